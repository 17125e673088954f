//! Compile options and their resolution.
//!
//! `CompileOptions` is what callers hand in; [`resolve`] validates it once
//! into [`ResolvedOptions`], which the pipeline treats as read-only.
//!
//! Resolution failures are configuration errors: the public entry points
//! print them and exit the process (see [`resolve_or_exit`]).

mod target;

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::bundler::{Bundler, EsbuildBundler};
use crate::fs::{FileSystem, RealFs};
use crate::utils::normalize_path;

pub use target::{Target, UnknownTarget};

/// Inline assets smaller than this many bytes into the bundle.
pub const DEFAULT_INLINE_LIMIT: u64 = 10_000;

/// Invoked after every successful compile.
pub type BuildCallback = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

/// Options for the bundle step.
#[derive(Debug, Clone)]
pub struct BundleOptions {
    /// Bundler command line prefix, e.g. `["esbuild"]` or `["npx", "esbuild"]`
    pub command: Vec<String>,
    /// Assets up to this size are inlined as data URLs
    pub inline_limit: u64,
    /// Record the input directory, relative to `blog_root_dir`, as `meta.path`
    pub add_path_to_meta: bool,
    pub blog_root_dir: Option<PathBuf>,
}

impl Default for BundleOptions {
    fn default() -> Self {
        Self {
            command: vec!["esbuild".to_string()],
            inline_limit: DEFAULT_INLINE_LIMIT,
            add_path_to_meta: false,
            blog_root_dir: None,
        }
    }
}

/// A compile request.
#[derive(Clone, Default)]
pub struct CompileOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub targets: Vec<Target>,
    pub on_build_complete: Option<BuildCallback>,
    /// Defaults to the local disk. A virtual filesystem requires absolute paths.
    pub input_fs: Option<Arc<dyn FileSystem>>,
    pub output_fs: Option<Arc<dyn FileSystem>>,
    /// Suppress all terminal output
    pub silent: bool,
    pub bundle: BundleOptions,
    /// Defaults to [`EsbuildBundler`] running `bundle.command`.
    pub bundler: Option<Arc<dyn Bundler>>,
}

impl CompileOptions {
    pub fn new(
        input_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        targets: impl IntoIterator<Item = Target>,
    ) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            targets: targets.into_iter().collect(),
            ..Default::default()
        }
    }
}

impl fmt::Debug for CompileOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompileOptions")
            .field("input_dir", &self.input_dir)
            .field("output_dir", &self.output_dir)
            .field("targets", &self.targets)
            .field("on_build_complete", &self.on_build_complete.is_some())
            .field("input_fs", &self.input_fs)
            .field("output_fs", &self.output_fs)
            .field("silent", &self.silent)
            .field("bundle", &self.bundle)
            .finish_non_exhaustive()
    }
}

/// Validated, normalized options.
#[derive(Clone)]
pub struct ResolvedOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub targets: BTreeSet<Target>,
    pub on_build_complete: Option<BuildCallback>,
    pub input_fs: Arc<dyn FileSystem>,
    pub output_fs: Arc<dyn FileSystem>,
    pub silent: bool,
    pub bundle: BundleOptions,
    pub bundler: Arc<dyn Bundler>,
}

impl fmt::Debug for ResolvedOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedOptions")
            .field("input_dir", &self.input_dir)
            .field("output_dir", &self.output_dir)
            .field("targets", &self.targets)
            .field("silent", &self.silent)
            .field("bundle", &self.bundle)
            .finish_non_exhaustive()
    }
}

impl ResolvedOptions {
    pub fn wants(&self, target: Target) -> bool {
        self.targets.contains(&target)
    }
}

/// Caller misuse detected while resolving options.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionsError {
    #[error("{which} directory is empty")]
    EmptyDir { which: &'static str },

    #[error("{which} directory `{path}` must be absolute when a virtual filesystem is used")]
    RelativeVirtualPath { which: &'static str, path: PathBuf },

    #[error("no target specified")]
    NoTargets,

    #[error("bundle command is empty")]
    EmptyBundleCommand,

    #[error("`blog_root_dir` is required when `add_path_to_meta` is enabled")]
    MissingBlogRoot,
}

/// Validate and normalize a compile request.
pub fn resolve(options: CompileOptions) -> Result<ResolvedOptions, OptionsError> {
    let input_dir = resolve_dir("input", &options.input_dir, options.input_fs.is_some())?;
    let output_dir = resolve_dir("output", &options.output_dir, options.output_fs.is_some())?;

    if options.targets.is_empty() {
        return Err(OptionsError::NoTargets);
    }
    let targets: BTreeSet<_> = options.targets.into_iter().collect();

    let mut bundle = options.bundle;
    if bundle.command.iter().all(|s| s.trim().is_empty()) {
        return Err(OptionsError::EmptyBundleCommand);
    }
    if bundle.add_path_to_meta {
        let root = bundle
            .blog_root_dir
            .as_deref()
            .ok_or(OptionsError::MissingBlogRoot)?;
        bundle.blog_root_dir = Some(normalize_path(root));
    }

    let bundler = options
        .bundler
        .unwrap_or_else(|| Arc::new(EsbuildBundler::new(bundle.command.clone())));

    Ok(ResolvedOptions {
        input_dir,
        output_dir,
        targets,
        on_build_complete: options.on_build_complete,
        input_fs: options.input_fs.unwrap_or_else(|| Arc::new(RealFs)),
        output_fs: options.output_fs.unwrap_or_else(|| Arc::new(RealFs)),
        silent: options.silent,
        bundle,
        bundler,
    })
}

/// Resolve options, or print the problem and exit the process.
pub fn resolve_or_exit(options: CompileOptions) -> ResolvedOptions {
    match resolve(options) {
        Ok(resolved) => resolved,
        Err(e) => {
            // Configuration errors are reported even in silent mode.
            crate::logger::set_silent(false);
            crate::log!("error"; "invalid compiler options: {}", e);
            std::process::exit(1);
        }
    }
}

fn resolve_dir(which: &'static str, path: &Path, is_virtual: bool) -> Result<PathBuf, OptionsError> {
    if path.as_os_str().is_empty() {
        return Err(OptionsError::EmptyDir { which });
    }
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    if is_virtual {
        return Err(OptionsError::RelativeVirtualPath {
            which,
            path: path.to_path_buf(),
        });
    }
    Ok(normalize_path(path))
}
