//! One compile of an article directory.
//!
//! # Flow
//!
//! ```text
//! ensure input dir -> recreate output dir -> read sources
//!   -> content view (blog.tsx)
//!        -> bundle (blog-bundle/)
//!             -> export (export.md)
//!        <- content view after-phase: format or delete blog.tsx
//!   -> on_build_complete
//! ```
//!
//! Steps are chained through [`Next`]: a step does its work, hands the
//! context to the rest of the chain, and may act again once it returns.

mod steps;
#[cfg(test)]
mod tests;

use std::collections::BTreeSet;
use std::time::Instant;

use anyhow::{Context, Result};

use crate::compiler::{CompileError, CompiledMarkdown, CompilerContext};
use crate::log;
use crate::options::{ResolvedOptions, Target};

pub use steps::step_for;

/// Markdown source, inside the input directory.
pub const ARTICLE_MD: &str = "article.md";
/// Component source, inside the input directory.
pub const ARTICLE_TSX: &str = "article.tsx";
/// Merged TSX, inside the output directory.
pub const BLOG_TSX: &str = "blog.tsx";
/// Bundle directory, inside the output directory.
pub const BUNDLE_DIR: &str = "blog-bundle";
/// Host module manifest, inside the bundle directory.
pub const INFO_JSON: &str = "info.json";
/// Static resources, copied from the input to the bundle directory.
pub const RES_DIR: &str = "res";
/// Portable markdown, inside the output directory.
pub const EXPORT_MD: &str = "export.md";

/// The two authored files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sources {
    pub markdown: String,
    pub tsx: String,
}

/// Everything a step can see.
pub struct BuildContext<'a> {
    pub options: &'a ResolvedOptions,
    pub sources: &'a Sources,
    pub compiler: &'a mut CompilerContext,
    compiled: Option<CompiledMarkdown>,
}

impl<'a> BuildContext<'a> {
    pub fn new(
        options: &'a ResolvedOptions,
        sources: &'a Sources,
        compiler: &'a mut CompilerContext,
    ) -> Self {
        Self {
            options,
            sources,
            compiler,
            compiled: None,
        }
    }

    /// Markdown compiled once per build, shared by the steps that need it.
    pub fn compiled(&mut self) -> Result<&CompiledMarkdown, CompileError> {
        let compiled = match self.compiled.take() {
            Some(compiled) => compiled,
            None => self
                .compiler
                .markdown
                .compile_markdown(&self.sources.markdown)?,
        };
        Ok(self.compiled.insert(compiled))
    }

    pub fn output_path(&self, name: &str) -> std::path::PathBuf {
        self.options.output_dir.join(name)
    }
}

/// A stage of the build.
pub trait BuildStep: Sync {
    fn target(&self) -> Target;

    /// Do the work of this step. Call `next.run(ctx)` at most once to
    /// continue the chain; not calling it ends the build here.
    fn run(&self, ctx: &mut BuildContext<'_>, next: Next<'_>) -> Result<()>;
}

/// Continuation: the steps after the current one.
///
/// Consumed by [`Next::run`], so a step cannot continue the chain twice.
#[must_use = "a step that drops `next` ends the build early"]
pub struct Next<'s> {
    rest: &'s [&'static dyn BuildStep],
}

impl<'s> Next<'s> {
    pub fn new(steps: &'s [&'static dyn BuildStep]) -> Self {
        Self { rest: steps }
    }

    pub fn run(self, ctx: &mut BuildContext<'_>) -> Result<()> {
        match self.rest.split_first() {
            Some((step, rest)) => {
                crate::debug!("build"; "step {}", step.target());
                step.run(ctx, Next { rest })
            }
            None => Ok(()),
        }
    }
}

/// Order requested targets into build steps.
///
/// `blog-bundle` needs `blog.tsx` first; `export.md` always comes last.
pub fn resolve_targets(targets: &BTreeSet<Target>) -> Vec<Target> {
    let mut order = Vec::with_capacity(3);
    if targets.contains(&Target::BlogBundle) {
        order.extend([Target::BlogTsx, Target::BlogBundle]);
    } else if targets.contains(&Target::BlogTsx) {
        order.push(Target::BlogTsx);
    }
    if targets.contains(&Target::ExportMd) {
        order.push(Target::ExportMd);
    }
    order
}

/// Run one full compile.
pub fn rebuild(options: &ResolvedOptions, compiler: &mut CompilerContext) -> Result<()> {
    let started = Instant::now();

    ensure_input_dir(options)?;
    clean_output_dir(options)?;
    let sources = read_sources(options)?;

    let steps: Vec<&'static dyn BuildStep> = resolve_targets(&options.targets)
        .into_iter()
        .map(step_for)
        .collect();
    let mut ctx = BuildContext::new(options, &sources, compiler);
    Next::new(&steps).run(&mut ctx)?;

    log!("build"; "compiled in {:.3}s", started.elapsed().as_secs_f64());

    if let Some(callback) = &options.on_build_complete {
        let started = Instant::now();
        log!("build"; "running on_build_complete...");
        callback().context("on_build_complete failed")?;
        log!("build"; "on_build_complete finished in {:.3}s", started.elapsed().as_secs_f64());
    }

    Ok(())
}

fn ensure_input_dir(options: &ResolvedOptions) -> Result<()> {
    options
        .input_fs
        .create_dir_all(&options.input_dir)
        .with_context(|| format!("cannot access input directory `{}`", options.input_dir.display()))
}

fn clean_output_dir(options: &ResolvedOptions) -> Result<()> {
    let dir = &options.output_dir;
    options
        .output_fs
        .remove_dir_all(dir)
        .with_context(|| format!("cannot remove output directory `{}`", dir.display()))?;
    options
        .output_fs
        .create_dir_all(dir)
        .with_context(|| format!("cannot create output directory `{}`", dir.display()))
}

fn read_sources(options: &ResolvedOptions) -> Result<Sources> {
    let read = |name: &str| {
        let path = options.input_dir.join(name);
        options
            .input_fs
            .read_to_string(&path)
            .with_context(|| format!("cannot read `{}`", path.display()))
    };
    Ok(Sources {
        markdown: read(ARTICLE_MD)?,
        tsx: read(ARTICLE_TSX)?,
    })
}
