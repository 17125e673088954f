//! justmark - compile a markdown article and its TSX component into a
//! blog bundle a host page can load at runtime.
//!
//! # Entry points
//!
//! - [`build`]: one compile of an article directory
//! - [`watch`]: compile, then recompile on every change until stopped
//!
//! ```ignore
//! use justmark::{CompileOptions, Target};
//!
//! let options = CompileOptions::new("posts/hello", "dist/hello", [Target::BlogBundle]);
//! justmark::build(options)?;
//! ```

pub mod build;
pub mod bundler;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod fs;
pub mod logger;
pub mod options;
pub mod utils;
pub mod watch;

pub use bundler::{BundleJob, Bundler, EsbuildBundler};
pub use compiler::{BlogMeta, CompileError, CompilerContext};
pub use fs::{FileSystem, MemoryFs, RealFs};
pub use options::{BuildCallback, BundleOptions, CompileOptions, OptionsError, Target};
pub use watch::{WatchHandle, watch};

/// Compile `options.input_dir` once.
///
/// Invalid options are reported and terminate the process with status 1;
/// use [`options::resolve`] to validate without exiting.
pub fn build(options: CompileOptions) -> anyhow::Result<()> {
    logger::set_silent(options.silent);
    let options = options::resolve_or_exit(options);
    build::rebuild(&options, &mut CompilerContext::new())
}
