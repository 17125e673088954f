//! Compilation of `article.md` + `article.tsx` into one TSX module.
//!
//! # Module Structure
//!
//! ```text
//! compiler/
//! ├── markdown/   # article.md -> { meta, content: <jsx> }
//! ├── merge       # splice the blog object into article.tsx
//! ├── imports     # `#module` imports -> giveme('module')
//! └── format      # re-print TSX for the blog.tsx target
//! ```

mod error;
pub mod format;
pub mod imports;
pub mod markdown;
pub mod merge;

pub use error::CompileError;
pub use format::format_tsx;
pub use imports::{ImportRecord, ModuleManifest, Transpiled, find_host_imports, rewrite_imports};
pub use markdown::{BlogMeta, CompiledMarkdown, MarkdownCompiler};
pub use merge::{BLOG_DECLARATION, add_path_to_meta, blog_object, inject_blog_object};

/// State carried across the steps of one compile, and across compiles of
/// one watch session.
///
/// Holds the markdown compiler so its extension set is configured once.
/// Not shared between concurrently running compiles.
#[derive(Debug, Default)]
pub struct CompilerContext {
    pub markdown: MarkdownCompiler,
}

impl CompilerContext {
    pub fn new() -> Self {
        Self::default()
    }
}
