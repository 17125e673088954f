//! Compile-time errors.
//!
//! These abort the current compile only. One-shot builds return them to the
//! caller; watch mode logs them and waits for the next change.

use std::path::PathBuf;

use thiserror::Error;

use super::merge::BLOG_DECLARATION;

/// Structural problems in the authored sources.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("`{marker}` declaration not found in article.tsx")]
    MissingMarker { marker: &'static str },

    #[error("failed to parse {file}: {message}")]
    Parse { file: &'static str, message: String },

    #[error("non-relative import `{0}` is not allowed; use `./`, `../`, `/` or the `#` host prefix")]
    NonRelativeImport(String),

    #[error("`import type` from host module `{0}` is not allowed")]
    TypeOnlyImport(String),

    #[error("named bindings are not allowed when importing host module `{0}`")]
    NamedBindings(String),

    #[error("import of host module `{0}` has no default binding")]
    MissingDefaultBinding(String),

    #[error("invalid `blog` metadata block")]
    Metadata(#[source] toml::de::Error),

    #[error("input directory `{dir}` is not inside blog root `{root}`")]
    OutsideBlogRoot { dir: PathBuf, root: PathBuf },

    #[error("failed to serialize blog metadata")]
    Serialize(#[from] serde_json::Error),
}

impl CompileError {
    pub fn missing_marker() -> Self {
        Self::MissingMarker {
            marker: BLOG_DECLARATION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_marker_names_marker() {
        let msg = CompileError::missing_marker().to_string();
        assert!(msg.contains("declare function blog(): Blog;"));
    }

    #[test]
    fn test_import_error_display() {
        let msg = CompileError::NonRelativeImport("react".into()).to_string();
        assert!(msg.contains("`react`"));
    }
}
