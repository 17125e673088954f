//! Shared helpers.
//!
//! - [`path`]: path normalization (`normalize_path`, `relative_slash_path`)
//! - [`exec`]: external command execution (`Cmd`)

pub mod exec;
pub mod path;

pub use path::{is_hidden, normalize_path, relative_slash_path};
