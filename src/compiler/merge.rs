//! Splice the compiled article into `article.tsx`.

use std::path::Path;

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use super::{BlogMeta, CompileError};
use crate::utils::relative_slash_path;

/// Forward declaration that `article.tsx` must contain exactly as written.
pub const BLOG_DECLARATION: &str = "declare function blog(): Blog;";

/// `{ ...<meta json>, content: <jsx> }`
pub fn blog_object(meta: &BlogMeta, content: &str) -> Result<String, CompileError> {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    meta.serialize(&mut ser)?;
    // serde_json only emits valid UTF-8.
    let json = String::from_utf8_lossy(&buf);
    Ok(format!("{{ ...{json}, content: {content} }}"))
}

/// Replace the first [`BLOG_DECLARATION`] with a definition returning `object`.
pub fn inject_blog_object(tsx: &str, object: &str) -> Result<String, CompileError> {
    if !tsx.contains(BLOG_DECLARATION) {
        return Err(CompileError::missing_marker());
    }
    Ok(tsx.replacen(
        BLOG_DECLARATION,
        &format!("function blog(): Blog {{ return {object}; }}"),
        1,
    ))
}

/// Record `input_dir` relative to `blog_root` as `meta.path`.
pub fn add_path_to_meta(
    meta: &mut BlogMeta,
    input_dir: &Path,
    blog_root: &Path,
) -> Result<(), CompileError> {
    let outside = || CompileError::OutsideBlogRoot {
        dir: input_dir.to_path_buf(),
        root: blog_root.to_path_buf(),
    };
    let path = relative_slash_path(input_dir, blog_root).ok_or_else(outside)?;
    let first = path.split('/').next().unwrap_or_default();
    if first == ".." || first == "." {
        return Err(outside());
    }
    meta.path = Some(path);
    Ok(())
}
