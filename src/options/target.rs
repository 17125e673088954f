use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Build target.
///
/// Ordering follows the build order: `blog.tsx` must exist before
/// `blog-bundle` can read it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Target {
    /// Merged TSX source, `blog.tsx`
    #[serde(rename = "blog.tsx")]
    BlogTsx,
    /// Bundled script and stylesheet, `blog-bundle/`
    #[serde(rename = "blog-bundle")]
    BlogBundle,
    /// Portable markdown export, `export.md`
    #[serde(rename = "export.md")]
    ExportMd,
}

impl Target {
    pub const ALL: [Target; 3] = [Target::BlogTsx, Target::BlogBundle, Target::ExportMd];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::BlogTsx => "blog.tsx",
            Self::BlogBundle => "blog-bundle",
            Self::ExportMd => "export.md",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown target `{0}` (expected one of: blog.tsx, blog-bundle, export.md)")]
pub struct UnknownTarget(pub String);

impl FromStr for Target {
    type Err = UnknownTarget;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownTarget(s.to_string()))
    }
}
