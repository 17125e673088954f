//! Blog metadata from the ```` ```blog ```` fence.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::compiler::CompileError;

/// Metadata of one article.
///
/// Parsed from TOML. Keys are camelCase, as in the emitted object; unknown
/// keys are carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,

    /// Empty means "not set"; filled from the first `# heading` later.
    #[serde(default)]
    pub title: String,

    /// License string, e.g. `CC BY-ND 4.0`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,

    #[serde(default, alias = "bg_image", skip_serializing_if = "Option::is_none")]
    pub bg_image: Option<String>,

    /// Article directory relative to the blog root, `/`-separated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BlogMeta {
    pub fn parse(source: &str) -> Result<Self, CompileError> {
        toml::from_str(source).map_err(CompileError::Metadata)
    }

    pub fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_fields() {
        let meta = BlogMeta::parse(
            r#"
uuid = "8c90c1d3"
title = "Hello"
copyright = "CC BY-ND 4.0"
topics = ["rust", "net"]
lang = "English"
bgImage = "./res/bg.png"
"#,
        )
        .unwrap();
        assert_eq!(meta.uuid.as_deref(), Some("8c90c1d3"));
        assert_eq!(meta.title, "Hello");
        assert_eq!(meta.copyright.as_deref(), Some("CC BY-ND 4.0"));
        assert_eq!(meta.topics, Some(vec!["rust".into(), "net".into()]));
        assert_eq!(meta.lang.as_deref(), Some("English"));
        assert_eq!(meta.bg_image.as_deref(), Some("./res/bg.png"));
        assert!(meta.extra.is_empty());
    }

    #[test]
    fn test_extra_keys_preserved() {
        let meta = BlogMeta::parse("title = \"t\"\nseries = \"net\"\n").unwrap();
        assert_eq!(meta.extra.get("series"), Some(&Value::String("net".into())));

        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["series"], "net");
        assert!(json.get("uuid").is_none());
    }

    #[test]
    fn test_invalid_toml() {
        let err = BlogMeta::parse("title = ").unwrap_err();
        assert!(matches!(err, CompileError::Metadata(_)));
    }

    #[test]
    fn test_serialized_keys_are_camel_case() {
        let meta = BlogMeta {
            title: "t".into(),
            bg_image: Some("bg.png".into()),
            ..Default::default()
        };
        let json = serde_json::to_string(&meta).unwrap();
        assert_eq!(json, r#"{"title":"t","bgImage":"bg.png"}"#);
    }
}
