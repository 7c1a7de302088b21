//! Editor settings: site configuration with per-page overrides.
//!
//! Keys are matched ignoring case, `_` and `-`, so `ContentToolsUrl`,
//! `contenttoolsurl` and `content_tools_url` are the same setting. A page can
//! override settings through a `content_editor` mapping in its front matter.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Front matter key holding per-page overrides.
pub const PAGE_SETTINGS_KEY: &str = "content_editor";

/// Browser editor backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorKind {
    /// Quill: submits rich-text deltas.
    #[serde(alias = "Quill")]
    Quill,
    /// ContentTools: submits HTML. Unknown editor names fall back to it.
    #[default]
    #[serde(alias = "content_tools", other)]
    ContentTools,
}

/// Resolved editor settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Include debug information in responses.
    pub debug: bool,
    /// Render the editor for callers allowed to edit.
    pub show: bool,
    /// Editor backend.
    pub editor: EditorKind,
    /// Upload directory, relative to the content root.
    #[serde(rename = "uploadpath")]
    pub upload_path: String,
    /// Editor UI language code.
    pub language: Option<String>,
    /// Location of the ContentTools library, when not bundled.
    #[serde(rename = "contenttoolsurl")]
    pub content_tools_url: Option<String>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            debug: false,
            show: true,
            editor: EditorKind::default(),
            upload_path: "images".to_string(),
            language: None,
            content_tools_url: None,
        }
    }
}

impl EditorConfig {
    /// Parses the plugin section of the site configuration.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let yaml_value: serde_yaml::Value = serde_yaml::from_str(yaml)?;
        let value = serde_json::to_value(yaml_value)?;
        Self::from_value(value)
    }

    /// Builds settings from a JSON mapping, normalizing keys.
    pub fn from_value(value: JsonValue) -> Result<Self, ConfigError> {
        match normalize_keys(value) {
            JsonValue::Null => Ok(Self::default()),
            value @ JsonValue::Object(_) => Ok(serde_json::from_value(value)?),
            _ => Err(ConfigError::InvalidRootType),
        }
    }

    /// Applies the `content_editor` section of a page's front matter.
    pub fn with_page_overrides(&self, page_meta: &JsonValue) -> Result<Self, ConfigError> {
        let Some(overrides) = page_section(page_meta) else {
            return Ok(self.clone());
        };
        let JsonValue::Object(overrides) = normalize_keys(overrides.clone()) else {
            return Err(ConfigError::InvalidRootType);
        };

        let mut merged = match serde_json::to_value(self)? {
            JsonValue::Object(map) => map,
            _ => Map::new(),
        };
        merged.extend(overrides);
        Self::from_value(JsonValue::Object(merged))
    }
}

fn page_section(page_meta: &JsonValue) -> Option<&JsonValue> {
    page_meta
        .as_object()?
        .iter()
        .find(|(key, _)| normalize_key(key) == normalize_key(PAGE_SETTINGS_KEY))
        .map(|(_, value)| value)
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

fn normalize_keys(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) => JsonValue::Object(
            map.into_iter()
                .map(|(key, value)| (normalize_key(&key), normalize_keys(value)))
                .collect(),
        ),
        JsonValue::Array(items) => JsonValue::Array(items.into_iter().map(normalize_keys).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_source_yields_defaults() {
        let config = EditorConfig::from_yaml_str("").unwrap();
        assert_eq!(config, EditorConfig::default());
        assert_eq!(config.upload_path, "images");
        assert!(config.show);
    }

    #[test]
    fn keys_are_case_insensitive() {
        let yaml = "Debug: true\nEditor: quill\nUploadPath: media/uploads\nContentToolsUrl: https://cdn.example/ct\n";
        let config = EditorConfig::from_yaml_str(yaml).unwrap();
        assert!(config.debug);
        assert_eq!(config.editor, EditorKind::Quill);
        assert_eq!(config.upload_path, "media/uploads");
        assert_eq!(
            config.content_tools_url.as_deref(),
            Some("https://cdn.example/ct")
        );
    }

    #[test]
    fn unknown_editor_falls_back_to_content_tools() {
        let config = EditorConfig::from_yaml_str("editor: tinymce").unwrap();
        assert_eq!(config.editor, EditorKind::ContentTools);
    }

    #[test]
    fn page_overrides_win_over_site_settings() {
        let site = EditorConfig::from_yaml_str("show: true\nlanguage: en").unwrap();
        let page = json!({
            "title": "About",
            "Content_Editor": { "Show": false, "upload_path": "about/img" }
        });
        let config = site.with_page_overrides(&page).unwrap();
        assert!(!config.show);
        assert_eq!(config.upload_path, "about/img");
        assert_eq!(config.language.as_deref(), Some("en"));
    }

    #[test]
    fn pages_without_section_keep_site_settings() {
        let site = EditorConfig::from_yaml_str("debug: true").unwrap();
        let config = site.with_page_overrides(&json!({ "title": "x" })).unwrap();
        assert_eq!(config, site);
    }

    #[test]
    fn rejects_non_mapping_roots() {
        let err = EditorConfig::from_yaml_str("- a\n- b").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRootType));
    }
}
