//! Browser editor backends.
//!
//! A backend knows which assets the browser needs and how to turn the payload
//! it submits for a region into the text stored in the file. New backends are
//! added by implementing [`EditorHandler`]; nothing else inspects payloads.

use crate::config::{EditorConfig, EditorKind};
use crate::error::ConvertError;
use serde_json::Value as JsonValue;
use std::path::Path;

/// What a backend may use when rendering its asset tags.
#[derive(Debug, Clone, Copy)]
pub struct AssetContext<'a> {
    /// Public URL of the bundled assets directory.
    pub assets_url: &'a str,
    /// Local path of the same directory, for reading bundled files.
    pub assets_dir: Option<&'a Path>,
    /// Settings of the current page.
    pub config: &'a EditorConfig,
}

/// A browser editor backend.
pub trait EditorHandler: Send + Sync {
    /// Backend identifier.
    fn kind(&self) -> EditorKind;

    /// `<link>`/`<script>` tags the editor needs on the page.
    fn assets(&self, ctx: &AssetContext<'_>) -> String;

    /// Text that replaces a region's content, as HTML or Markdown.
    fn render_output(&self, edit: &JsonValue, markdown: bool) -> Result<String, ConvertError>;
}

/// Picks the backend for a configured editor kind.
pub type EditorFactory = fn(EditorKind) -> Box<dyn EditorHandler>;

/// Backend that stores submitted strings verbatim. Used when the host
/// does not register real backends.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughEditor;

impl EditorHandler for PassthroughEditor {
    fn kind(&self) -> EditorKind {
        EditorKind::ContentTools
    }

    fn assets(&self, _ctx: &AssetContext<'_>) -> String {
        String::new()
    }

    fn render_output(&self, edit: &JsonValue, _markdown: bool) -> Result<String, ConvertError> {
        match edit {
            JsonValue::String(text) => Ok(text.clone()),
            _ => edit
                .get("html")
                .and_then(JsonValue::as_str)
                .map(str::to_string)
                .ok_or(ConvertError::MissingField {
                    editor: "passthrough",
                    field: "html",
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn passthrough_accepts_strings_and_html_objects() {
        let editor = PassthroughEditor;
        assert_eq!(editor.render_output(&json!("New"), false).unwrap(), "New");
        assert_eq!(
            editor
                .render_output(&json!({ "html": "<b>x</b>" }), true)
                .unwrap(),
            "<b>x</b>"
        );
        assert!(editor.render_output(&json!({ "deltas": [] }), false).is_err());
    }
}
