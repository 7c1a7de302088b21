//! ContentTools backend: regions are submitted as ready HTML.

use crate::markdownify::html_to_markdown;
use html_escape::encode_double_quoted_attribute;
use pagepatch_core::{AssetContext, ConvertError, EditorHandler, EditorKind};
use serde_json::Value as JsonValue;
use std::fs;

const EDITOR: &str = "contenttools";

/// ContentTools editor backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentToolsEditor;

impl EditorHandler for ContentToolsEditor {
    fn kind(&self) -> EditorKind {
        EditorKind::ContentTools
    }

    fn assets(&self, ctx: &AssetContext<'_>) -> String {
        let assets_url = ctx.assets_url;
        let lib_url = match ctx.config.content_tools_url.as_deref() {
            Some(url) if !url.trim().is_empty() => url.trim().trim_end_matches('/').to_string(),
            _ => format!("{assets_url}/ContentTools"),
        };
        let language = ctx
            .config
            .language
            .as_deref()
            .filter(|lang| is_language_code(lang));
        let translations = language
            .and_then(|lang| load_translations(ctx, lang))
            .unwrap_or_default();
        let lang_attr = encode_double_quoted_attribute(language.unwrap_or_default());

        format!(
            "<link href=\"{lib_url}/build/content-tools.min.css\" rel=\"stylesheet\">\n\
             <script src=\"{lib_url}/build/content-tools.min.js\"></script>\n\
             <link href=\"{assets_url}/style.css\" rel=\"stylesheet\">\n\
             <script id=\"ContentToolsLanguage\" type=\"application/json\" data-lang=\"{lang_attr}\">{translations}</script>\n\
             <script src=\"{assets_url}/editor.js\"></script>\n"
        )
    }

    fn render_output(&self, edit: &JsonValue, markdown: bool) -> Result<String, ConvertError> {
        let html = match edit {
            JsonValue::String(html) => html.as_str(),
            _ => edit
                .get("html")
                .and_then(JsonValue::as_str)
                .ok_or(ConvertError::MissingField {
                    editor: EDITOR,
                    field: "html",
                })?,
        };
        if !markdown {
            return Ok(html.to_string());
        }
        html_to_markdown(html).map_err(|err| ConvertError::InvalidPayload {
            editor: EDITOR,
            message: err.to_string(),
        })
    }
}

fn is_language_code(lang: &str) -> bool {
    !lang.is_empty()
        && lang
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Bundled translation file, only available when ContentTools is served
/// from the local assets directory.
fn load_translations(ctx: &AssetContext<'_>, lang: &str) -> Option<String> {
    if ctx.config.content_tools_url.is_some() {
        return None;
    }
    let path = ctx
        .assets_dir?
        .join("ContentTools")
        .join("translations")
        .join(format!("{lang}.json"));
    match fs::read_to_string(&path) {
        Ok(data) => Some(data),
        Err(err) => {
            log::warn!("no ContentTools translations at {}: {err}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagepatch_core::EditorConfig;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn returns_html_unchanged_without_markdown() {
        let edit = json!({ "html": "<p>Hello <b>you</b></p>" });
        assert_eq!(
            ContentToolsEditor.render_output(&edit, false).unwrap(),
            "<p>Hello <b>you</b></p>"
        );
        assert_eq!(
            ContentToolsEditor.render_output(&json!("New"), false).unwrap(),
            "New"
        );
    }

    #[test]
    fn converts_to_markdown_when_asked() {
        let edit = json!({ "html": "<strong>Hi</strong>" });
        assert_eq!(ContentToolsEditor.render_output(&edit, true).unwrap(), "**Hi**");
    }

    #[test]
    fn rejects_payloads_without_html() {
        let err = ContentToolsEditor
            .render_output(&json!({ "deltas": {} }), false)
            .unwrap_err();
        assert!(matches!(err, ConvertError::MissingField { field: "html", .. }));
    }

    #[test]
    fn assets_embed_local_translations() {
        let temp = TempDir::new().unwrap();
        let translations = temp.path().join("ContentTools").join("translations");
        fs::create_dir_all(&translations).unwrap();
        fs::write(translations.join("fr.json"), r#"{"Save":"Enregistrer"}"#).unwrap();

        let config = EditorConfig {
            language: Some("fr".to_string()),
            ..EditorConfig::default()
        };
        let ctx = AssetContext {
            assets_url: "/plugins/assets",
            assets_dir: Some(temp.path()),
            config: &config,
        };
        let markup = ContentToolsEditor.assets(&ctx);
        assert!(markup.contains(r#"<link href="/plugins/assets/ContentTools/build/content-tools.min.css""#));
        assert!(markup.contains(r#"data-lang="fr">{"Save":"Enregistrer"}</script>"#));
    }

    #[test]
    fn assets_use_configured_library_url() {
        let config = EditorConfig {
            content_tools_url: Some("https://cdn.example/ct/".to_string()),
            language: Some("../../etc/passwd".to_string()),
            ..EditorConfig::default()
        };
        let ctx = AssetContext {
            assets_url: "/assets",
            assets_dir: None,
            config: &config,
        };
        let markup = ContentToolsEditor.assets(&ctx);
        assert!(markup.contains(r#"<script src="https://cdn.example/ct/build/content-tools.min.js">"#));
        assert!(markup.contains(r#"data-lang=""></script>"#));
    }
}
