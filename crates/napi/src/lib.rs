#![deny(missing_docs)]
//! Node.js bindings that drive pagepatch edit sessions from a JavaScript host.

use napi::bindgen_prelude::*;
use napi_derive::napi;
use pagepatch_core::{ConfigError, EditorConfig, PatchError};
use serde_json::Value as JsonValue;

/// The per-request session class.
pub mod session;
/// NAPI-exposed data structures.
pub mod types;

pub use session::ContentEditorSession;
pub use types::*;

/// Resolves editor settings from the YAML plugin section of a site config,
/// filling in defaults.
#[napi(js_name = "parseEditorConfig")]
pub fn parse_editor_config(yaml: String) -> napi::Result<JsonValue> {
    let config = EditorConfig::from_yaml_str(&yaml).map_err(convert_error)?;
    serde_json::to_value(config).map_err(convert_error)
}

/// Removes every `<!-- end editable -->` marker from `content`.
#[napi(js_name = "stripEndMarkers")]
pub fn strip_end_markers(content: String) -> String {
    pagepatch_core::strip_end_markers(&content).into_owned()
}

fn convert_error<E: Into<PatchError>>(err: E) -> Error {
    match err.into() {
        PatchError::Config(ConfigError::Yaml(e)) => {
            Error::new(Status::InvalidArg, format!("Config parse error: {}", e))
        }
        PatchError::Config(e) => Error::new(Status::InvalidArg, e.to_string()),
        PatchError::Encoding(e) => Error::from_reason(format!("Encoding error: {}", e)),
    }
}
