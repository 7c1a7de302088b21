//! NAPI-exposed data structures.

use napi::bindgen_prelude::Buffer;
use napi_derive::napi;
use pagepatch_core::Capabilities;
use serde_json::Value as JsonValue;

/// Everything the host knows about the request being served.
#[napi(object)]
pub struct SessionOptions {
    /// Directory holding the site's content.
    pub content_root: String,
    /// File of the page being served.
    pub request_file: String,
    /// Public URL of the content root, with its trailing slash.
    pub base_url: Option<String>,
    /// Value of the `ContentEditor` form field.
    pub payload: Option<String>,
    /// File sent in the `ContentEditorUpload` form field.
    pub upload: Option<UploadInput>,
    /// What the caller may do. Everything is allowed when omitted.
    pub capabilities: Option<CapabilitiesInput>,
    /// Site-wide editor settings, as found in the site configuration.
    pub config: Option<JsonValue>,
}

/// An uploaded file.
#[napi(object)]
pub struct UploadInput {
    /// Client-side file name.
    pub name: String,
    /// File bytes.
    pub contents: Buffer,
}

/// Capability flags decided by the host's authentication layer.
#[napi(object)]
#[derive(Debug, Clone, Default)]
pub struct CapabilitiesInput {
    /// Show the editor.
    pub edit: Option<bool>,
    /// Write pages and theme files.
    pub save: Option<bool>,
    /// Store uploads.
    pub upload: Option<bool>,
}

impl From<CapabilitiesInput> for Capabilities {
    fn from(input: CapabilitiesInput) -> Self {
        let all = Capabilities::all();
        Capabilities {
            edit: input.edit.unwrap_or(all.edit),
            save: input.save.unwrap_or(all.save),
            upload: input.upload.unwrap_or(all.upload),
        }
    }
}
