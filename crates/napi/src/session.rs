//! The per-request session class.

use crate::convert_error;
use crate::types::SessionOptions;
use napi_derive::napi;
use pagepatch_core::{
    Capabilities, EditRequest, EditSession, EditorConfig, RequestContext, UploadedFile,
    strip_end_markers,
};
use pagepatch_editors::handler_for;
use serde_json::Value as JsonValue;
use std::path::Path;

/// One edit request, driven through the host's page lifecycle.
#[napi]
pub struct ContentEditorSession {
    inner: EditSession,
}

#[napi]
impl ContentEditorSession {
    #[napi(constructor)]
    /// Starts a session and decodes the submitted payload.
    pub fn new(options: SessionOptions) -> napi::Result<Self> {
        let config = match options.config {
            Some(value) => EditorConfig::from_value(value).map_err(convert_error)?,
            None => EditorConfig::default(),
        };
        let request = EditRequest {
            payload: options.payload.map(String::into_bytes),
            upload: options.upload.map(|upload| UploadedFile {
                name: upload.name,
                contents: upload.contents.to_vec(),
            }),
        };
        let ctx = RequestContext {
            content_root: options.content_root.into(),
            request_file: options.request_file.into(),
            base_url: options.base_url.unwrap_or_else(|| "/".to_string()),
            capabilities: options
                .capabilities
                .map(Capabilities::from)
                .unwrap_or_default(),
            config,
        };
        Ok(Self {
            inner: EditSession::new(request, ctx, handler_for),
        })
    }

    /// Saves page edits and returns the content to render.
    #[napi(js_name = "contentLoaded")]
    pub fn content_loaded(&mut self, raw: String) -> String {
        self.inner.content_loaded(&raw)
    }

    /// Editor assets and metadata block, or `null` when the caller may not edit.
    #[napi(js_name = "editorMarkup")]
    pub fn editor_markup(&self, assets_url: String, assets_dir: Option<String>) -> Option<String> {
        self.inner
            .editor_markup(&assets_url, assets_dir.as_deref().map(Path::new))
    }

    /// Saves theme regions and returns what to send: the JSON response for
    /// edit and upload requests, the page without end markers otherwise.
    #[napi(js_name = "pageRendered")]
    pub fn page_rendered(&mut self, output: String) -> napi::Result<String> {
        match self.inner.page_rendered(&output) {
            Some(response) => response.to_json().map_err(convert_error),
            None => Ok(strip_end_markers(&output).into_owned()),
        }
    }

    /// Notifications gathered so far.
    #[napi(getter)]
    pub fn status(&self) -> napi::Result<JsonValue> {
        serde_json::to_value(self.inner.status()).map_err(convert_error)
    }
}
