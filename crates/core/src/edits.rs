//! Edits submitted by the browser editor for one request.

use crate::error::DecodeError;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Form field carrying the JSON edit payload.
pub const EDITS_FIELD: &str = "ContentEditor";
/// Form field carrying an uploaded file.
pub const UPLOAD_FIELD: &str = "ContentEditorUpload";

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(default)]
    meta: Option<String>,
    #[serde(default)]
    regions: Option<BTreeMap<String, JsonValue>>,
}

/// Decoded edit set: an optional metadata block and edits keyed by region name.
///
/// Region payloads are opaque here; only an [`crate::EditorHandler`] reads them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditSet {
    meta: Option<String>,
    regions: BTreeMap<String, JsonValue>,
}

impl EditSet {
    /// An edit set with nothing in it.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Decodes the raw payload. A missing or blank payload is an empty set.
    pub fn decode(raw: Option<&[u8]>) -> Result<Self, DecodeError> {
        let Some(raw) = raw else {
            return Ok(Self::empty());
        };
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::empty());
        }

        let value: JsonValue = serde_json::from_slice(raw)?;
        if !value.is_object() {
            return Err(DecodeError::NotAnObject);
        }
        let payload: Payload = serde_json::from_value(value)?;

        Ok(Self {
            meta: payload.meta.filter(|meta| !meta.is_empty()),
            regions: payload
                .regions
                .unwrap_or_default()
                .into_iter()
                .filter(|(_, edit)| !edit.is_null())
                .collect(),
        })
    }

    /// Whether anything was submitted. Gates every file mutation.
    pub fn been_received(&self) -> bool {
        self.meta.is_some() || !self.regions.is_empty()
    }

    /// Submitted metadata block.
    pub fn meta(&self) -> Option<&str> {
        self.meta.as_deref()
    }

    /// Whether at least one region edit was submitted.
    pub fn has_region_edits(&self) -> bool {
        !self.regions.is_empty()
    }

    /// Editor payload for `name`.
    pub fn region_edit(&self, name: &str) -> Option<&JsonValue> {
        self.regions.get(name)
    }

    /// Names of all edited regions, sorted.
    pub fn region_names(&self) -> impl Iterator<Item = &str> {
        self.regions.keys().map(String::as_str)
    }
}
