#![deny(missing_docs)]
//! Browser editor backends for pagepatch.
//!
//! Each backend implements [`pagepatch_core::EditorHandler`]; [`handler_for`]
//! picks one from the configured [`EditorKind`] and can be handed to
//! [`pagepatch_core::EditSession::new`] directly.

/// ContentTools backend.
pub mod content_tools;
/// HTML to Markdown conversion.
pub mod markdownify;
/// Quill delta backend.
pub mod quill;

use pagepatch_core::{EditorHandler, EditorKind};

pub use content_tools::ContentToolsEditor;
pub use markdownify::html_to_markdown;
pub use quill::QuillEditor;

/// Backend for `kind`.
pub fn handler_for(kind: EditorKind) -> Box<dyn EditorHandler> {
    match kind {
        EditorKind::ContentTools => Box::new(ContentToolsEditor),
        EditorKind::Quill => Box::new(QuillEditor),
    }
}
