#![deny(missing_docs)]
//! Pagepatch core: editable-region matching, exact-match file patching and
//! per-request edit sessions for flat-file CMS pages.

/// Applying submitted edits to parsed regions.
pub mod apply;
/// Per-request capabilities.
pub mod auth;
/// Editor settings and page-level overrides.
pub mod config;
/// Editor backend trait.
pub mod editor;
/// Submitted edit payload.
pub mod edits;
/// Core error types.
pub mod error;
/// Page metadata block extraction.
pub mod frontmatter;
/// Metadata block persistence.
pub mod meta;
/// Per-region save results.
pub mod outcome;
/// Region persistence and atomic writes.
pub mod persist;
/// Editable region grammar and matcher.
pub mod region;
/// Request lifecycle orchestration.
pub mod session;
/// Request-scoped notifications.
pub mod status;
/// Upload containment and storage.
pub mod upload;

pub use apply::EditApplier;
pub use auth::{Capabilities, Capability};
pub use config::{EditorConfig, EditorKind, PAGE_SETTINGS_KEY};
pub use editor::{AssetContext, EditorFactory, EditorHandler, PassthroughEditor};
pub use edits::{EDITS_FIELD, EditSet, UPLOAD_FIELD};
pub use error::{
    ConfigError, ConvertError, DecodeError, MetaError, PatchError, SaveError, UploadError,
};
pub use frontmatter::{FrontmatterError, MetaDelimiter, RawMeta, extract_raw_meta};
pub use meta::{META_SAVED, save_meta};
pub use outcome::{RegionOutcome, SaveState};
pub use persist::{RegionPersistor, SourceResolver, replace_exactly_once, write_atomic};
pub use region::{
    END_MARKER_PATTERN, RegionKind, RegionMatch, normalize_line_endings, parse_regions,
    strip_end_markers,
};
pub use session::{EditRequest, EditResponse, EditSession, EditedSummary, RequestContext};
pub use status::{StatusEntry, StatusLog};
pub use upload::{UploadOutput, UploadedFile, resolve_upload_dir, store_upload};
