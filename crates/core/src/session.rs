//! One edit request, from the raw page to the JSON response.
//!
//! The host drives a session through its page lifecycle:
//!
//! 1. [`EditSession::new`] when the request arrives,
//! 2. [`EditSession::content_loaded`] with the raw page file,
//! 3. [`EditSession::editor_markup`] while rendering the template,
//! 4. [`EditSession::page_rendered`] with the final output.
//!
//! Nothing here is global: status, capabilities and settings all live on the
//! session and die with it.

use crate::apply::EditApplier;
use crate::auth::{Capabilities, Capability};
use crate::config::EditorConfig;
use crate::edits::EditSet;
use crate::editor::{AssetContext, EditorFactory, EditorHandler};
use crate::error::PatchError;
use crate::frontmatter::{RawMeta, extract_raw_meta};
use crate::meta::save_meta;
use crate::outcome::RegionOutcome;
use crate::persist::{RegionPersistor, SourceResolver};
use crate::region::strip_end_markers;
use crate::status::StatusLog;
use crate::upload::{UploadOutput, UploadedFile, store_upload};
use serde::Serialize;
use std::mem;
use std::path::{Path, PathBuf};

/// What the browser sent.
#[derive(Debug, Clone, Default)]
pub struct EditRequest {
    /// Raw JSON edit payload, if the form field was present.
    pub payload: Option<Vec<u8>>,
    /// Uploaded file, if any.
    pub upload: Option<UploadedFile>,
}

/// Everything the host knows about the page being served.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Directory holding the site's content; anchors `data-src` and uploads.
    pub content_root: PathBuf,
    /// File of the page being served.
    pub request_file: PathBuf,
    /// Public URL of the content root, with its trailing slash.
    pub base_url: String,
    /// What the caller may do.
    pub capabilities: Capabilities,
    /// Site-wide editor settings.
    pub config: EditorConfig,
}

/// Regions and metadata reported back to the editor.
#[derive(Debug, Clone, Serialize)]
pub struct EditedSummary {
    /// Submitted metadata block.
    pub meta: Option<String>,
    /// Every attempted region.
    pub regions: Vec<RegionOutcome>,
}

/// JSON body answering an edit or upload request.
#[derive(Debug, Clone, Serialize)]
pub struct EditResponse {
    /// Notifications, in the order they happened.
    pub status: StatusLog,
    /// Per-region results.
    pub edited: EditedSummary,
    /// Stored upload.
    pub file: Option<UploadOutput>,
    /// Whether debug output is enabled.
    pub debug: bool,
}

impl EditResponse {
    /// Serializes the response body.
    pub fn to_json(&self) -> Result<String, PatchError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Per-request edit state.
pub struct EditSession {
    edits: EditSet,
    decode_failed: bool,
    upload: Option<UploadedFile>,
    upload_received: bool,
    file: Option<UploadOutput>,
    resolver: SourceResolver,
    base_url: String,
    capabilities: Capabilities,
    site_config: EditorConfig,
    config: EditorConfig,
    factory: EditorFactory,
    editor: Box<dyn EditorHandler>,
    raw_meta: Option<RawMeta>,
    applier: EditApplier,
    status: StatusLog,
}

impl EditSession {
    /// Starts a session, decoding the submitted payload.
    pub fn new(request: EditRequest, ctx: RequestContext, factory: EditorFactory) -> Self {
        let mut status = StatusLog::new();
        let (edits, decode_failed) = match EditSet::decode(request.payload.as_deref()) {
            Ok(edits) => (edits, false),
            Err(err) => {
                log::warn!("discarding edit payload: {err}");
                status.add(false, "Can't decode editor data");
                (EditSet::empty(), true)
            }
        };

        Self {
            edits,
            decode_failed,
            upload_received: request.upload.is_some(),
            upload: request.upload,
            file: None,
            resolver: SourceResolver::new(ctx.content_root, ctx.request_file),
            base_url: ctx.base_url,
            capabilities: ctx.capabilities,
            editor: factory(ctx.config.editor),
            site_config: ctx.config.clone(),
            config: ctx.config,
            factory,
            raw_meta: None,
            applier: EditApplier::new(),
            status,
        }
    }

    /// Handles the raw page file: page settings, upload, metadata and region
    /// saves. Returns the content to render, without end markers.
    pub fn content_loaded(&mut self, raw: &str) -> String {
        self.raw_meta = extract_raw_meta(raw);
        self.apply_page_settings();
        self.handle_upload();

        if self.edits.been_received() {
            if self.capabilities.can(Capability::Save) {
                if let Some(new_meta) = self.edits.meta() {
                    let previous = self.raw_meta.as_ref().map(|meta| meta.text.as_str());
                    self.status.push(save_meta(
                        raw,
                        previous,
                        new_meta,
                        self.resolver.request_file(),
                    ));
                }
                let saved = self.apply_pass(raw);
                if saved == Some(true) {
                    self.status.add(true, "The page has been saved");
                }
            } else {
                self.status
                    .add(false, "You don't have the rights to save content");
            }
        }

        strip_end_markers(raw).into_owned()
    }

    /// Editor assets and the metadata editor block, when the caller may edit.
    ///
    /// `assets_url` is the public URL of the bundled assets, `assets_dir` the
    /// same directory on disk.
    pub fn editor_markup(&self, assets_url: &str, assets_dir: Option<&Path>) -> Option<String> {
        if !self.config.show || !self.capabilities.can(Capability::Edit) {
            return None;
        }

        let assets_url = assets_url.trim_end_matches('/');
        let ctx = AssetContext {
            assets_url,
            assets_dir,
            config: &self.config,
        };
        let meta = self
            .raw_meta
            .as_ref()
            .map(|meta| html_escape::encode_text(&meta.text).into_owned())
            .unwrap_or_default();

        let mut markup = format!(
            "<link href=\"{assets_url}/noty/lib/noty.css\" rel=\"stylesheet\">\n\
             <link href=\"{assets_url}/noty/themes/mint.css\" rel=\"stylesheet\">\n\
             <script src=\"{assets_url}/noty/lib/noty.min.js\" type=\"text/javascript\"></script>\n"
        );
        markup.push_str(&self.editor.assets(&ctx));
        markup.push_str(&format!(
            "\n<div class=\"ContentEditor\">\n\
             <pre class=\"ContentEditor_Meta\" data-fixture data-meta>{meta}</pre>\n\
             </div>\n"
        ));
        Some(markup)
    }

    /// Saves regions found in the rendered output and builds the response.
    ///
    /// Returns `None` for ordinary page views, when neither edits nor an
    /// upload came with the request.
    pub fn page_rendered(&mut self, output: &str) -> Option<EditResponse> {
        if self.edits.been_received() && self.capabilities.can(Capability::Save) {
            let saved = self.apply_pass(output);
            if saved == Some(true) {
                self.status.add(true, "The theme files have been saved");
            }

            for name in self.applier.unmatched_names(&self.edits) {
                self.status
                    .add(false, format!("No corresponding block found for \"{name}\""));
            }
            for name in self.applier.duplicate_names() {
                let first_saved = self
                    .applier
                    .outcomes()
                    .iter()
                    .any(|outcome| outcome.name() == name && outcome.is_saved());
                let message = if first_saved {
                    format!("Region \"{name}\" is defined more than once; only the first one was saved")
                } else {
                    format!("Region \"{name}\" is defined more than once; none of its copies were saved")
                };
                self.status.add(false, message);
            }
        }

        if !self.edits.been_received() && !self.upload_received && !self.decode_failed {
            return None;
        }

        Some(EditResponse {
            status: mem::take(&mut self.status),
            edited: EditedSummary {
                meta: self.edits.meta().map(str::to_string),
                regions: mem::take(&mut self.applier).into_outcomes(),
            },
            file: self.file.take(),
            debug: self.config.debug,
        })
    }

    /// Settings in effect for this page.
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Decoded edits.
    pub fn edits(&self) -> &EditSet {
        &self.edits
    }

    /// Notifications so far.
    pub fn status(&self) -> &StatusLog {
        &self.status
    }

    /// Region outcomes so far.
    pub fn outcomes(&self) -> &[RegionOutcome] {
        self.applier.outcomes()
    }

    /// Runs one apply pass over `content` and reports each region it failed
    /// to save.
    fn apply_pass(&mut self, content: &str) -> Option<bool> {
        let before = self.applier.outcomes().len();
        let persistor = RegionPersistor::new(&self.resolver);
        let saved = self
            .applier
            .apply(content, &self.edits, self.editor.as_ref(), &persistor);

        for outcome in &self.applier.outcomes()[before..] {
            if outcome.is_saved() {
                continue;
            }
            self.status.add(
                false,
                format!(
                    "Region \"{}\" couldn't be saved: {}",
                    outcome.name(),
                    outcome.message().unwrap_or("unknown error")
                ),
            );
        }
        saved
    }

    fn apply_page_settings(&mut self) {
        let Some(raw_meta) = &self.raw_meta else {
            return;
        };
        let overridden = raw_meta
            .parse_yaml()
            .map_err(|err| err.to_string())
            .and_then(|meta| {
                self.site_config
                    .with_page_overrides(&meta)
                    .map_err(|err| err.to_string())
            });
        match overridden {
            Ok(config) => {
                if config.editor != self.config.editor {
                    self.editor = (self.factory)(config.editor);
                }
                self.config = config;
            }
            Err(err) => log::warn!("ignoring page editor settings: {err}"),
        }
    }

    fn handle_upload(&mut self) {
        let Some(file) = self.upload.take() else {
            return;
        };
        if !self.capabilities.can(Capability::Upload) {
            self.status
                .add(false, "You don't have the rights to upload files");
            return;
        }

        match store_upload(
            &file,
            self.resolver.content_root(),
            &self.config.upload_path,
            &self.base_url,
        ) {
            Ok(output) => {
                self.status.add(true, "The file has been uploaded");
                self.file = Some(output);
            }
            Err(err) => {
                log::warn!("upload rejected: {err}");
                self.status.add(false, err.user_message());
            }
        }
    }
}
