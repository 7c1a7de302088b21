//! Per-region save results.

use crate::error::SaveError;
use crate::region::{RegionKind, RegionMatch};
use serde::{Serialize, Serializer};
use std::path::{Path, PathBuf};

/// Save state of a region. Moves from `NotAttempted` to a final state once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveState {
    /// No save has run yet.
    #[default]
    NotAttempted,
    /// The save ran and failed.
    Failed,
    /// The save ran and the file was written.
    Succeeded,
}

impl SaveState {
    /// `None` until attempted, then whether it succeeded.
    pub fn as_option(self) -> Option<bool> {
        match self {
            SaveState::NotAttempted => None,
            SaveState::Failed => Some(false),
            SaveState::Succeeded => Some(true),
        }
    }
}

impl Serialize for SaveState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_option().serialize(serializer)
    }
}

/// Result of saving one matched region, reported back to the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionOutcome {
    name: String,
    source: Option<String>,
    saved: SaveState,
    message: Option<String>,
    #[serde(skip)]
    kind: RegionKind,
    #[serde(skip)]
    markdown: bool,
    #[serde(skip)]
    resolved_path: Option<PathBuf>,
}

impl RegionOutcome {
    /// A not-yet-attempted outcome for `region`.
    pub fn pending(region: &RegionMatch) -> Self {
        Self {
            name: region.name().to_string(),
            source: region.source().map(str::to_string),
            saved: SaveState::NotAttempted,
            message: None,
            kind: region.kind(),
            markdown: region.uses_markdown(),
            resolved_path: None,
        }
    }

    /// Records a successful write to `path`.
    pub fn succeed(&mut self, path: PathBuf) {
        if self.saved != SaveState::NotAttempted {
            return;
        }
        let message = if self.markdown { "Saved to markdown" } else { "Saved" };
        self.saved = SaveState::Succeeded;
        self.message = Some(message.to_string());
        self.resolved_path = Some(path);
    }

    /// Records a failure.
    pub fn fail(&mut self, err: &SaveError) {
        if self.saved != SaveState::NotAttempted {
            return;
        }
        self.saved = SaveState::Failed;
        self.message = Some(err.user_message().to_string());
        self.resolved_path = match err {
            SaveError::SourceNotFound { path }
            | SaveError::Read { path, .. }
            | SaveError::SubstitutionMismatch { path, .. }
            | SaveError::Write { path, .. } => Some(path.clone()),
            SaveError::Convert(_) => None,
        };
    }

    /// Region name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `data-src` of the region, if any.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Region kind.
    pub fn kind(&self) -> RegionKind {
        self.kind
    }

    /// Current save state.
    pub fn state(&self) -> SaveState {
        self.saved
    }

    /// Whether the save succeeded.
    pub fn is_saved(&self) -> bool {
        self.saved == SaveState::Succeeded
    }

    /// Human-readable result, set once attempted.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// File the save targeted.
    pub fn resolved_path(&self) -> Option<&Path> {
        self.resolved_path.as_deref()
    }
}
