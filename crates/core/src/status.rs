//! Request-scoped status log surfaced to the editor as notifications.

use serde::Serialize;

/// One notification line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    /// `true` for success, `false` for failure.
    pub state: bool,
    /// Human-readable text.
    pub message: String,
}

impl StatusEntry {
    /// Successful entry.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            state: true,
            message: message.into(),
        }
    }

    /// Failed entry.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            state: false,
            message: message.into(),
        }
    }
}

/// Append-only list of status entries for one request.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct StatusLog {
    entries: Vec<StatusEntry>,
}

impl StatusLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn add(&mut self, state: bool, message: impl Into<String>) {
        self.push(StatusEntry {
            state,
            message: message.into(),
        });
    }

    /// Appends a prepared entry.
    pub fn push(&mut self, entry: StatusEntry) {
        if entry.state {
            log::debug!("status: {}", entry.message);
        } else {
            log::warn!("status: {}", entry.message);
        }
        self.entries.push(entry);
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[StatusEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was logged.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consumes the log.
    pub fn into_entries(self) -> Vec<StatusEntry> {
        self.entries
    }
}
