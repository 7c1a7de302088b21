//! Per-request capabilities, decided by the host's authentication layer.

use serde::Deserialize;

/// An action gated by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Show the editor UI.
    Edit,
    /// Write pages and theme files.
    Save,
    /// Store uploaded files.
    Upload,
}

/// What the current caller may do. Everything is allowed by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    /// See [`Capability::Edit`].
    pub edit: bool,
    /// See [`Capability::Save`].
    pub save: bool,
    /// See [`Capability::Upload`].
    pub upload: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::all()
    }
}

impl Capabilities {
    /// Every capability granted.
    pub const fn all() -> Self {
        Self {
            edit: true,
            save: true,
            upload: true,
        }
    }

    /// Nothing granted.
    pub const fn none() -> Self {
        Self {
            edit: false,
            save: false,
            upload: false,
        }
    }

    /// Whether `capability` is granted.
    pub fn can(&self, capability: Capability) -> bool {
        match capability {
            Capability::Edit => self.edit,
            Capability::Save => self.save,
            Capability::Upload => self.upload,
        }
    }

    /// Returns a copy with `capability` set to `granted`.
    pub fn with(mut self, capability: Capability, granted: bool) -> Self {
        match capability {
            Capability::Edit => self.edit = granted,
            Capability::Save => self.save = granted,
            Capability::Upload => self.upload = granted,
        }
        self
    }
}
