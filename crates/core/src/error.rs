use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while decoding the payload submitted by the browser editor.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload is not valid JSON, or a field has the wrong shape.
    #[error("Invalid editor payload: {0}")]
    Json(#[from] serde_json::Error),
    /// The payload decoded to something other than a JSON object.
    #[error("Editor payload must be a JSON object")]
    NotAnObject,
}

/// Errors raised by an editor backend while turning an edit into file content.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The payload lacks the field the backend reads (`html`, `deltas`).
    #[error("Missing `{field}` in {editor} edit payload")]
    MissingField {
        /// Backend name
        editor: &'static str,
        /// Expected field
        field: &'static str,
    },
    /// The payload was present but could not be interpreted.
    #[error("Invalid {editor} edit payload: {message}")]
    InvalidPayload {
        /// Backend name
        editor: &'static str,
        /// What went wrong
        message: String,
    },
}

/// Failure of a single region save. Recovered into a [`crate::RegionOutcome`].
#[derive(Debug, Error)]
pub enum SaveError {
    /// The resolved source file does not exist.
    #[error("Source file not found: {}", path.display())]
    SourceNotFound {
        /// Resolved path
        path: PathBuf,
    },
    /// The source file exists but could not be read.
    #[error("Error reading {}: {source}", path.display())]
    Read {
        /// Resolved path
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },
    /// The region text was found zero or several times in the file.
    #[error("Region text found {occurrences} times in {}", path.display())]
    SubstitutionMismatch {
        /// Resolved path
        path: PathBuf,
        /// Number of verbatim occurrences found
        occurrences: usize,
    },
    /// The patched file could not be written back.
    #[error("Error writing {}: {source}", path.display())]
    Write {
        /// Resolved path
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },
    /// The editor backend rejected the edit payload.
    #[error(transparent)]
    Convert(#[from] ConvertError),
}

impl SaveError {
    /// Message shown to the person editing the page.
    pub fn user_message(&self) -> &'static str {
        match self {
            SaveError::SourceNotFound { .. } => "Source file not found",
            SaveError::Read { .. } => "Error reading file",
            SaveError::SubstitutionMismatch { .. } => "Error replacing region content",
            SaveError::Write { .. } => "Error writing file",
            SaveError::Convert(_) => "Invalid editor data",
        }
    }
}

/// Failure of a metadata block save.
#[derive(Debug, Error)]
pub enum MetaError {
    /// The previous metadata snapshot was not found in the page.
    #[error("Page meta snapshot not found in raw content")]
    NotFound,
    /// The page file could not be written back.
    #[error("Error writing {}: {source}", path.display())]
    Write {
        /// Page path
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },
}

impl MetaError {
    /// Message shown to the person editing the page.
    pub fn user_message(&self) -> &'static str {
        match self {
            MetaError::NotFound => "Error replacing page meta",
            MetaError::Write { .. } => "Error writing file",
        }
    }
}

/// Failure of an upload.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The upload directory is missing or resolves outside the content root.
    #[error("Upload directory {dir:?} is missing or outside {}", root.display())]
    InvalidDirectory {
        /// Configured upload directory
        dir: String,
        /// Content root it must stay within
        root: PathBuf,
    },
    /// The uploaded file name has no usable base name.
    #[error("Invalid upload file name {0:?}")]
    InvalidFileName(String),
    /// The destination could not be written.
    #[error("Error writing {}: {source}", path.display())]
    Write {
        /// Destination path
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },
}

impl UploadError {
    /// Message shown to the person editing the page.
    pub fn user_message(&self) -> String {
        match self {
            UploadError::InvalidDirectory { dir, .. } => {
                format!("The upload directory \"{}\" is missing or invalid", dir)
            }
            UploadError::InvalidFileName(_) | UploadError::Write { .. } => {
                "The file couldn't be uploaded".to_string()
            }
        }
    }
}

/// Errors raised while loading editor settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The YAML source failed to parse.
    #[error("Config parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// The settings have the wrong shape.
    #[error("Invalid config: {0}")]
    Invalid(#[from] serde_json::Error),
    /// The settings root is not a mapping.
    #[error("Config must be a mapping at the top level")]
    InvalidRootType,
}

/// Errors that can escape a session to its host.
#[derive(Debug, Error)]
pub enum PatchError {
    /// Settings could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Response serialization failed.
    #[error("Response encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}
