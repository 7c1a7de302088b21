//! File uploads into a directory under the content root.

use crate::error::UploadError;
use crate::persist::write_atomic;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// A file received alongside the edit payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Client-side file name; only its base name is used.
    pub name: String,
    /// File bytes.
    pub contents: Vec<u8>,
}

/// Where an upload landed, reported back to the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadOutput {
    /// Stored file name.
    pub name: String,
    /// Public URL of the stored file.
    pub path: String,
    /// Pixel dimensions `[width, height]` for images.
    pub size: Option<[u32; 2]>,
}

/// Resolves `dir` against `root`, accepting it only when it is an existing
/// directory inside `root` once both are canonicalized.
pub fn resolve_upload_dir(root: &Path, dir: &str) -> Result<PathBuf, UploadError> {
    let invalid = || UploadError::InvalidDirectory {
        dir: dir.to_string(),
        root: root.to_path_buf(),
    };

    let canonical_root = fs::canonicalize(root).map_err(|_| invalid())?;
    let candidate = root.join(dir.trim_start_matches(['/', '\\']));
    let resolved = fs::canonicalize(&candidate).map_err(|_| invalid())?;

    if !resolved.starts_with(&canonical_root) || !resolved.is_dir() {
        log::warn!(
            "upload directory {} escapes {} or is not a directory",
            resolved.display(),
            canonical_root.display()
        );
        return Err(invalid());
    }
    Ok(resolved)
}

/// Stores `file` in `dir` (relative to `root`) and describes the result.
///
/// `base_url` is the public URL of `root`, with its trailing slash.
pub fn store_upload(
    file: &UploadedFile,
    root: &Path,
    dir: &str,
    base_url: &str,
) -> Result<UploadOutput, UploadError> {
    let target_dir = resolve_upload_dir(root, dir)?;
    let name = base_name(&file.name).ok_or_else(|| UploadError::InvalidFileName(file.name.clone()))?;

    let destination = target_dir.join(name);
    write_atomic(&destination, &file.contents).map_err(|source| UploadError::Write {
        path: destination.clone(),
        source,
    })?;
    log::info!("stored upload at {}", destination.display());

    let size = image::image_dimensions(&destination)
        .ok()
        .map(|(width, height)| [width, height]);

    Ok(UploadOutput {
        name: name.to_string(),
        path: format!("{}{}/{}", base_url, dir.trim_matches(['/', '\\']), name),
        size,
    })
}

/// Last path segment of a client file name, whichever separator it uses.
fn base_name(name: &str) -> Option<&str> {
    let base = name.rsplit(['/', '\\']).next()?.trim();
    match base {
        "" | "." | ".." => None,
        base => Some(base),
    }
}
