//! Region persistence: exact-match substitution and file writes.
//!
//! A save only happens when the region text captured at parse time appears
//! exactly once in the file on disk. Anything else means the file changed
//! since it was parsed (or is ambiguous), and the save is refused untouched.

use crate::error::SaveError;
use crate::outcome::RegionOutcome;
use crate::region::{RegionMatch, normalize_line_endings};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Maps a region to the file that holds it.
#[derive(Debug, Clone)]
pub struct SourceResolver {
    content_root: PathBuf,
    request_file: PathBuf,
}

impl SourceResolver {
    /// `content_root` anchors `data-src` paths; `request_file` is the page
    /// being served.
    pub fn new(content_root: impl Into<PathBuf>, request_file: impl Into<PathBuf>) -> Self {
        Self {
            content_root: content_root.into(),
            request_file: request_file.into(),
        }
    }

    /// Root directory `data-src` paths are relative to.
    pub fn content_root(&self) -> &Path {
        &self.content_root
    }

    /// File of the page being served.
    pub fn request_file(&self) -> &Path {
        &self.request_file
    }

    /// File holding `region`.
    pub fn resolve(&self, region: &RegionMatch) -> PathBuf {
        match region.source() {
            Some(source) => self.content_root.join(source.trim_start_matches(['/', '\\'])),
            None => self.request_file.clone(),
        }
    }
}

/// Writes one region's new content into its source file.
#[derive(Debug, Clone, Copy)]
pub struct RegionPersistor<'a> {
    resolver: &'a SourceResolver,
}

impl<'a> RegionPersistor<'a> {
    /// Persistor resolving files through `resolver`.
    pub fn new(resolver: &'a SourceResolver) -> Self {
        Self { resolver }
    }

    /// Replaces the region's content with `new_content` on disk.
    pub fn save(&self, region: &RegionMatch, new_content: &str) -> RegionOutcome {
        let mut outcome = RegionOutcome::pending(region);
        match self.try_save(region, new_content) {
            Ok(path) => {
                log::info!("saved region {:?} to {}", region.name(), path.display());
                outcome.succeed(path);
            }
            Err(err) => {
                log::warn!("region {:?} not saved: {err}", region.name());
                outcome.fail(&err);
            }
        }
        outcome
    }

    fn try_save(&self, region: &RegionMatch, new_content: &str) -> Result<PathBuf, SaveError> {
        let path = self.resolver.resolve(region);
        if !path.is_file() {
            return Err(SaveError::SourceNotFound { path });
        }

        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(source) => return Err(SaveError::Read { path, source }),
        };
        let content = normalize_line_endings(&raw);

        let patched = match replace_exactly_once(
            &content,
            &region.full_text(),
            &region.with_inner(new_content),
        ) {
            Ok(patched) => patched,
            Err(occurrences) => return Err(SaveError::SubstitutionMismatch { path, occurrences }),
        };

        match write_atomic(&path, patched.as_bytes()) {
            Ok(()) => Ok(path),
            Err(source) => Err(SaveError::Write { path, source }),
        }
    }
}

/// Replaces `needle` when it occurs exactly once; otherwise returns the count.
pub fn replace_exactly_once(haystack: &str, needle: &str, replacement: &str) -> Result<String, usize> {
    if needle.is_empty() {
        return Err(0);
    }
    let mut positions = haystack.match_indices(needle).map(|(index, _)| index);
    match (positions.next(), positions.next()) {
        (Some(index), None) => {
            let mut out = String::with_capacity(haystack.len() - needle.len() + replacement.len());
            out.push_str(&haystack[..index]);
            out.push_str(replacement);
            out.push_str(&haystack[index + needle.len()..]);
            Ok(out)
        }
        (None, _) => Err(0),
        (Some(_), Some(_)) => Err(2 + positions.count()),
    }
}

/// Writes `contents` through a temporary file renamed over `path`.
///
/// The original permissions are kept when `path` already exists.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), metadata.permissions())?;
    }
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}
