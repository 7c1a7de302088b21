//! Page metadata block persistence.

use crate::error::MetaError;
use crate::persist::write_atomic;
use crate::status::StatusEntry;
use std::path::Path;

/// Status text of a successful metadata save.
pub const META_SAVED: &str = "Page meta saved. Reload the page to see changes.";

/// Replaces a page's metadata block and writes the page back.
///
/// `previous` is the block captured from the same raw content when the request
/// started, so a literal replacement is enough. Only the first occurrence is
/// replaced: the block sits at the top of the page.
pub fn save_meta(
    raw_content: &str,
    previous: Option<&str>,
    new_meta: &str,
    target: &Path,
) -> StatusEntry {
    match try_save_meta(raw_content, previous, new_meta, target) {
        Ok(()) => {
            log::info!("saved page meta to {}", target.display());
            StatusEntry::success(META_SAVED)
        }
        Err(err) => {
            log::warn!("page meta not saved: {err}");
            StatusEntry::failure(err.user_message())
        }
    }
}

fn try_save_meta(
    raw_content: &str,
    previous: Option<&str>,
    new_meta: &str,
    target: &Path,
) -> Result<(), MetaError> {
    let previous = previous.filter(|p| !p.is_empty()).ok_or(MetaError::NotFound)?;
    if !raw_content.contains(previous) {
        return Err(MetaError::NotFound);
    }
    let updated = raw_content.replacen(previous, new_meta, 1);
    write_atomic(target, updated.as_bytes()).map_err(|source| MetaError::Write {
        path: target.to_path_buf(),
        source,
    })
}
