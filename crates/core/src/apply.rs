//! Matching submitted edits against parsed regions and saving them.

use crate::edits::EditSet;
use crate::editor::EditorHandler;
use crate::error::SaveError;
use crate::outcome::RegionOutcome;
use crate::persist::RegionPersistor;
use crate::region::{RegionMatch, parse_regions};
use serde_json::Value as JsonValue;
use std::collections::{BTreeSet, HashSet};

/// Applies one request's edits across one or more passes.
///
/// A page is usually patched twice: once against its raw content, once against
/// the full rendered output (theme files, `data-src` regions). A region name
/// attempted in an earlier pass is never attempted again.
#[derive(Debug, Default)]
pub struct EditApplier {
    attempted: HashSet<String>,
    outcomes: Vec<RegionOutcome>,
    duplicates: BTreeSet<String>,
}

impl EditApplier {
    /// Applier with nothing attempted yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Saves every region of `content` that has a submitted edit.
    ///
    /// Returns `None` when nothing was attempted, `Some(true)` when every
    /// attempted region was saved and `Some(false)` as soon as one failed.
    pub fn apply(
        &mut self,
        content: &str,
        edits: &EditSet,
        editor: &dyn EditorHandler,
        persistor: &RegionPersistor<'_>,
    ) -> Option<bool> {
        if !edits.been_received() || !edits.has_region_edits() {
            return None;
        }

        let regions = parse_regions(content);
        let mut seen = HashSet::new();
        let mut all_saved = None;

        for region in &regions {
            let Some(edit) = edits.region_edit(region.name()) else {
                continue;
            };
            if !seen.insert(region.name()) {
                self.flag_duplicate(region.name());
                continue;
            }
            if self.attempted.contains(region.name()) {
                continue;
            }
            self.attempted.insert(region.name().to_string());

            let outcome = attempt(region, edit, editor, persistor);
            all_saved = Some(all_saved != Some(false) && outcome.is_saved());
            self.outcomes.push(outcome);
        }

        all_saved
    }

    fn flag_duplicate(&mut self, name: &str) {
        if self.duplicates.insert(name.to_string()) {
            log::warn!("region {name:?} is defined more than once; later copies are ignored");
        }
    }

    /// Outcomes of every attempted region, in attempt order.
    pub fn outcomes(&self) -> &[RegionOutcome] {
        &self.outcomes
    }

    /// Consumes the applier, returning its outcomes.
    pub fn into_outcomes(self) -> Vec<RegionOutcome> {
        self.outcomes
    }

    /// Submitted region names that no pass matched.
    pub fn unmatched_names<'e>(&self, edits: &'e EditSet) -> Vec<&'e str> {
        edits
            .region_names()
            .filter(|name| !self.attempted.contains(*name))
            .collect()
    }

    /// Edited region names found more than once in a single pass.
    pub fn duplicate_names(&self) -> impl Iterator<Item = &str> {
        self.duplicates.iter().map(String::as_str)
    }
}

fn attempt(
    region: &RegionMatch,
    edit: &JsonValue,
    editor: &dyn EditorHandler,
    persistor: &RegionPersistor<'_>,
) -> RegionOutcome {
    match editor.render_output(edit, region.uses_markdown()) {
        Ok(rendered) => persistor.save(region, &rendered),
        Err(err) => {
            log::warn!("region {:?} not converted: {err}", region.name());
            let mut outcome = RegionOutcome::pending(region);
            outcome.fail(&SaveError::Convert(err));
            outcome
        }
    }
}
