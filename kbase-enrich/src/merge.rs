//! Merge engine: the only writer of enrichment fields
//!
//! Two strategies:
//! - **Overwrite**: a resolved arXiv entry replaces all three fields on every
//!   item filed under its id, so those items end up identical.
//! - **Prefer new**: new values overwrite old, old values are kept where the
//!   new value is null. Used for best-effort sources and for "not found",
//!   so a miss never erases earlier data.

use crate::classifier::ArxivIndex;
use crate::sources::{ArxivResults, PaperMetadata};
use kbase_common::{Catalog, Item, ItemHandle};

/// Enrichment fields to apply to an item
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichmentPatch {
    pub summary: Option<String>,
    pub date: Option<String>,
    pub authors: Option<Vec<String>>,
}

impl From<&PaperMetadata> for EnrichmentPatch {
    fn from(meta: &PaperMetadata) -> Self {
        Self {
            summary: meta.summary.clone(),
            date: meta.date.clone(),
            authors: meta.authors.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    Overwrite,
    PreferNew,
}

pub fn apply_patch(item: &mut Item, patch: &EnrichmentPatch, mode: MergeMode) {
    match mode {
        MergeMode::Overwrite => {
            item.summary = patch.summary.clone();
            item.date = patch.date.clone();
            item.authors = patch.authors.clone();
        }
        MergeMode::PreferNew => {
            if patch.summary.is_some() {
                item.summary = patch.summary.clone();
            }
            if patch.date.is_some() {
                item.date = patch.date.clone();
            }
            if patch.authors.is_some() {
                item.authors = patch.authors.clone();
            }
        }
    }
}

/// Apply one patch through every handle; returns how many items were written
pub fn apply_to_handles(
    catalog: &mut Catalog,
    handles: &[ItemHandle],
    patch: &EnrichmentPatch,
    mode: MergeMode,
) -> usize {
    let mut written = 0;
    for handle in handles {
        if let Some(item) = catalog.item_mut(*handle) {
            apply_patch(item, patch, mode);
            written += 1;
        }
    }
    written
}

/// Merge one arXiv batch
///
/// Ids present in `results` overwrite every item registered under them. Ids
/// absent from `results` only get nulls defaulted in. Returns the number of
/// items written from a resolved entry.
pub fn merge_arxiv_batch(
    catalog: &mut Catalog,
    index: &ArxivIndex,
    batch: &[String],
    results: &ArxivResults,
) -> usize {
    let mut enriched = 0;
    for id in batch {
        let handles = index.handles(id);
        match results.get(id) {
            Some(meta) => {
                enriched += apply_to_handles(
                    catalog,
                    handles,
                    &EnrichmentPatch::from(meta),
                    MergeMode::Overwrite,
                );
            }
            None => {
                apply_to_handles(catalog, handles, &EnrichmentPatch::default(), MergeMode::PreferNew);
            }
        }
    }
    enriched
}
