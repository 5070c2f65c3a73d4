//! Client-local overlay of uncommitted catalog edits
//!
//! The overlay holds pending additions and pending removals until they are
//! committed to the store. Two pure views combine it with a store catalog:
//!
//! - **Display view**: additions appended to their category and flagged
//!   `pending`; removals only flagged `removed`, so they can still be undone.
//! - **Commit view**: additions appended, removals filtered out. This is the
//!   document that gets exported or saved.
//!
//! An addition whose target category does not exist is dropped. An addition
//! whose url is already present in the view is skipped, so a commit never
//! introduces a duplicate url.

use crate::catalog::{Catalog, Item, ItemKind};
use crate::store::write_atomic;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Cache key used when none is given
pub const DEFAULT_OVERLAY_KEY: &str = "kb_pending";

/// Rejected overlay edits
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OverlayError {
    #[error("URL is required")]
    MissingUrl,

    #[error("Title is required")]
    MissingTitle,

    #[error("Already pending: {0}")]
    DuplicatePending(String),
}

/// Item waiting to be added, with the category it goes into
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDraft {
    #[serde(flatten)]
    pub item: Item,
    #[serde(rename = "_category")]
    pub category: String,
}

impl ItemDraft {
    /// New user-sourced draft with empty enrichment fields
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        kind: ItemKind,
        category: impl Into<String>,
    ) -> Self {
        let mut item = Item::new(title, url, kind);
        item.set_source("user");
        Self {
            item,
            category: category.into(),
        }
    }

    pub fn with_summary(mut self, summary: Option<String>) -> Self {
        self.item.summary = summary;
        self
    }
}

/// Pending additions and removals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overlay {
    #[serde(default)]
    pub pending_additions: Vec<ItemDraft>,
    #[serde(default)]
    pub pending_removals: BTreeSet<String>,
}

/// Item as shown in the display view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayItem {
    #[serde(flatten)]
    pub item: Item,
    pub pending: bool,
    pub removed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayCategory {
    pub name: String,
    pub items: Vec<DisplayItem>,
}

/// Store plus overlay, with removals flagged rather than applied
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayView {
    pub total_items: usize,
    pub categories: Vec<DisplayCategory>,
}

impl DisplayView {
    pub fn items(&self) -> impl Iterator<Item = &DisplayItem> {
        self.categories.iter().flat_map(|c| c.items.iter())
    }
}

/// Result of [`Overlay::prepare_commit`]
#[derive(Debug, Clone, PartialEq)]
pub struct CommitView {
    pub catalog: Catalog,
    /// Additions that landed (duplicates and unknown categories excluded)
    pub added: usize,
    /// Items dropped by pending removals
    pub removed: usize,
}

impl Overlay {
    pub fn is_empty(&self) -> bool {
        self.pending_additions.is_empty() && self.pending_removals.is_empty()
    }

    /// Queue an item for addition
    ///
    /// Url and title are trimmed and must be non-empty. A url already queued
    /// is rejected.
    pub fn add_pending(&mut self, mut draft: ItemDraft) -> std::result::Result<(), OverlayError> {
        let url = draft.item.url().trim().to_string();
        let title = draft.item.title().trim().to_string();

        if url.is_empty() {
            return Err(OverlayError::MissingUrl);
        }
        if title.is_empty() {
            return Err(OverlayError::MissingTitle);
        }
        if self.pending_additions.iter().any(|p| p.item.url() == url) {
            return Err(OverlayError::DuplicatePending(url));
        }

        draft.item.set_url(url);
        draft.item.set_title(title);

        self.pending_additions.push(draft);
        Ok(())
    }

    /// Flip pending-removal membership; returns whether the url is now marked
    pub fn toggle_removal(&mut self, url: &str) -> bool {
        if self.pending_removals.remove(url) {
            false
        } else {
            self.pending_removals.insert(url.to_string());
            true
        }
    }

    pub fn clear_removals(&mut self) {
        self.pending_removals.clear();
    }

    /// Drop everything; called once a commit has landed
    pub fn clear(&mut self) {
        self.pending_additions.clear();
        self.pending_removals.clear();
    }

    /// Store catalog with additions appended; returns the urls actually added
    fn with_additions(&self, store: &Catalog) -> (Catalog, HashSet<String>) {
        let mut merged = store.clone();
        let mut seen: HashSet<String> = merged.items().map(|(_, i)| i.url().to_string()).collect();
        let mut added = HashSet::new();

        for draft in &self.pending_additions {
            let url = draft.item.url();
            if seen.contains(url) {
                warn!(url = %url, "Pending addition already in catalog, skipping");
                continue;
            }
            match merged.category_mut(&draft.category) {
                Some(category) => {
                    category.items.push(draft.item.clone());
                    seen.insert(url.to_string());
                    added.insert(url.to_string());
                }
                None => {
                    debug!(
                        url = %url,
                        category = %draft.category,
                        "Target category missing, dropping pending addition"
                    );
                }
            }
        }

        (merged, added)
    }

    /// Merged catalog with removals applied and `total_items` recomputed
    pub fn commit_view(&self, store: &Catalog) -> Catalog {
        self.prepare_commit(store).catalog
    }

    /// Commit view plus what actually changed relative to `store`
    pub fn prepare_commit(&self, store: &Catalog) -> CommitView {
        let (mut catalog, added) = self.with_additions(store);
        let before = catalog.item_count();
        for category in &mut catalog.categories {
            category
                .items
                .retain(|item| !self.pending_removals.contains(item.url()));
        }
        catalog.recount();

        CommitView {
            removed: before - catalog.metadata.total_items,
            added: added.len(),
            catalog,
        }
    }

    /// Merged catalog with pending/removed markers
    pub fn display_view(&self, store: &Catalog) -> DisplayView {
        let (merged, added) = self.with_additions(store);
        let total_items = merged.item_count();

        let categories = merged
            .categories
            .into_iter()
            .map(|category| DisplayCategory {
                name: category.name,
                items: category
                    .items
                    .into_iter()
                    .map(|item| DisplayItem {
                        pending: added.contains(item.url()),
                        removed: self.pending_removals.contains(item.url()),
                        item,
                    })
                    .collect(),
            })
            .collect();

        DisplayView {
            total_items,
            categories,
        }
    }
}

/// Overlays persisted as `<dir>/<key>.json`
#[derive(Debug, Clone)]
pub struct OverlayCache {
    dir: PathBuf,
}

impl OverlayCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Load an overlay; a missing or unreadable entry yields an empty one
    pub fn load(&self, key: &str) -> Overlay {
        let path = self.path_for(key);
        if !path.exists() {
            return Overlay::default();
        }

        let parsed = std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|text| serde_json::from_str(&text).map_err(|e| e.to_string()));
        match parsed {
            Ok(overlay) => overlay,
            Err(e) => {
                warn!(path = %path.display(), "Discarding unreadable overlay: {}", e);
                Overlay::default()
            }
        }
    }

    pub fn save(&self, key: &str, overlay: &Overlay) -> Result<()> {
        let json = serde_json::to_string_pretty(overlay)?;
        write_atomic(&self.path_for(key), json.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Category;
    use tempfile::TempDir;

    fn paper(title: &str, url: &str) -> Item {
        Item::new(title, url, ItemKind::Paper)
    }

    /// Store with A, B in "Papers" and C in "Repos"
    fn store() -> Catalog {
        let mut papers = Category::new("Papers");
        papers.items.push(paper("A", "https://a.example/1"));
        papers.items.push(paper("B", "https://b.example/2"));
        let mut repos = Category::new("Repos");
        repos
            .items
            .push(Item::new("C", "https://github.com/c/c", ItemKind::Repo));

        let mut catalog = Catalog::default();
        catalog.categories = vec![papers, repos];
        catalog.recount();
        catalog
    }

    fn overlay_removing_b_adding_d() -> Overlay {
        let mut overlay = Overlay::default();
        overlay.toggle_removal("https://b.example/2");
        overlay
            .add_pending(ItemDraft::new("D", "https://d.example/4", ItemKind::Blog, "Repos"))
            .unwrap();
        overlay
    }

    fn titles(catalog: &Catalog) -> Vec<String> {
        catalog.items().map(|(_, i)| i.title().to_string()).collect()
    }

    #[test]
    fn test_commit_view_applies_removals() {
        let overlay = overlay_removing_b_adding_d();
        let view = overlay.commit_view(&store());

        assert_eq!(titles(&view), vec!["A", "C", "D"]);
        assert_eq!(view.metadata.total_items, 3);
    }

    #[test]
    fn test_display_view_flags_without_removing() {
        let overlay = overlay_removing_b_adding_d();
        let view = overlay.display_view(&store());

        let flags: Vec<(&str, bool, bool)> = view
            .items()
            .map(|i| (i.item.title(), i.pending, i.removed))
            .collect();
        assert_eq!(
            flags,
            vec![
                ("A", false, false),
                ("B", false, true),
                ("C", false, false),
                ("D", true, false),
            ]
        );
        assert_eq!(view.total_items, 4);
    }

    #[test]
    fn test_views_do_not_touch_store() {
        let original = store();
        let overlay = overlay_removing_b_adding_d();
        let _ = overlay.commit_view(&original);
        let _ = overlay.display_view(&original);
        assert_eq!(original, store());
    }

    #[test]
    fn test_addition_to_missing_category_is_dropped() {
        let mut overlay = Overlay::default();
        overlay
            .add_pending(ItemDraft::new("E", "https://e.example", ItemKind::Tool, "Gone"))
            .unwrap();

        let view = overlay.commit_view(&store());
        assert_eq!(view.metadata.total_items, 3);
        assert_eq!(view.categories.len(), 2);
    }

    #[test]
    fn test_addition_with_existing_url_is_skipped() {
        let mut overlay = Overlay::default();
        overlay
            .add_pending(ItemDraft::new("A again", "https://a.example/1", ItemKind::Paper, "Repos"))
            .unwrap();

        let view = overlay.commit_view(&store());
        assert_eq!(titles(&view), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_prepare_commit_counts_only_what_landed() {
        let mut overlay = overlay_removing_b_adding_d();
        overlay
            .add_pending(ItemDraft::new("A again", "https://a.example/1", ItemKind::Paper, "Papers"))
            .unwrap();
        overlay
            .add_pending(ItemDraft::new("E", "https://e.example", ItemKind::Tool, "Gone"))
            .unwrap();
        overlay.toggle_removal("https://not-in-store.example");

        let commit = overlay.prepare_commit(&store());

        assert_eq!(commit.added, 1);
        assert_eq!(commit.removed, 1);
        assert_eq!(commit.catalog, overlay.commit_view(&store()));
    }

    #[test]
    fn test_add_pending_validates_and_trims() {
        let mut overlay = Overlay::default();

        let err = overlay
            .add_pending(ItemDraft::new("T", "   ", ItemKind::Paper, "Papers"))
            .unwrap_err();
        assert_eq!(err, OverlayError::MissingUrl);

        let err = overlay
            .add_pending(ItemDraft::new("", "https://x.example", ItemKind::Paper, "Papers"))
            .unwrap_err();
        assert_eq!(err, OverlayError::MissingTitle);

        overlay
            .add_pending(ItemDraft::new(" Title ", " https://x.example ", ItemKind::Paper, "Papers"))
            .unwrap();
        let draft = &overlay.pending_additions[0];
        assert_eq!(draft.item.url(), "https://x.example");
        assert_eq!(draft.item.title(), "Title");
        assert_eq!(draft.item.source(), Some("user"));
    }

    #[test]
    fn test_add_pending_rejects_duplicate_url() {
        let mut overlay = Overlay::default();
        overlay
            .add_pending(ItemDraft::new("X", "https://x.example", ItemKind::Paper, "Papers"))
            .unwrap();
        let err = overlay
            .add_pending(ItemDraft::new("X2", "https://x.example", ItemKind::Blog, "Repos"))
            .unwrap_err();

        assert_eq!(err, OverlayError::DuplicatePending("https://x.example".to_string()));
        assert_eq!(overlay.pending_additions.len(), 1);
    }

    #[test]
    fn test_toggle_removal_round_trips() {
        let mut overlay = Overlay::default();
        assert!(overlay.toggle_removal("u"));
        assert!(overlay.pending_removals.contains("u"));
        assert!(!overlay.toggle_removal("u"));
        assert!(overlay.is_empty());
    }

    #[test]
    fn test_draft_serializes_category_marker() {
        let draft = ItemDraft::new("T", "https://t.example", ItemKind::Video, "Talks");
        let value = serde_json::to_value(&draft).unwrap();

        assert_eq!(value["_category"], "Talks");
        assert_eq!(value["type"], "video");
        assert!(value["summary"].is_null());

        let back: ItemDraft = serde_json::from_value(value).unwrap();
        assert_eq!(back, draft);
    }

    #[test]
    fn test_cache_round_trip() {
        let dir = TempDir::new().unwrap();
        let cache = OverlayCache::new(dir.path().join("overlays"));
        let overlay = overlay_removing_b_adding_d();

        cache.save(DEFAULT_OVERLAY_KEY, &overlay).unwrap();
        assert_eq!(cache.load(DEFAULT_OVERLAY_KEY), overlay);
        assert!(cache.load("other").is_empty());
    }

    #[test]
    fn test_cache_discards_corrupt_entry() {
        let dir = TempDir::new().unwrap();
        let cache = OverlayCache::new(dir.path());
        std::fs::write(cache.path_for("broken"), "{not json").unwrap();

        assert!(cache.load("broken").is_empty());
    }
}
