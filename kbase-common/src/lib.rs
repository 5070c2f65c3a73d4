//! # kbase Common Library
//!
//! Shared code for the knowledge-base tools:
//! - Catalog document model (categories, items, enrichment fields)
//! - Authoritative on-disk store with atomic replace
//! - Client-local overlay of pending additions/removals and its merge views
//! - Configuration loading

pub mod catalog;
pub mod config;
pub mod error;
pub mod overlay;
pub mod store;

pub use catalog::{Catalog, CatalogMetadata, Category, Item, ItemHandle, ItemKind};
pub use error::{Error, Result};
pub use overlay::{CommitView, DisplayView, ItemDraft, Overlay, OverlayCache, OverlayError};
pub use store::CatalogStore;
