//! Provenance classification
//!
//! Splits every not-yet-enriched item into exactly one bucket. arXiv items
//! are grouped by paper id, so one id can point at several catalog entries.

use crate::extract::extract_arxiv_id;
use crate::sources::anthology::is_anthology_url;
use kbase_common::{Catalog, ItemHandle};
use std::collections::HashMap;

/// arXiv id → every item filed under it, ids kept in first-seen order
#[derive(Debug, Default)]
pub struct ArxivIndex {
    order: Vec<String>,
    handles: HashMap<String, Vec<ItemHandle>>,
}

impl ArxivIndex {
    pub fn insert(&mut self, id: String, handle: ItemHandle) {
        match self.handles.get_mut(&id) {
            Some(handles) => handles.push(handle),
            None => {
                self.order.push(id.clone());
                self.handles.insert(id, vec![handle]);
            }
        }
    }

    /// Distinct ids
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    pub fn handles(&self, id: &str) -> &[ItemHandle] {
        self.handles.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Disjoint provenance buckets
#[derive(Debug, Default)]
pub struct Classification {
    pub arxiv: ArxivIndex,
    pub anthology: Vec<ItemHandle>,
    pub generic: Vec<ItemHandle>,
    pub non_document: Vec<ItemHandle>,
    /// Items skipped because they already have a summary
    pub already_enriched: usize,
}

impl Classification {
    /// Papers considered this run; arXiv counted per distinct id
    pub fn papers_processed(&self) -> usize {
        self.arxiv.len() + self.anthology.len() + self.generic.len()
    }
}

/// Partition the catalog's unenriched items
pub fn classify(catalog: &Catalog, anthology_host: &str) -> Classification {
    let mut buckets = Classification::default();

    for (handle, item) in catalog.items() {
        if item.is_enriched() {
            buckets.already_enriched += 1;
            continue;
        }

        if !item.is_paper() {
            buckets.non_document.push(handle);
        } else if let Some(id) = extract_arxiv_id(item.url()) {
            buckets.arxiv.insert(id, handle);
        } else if is_anthology_url(item.url(), anthology_host) {
            buckets.anthology.push(handle);
        } else {
            buckets.generic.push(handle);
        }
    }

    buckets
}
