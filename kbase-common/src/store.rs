//! Authoritative catalog store
//!
//! One JSON document on disk. Every call reads or writes the file directly;
//! nothing is cached between calls.
//!
//! Writes go to a freshly created sibling temp file which is then renamed over
//! the target, so readers see either the old or the new document, never a mix.
//!
//! Concurrent writers are not coordinated: two overlapping load/modify/save
//! cycles race and the last rename wins.

use crate::catalog::Catalog;
use crate::{Error, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// File-backed catalog store
#[derive(Debug, Clone)]
pub struct CatalogStore {
    path: PathBuf,
}

impl CatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the catalog
    ///
    /// A document that does not match the catalog schema is reported as
    /// [`Error::MalformedStore`].
    pub fn load(&self) -> Result<Catalog> {
        let text = fs::read_to_string(&self.path)?;
        let catalog = Catalog::from_json(&text).map_err(|source| Error::MalformedStore {
            path: self.path.clone(),
            source,
        })?;
        debug!(
            path = %self.path.display(),
            categories = catalog.categories.len(),
            "Loaded catalog"
        );
        Ok(catalog)
    }

    /// Recompute `total_items` and atomically replace the document
    pub fn save(&self, catalog: &mut Catalog) -> Result<()> {
        catalog.recount();
        let json = catalog.to_json_pretty()?;
        write_atomic(&self.path, json.as_bytes())?;
        debug!(
            path = %self.path.display(),
            total_items = catalog.metadata.total_items,
            "Saved catalog"
        );
        Ok(())
    }
}

/// Write `contents` to `target` via a uniquely named sibling temp file + rename
///
/// Each call gets its own temp file, so overlapping writers never share one.
pub(crate) fn write_atomic(target: &Path, contents: &[u8]) -> Result<()> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    // on failure the temp file is removed when the error drops it
    temp.persist(target).map_err(|e| Error::Io(e.error))?;
    Ok(())
}
