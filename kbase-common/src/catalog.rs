//! Catalog document model
//!
//! The catalog is a JSON document of named categories, each holding an ordered
//! list of bookmarked items. Fields this crate does not know about are kept in
//! flattened maps so a load/save cycle never drops data written by other tools.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Kind of bookmarked reference
///
/// Serialized as the lowercase tag used by the catalog (`"paper"`, `"repo"`, ...).
/// Tags outside the known set are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ItemKind {
    Paper,
    Repo,
    Blog,
    Video,
    Tool,
    Pod,
    Podcast,
    Docs,
    News,
    Other,
    Unknown(String),
}

impl ItemKind {
    pub fn as_str(&self) -> &str {
        match self {
            ItemKind::Paper => "paper",
            ItemKind::Repo => "repo",
            ItemKind::Blog => "blog",
            ItemKind::Video => "video",
            ItemKind::Tool => "tool",
            ItemKind::Pod => "pod",
            ItemKind::Podcast => "podcast",
            ItemKind::Docs => "docs",
            ItemKind::News => "news",
            ItemKind::Other => "other",
            ItemKind::Unknown(tag) => tag,
        }
    }

    pub fn is_paper(&self) -> bool {
        matches!(self, ItemKind::Paper)
    }
}

impl From<String> for ItemKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "paper" => ItemKind::Paper,
            "repo" => ItemKind::Repo,
            "blog" => ItemKind::Blog,
            "video" => ItemKind::Video,
            "tool" => ItemKind::Tool,
            "pod" => ItemKind::Pod,
            "podcast" => ItemKind::Podcast,
            "docs" => ItemKind::Docs,
            "news" => ItemKind::News,
            "other" => ItemKind::Other,
            _ => ItemKind::Unknown(tag),
        }
    }
}

impl From<&str> for ItemKind {
    fn from(tag: &str) -> Self {
        ItemKind::from(tag.to_string())
    }
}

impl From<ItemKind> for String {
    fn from(kind: ItemKind) -> Self {
        match kind {
            ItemKind::Unknown(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One catalog entry
///
/// `summary`, `date` and `authors` are the enrichment fields. They always
/// serialize (as `null` when unknown) so every item leaving a run carries all
/// three keys.
///
/// Everything else, `title`, `url`, `type` and `source` included, stays in
/// `fields` exactly as it was read. A key that is missing or holds a
/// non-string value is written back untouched and reads as absent through
/// the accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default)]
    pub summary: Option<String>,
    /// ISO day (`YYYY-MM-DD`)
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub authors: Option<Vec<String>>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Item {
    pub fn new(title: impl Into<String>, url: impl Into<String>, kind: ItemKind) -> Self {
        let mut fields = Map::new();
        fields.insert("title".to_string(), Value::String(title.into()));
        fields.insert("url".to_string(), Value::String(url.into()));
        fields.insert("type".to_string(), Value::String(kind.into()));
        Self {
            summary: None,
            date: None,
            authors: None,
            fields,
        }
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Empty when missing or not a string
    pub fn title(&self) -> &str {
        self.text("title").unwrap_or("")
    }

    /// Unique key within a catalog; empty when missing or not a string
    pub fn url(&self) -> &str {
        self.text("url").unwrap_or("")
    }

    /// `None` when `type` is missing or not a string
    pub fn kind(&self) -> Option<ItemKind> {
        self.text("type").map(ItemKind::from)
    }

    pub fn is_paper(&self) -> bool {
        self.text("type") == Some(ItemKind::Paper.as_str())
    }

    /// Provenance tag, e.g. "user"
    pub fn source(&self) -> Option<&str> {
        self.text("source")
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.fields.insert("title".to_string(), Value::String(title.into()));
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.fields.insert("url".to_string(), Value::String(url.into()));
    }

    pub fn set_source(&mut self, source: impl Into<String>) {
        self.fields.insert("source".to_string(), Value::String(source.into()));
    }

    /// Idempotency gate: an item with a summary is never fetched again
    pub fn is_enriched(&self) -> bool {
        self.summary.is_some()
    }
}

/// Named, ordered group of items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
            extra: Map::new(),
        }
    }
}

/// Derived catalog counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogMetadata {
    #[serde(default)]
    pub total_items: usize,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Stable address of an item inside a catalog: category index plus item index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemHandle {
    pub category: usize,
    pub item: usize,
}

/// The whole catalog document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub metadata: CatalogMetadata,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Catalog {
    /// Sum of per-category item counts
    pub fn item_count(&self) -> usize {
        self.categories.iter().map(|c| c.items.len()).sum()
    }

    /// Recompute `metadata.total_items` from the categories
    pub fn recount(&mut self) {
        self.metadata.total_items = self.item_count();
    }

    pub fn items_with_summary(&self) -> usize {
        self.items().filter(|(_, item)| item.is_enriched()).count()
    }

    /// All items with their handles, in document order
    pub fn items(&self) -> impl Iterator<Item = (ItemHandle, &Item)> {
        self.categories
            .iter()
            .enumerate()
            .flat_map(|(ci, category)| {
                category.items.iter().enumerate().map(move |(ii, item)| {
                    (
                        ItemHandle {
                            category: ci,
                            item: ii,
                        },
                        item,
                    )
                })
            })
    }

    pub fn item(&self, handle: ItemHandle) -> Option<&Item> {
        self.categories
            .get(handle.category)
            .and_then(|c| c.items.get(handle.item))
    }

    pub fn item_mut(&mut self, handle: ItemHandle) -> Option<&mut Item> {
        self.categories
            .get_mut(handle.category)
            .and_then(|c| c.items.get_mut(handle.item))
    }

    pub fn category_mut(&mut self, name: &str) -> Option<&mut Category> {
        self.categories.iter_mut().find(|c| c.name == name)
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.items().any(|(_, item)| item.url() == url)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Two-space indented JSON, non-ASCII left unescaped
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
