//! Stash documents and the container codec
//!
//! A [`Stash`] is the mutable, owned form of a stash file. Counts stored on
//! disk (pages, items per page, D2R section sizes) are recomputed when the
//! document is written.

mod decode;
mod encode;
pub(crate) mod header;

pub use decode::decode_stash;
pub use encode::encode_stash;

use serde::{Deserialize, Serialize};

use crate::item::Item;
use crate::schema::{Dialect, FieldValues};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stash {
    pub dialect: Dialect,
    /// Decimal revision on D2R (`"98"`), two-character tag on PlugY (`"02"`)
    pub version: String,
    /// Zero when the container has no gold field. On D2R this is the first
    /// section's gold, written to every page without its own.
    pub shared_gold: u32,
    /// Page count as decoded; writes use `pages.len()`
    pub page_count: u32,
    /// File header fields with no semantic role. Sectioned stashes keep
    /// these per page instead.
    #[serde(default)]
    pub header: FieldValues,
    pub pages: Vec<Page>,
    /// Bytes after the last page of a tabbed stash
    #[serde(default)]
    pub trailer: Vec<u8>,
}

impl Stash {
    pub fn new(dialect: Dialect, version: &str) -> Self {
        Self {
            dialect,
            version: version.to_string(),
            shared_gold: 0,
            page_count: 0,
            header: FieldValues::new(),
            pages: Vec::new(),
            trailer: Vec::new(),
        }
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.pages.iter().flat_map(|p| p.items.iter())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// PlugY page flags (shared/index/main index bits)
    #[serde(default)]
    pub flags: Option<u32>,
    #[serde(default)]
    pub name: Option<String>,
    /// Section gold, kept only where it differs from `Stash::shared_gold`
    /// (D2R)
    #[serde(default)]
    pub gold: Option<u32>,
    /// Section version, kept only where it differs from `Stash::version`
    /// (D2R)
    #[serde(default)]
    pub version: Option<String>,
    /// Section header fields with no semantic role (D2R)
    #[serde(default)]
    pub header: FieldValues,
    pub items: Vec<Item>,
    /// Bytes between the item list and the end of a D2R section
    #[serde(default)]
    pub trailer: Vec<u8>,
}

impl Page {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }
}
