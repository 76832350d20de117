//! File-level container layouts for the supported stash dialects

use serde::{Deserialize, Serialize};

use super::field::{Condition, FieldDescriptor, FieldRole, FieldValue};

/// D2R shared stash section magic (0xAA55AA55 little-endian)
pub const RESURRECTED_MAGIC: [u8; 4] = [0x55, 0xaa, 0x55, 0xaa];

/// PlugY shared stash magic
pub const PLUGY_SHARED_MAGIC: [u8; 4] = *b"SSS\0";

/// PlugY private stash magic
pub const PLUGY_PRIVATE_MAGIC: [u8; 4] = *b"CSTM";

/// PlugY page marker
pub const PAGE_MARKER: [u8; 2] = *b"ST";

/// Item list marker shared by every dialect
pub const ITEM_LIST_MARKER: [u8; 2] = *b"JM";

/// Item revision PlugY stashes are written with (1.10+ item records)
pub const PLUGY_ITEM_REVISION: u32 = 0x60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// D2R shared stash (`.d2i`)
    ResurrectedShared,
    /// PlugY shared stash (`.sss`)
    PlugyShared,
    /// PlugY private stash (`.d2x`)
    PlugyPrivate,
}

/// How pages follow the file header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageFraming {
    /// Every page is a section repeating the full header; sections run to
    /// the end of the buffer
    Sectioned,
    /// One header carries the page count; each page opens with `marker`,
    /// then an optional u32 flags word and an optional NUL-terminated name
    Tabbed { marker: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerLayout {
    pub dialect: Dialect,
    /// Detection marker at byte 0
    pub magic: Vec<u8>,
    pub header: Vec<FieldDescriptor>,
    pub framing: PageFraming,
    pub item_list_marker: Vec<u8>,
    /// Item revision for dialects whose header carries no numeric revision
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_revision: Option<u32>,
}

impl ContainerLayout {
    /// Built-in layouts in detection priority order
    pub fn builtin() -> Vec<Self> {
        vec![
            Self::resurrected_shared(),
            Self::plugy_shared(),
            Self::plugy_private(),
        ]
    }

    pub fn resurrected_shared() -> Self {
        Self {
            dialect: Dialect::ResurrectedShared,
            magic: RESURRECTED_MAGIC.to_vec(),
            header: vec![
                FieldDescriptor::magic("magic", &RESURRECTED_MAGIC),
                FieldDescriptor::uint("flags", 32, FieldRole::Extra),
                FieldDescriptor::uint("version", 32, FieldRole::Version),
                FieldDescriptor::uint("gold", 32, FieldRole::Gold),
                FieldDescriptor::uint("size", 32, FieldRole::SectionSize),
                FieldDescriptor::reserved("reserved", 44),
            ],
            framing: PageFraming::Sectioned,
            item_list_marker: ITEM_LIST_MARKER.to_vec(),
            item_revision: None,
        }
    }

    pub fn plugy_shared() -> Self {
        Self {
            dialect: Dialect::PlugyShared,
            magic: PLUGY_SHARED_MAGIC.to_vec(),
            header: vec![
                FieldDescriptor::magic("magic", &PLUGY_SHARED_MAGIC),
                FieldDescriptor::text("version", 2, FieldRole::Version),
                FieldDescriptor::uint("gold", 32, FieldRole::Gold)
                    .when(Condition::equals("version", FieldValue::Text("02".into()))),
                FieldDescriptor::uint("pages", 32, FieldRole::PageCount),
            ],
            framing: PageFraming::Tabbed {
                marker: PAGE_MARKER.to_vec(),
            },
            item_list_marker: ITEM_LIST_MARKER.to_vec(),
            item_revision: Some(PLUGY_ITEM_REVISION),
        }
    }

    pub fn plugy_private() -> Self {
        Self {
            dialect: Dialect::PlugyPrivate,
            magic: PLUGY_PRIVATE_MAGIC.to_vec(),
            header: vec![
                FieldDescriptor::magic("magic", &PLUGY_PRIVATE_MAGIC),
                FieldDescriptor::text("version", 2, FieldRole::Version),
                FieldDescriptor::uint("reserved", 32, FieldRole::Extra),
                FieldDescriptor::uint("pages", 32, FieldRole::PageCount),
            ],
            framing: PageFraming::Tabbed {
                marker: PAGE_MARKER.to_vec(),
            },
            item_list_marker: ITEM_LIST_MARKER.to_vec(),
            item_revision: Some(PLUGY_ITEM_REVISION),
        }
    }

    pub fn matches(&self, buffer: &[u8]) -> bool {
        !self.magic.is_empty() && buffer.starts_with(&self.magic)
    }

    pub fn has_gold(&self) -> bool {
        self.header.iter().any(|f| f.role == FieldRole::Gold)
    }
}
