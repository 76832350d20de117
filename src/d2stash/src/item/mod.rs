//! Item records
//!
//! An item is a bit-packed record: a flag word, placement, then one of three
//! bodies. Ears carry only their owner's class, level and name; simple items
//! stop after the base code; extended items continue with quality data,
//! stat lists and any socketed items, which follow the record as complete
//! records of their own.

mod decode;
mod encode;
mod property;

pub use decode::decode_item;
pub use encode::encode_item;

use serde::{Deserialize, Serialize};

use crate::bits::OpaqueBits;

/// Socketed items may themselves hold socketed items this many levels deep
pub const MAX_SOCKET_DEPTH: usize = 2;

#[allow(clippy::struct_excessive_bools)] // One per record flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub identified: bool,
    pub new: bool,
    pub starter: bool,
    pub ethereal: bool,
    /// Reserved runs of the flag word, concatenated in stream order
    pub reserved: OpaqueBits,
    /// Item format version stored in the record
    pub version: u16,
    pub placement: Placement,
    pub body: ItemBody,
    /// Bits between the end of the record and the next byte boundary
    pub padding: OpaqueBits,
}

impl Item {
    pub fn code(&self) -> Option<&str> {
        match &self.body {
            ItemBody::Ear(_) => None,
            ItemBody::Simple(simple) => Some(&simple.code),
            ItemBody::Extended(extended) => Some(&extended.code),
        }
    }

    pub fn socketed_items(&self) -> &[Item] {
        match &self.body {
            ItemBody::Extended(extended) => &extended.socketed_items,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub location: u8,
    pub equipped: u8,
    pub column: u8,
    pub row: u8,
    /// Storage panel (inventory, cube, stash, ...)
    pub panel: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemBody {
    Ear(Ear),
    Simple(Simple),
    Extended(Box<Extended>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ear {
    pub class: u8,
    pub level: u8,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Simple {
    pub code: String,
    pub quest_difficulty: Option<u16>,
    /// Raw filled-socket field; simple items never carry socketed records
    pub socket_fill: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extended {
    pub code: String,
    pub quest_difficulty: Option<u16>,
    pub id: u32,
    pub level: u8,
    pub picture: Option<u8>,
    /// Class-specific automatic affix
    pub auto_affix: Option<u16>,
    pub quality: Quality,
    pub runeword: Option<Runeword>,
    pub personalized_name: Option<String>,
    pub tome: Option<u8>,
    pub timestamp: bool,
    pub defense: Option<i64>,
    pub durability: Option<Durability>,
    pub quantity: Option<u16>,
    /// Total socket count; `Some` sets the socketed flag
    pub sockets: Option<u8>,
    pub properties: Vec<Property>,
    pub socketed_items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tier", rename_all = "snake_case")]
pub enum Quality {
    Low { kind: u8 },
    Normal,
    Superior { kind: u8 },
    Magic { prefix: u16, suffix: u16 },
    Set { id: u16, bonuses: Vec<SetBonus> },
    Rare(RareName),
    Unique { id: u16 },
    Crafted(RareName),
}

impl Quality {
    /// On-disk quality tier
    pub fn tier(&self) -> u8 {
        match self {
            Self::Low { .. } => 1,
            Self::Normal => 2,
            Self::Superior { .. } => 3,
            Self::Magic { .. } => 4,
            Self::Set { .. } => 5,
            Self::Rare(_) => 6,
            Self::Unique { .. } => 7,
            Self::Crafted(_) => 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RareName {
    pub first: u8,
    pub second: u8,
    /// One entry per affix slot, alternating prefix/suffix
    pub affixes: Vec<Option<u16>>,
}

/// Stat list unlocked by wearing part of a set; `slot` is its bit in the
/// set bonus mask
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetBonus {
    pub slot: u8,
    pub properties: Vec<Property>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Runeword {
    pub id: u16,
    pub marker: u8,
    pub properties: Vec<Property>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Durability {
    pub max: i64,
    /// Absent when the stored maximum is zero (indestructible)
    pub current: Option<i64>,
}

/// One stat list entry; grouped stats carry one value per stat id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub id: u16,
    pub values: Vec<StatValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatValue {
    pub param: Option<u64>,
    pub value: i64,
}

impl StatValue {
    pub fn new(value: i64) -> Self {
        Self { param: None, value }
    }

    pub fn with_param(param: u64, value: i64) -> Self {
        Self {
            param: Some(param),
            value,
        }
    }
}
