//! Item record layouts per format revision
//!
//! Widths come from the game's item record format; legacy (1.10+, revision
//! `0x60`) and D2R (`0x61` onward) differ in the per-item marker, the item
//! version width, the base code encoding, name character width and the
//! quest difficulty field.

use serde::{Deserialize, Serialize};

/// Highest revision using legacy item records
pub const LAST_LEGACY_REVISION: u32 = 0x60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemFlag {
    Identified,
    Socketed,
    New,
    Ear,
    Starter,
    Simple,
    Ethereal,
    Personalized,
    Runeword,
}

impl ItemFlag {
    pub(crate) fn mask(self) -> u16 {
        1 << self as u16
    }
}

/// One slot of the item flag word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagSlot {
    Flag(ItemFlag),
    /// Run of bits with no known meaning, captured verbatim
    Reserved(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeEncoding {
    /// One byte per character
    Ascii,
    /// Huffman-coded symbols
    Huffman,
}

/// A numeric field stored as `value + bias`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiasedField {
    pub bits: u32,
    #[serde(default)]
    pub bias: i64,
}

impl BiasedField {
    pub const fn new(bits: u32, bias: i64) -> Self {
        Self { bits, bias }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemLayout {
    /// Marker opening every item record, if any
    pub marker: Option<Vec<u8>>,
    pub flags: Vec<FlagSlot>,
    pub version_bits: u32,

    // Placement
    pub location_bits: u32,
    pub equipped_bits: u32,
    pub column_bits: u32,
    pub row_bits: u32,
    pub panel_bits: u32,

    pub code: CodeEncoding,
    pub code_len: usize,
    pub name_char_bits: u32,
    pub ear_class_bits: u32,
    pub ear_level_bits: u32,
    pub ear_name_max: usize,
    pub personal_name_max: usize,
    pub quest_difficulty_bits: Option<u32>,
    pub socket_fill_bits: u32,
    pub simple_socket_fill_bits: u32,

    // Extended records
    pub id_bits: u32,
    pub level_bits: u32,
    pub quality_bits: u32,
    pub picture_bits: u32,
    pub auto_affix_bits: u32,
    pub low_quality_bits: u32,
    pub superior_bits: u32,
    pub magic_affix_bits: u32,
    pub set_id_bits: u32,
    pub unique_id_bits: u32,
    pub rare_name_bits: u32,
    pub rare_affix_bits: u32,
    pub rare_affix_slots: usize,
    pub runeword_bits: u32,
    pub runeword_marker_bits: u32,
    pub tome_bits: u32,
    pub defense: BiasedField,
    pub max_durability: BiasedField,
    pub durability: BiasedField,
    pub quantity_bits: u32,
    pub socket_count_bits: u32,
    pub set_mask_bits: u32,

    // Stat lists
    pub stat_id_bits: u32,
    pub stat_terminator: u16,
}

impl ItemLayout {
    pub fn for_revision(revision: u32) -> Self {
        if revision <= LAST_LEGACY_REVISION {
            Self::legacy()
        } else {
            Self::resurrected()
        }
    }

    /// 1.10+ records, each opening with `JM`
    pub fn legacy() -> Self {
        Self {
            marker: Some(b"JM".to_vec()),
            flags: standard_flags(),
            version_bits: 10,
            location_bits: 3,
            equipped_bits: 4,
            column_bits: 4,
            row_bits: 4,
            panel_bits: 3,
            code: CodeEncoding::Ascii,
            code_len: 4,
            name_char_bits: 7,
            ear_class_bits: 3,
            ear_level_bits: 7,
            ear_name_max: 15,
            personal_name_max: 16,
            quest_difficulty_bits: None,
            socket_fill_bits: 3,
            simple_socket_fill_bits: 1,
            id_bits: 32,
            level_bits: 7,
            quality_bits: 4,
            picture_bits: 3,
            auto_affix_bits: 11,
            low_quality_bits: 3,
            superior_bits: 3,
            magic_affix_bits: 11,
            set_id_bits: 12,
            unique_id_bits: 12,
            rare_name_bits: 8,
            rare_affix_bits: 11,
            rare_affix_slots: 6,
            runeword_bits: 12,
            runeword_marker_bits: 4,
            tome_bits: 5,
            defense: BiasedField::new(11, 10),
            max_durability: BiasedField::new(8, 0),
            durability: BiasedField::new(9, 0),
            quantity_bits: 9,
            socket_count_bits: 4,
            set_mask_bits: 5,
            stat_id_bits: 9,
            stat_terminator: 0x1ff,
        }
    }

    /// D2R records: no per-item marker, Huffman codes, 8-bit names
    pub fn resurrected() -> Self {
        Self {
            marker: None,
            version_bits: 3,
            code: CodeEncoding::Huffman,
            name_char_bits: 8,
            quest_difficulty_bits: Some(2),
            ..Self::legacy()
        }
    }
}

fn standard_flags() -> Vec<FlagSlot> {
    use FlagSlot::{Flag, Reserved};
    vec![
        Reserved(4),
        Flag(ItemFlag::Identified),
        Reserved(6),
        Flag(ItemFlag::Socketed),
        Reserved(1),
        Flag(ItemFlag::New),
        Reserved(2),
        Flag(ItemFlag::Ear),
        Flag(ItemFlag::Starter),
        Reserved(3),
        Flag(ItemFlag::Simple),
        Flag(ItemFlag::Ethereal),
        Reserved(1),
        Flag(ItemFlag::Personalized),
        Reserved(1),
        Flag(ItemFlag::Runeword),
        Reserved(5),
    ]
}
