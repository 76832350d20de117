//! # d2stash
//!
//! Diablo II stash codec: decodes stash files into a mutable [`Stash`]
//! document and encodes it back, byte for byte when nothing was changed.
//!
//! # Format Overview
//!
//! ## D2R shared stash (`.d2i`)
//!
//! A run of sections, one per page, each opening with a 64-byte header:
//! - Bytes 0-3: `55 AA 55 AA` magic
//! - Bytes 4-7: Flags
//! - Bytes 8-11: Revision (`0x61`, `0x62`, `0x63`, ...)
//! - Bytes 12-15: Shared gold
//! - Bytes 16-19: Section size in bytes, header included
//! - Bytes 20-63: Reserved
//!
//! followed by a `JM` item list (u16 count, then bit-packed item records).
//!
//! ## PlugY shared (`.sss`) and private (`.d2x`) stashes
//!
//! - `SSS\0` + two-character version + gold (version `02` only) + u32 pages
//! - `CSTM` + two-character version + u32 reserved + u32 pages
//!
//! Each page is `ST`, an optional u32 flags word, an optional NUL-terminated
//! name and a `JM` item list of 1.10+ records.
//!
//! ## Example
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let constants = d2stash::Constants::from_json(&std::fs::read_to_string("constants.json")?)?;
//! let bytes = std::fs::read("SharedStashSoftCoreV2.d2i")?;
//!
//! let mut stash = d2stash::read_stash(&bytes, &constants, None)?;
//! stash.shared_gold = 2_500_000;
//!
//! std::fs::write("SharedStashSoftCoreV2.d2i", d2stash::write_stash(&stash, &constants, None)?)?;
//! # Ok(())
//! # }
//! ```

pub mod bits;
mod huffman;
pub mod item;
pub mod schema;
pub mod stash;
pub mod version;

#[doc(inline)]
pub use bits::{BitReader, BitWriter, OpaqueBits};
#[doc(inline)]
pub use item::{
    decode_item, encode_item, Durability, Ear, Extended, Item, ItemBody, Placement, Property,
    Quality, RareName, Runeword, SetBonus, Simple, StatValue,
};
#[doc(inline)]
pub use schema::{
    Condition, Constants, ContainerLayout, Dialect, FieldDescriptor, FieldKind, FieldRole,
    FieldValue, ItemClass, ItemLayout, ItemType, PageFraming, Schema, StatDef,
};
#[doc(inline)]
pub use stash::{decode_stash, encode_stash, Page, Stash};
#[doc(inline)]
pub use version::{resolve_version, Resolved};

/// Errors from stash decoding and encoding
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Read past end of buffer at bit {offset}: need {requested} bits, {available} available")]
    OutOfBounds {
        offset: usize,
        requested: usize,
        available: usize,
    },

    #[error("Byte-aligned access at unaligned bit offset {0}")]
    MisalignedAccess(usize),

    #[error("Value {value} does not fit in {bits} bits")]
    ValueOverflow { value: i128, bits: u32 },

    #[error("Field width {0} exceeds 64 bits")]
    InvalidWidth(u32),

    #[error("Unknown version: 0x{0:02x}")]
    UnknownVersion(u32),

    #[error("Unrecognized stash format: {0}")]
    UnrecognizedFormat(String),

    #[error("Corrupt page marker at byte {offset}: expected {expected:02x?}, got {actual:02x?}")]
    CorruptPageMarker {
        offset: usize,
        expected: Vec<u8>,
        actual: Vec<u8>,
    },

    #[error("Corrupt item record at bit {offset}: {reason}")]
    CorruptItemRecord { offset: usize, reason: String },

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Failed to parse JSON constants: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse YAML constants: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Decode a stash file.
///
/// The container dialect is always detected from the magic bytes. `revision`
/// pins the item-format schema; when `None` it is detected from the header.
pub fn read_stash(buffer: &[u8], constants: &Constants, revision: Option<u32>) -> Result<Stash> {
    let resolved = resolve_version(buffer, constants, revision)?;
    decode_stash(buffer, resolved.container, resolved.schema)
}

/// Encode a stash document.
///
/// `revision` pins the item-format schema; when `None` it is taken from the
/// document.
pub fn write_stash(stash: &Stash, constants: &Constants, revision: Option<u32>) -> Result<Vec<u8>> {
    let container = constants.container(stash.dialect).ok_or_else(|| {
        Error::UnrecognizedFormat(format!("no container layout for {:?}", stash.dialect))
    })?;
    let revision = match revision {
        Some(revision) => revision,
        None => version::document_revision(stash, container)?,
    };
    let schema = constants.schema(revision)?;
    encode_stash(stash, container, schema)
}
