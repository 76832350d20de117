//! Item record decoding

use tracing::trace;

use crate::bits::{BitReader, BitWriter, OpaqueBits};
use crate::huffman;
use crate::schema::{
    BiasedField, CodeEncoding, FlagSlot, ItemFlag, ItemLayout, ItemType, Schema,
};
use crate::{Error, Result};

use super::property::read_properties;
use super::{
    Durability, Ear, Extended, Item, ItemBody, Placement, Quality, RareName, Runeword, SetBonus,
    Simple, MAX_SOCKET_DEPTH,
};

/// Decode one item record, plus any socketed items that follow it.
///
/// The reader must sit on a byte boundary; it is left on the boundary after
/// the last socketed item.
pub fn decode_item(reader: &mut BitReader<'_>, schema: &Schema) -> Result<Item> {
    decode_at_depth(reader, schema, 0)
}

fn decode_at_depth(reader: &mut BitReader<'_>, schema: &Schema, depth: usize) -> Result<Item> {
    let start = reader.tell();
    decode_tree(reader, schema, depth, start).map_err(|err| match err {
        Error::OutOfBounds { .. } => Error::CorruptItemRecord {
            offset: start,
            reason: format!("record runs past the end of the buffer ({err})"),
        },
        other => other,
    })
}

fn decode_tree(
    reader: &mut BitReader<'_>,
    schema: &Schema,
    depth: usize,
    start: usize,
) -> Result<Item> {
    let (mut item, fill) = decode_record(reader, schema, start)?;

    if let ItemBody::Extended(extended) = &mut item.body {
        if fill > 0 && depth >= MAX_SOCKET_DEPTH {
            return Err(Error::CorruptItemRecord {
                offset: start,
                reason: format!("socketed items nested deeper than {MAX_SOCKET_DEPTH}"),
            });
        }
        extended.socketed_items.reserve(usize::from(fill));
        for _ in 0..fill {
            extended
                .socketed_items
                .push(decode_at_depth(reader, schema, depth + 1)?);
        }
    }

    trace!(
        offset = start,
        code = ?item.code(),
        depth,
        socketed = item.socketed_items().len(),
        "decoded item"
    );
    Ok(item)
}

/// Flags set in the record, with the reserved runs concatenated
struct FlagWord {
    set: u16,
    reserved: OpaqueBits,
}

impl FlagWord {
    fn has(&self, flag: ItemFlag) -> bool {
        self.set & flag.mask() != 0
    }
}

/// One record up to and including its padding. Returns the item with no
/// socketed children and the number of children that follow.
fn decode_record(reader: &mut BitReader<'_>, schema: &Schema, start: usize) -> Result<(Item, u8)> {
    let layout = &schema.items;

    if let Some(marker) = &layout.marker {
        let found = reader.read_bytes(marker.len())?;
        if found != marker.as_slice() {
            return Err(Error::CorruptItemRecord {
                offset: start,
                reason: format!("expected item marker {marker:02x?}, found {found:02x?}"),
            });
        }
    }

    let flags = read_flags(reader, layout)?;
    let version = read_as::<u16>(reader, layout.version_bits)?;
    let placement = Placement {
        location: read_as::<u8>(reader, layout.location_bits)?,
        equipped: read_as::<u8>(reader, layout.equipped_bits)?,
        column: read_as::<u8>(reader, layout.column_bits)?,
        row: read_as::<u8>(reader, layout.row_bits)?,
        panel: read_as::<u8>(reader, layout.panel_bits)?,
    };

    let (body, fill) = if flags.has(ItemFlag::Ear) {
        let ear = Ear {
            class: read_as::<u8>(reader, layout.ear_class_bits)?,
            level: read_as::<u8>(reader, layout.ear_level_bits)?,
            name: read_name(reader, layout.name_char_bits, layout.ear_name_max)?,
        };
        (ItemBody::Ear(ear), 0)
    } else {
        read_coded_body(reader, schema, &flags, start)?
    };

    let padding = reader.align()?;

    let item = Item {
        identified: flags.has(ItemFlag::Identified),
        new: flags.has(ItemFlag::New),
        starter: flags.has(ItemFlag::Starter),
        ethereal: flags.has(ItemFlag::Ethereal),
        reserved: flags.reserved,
        version,
        placement,
        body,
        padding,
    };
    Ok((item, fill))
}

fn read_flags(reader: &mut BitReader<'_>, layout: &ItemLayout) -> Result<FlagWord> {
    let mut set = 0u16;
    let mut reserved = BitWriter::new();

    for slot in &layout.flags {
        match *slot {
            FlagSlot::Flag(flag) => {
                if reader.read_bit()? {
                    set |= flag.mask();
                }
            }
            FlagSlot::Reserved(len) => reserved.write_opaque(&reader.read_opaque(len as usize)?)?,
        }
    }

    let len = reserved.tell();
    Ok(FlagWord {
        set,
        reserved: OpaqueBits::new(len, reserved.into_bytes()),
    })
}

/// Simple or extended body, everything after placement up to the padding
fn read_coded_body(
    reader: &mut BitReader<'_>,
    schema: &Schema,
    flags: &FlagWord,
    start: usize,
) -> Result<(ItemBody, u8)> {
    let layout = &schema.items;

    let code = read_code(reader, layout)?;
    let item_type = schema
        .item_type(&code)
        .ok_or_else(|| Error::CorruptItemRecord {
            offset: start,
            reason: format!("unknown item code {code:?}"),
        })?;

    let quest_difficulty = match layout.quest_difficulty_bits {
        Some(bits) if item_type.quest => Some(read_as::<u16>(reader, bits)?),
        _ => None,
    };

    let fill_bits = if flags.has(ItemFlag::Simple) || quest_difficulty.is_some() {
        layout.simple_socket_fill_bits
    } else {
        layout.socket_fill_bits
    };
    let fill = read_as::<u8>(reader, fill_bits)?;

    if flags.has(ItemFlag::Simple) {
        let simple = Simple {
            code,
            quest_difficulty,
            socket_fill: fill,
        };
        return Ok((ItemBody::Simple(simple), 0));
    }

    let extended = read_extended(reader, schema, item_type, flags, code, quest_difficulty, start)?;
    Ok((ItemBody::Extended(Box::new(extended)), fill))
}

#[allow(clippy::too_many_lines)] // Field order of the extended record
fn read_extended(
    reader: &mut BitReader<'_>,
    schema: &Schema,
    item_type: &ItemType,
    flags: &FlagWord,
    code: String,
    quest_difficulty: Option<u16>,
    start: usize,
) -> Result<Extended> {
    let layout = &schema.items;

    let id = read_as::<u32>(reader, layout.id_bits)?;
    let level = read_as::<u8>(reader, layout.level_bits)?;
    let tier = reader.read_bits(layout.quality_bits)?;

    let picture = read_flagged(reader, layout.picture_bits)?;
    let auto_affix = read_flagged(reader, layout.auto_affix_bits)?;

    let mut quality = match tier {
        1 => Quality::Low {
            kind: read_as::<u8>(reader, layout.low_quality_bits)?,
        },
        2 => Quality::Normal,
        3 => Quality::Superior {
            kind: read_as::<u8>(reader, layout.superior_bits)?,
        },
        4 => Quality::Magic {
            prefix: read_as::<u16>(reader, layout.magic_affix_bits)?,
            suffix: read_as::<u16>(reader, layout.magic_affix_bits)?,
        },
        5 => Quality::Set {
            id: read_as::<u16>(reader, layout.set_id_bits)?,
            bonuses: Vec::new(),
        },
        6 => Quality::Rare(read_rare_name(reader, layout)?),
        7 => Quality::Unique {
            id: read_as::<u16>(reader, layout.unique_id_bits)?,
        },
        8 => Quality::Crafted(read_rare_name(reader, layout)?),
        other => {
            return Err(Error::CorruptItemRecord {
                offset: start,
                reason: format!("invalid quality {other}"),
            })
        }
    };

    let runeword = if flags.has(ItemFlag::Runeword) {
        Some((
            read_as::<u16>(reader, layout.runeword_bits)?,
            read_as::<u8>(reader, layout.runeword_marker_bits)?,
        ))
    } else {
        None
    };

    let personalized_name = if flags.has(ItemFlag::Personalized) {
        Some(read_name(
            reader,
            layout.name_char_bits,
            layout.personal_name_max,
        )?)
    } else {
        None
    };

    let tome = if item_type.tome {
        Some(read_as::<u8>(reader, layout.tome_bits)?)
    } else {
        None
    };

    let timestamp = reader.read_bit()?;

    let defense = if item_type.class.has_defense() {
        Some(read_biased(reader, layout.defense)?)
    } else {
        None
    };

    let durability = if item_type.class.has_durability() {
        let offset = reader.tell();
        let raw_max = reader.read_bits(layout.max_durability.bits)?;
        let max = unbias(raw_max, layout.max_durability, offset)?;
        let current = if raw_max != 0 {
            Some(read_biased(reader, layout.durability)?)
        } else {
            None
        };
        Some(Durability { max, current })
    } else {
        None
    };

    let quantity = if item_type.stackable {
        Some(read_as::<u16>(reader, layout.quantity_bits)?)
    } else {
        None
    };

    let sockets = if flags.has(ItemFlag::Socketed) {
        Some(read_as::<u8>(reader, layout.socket_count_bits)?)
    } else {
        None
    };

    let set_mask = match quality {
        Quality::Set { .. } => reader.read_bits(layout.set_mask_bits)?,
        _ => 0,
    };

    let properties = read_properties(reader, schema)?;

    if let Quality::Set { bonuses, .. } = &mut quality {
        for slot in 0..layout.set_mask_bits {
            if set_mask >> slot & 1 == 1 {
                bonuses.push(SetBonus {
                    slot: slot as u8,
                    properties: read_properties(reader, schema)?,
                });
            }
        }
    }

    let runeword = match runeword {
        Some((id, marker)) => Some(Runeword {
            id,
            marker,
            properties: read_properties(reader, schema)?,
        }),
        None => None,
    };

    Ok(Extended {
        code,
        quest_difficulty,
        id,
        level,
        picture,
        auto_affix,
        quality,
        runeword,
        personalized_name,
        tome,
        timestamp,
        defense,
        durability,
        quantity,
        sockets,
        properties,
        socketed_items: Vec::new(),
    })
}

/// Read a `bits`-wide field into the type that models it. Layouts come from
/// the constants table, so a width can exceed the type.
pub(super) fn read_as<T: TryFrom<u64>>(reader: &mut BitReader<'_>, bits: u32) -> Result<T> {
    let offset = reader.tell();
    let value = reader.read_bits(bits)?;
    T::try_from(value).map_err(|_| Error::CorruptItemRecord {
        offset,
        reason: format!(
            "{bits}-bit value {value} does not fit {}",
            std::any::type_name::<T>()
        ),
    })
}

/// Stored `raw` back to `raw - bias`
pub(super) fn unbias(raw: u64, field: BiasedField, offset: usize) -> Result<i64> {
    i64::try_from(raw)
        .ok()
        .and_then(|value| value.checked_sub(field.bias))
        .ok_or_else(|| Error::CorruptItemRecord {
            offset,
            reason: format!("value {raw} with bias {} is out of range", field.bias),
        })
}

fn read_biased(reader: &mut BitReader<'_>, field: BiasedField) -> Result<i64> {
    let offset = reader.tell();
    let raw = reader.read_bits(field.bits)?;
    unbias(raw, field, offset)
}

/// A presence bit followed, when set, by a `bits`-wide value
fn read_flagged<T: TryFrom<u64>>(reader: &mut BitReader<'_>, bits: u32) -> Result<Option<T>> {
    if reader.read_bit()? {
        Ok(Some(read_as(reader, bits)?))
    } else {
        Ok(None)
    }
}

fn read_rare_name(reader: &mut BitReader<'_>, layout: &ItemLayout) -> Result<RareName> {
    let first = read_as::<u8>(reader, layout.rare_name_bits)?;
    let second = read_as::<u8>(reader, layout.rare_name_bits)?;
    let affixes = (0..layout.rare_affix_slots)
        .map(|_| read_flagged(reader, layout.rare_affix_bits))
        .collect::<Result<Vec<_>>>()?;
    Ok(RareName {
        first,
        second,
        affixes,
    })
}

fn read_code(reader: &mut BitReader<'_>, layout: &ItemLayout) -> Result<String> {
    let mut code = String::with_capacity(layout.code_len);
    for _ in 0..layout.code_len {
        let symbol = match layout.code {
            CodeEncoding::Ascii => char::from(read_as::<u8>(reader, 8)?),
            CodeEncoding::Huffman => huffman::read_symbol(reader)?,
        };
        code.push(symbol);
    }
    code.truncate(code.trim_end_matches(' ').len());
    Ok(code)
}

/// Up to `max` characters of `bits` each, NUL-terminated when shorter
fn read_name(reader: &mut BitReader<'_>, bits: u32, max: usize) -> Result<String> {
    let mut name = String::with_capacity(max);
    for _ in 0..max {
        let ch: u8 = read_as(reader, bits)?;
        if ch == 0 {
            break;
        }
        name.push(char::from(ch));
    }
    Ok(name)
}
