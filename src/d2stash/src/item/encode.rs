//! Item record encoding, the mirror of [`super::decode`]

use crate::bits::{BitReader, BitWriter, OpaqueBits};
use crate::huffman;
use crate::schema::{CodeEncoding, FlagSlot, ItemFlag, ItemLayout, ItemType, Schema};
use crate::{Error, Result};

use super::property::{write_biased, write_properties};
use super::{Extended, Item, ItemBody, Quality, RareName, MAX_SOCKET_DEPTH};

/// Encode one item record followed by its socketed items.
///
/// Derived fields (structural flags, filled socket count, set bonus mask) are
/// computed from the item's content; reserved bits and padding are replayed.
pub fn encode_item(item: &Item, writer: &mut BitWriter, schema: &Schema) -> Result<()> {
    encode_at_depth(item, writer, schema, 0)
}

fn encode_at_depth(item: &Item, writer: &mut BitWriter, schema: &Schema, depth: usize) -> Result<()> {
    let layout = &schema.items;

    if let Some(marker) = &layout.marker {
        writer.write_bytes(marker)?;
    }

    write_flags(writer, layout, item)?;
    writer.write_bits(u64::from(item.version), layout.version_bits)?;

    let placement = &item.placement;
    writer.write_bits(u64::from(placement.location), layout.location_bits)?;
    writer.write_bits(u64::from(placement.equipped), layout.equipped_bits)?;
    writer.write_bits(u64::from(placement.column), layout.column_bits)?;
    writer.write_bits(u64::from(placement.row), layout.row_bits)?;
    writer.write_bits(u64::from(placement.panel), layout.panel_bits)?;

    match &item.body {
        ItemBody::Ear(ear) => {
            writer.write_bits(u64::from(ear.class), layout.ear_class_bits)?;
            writer.write_bits(u64::from(ear.level), layout.ear_level_bits)?;
            write_name(writer, &ear.name, layout.name_char_bits, layout.ear_name_max)?;
            writer.pad_to_byte(&item.padding)
        }
        ItemBody::Simple(simple) => {
            let item_type = catalog_entry(schema, &simple.code)?;
            write_code(writer, layout, &simple.code)?;
            write_quest_difficulty(writer, layout, item_type, simple.quest_difficulty)?;
            writer.write_bits(u64::from(simple.socket_fill), layout.simple_socket_fill_bits)?;
            writer.pad_to_byte(&item.padding)
        }
        ItemBody::Extended(extended) => {
            if !extended.socketed_items.is_empty() && depth >= MAX_SOCKET_DEPTH {
                return Err(Error::InvalidDocument(format!(
                    "socketed items nested deeper than {MAX_SOCKET_DEPTH}"
                )));
            }

            let item_type = catalog_entry(schema, &extended.code)?;
            write_code(writer, layout, &extended.code)?;
            let quest = write_quest_difficulty(writer, layout, item_type, extended.quest_difficulty)?;

            let fill_bits = if quest {
                layout.simple_socket_fill_bits
            } else {
                layout.socket_fill_bits
            };
            let fill = extended.socketed_items.len();
            writer
                .write_bits(fill as u64, fill_bits)
                .map_err(|_| Error::ValueOverflow {
                    value: fill as i128,
                    bits: fill_bits,
                })?;

            write_extended(writer, schema, item_type, extended)?;
            writer.pad_to_byte(&item.padding)?;

            for child in &extended.socketed_items {
                encode_at_depth(child, writer, schema, depth + 1)?;
            }
            Ok(())
        }
    }
}

fn flag_set(item: &Item) -> u16 {
    let mut set = 0u16;
    let mut put = |flag: ItemFlag, on: bool| {
        if on {
            set |= flag.mask();
        }
    };

    put(ItemFlag::Identified, item.identified);
    put(ItemFlag::New, item.new);
    put(ItemFlag::Starter, item.starter);
    put(ItemFlag::Ethereal, item.ethereal);

    match &item.body {
        ItemBody::Ear(_) => put(ItemFlag::Ear, true),
        ItemBody::Simple(_) => put(ItemFlag::Simple, true),
        ItemBody::Extended(extended) => {
            put(ItemFlag::Socketed, extended.sockets.is_some());
            put(ItemFlag::Personalized, extended.personalized_name.is_some());
            put(ItemFlag::Runeword, extended.runeword.is_some());
        }
    }
    set
}

fn write_flags(writer: &mut BitWriter, layout: &ItemLayout, item: &Item) -> Result<()> {
    let set = flag_set(item);

    let reserved_len: usize = layout
        .flags
        .iter()
        .map(|slot| match slot {
            FlagSlot::Reserved(len) => *len as usize,
            FlagSlot::Flag(_) => 0,
        })
        .sum();
    // Captures from another layout do not line up; fall back to zeros
    let zeros;
    let reserved_bits = if item.reserved.len() == reserved_len {
        &item.reserved
    } else {
        zeros = OpaqueBits::zeros(reserved_len);
        &zeros
    };
    let mut reserved = BitReader::new(reserved_bits.as_bytes());

    for slot in &layout.flags {
        match *slot {
            FlagSlot::Flag(flag) => writer.write_bit(set & flag.mask() != 0)?,
            FlagSlot::Reserved(len) => writer.write_opaque(&reserved.read_opaque(len as usize)?)?,
        }
    }
    Ok(())
}

fn catalog_entry<'a>(schema: &'a Schema, code: &str) -> Result<&'a ItemType> {
    schema
        .item_type(code)
        .ok_or_else(|| Error::InvalidDocument(format!("unknown item code {code:?}")))
}

/// Check an optional field against what the catalog says the item carries
fn required<T: Copy>(present: bool, value: Option<T>, field: &str, code: &str) -> Result<Option<T>> {
    if present != value.is_some() {
        let expected = if present { "requires" } else { "does not carry" };
        return Err(Error::InvalidDocument(format!(
            "item {code:?} {expected} {field}"
        )));
    }
    Ok(value)
}

/// Returns whether the difficulty field was written
fn write_quest_difficulty(
    writer: &mut BitWriter,
    layout: &ItemLayout,
    item_type: &ItemType,
    difficulty: Option<u16>,
) -> Result<bool> {
    match layout.quest_difficulty_bits {
        Some(bits) if item_type.quest => match difficulty {
            Some(value) => {
                writer.write_bits(u64::from(value), bits)?;
                Ok(true)
            }
            None => Err(Error::InvalidDocument(
                "quest item requires a difficulty".to_string(),
            )),
        },
        _ if difficulty.is_some() => Err(Error::InvalidDocument(
            "quest difficulty on an item that does not carry one".to_string(),
        )),
        _ => Ok(false),
    }
}

#[allow(clippy::too_many_lines)] // Field order of the extended record
fn write_extended(
    writer: &mut BitWriter,
    schema: &Schema,
    item_type: &ItemType,
    extended: &Extended,
) -> Result<()> {
    let layout = &schema.items;
    let code = extended.code.as_str();

    writer.write_bits(u64::from(extended.id), layout.id_bits)?;
    writer.write_bits(u64::from(extended.level), layout.level_bits)?;
    writer.write_bits(u64::from(extended.quality.tier()), layout.quality_bits)?;

    write_flagged(writer, extended.picture.map(u64::from), layout.picture_bits)?;
    write_flagged(writer, extended.auto_affix.map(u64::from), layout.auto_affix_bits)?;

    let mut set_mask = 0u64;
    match &extended.quality {
        Quality::Low { kind } => writer.write_bits(u64::from(*kind), layout.low_quality_bits)?,
        Quality::Normal => {}
        Quality::Superior { kind } => writer.write_bits(u64::from(*kind), layout.superior_bits)?,
        Quality::Magic { prefix, suffix } => {
            writer.write_bits(u64::from(*prefix), layout.magic_affix_bits)?;
            writer.write_bits(u64::from(*suffix), layout.magic_affix_bits)?;
        }
        Quality::Set { id, bonuses } => {
            writer.write_bits(u64::from(*id), layout.set_id_bits)?;
            let mut last = None;
            for bonus in bonuses {
                if u32::from(bonus.slot) >= layout.set_mask_bits
                    || last.is_some_and(|prev| bonus.slot <= prev)
                {
                    return Err(Error::InvalidDocument(format!(
                        "set bonus slots must be ascending, unique and below {}",
                        layout.set_mask_bits
                    )));
                }
                last = Some(bonus.slot);
                set_mask |= 1 << bonus.slot;
            }
        }
        Quality::Rare(name) | Quality::Crafted(name) => write_rare_name(writer, layout, name)?,
        Quality::Unique { id } => writer.write_bits(u64::from(*id), layout.unique_id_bits)?,
    }

    if let Some(runeword) = &extended.runeword {
        writer.write_bits(u64::from(runeword.id), layout.runeword_bits)?;
        writer.write_bits(u64::from(runeword.marker), layout.runeword_marker_bits)?;
    }

    if let Some(name) = &extended.personalized_name {
        write_name(writer, name, layout.name_char_bits, layout.personal_name_max)?;
    }

    if let Some(tome) = required(item_type.tome, extended.tome, "tome data", code)? {
        writer.write_bits(u64::from(tome), layout.tome_bits)?;
    }

    writer.write_bit(extended.timestamp)?;

    let defense = required(item_type.class.has_defense(), extended.defense, "defense", code)?;
    if let Some(defense) = defense {
        write_biased(writer, defense, layout.defense.bias, layout.defense.bits)?;
    }

    let durability = required(
        item_type.class.has_durability(),
        extended.durability,
        "durability",
        code,
    )?;
    if let Some(durability) = durability {
        let max = layout.max_durability;
        write_biased(writer, durability.max, max.bias, max.bits)?;
        let indestructible = durability.max + max.bias == 0;
        match (indestructible, durability.current) {
            (false, Some(current)) => {
                write_biased(writer, current, layout.durability.bias, layout.durability.bits)?
            }
            (true, None) => {}
            _ => {
                return Err(Error::InvalidDocument(format!(
                    "item {code:?} carries current durability only when max durability is nonzero"
                )))
            }
        }
    }

    if let Some(quantity) = required(item_type.stackable, extended.quantity, "quantity", code)? {
        writer.write_bits(u64::from(quantity), layout.quantity_bits)?;
    }

    if let Some(sockets) = extended.sockets {
        writer.write_bits(u64::from(sockets), layout.socket_count_bits)?;
    }

    if let Quality::Set { .. } = extended.quality {
        writer.write_bits(set_mask, layout.set_mask_bits)?;
    }

    write_properties(writer, schema, &extended.properties)?;

    if let Quality::Set { bonuses, .. } = &extended.quality {
        for bonus in bonuses {
            write_properties(writer, schema, &bonus.properties)?;
        }
    }

    if let Some(runeword) = &extended.runeword {
        write_properties(writer, schema, &runeword.properties)?;
    }

    Ok(())
}

fn write_flagged(writer: &mut BitWriter, value: Option<u64>, bits: u32) -> Result<()> {
    writer.write_bit(value.is_some())?;
    if let Some(value) = value {
        writer.write_bits(value, bits)?;
    }
    Ok(())
}

fn write_rare_name(writer: &mut BitWriter, layout: &ItemLayout, name: &RareName) -> Result<()> {
    if name.affixes.len() != layout.rare_affix_slots {
        return Err(Error::InvalidDocument(format!(
            "rare names carry {} affix slots, got {}",
            layout.rare_affix_slots,
            name.affixes.len()
        )));
    }

    writer.write_bits(u64::from(name.first), layout.rare_name_bits)?;
    writer.write_bits(u64::from(name.second), layout.rare_name_bits)?;
    for affix in &name.affixes {
        write_flagged(writer, affix.map(u64::from), layout.rare_affix_bits)?;
    }
    Ok(())
}

fn write_code(writer: &mut BitWriter, layout: &ItemLayout, code: &str) -> Result<()> {
    let len = code.chars().count();
    if len > layout.code_len {
        return Err(Error::InvalidDocument(format!(
            "item code {code:?} is longer than {} characters",
            layout.code_len
        )));
    }

    let padding = std::iter::repeat(' ').take(layout.code_len - len);
    for symbol in code.chars().chain(padding) {
        match layout.code {
            CodeEncoding::Ascii => {
                let byte = u8::try_from(symbol).map_err(|_| {
                    Error::InvalidDocument(format!("{symbol:?} in item code {code:?}"))
                })?;
                writer.write_bits(u64::from(byte), 8)?;
            }
            CodeEncoding::Huffman => huffman::write_symbol(writer, symbol)?,
        }
    }
    Ok(())
}

/// Up to `max` characters of `bits` each, NUL-terminated when shorter
fn write_name(writer: &mut BitWriter, name: &str, bits: u32, max: usize) -> Result<()> {
    let len = name.chars().count();
    if len > max {
        return Err(Error::InvalidDocument(format!(
            "name {name:?} is longer than {max} characters"
        )));
    }

    for ch in name.chars() {
        let byte = u8::try_from(ch)
            .ok()
            .filter(|b| *b != 0)
            .ok_or_else(|| Error::InvalidDocument(format!("{ch:?} in name {name:?}")))?;
        writer.write_bits(u64::from(byte), bits)?;
    }
    if len < max {
        writer.write_bits(0, bits)?;
    }
    Ok(())
}
