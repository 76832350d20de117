//! Stat lists: `(id, [param], value)` entries closed by a terminator id

use crate::bits::{BitReader, BitWriter};
use crate::schema::{BiasedField, Schema};
use crate::{Error, Result};

use super::decode::{read_as, unbias};
use super::{Property, StatValue};

pub(crate) fn read_properties(reader: &mut BitReader<'_>, schema: &Schema) -> Result<Vec<Property>> {
    let layout = &schema.items;
    let mut properties = Vec::new();

    loop {
        let offset = reader.tell();
        let id: u16 = read_as(reader, layout.stat_id_bits)?;
        if id == layout.stat_terminator {
            return Ok(properties);
        }

        let group = schema
            .stat(id)
            .ok_or_else(|| unknown_stat(offset, id))?
            .group
            .max(1);
        let mut values = Vec::with_capacity(usize::from(group));
        for member in 0..group {
            let member_id = id.checked_add(member).ok_or_else(|| unknown_stat(offset, id))?;
            let stat = schema
                .stat(member_id)
                .ok_or_else(|| unknown_stat(offset, member_id))?;
            let param = if stat.param_bits > 0 {
                Some(reader.read_bits(stat.param_bits)?)
            } else {
                None
            };
            let value_offset = reader.tell();
            let raw = reader.read_bits(stat.bits)?;
            values.push(StatValue {
                param,
                value: unbias(raw, BiasedField::new(stat.bits, stat.bias), value_offset)?,
            });
        }

        properties.push(Property { id, values });
    }
}

pub(crate) fn write_properties(
    writer: &mut BitWriter,
    schema: &Schema,
    properties: &[Property],
) -> Result<()> {
    let layout = &schema.items;

    for property in properties {
        let id = property.id;
        if id == layout.stat_terminator {
            return Err(Error::InvalidDocument(format!(
                "stat id {id} is the list terminator"
            )));
        }
        let group = schema
            .stat(id)
            .ok_or_else(|| Error::InvalidDocument(format!("unknown stat id {id}")))?
            .group
            .max(1);
        if property.values.len() != usize::from(group) {
            return Err(Error::InvalidDocument(format!(
                "stat {id} takes {group} values, got {}",
                property.values.len()
            )));
        }

        writer.write_bits(u64::from(id), layout.stat_id_bits)?;
        for (member_id, value) in (id..).zip(&property.values) {
            let stat = schema
                .stat(member_id)
                .ok_or_else(|| Error::InvalidDocument(format!("unknown stat id {member_id}")))?;
            match (stat.param_bits, value.param) {
                (0, None) => {}
                (bits, Some(param)) if bits > 0 => writer.write_bits(param, bits)?,
                _ => {
                    return Err(Error::InvalidDocument(format!(
                        "stat {member_id} parameter does not match its definition"
                    )))
                }
            }
            write_biased(writer, value.value, stat.bias, stat.bits)?;
        }
    }

    writer.write_bits(u64::from(layout.stat_terminator), layout.stat_id_bits)
}

/// Write `value + bias` as an unsigned field
pub(crate) fn write_biased(writer: &mut BitWriter, value: i64, bias: i64, bits: u32) -> Result<()> {
    let raw = value
        .checked_add(bias)
        .filter(|raw| *raw >= 0)
        .ok_or(Error::ValueOverflow {
            value: i128::from(value),
            bits,
        })?;
    writer
        .write_bits(raw as u64, bits)
        .map_err(|_| Error::ValueOverflow {
            value: i128::from(value),
            bits,
        })
}

fn unknown_stat(offset: usize, id: u16) -> Error {
    Error::CorruptItemRecord {
        offset,
        reason: format!("unknown stat id {id}"),
    }
}
