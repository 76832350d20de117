//! Declarative header fields

use crate::bits::{BitReader, BitWriter};
use crate::schema::{FieldDescriptor, FieldKind, FieldRole, FieldValue, FieldValues};
use crate::{Error, Result};

/// Decode every present field of a header, in order.
///
/// A magic field that does not match is a `CorruptPageMarker`.
pub(crate) fn decode_fields(
    reader: &mut BitReader<'_>,
    fields: &[FieldDescriptor],
) -> Result<FieldValues> {
    let mut values = FieldValues::new();

    for field in fields {
        if !field.is_present(&values) {
            continue;
        }

        let value = match &field.kind {
            FieldKind::Magic { bytes } => {
                let offset = reader.byte_offset();
                let found = reader.read_bytes(bytes.len())?;
                if found != bytes.as_slice() {
                    return Err(Error::CorruptPageMarker {
                        offset,
                        expected: bytes.clone(),
                        actual: found.to_vec(),
                    });
                }
                FieldValue::Bytes(bytes.clone())
            }
            FieldKind::UInt { bits } => FieldValue::UInt(reader.read_bits(*bits)?),
            FieldKind::Text { len } => FieldValue::Text(latin1_decode(reader.read_bytes(*len)?)),
            FieldKind::Reserved { len } => FieldValue::Bytes(reader.read_bytes(*len)?.to_vec()),
        };
        values.insert(field.name.clone(), value);
    }

    Ok(values)
}

/// Decoded header split by field role
#[derive(Debug, Default)]
pub(crate) struct HeaderSummary {
    pub version: Option<String>,
    pub gold: Option<u32>,
    pub page_count: Option<u32>,
    pub section_size: Option<u32>,
    pub extras: FieldValues,
}

pub(crate) fn summarize(fields: &[FieldDescriptor], mut values: FieldValues) -> HeaderSummary {
    let mut summary = HeaderSummary::default();

    for field in fields {
        let Some(value) = values.remove(&field.name) else {
            continue;
        };
        let number = value.as_uint().and_then(|v| u32::try_from(v).ok());
        match field.role {
            FieldRole::Marker => {}
            FieldRole::Version => {
                summary.version = match value {
                    FieldValue::UInt(v) => Some(v.to_string()),
                    FieldValue::Text(s) => Some(s),
                    FieldValue::Bytes(_) => None,
                }
            }
            FieldRole::Gold => summary.gold = number,
            FieldRole::PageCount => summary.page_count = number,
            FieldRole::SectionSize => summary.section_size = number,
            FieldRole::Extra => {
                summary.extras.insert(field.name.clone(), value);
            }
        }
    }

    summary
}

/// Values the stash codec supplies for role-bearing fields
pub(crate) struct HeaderInput<'a> {
    pub version: &'a str,
    pub revision: u32,
    pub gold: u32,
    pub page_count: u32,
    pub extras: &'a FieldValues,
}

/// Position and width of the section size field, patched once the section
/// has been written
pub(crate) type SizeSlot = (usize, u32);

pub(crate) fn encode_fields(
    writer: &mut BitWriter,
    fields: &[FieldDescriptor],
    input: &HeaderInput<'_>,
) -> Result<Option<SizeSlot>> {
    let mut written = FieldValues::new();
    let mut slot = None;

    for field in fields {
        let value = field_value(field, input);
        // Conditions see the fields written so far, as on decode
        if !field.is_present(&written) {
            continue;
        }

        match (&field.kind, &value) {
            (FieldKind::Magic { bytes }, _) => writer.write_bytes(bytes)?,
            (FieldKind::UInt { bits }, FieldValue::UInt(v)) => {
                if field.role == FieldRole::SectionSize {
                    slot = Some((writer.tell(), *bits));
                }
                writer.write_bits(*v, *bits)?
            }
            (FieldKind::Text { len }, FieldValue::Text(text)) => {
                let mut bytes = latin1_encode(text)?;
                if bytes.len() > *len {
                    return Err(Error::InvalidDocument(format!(
                        "header field {:?} holds at most {len} characters, got {text:?}",
                        field.name
                    )));
                }
                bytes.resize(*len, 0);
                writer.write_bytes(&bytes)?
            }
            (FieldKind::Reserved { len }, FieldValue::Bytes(bytes)) if bytes.len() == *len => {
                writer.write_bytes(bytes)?
            }
            _ => {
                return Err(Error::InvalidDocument(format!(
                    "header field {:?} cannot hold {value:?}",
                    field.name
                )))
            }
        }
        written.insert(field.name.clone(), value);
    }

    Ok(slot)
}

fn field_value(field: &FieldDescriptor, input: &HeaderInput<'_>) -> FieldValue {
    let number = |v: u32| match field.kind {
        FieldKind::Text { .. } => FieldValue::Text(v.to_string()),
        _ => FieldValue::UInt(u64::from(v)),
    };

    match field.role {
        FieldRole::Marker => field.kind.default_value(),
        FieldRole::Version => match field.kind {
            FieldKind::UInt { .. } => FieldValue::UInt(u64::from(input.revision)),
            _ => FieldValue::Text(input.version.to_string()),
        },
        FieldRole::Gold => number(input.gold),
        FieldRole::PageCount => number(input.page_count),
        FieldRole::SectionSize => FieldValue::UInt(0),
        FieldRole::Extra => input
            .extras
            .get(&field.name)
            .cloned()
            .unwrap_or_else(|| field.kind.default_value()),
    }
}

/// Bytes to text, one character per byte
pub(crate) fn latin1_decode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Inverse of [`latin1_decode`]; characters above U+00FF have no byte
pub(crate) fn latin1_encode(text: &str) -> Result<Vec<u8>> {
    text.chars()
        .map(|ch| {
            u8::try_from(ch)
                .map_err(|_| Error::InvalidDocument(format!("{ch:?} in {text:?} is not a byte")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ContainerLayout;

    fn extras() -> FieldValues {
        FieldValues::new()
    }

    #[test]
    fn test_plugy_gold_follows_version() {
        let layout = ContainerLayout::plugy_shared();
        let encode = |version: &str| {
            let mut writer = BitWriter::new();
            let extras = extras();
            let input = HeaderInput {
                version,
                revision: 0x60,
                gold: 5_912_844,
                page_count: 145,
                extras: &extras,
            };
            encode_fields(&mut writer, &layout.header, &input).unwrap();
            writer.into_bytes()
        };

        let with_gold = encode("02");
        assert_eq!(with_gold.len(), 14);
        assert_eq!(&with_gold[..6], b"SSS\x0002");

        let without_gold = encode("01");
        assert_eq!(without_gold.len(), 10);

        let values = decode_fields(&mut BitReader::new(&with_gold), &layout.header).unwrap();
        let summary = summarize(&layout.header, values);
        assert_eq!(summary.version.as_deref(), Some("02"));
        assert_eq!(summary.gold, Some(5_912_844));
        assert_eq!(summary.page_count, Some(145));
        assert!(summary.extras.is_empty());
    }

    #[test]
    fn test_resurrected_header_slot_and_extras() {
        let layout = ContainerLayout::resurrected_shared();
        let mut extras = extras();
        extras.insert("flags".to_string(), FieldValue::UInt(1));

        let mut writer = BitWriter::new();
        let input = HeaderInput {
            version: "98",
            revision: 0x62,
            gold: 2_500_000,
            page_count: 3,
            extras: &extras,
        };
        let slot = encode_fields(&mut writer, &layout.header, &input).unwrap();
        assert_eq!(slot, Some((128, 32)));

        let bytes = writer.into_bytes();
        assert_eq!(bytes.len(), 64);
        assert_eq!(&bytes[4..12], &[1, 0, 0, 0, 0x62, 0, 0, 0]);

        let values = decode_fields(&mut BitReader::new(&bytes), &layout.header).unwrap();
        let summary = summarize(&layout.header, values);
        assert_eq!(summary.version.as_deref(), Some("98"));
        assert_eq!(summary.gold, Some(2_500_000));
        assert_eq!(summary.section_size, Some(0));
        assert_eq!(summary.extras.get("flags"), Some(&FieldValue::UInt(1)));
        assert_eq!(
            summary.extras.get("reserved"),
            Some(&FieldValue::Bytes(vec![0; 44]))
        );
    }

    #[test]
    fn test_magic_mismatch() {
        let layout = ContainerLayout::plugy_private();
        let err = decode_fields(&mut BitReader::new(b"CSTX01\0\0\0\0\0\0\0\0"), &layout.header)
            .unwrap_err();
        assert!(matches!(err, Error::CorruptPageMarker { offset: 0, .. }));
    }

    #[test]
    fn test_wrong_reserved_length() {
        let layout = ContainerLayout::resurrected_shared();
        let mut extras = extras();
        extras.insert("reserved".to_string(), FieldValue::Bytes(vec![0; 3]));
        let input = HeaderInput {
            version: "98",
            revision: 0x62,
            gold: 0,
            page_count: 1,
            extras: &extras,
        };
        assert!(matches!(
            encode_fields(&mut BitWriter::new(), &layout.header, &input),
            Err(Error::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_latin1_is_lossless() {
        let bytes: Vec<u8> = (1..=255).collect();
        let text = latin1_decode(&bytes);
        assert_eq!(latin1_encode(&text).unwrap(), bytes);
        assert!(latin1_encode("页").is_err());
    }
}
