//! Container detection and schema selection

use tracing::debug;

use crate::bits::BitReader;
use crate::schema::{Constants, ContainerLayout, FieldRole, FieldValue, Schema};
use crate::stash::{header, Stash};
use crate::{Error, Result};

/// The layout pair a buffer is read with
#[derive(Debug, Clone, Copy)]
pub struct Resolved<'a> {
    pub container: &'a ContainerLayout,
    pub schema: &'a Schema,
}

/// First container layout whose magic opens `buffer`, in priority order
pub fn detect_container<'a>(buffer: &[u8], constants: &'a Constants) -> Result<&'a ContainerLayout> {
    constants
        .containers
        .iter()
        .find(|c| c.matches(buffer))
        .ok_or_else(|| {
            let head = &buffer[..buffer.len().min(4)];
            Error::UnrecognizedFormat(format!("no container magic matches {head:02x?}"))
        })
}

/// Pick the container layout and item schema for `buffer`.
///
/// A `declared` revision must exist in the table (`UnknownVersion`); a
/// detected one that has no schema is reported as `UnrecognizedFormat`.
pub fn resolve_version<'a>(
    buffer: &[u8],
    constants: &'a Constants,
    declared: Option<u32>,
) -> Result<Resolved<'a>> {
    let container = detect_container(buffer, constants)?;

    let schema = match declared {
        Some(revision) => constants.schema(revision)?,
        None => {
            let revision = detect_revision(buffer, container)?;
            constants.find_schema(revision).ok_or_else(|| {
                Error::UnrecognizedFormat(format!(
                    "{:?} revision 0x{revision:02x} has no schema",
                    container.dialect
                ))
            })?
        }
    };

    debug!(
        dialect = ?container.dialect,
        revision = schema.revision,
        declared = declared.is_some(),
        "resolved stash version"
    );

    Ok(Resolved { container, schema })
}

fn detect_revision(buffer: &[u8], container: &ContainerLayout) -> Result<u32> {
    if let Some(revision) = container.item_revision {
        return Ok(revision);
    }

    let mut reader = BitReader::new(buffer);
    let values = header::decode_fields(&mut reader, &container.header)?;
    container
        .header
        .iter()
        .find(|f| f.role == FieldRole::Version)
        .and_then(|f| values.get(&f.name))
        .and_then(revision_from_value)
        .ok_or_else(|| {
            Error::UnrecognizedFormat(format!(
                "{:?} header carries no numeric revision",
                container.dialect
            ))
        })
}

fn revision_from_value(value: &FieldValue) -> Option<u32> {
    match value {
        FieldValue::UInt(v) => u32::try_from(*v).ok(),
        FieldValue::Text(s) => s.parse().ok(),
        FieldValue::Bytes(_) => None,
    }
}

/// Revision a document is written with when the caller does not pin one
pub(crate) fn document_revision(stash: &Stash, container: &ContainerLayout) -> Result<u32> {
    if let Some(revision) = container.item_revision {
        return Ok(revision);
    }
    stash.version.parse().map_err(|_| {
        Error::InvalidDocument(format!(
            "version {:?} is not a revision number",
            stash.version
        ))
    })
}
