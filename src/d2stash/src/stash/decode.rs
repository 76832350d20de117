use memchr::memchr;
use tracing::{debug, warn};

use crate::bits::BitReader;
use crate::item::{decode_item, Item};
use crate::schema::{ContainerLayout, PageFraming, Schema};
use crate::{Error, Result};

use super::header::{decode_fields, latin1_decode, summarize};
use super::{Page, Stash};

/// Decode a whole stash buffer with an already resolved layout pair
pub fn decode_stash(buffer: &[u8], container: &ContainerLayout, schema: &Schema) -> Result<Stash> {
    let mut reader = BitReader::new(buffer);

    let stash = match &container.framing {
        PageFraming::Tabbed { marker } => decode_tabbed(&mut reader, container, schema, marker)?,
        PageFraming::Sectioned => decode_sectioned(&mut reader, container, schema)?,
    };

    debug!(
        dialect = ?stash.dialect,
        version = %stash.version,
        pages = stash.pages.len(),
        items = stash.items().count(),
        trailer = stash.trailer.len(),
        "decoded stash"
    );
    Ok(stash)
}

fn decode_tabbed(
    reader: &mut BitReader<'_>,
    container: &ContainerLayout,
    schema: &Schema,
    marker: &[u8],
) -> Result<Stash> {
    let values = decode_fields(reader, &container.header)?;
    let summary = summarize(&container.header, values);

    let mut pages = Vec::new();
    match summary.page_count {
        Some(count) => {
            for _ in 0..count {
                pages.push(read_tab(reader, container, schema, marker)?);
            }
        }
        None => {
            while reader.remaining_bits() > 0 {
                pages.push(read_tab(reader, container, schema, marker)?);
            }
        }
    }

    Ok(Stash {
        dialect: container.dialect,
        version: summary.version.unwrap_or_default(),
        shared_gold: summary.gold.unwrap_or(0),
        page_count: pages.len() as u32,
        header: summary.extras,
        pages,
        trailer: reader.rest()?.to_vec(),
    })
}

fn read_tab(
    reader: &mut BitReader<'_>,
    container: &ContainerLayout,
    schema: &Schema,
    marker: &[u8],
) -> Result<Page> {
    let offset = reader.byte_offset();
    expect_marker(reader, marker)?;

    let list_marker = container.item_list_marker.as_slice();
    let flags = if next_is(reader, list_marker) {
        None
    } else {
        Some(reader.read_u32()?)
    };
    let name = if flags.is_some() && !next_is(reader, list_marker) {
        Some(read_name(reader)?)
    } else {
        None
    };

    let items = read_item_list(reader, list_marker, schema)?;
    debug!(offset, ?flags, ?name, items = items.len(), "decoded page");

    Ok(Page {
        flags,
        name,
        items,
        ..Page::default()
    })
}

fn decode_sectioned(
    reader: &mut BitReader<'_>,
    container: &ContainerLayout,
    schema: &Schema,
) -> Result<Stash> {
    let mut version: Option<String> = None;
    let mut gold: Option<u32> = None;
    let mut pages = Vec::new();

    while reader.remaining_bits() > 0 {
        let start = reader.byte_offset();
        let values = decode_fields(reader, &container.header)?;
        let summary = summarize(&container.header, values);

        // The first section sets the stash-wide values; later ones only
        // record where they differ
        let page_version = if version.is_none() {
            version = summary.version;
            None
        } else {
            summary.version.filter(|v| Some(v) != version.as_ref())
        };
        let page_gold = match gold {
            None => {
                gold = summary.gold;
                None
            }
            Some(first) => summary.gold.filter(|&g| g != first),
        };

        let items = read_item_list(reader, &container.item_list_marker, schema)?;

        let consumed = reader.byte_offset() - start;
        let available = reader.remaining_bits() / 8;
        let mut trailer = Vec::new();
        match summary.section_size.map(|size| size as usize) {
            Some(size) if size > consumed && size - consumed <= available => {
                trailer = reader.read_bytes(size - consumed)?.to_vec();
            }
            Some(size) if size != consumed => {
                warn!(
                    offset = start,
                    declared = size,
                    actual = consumed,
                    "section size disagrees with section contents"
                );
            }
            _ => {}
        }

        debug!(
            offset = start,
            items = items.len(),
            trailer = trailer.len(),
            "decoded section"
        );
        pages.push(Page {
            gold: page_gold,
            version: page_version,
            header: summary.extras,
            items,
            trailer,
            ..Page::default()
        });
    }

    Ok(Stash {
        dialect: container.dialect,
        version: version.unwrap_or_else(|| schema.revision.to_string()),
        shared_gold: gold.unwrap_or(0),
        page_count: pages.len() as u32,
        header: Default::default(),
        pages,
        trailer: Vec::new(),
    })
}

/// Item list marker, u16 count, then the records
fn read_item_list(reader: &mut BitReader<'_>, marker: &[u8], schema: &Schema) -> Result<Vec<Item>> {
    expect_marker(reader, marker)?;
    let count = reader.read_u16()?;
    (0..count).map(|_| decode_item(reader, schema)).collect()
}

fn expect_marker(reader: &mut BitReader<'_>, marker: &[u8]) -> Result<()> {
    let offset = reader.byte_offset();
    let found = reader.read_bytes(marker.len())?;
    if found != marker {
        return Err(Error::CorruptPageMarker {
            offset,
            expected: marker.to_vec(),
            actual: found.to_vec(),
        });
    }
    Ok(())
}

fn next_is(reader: &BitReader<'_>, marker: &[u8]) -> bool {
    reader
        .peek_bytes(marker.len())
        .is_ok_and(|next| next == marker)
}

/// NUL-terminated page name
fn read_name(reader: &mut BitReader<'_>) -> Result<String> {
    let rest = reader.rest()?;
    let len = memchr(0, rest).ok_or(Error::OutOfBounds {
        offset: reader.tell(),
        requested: (rest.len() + 1) * 8,
        available: rest.len() * 8,
    })?;
    let name = latin1_decode(reader.read_bytes(len)?);
    reader.read_bytes(1)?;
    Ok(name)
}
