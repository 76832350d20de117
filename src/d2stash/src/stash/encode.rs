use tracing::debug;

use crate::bits::BitWriter;
use crate::item::{encode_item, Item};
use crate::schema::{ContainerLayout, PageFraming, Schema};
use crate::{Error, Result};

use super::header::{encode_fields, latin1_encode, HeaderInput};
use super::{Page, Stash};

/// Encode a stash document.
///
/// Page and item counts and D2R section sizes come from the document's
/// content, not from `page_count` or any decoded header value.
pub fn encode_stash(stash: &Stash, container: &ContainerLayout, schema: &Schema) -> Result<Vec<u8>> {
    if stash.dialect != container.dialect {
        return Err(Error::InvalidDocument(format!(
            "{:?} document written with the {:?} layout",
            stash.dialect, container.dialect
        )));
    }

    let page_count = u32::try_from(stash.pages.len())
        .map_err(|_| Error::InvalidDocument(format!("{} pages", stash.pages.len())))?;
    let mut writer = BitWriter::new();

    match &container.framing {
        PageFraming::Tabbed { marker } => {
            let input = HeaderInput {
                version: &stash.version,
                revision: schema.revision,
                gold: stash.shared_gold,
                page_count,
                extras: &stash.header,
            };
            encode_fields(&mut writer, &container.header, &input)?;
            for page in &stash.pages {
                write_tab(&mut writer, container, schema, marker, page)?;
            }
            writer.write_bytes(&stash.trailer)?;
        }
        PageFraming::Sectioned => {
            for page in &stash.pages {
                let input = HeaderInput {
                    version: page.version.as_deref().unwrap_or(&stash.version),
                    revision: section_revision(page, schema)?,
                    gold: page.gold.unwrap_or(stash.shared_gold),
                    page_count,
                    extras: &page.header,
                };
                write_section(&mut writer, container, schema, &input, page)?;
            }
        }
    }

    let bytes = writer.into_bytes();
    debug!(
        dialect = ?stash.dialect,
        revision = schema.revision,
        pages = page_count,
        len = bytes.len(),
        "encoded stash"
    );
    Ok(bytes)
}

/// A page's own section version, else the revision being written
fn section_revision(page: &Page, schema: &Schema) -> Result<u32> {
    match &page.version {
        Some(version) => version.parse().map_err(|_| {
            Error::InvalidDocument(format!("section version {version:?} is not a revision number"))
        }),
        None => Ok(schema.revision),
    }
}

fn write_section(
    writer: &mut BitWriter,
    container: &ContainerLayout,
    schema: &Schema,
    input: &HeaderInput<'_>,
    page: &Page,
) -> Result<()> {
    if page.flags.is_some() || page.name.is_some() {
        return Err(Error::InvalidDocument(
            "sectioned pages carry no flags or name".to_string(),
        ));
    }

    let start = writer.tell();
    let slot = encode_fields(writer, &container.header, input)?;
    write_item_list(writer, &container.item_list_marker, schema, &page.items)?;
    writer.write_bytes(&page.trailer)?;

    if let Some((offset, bits)) = slot {
        let end = writer.tell();
        let size = (end - start) / 8;
        writer.seek(offset)?;
        writer.write_bits(size as u64, bits)?;
        writer.seek(end)?;
    }
    Ok(())
}

fn write_tab(
    writer: &mut BitWriter,
    container: &ContainerLayout,
    schema: &Schema,
    marker: &[u8],
    page: &Page,
) -> Result<()> {
    if page.gold.is_some() || page.version.is_some() {
        return Err(Error::InvalidDocument(
            "tabbed pages carry no gold or version of their own".to_string(),
        ));
    }

    let list_marker = container.item_list_marker.as_slice();
    writer.write_bytes(marker)?;

    match (page.flags, &page.name) {
        (None, None) => {}
        (None, Some(name)) => {
            return Err(Error::InvalidDocument(format!(
                "page name {name:?} needs a flags word"
            )))
        }
        (Some(flags), name) => {
            let word = flags.to_le_bytes();
            if word.starts_with(list_marker) {
                return Err(Error::InvalidDocument(format!(
                    "page flags {flags:#010x} would read back as an item list"
                )));
            }
            writer.write_u32(flags)?;

            if let Some(name) = name {
                let bytes = latin1_encode(name)?;
                if bytes.contains(&0) || bytes.starts_with(list_marker) {
                    return Err(Error::InvalidDocument(format!(
                        "page name {name:?} cannot be stored"
                    )));
                }
                writer.write_bytes(&bytes)?;
                writer.write_bytes(&[0])?;
            }
        }
    }

    write_item_list(writer, list_marker, schema, &page.items)
}

fn write_item_list(
    writer: &mut BitWriter,
    marker: &[u8],
    schema: &Schema,
    items: &[Item],
) -> Result<()> {
    let count = u16::try_from(items.len())
        .map_err(|_| Error::InvalidDocument(format!("{} items on one page", items.len())))?;
    writer.write_bytes(marker)?;
    writer.write_u16(count)?;
    for item in items {
        encode_item(item, writer, schema)?;
    }
    Ok(())
}
