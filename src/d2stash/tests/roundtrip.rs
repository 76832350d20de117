mod common;

use anyhow::Result;
use d2stash::{read_stash, write_stash, Dialect, ItemBody, Stash};

use common::{constants, plugy_private_stash, plugy_shared_stash, resurrected_stash};

/// Encode a document, then check read/write reproduces those bytes exactly
fn assert_byte_identity(stash: &Stash) -> Result<(Vec<u8>, Stash)> {
    let constants = constants();
    let bytes = write_stash(stash, &constants, None)?;
    let decoded = read_stash(&bytes, &constants, None)?;
    let rewritten = write_stash(&decoded, &constants, None)?;
    assert_eq!(rewritten, bytes);
    Ok((bytes, decoded))
}

#[test]
fn test_resurrected_roundtrip() -> Result<()> {
    let stash = resurrected_stash();
    let (bytes, decoded) = assert_byte_identity(&stash)?;

    assert_eq!(&bytes[..4], &[0x55, 0xaa, 0x55, 0xaa]);
    assert_eq!(decoded.dialect, Dialect::ResurrectedShared);
    assert_eq!(decoded.version, "98");
    assert_eq!(decoded.shared_gold, 2_500_000);
    assert_eq!(decoded.page_count, 3);
    assert_eq!(decoded.pages.len(), 3);
    for (page, original) in decoded.pages.iter().zip(&stash.pages) {
        let codes: Vec<_> = page.items.iter().map(|i| i.code()).collect();
        let expected: Vec<_> = original.items.iter().map(|i| i.code()).collect();
        assert_eq!(codes, expected);
    }
    Ok(())
}

#[test]
fn test_plugy_shared_roundtrip() -> Result<()> {
    let stash = plugy_shared_stash();
    let (bytes, decoded) = assert_byte_identity(&stash)?;

    assert_eq!(&bytes[..6], b"SSS\x0002");
    assert_eq!(decoded.dialect, Dialect::PlugyShared);
    assert_eq!(decoded.version, "02");
    assert_eq!(decoded.shared_gold, 5_912_844);
    assert_eq!(decoded.page_count, 145);
    assert_eq!(decoded.pages[5].name.as_deref(), Some("Page 5"));
    assert_eq!(decoded.pages[3].flags, None);
    assert_eq!(decoded.pages[4].flags, Some(1));
    assert!(decoded.trailer.is_empty());
    Ok(())
}

#[test]
fn test_plugy_private_roundtrip() -> Result<()> {
    let stash = plugy_private_stash();
    let (bytes, decoded) = assert_byte_identity(&stash)?;

    assert_eq!(&bytes[..6], b"CSTM01");
    assert_eq!(decoded.dialect, Dialect::PlugyPrivate);
    assert_eq!(decoded.version, "01");
    assert_eq!(decoded.shared_gold, 0);
    assert_eq!(decoded.page_count, 56);
    Ok(())
}

#[test]
fn test_plugy_trailer_survives() -> Result<()> {
    let constants = constants();
    let mut stash = plugy_private_stash();
    stash.trailer = b"\x00\x01trailing".to_vec();

    let bytes = write_stash(&stash, &constants, None)?;
    assert!(bytes.ends_with(b"\x00\x01trailing"));
    let decoded = read_stash(&bytes, &constants, None)?;
    assert_eq!(decoded.trailer, stash.trailer);
    assert_eq!(write_stash(&decoded, &constants, None)?, bytes);
    Ok(())
}

#[test]
fn test_stale_page_count_is_recomputed() -> Result<()> {
    let constants = constants();
    let mut stash = plugy_shared_stash();
    stash.page_count = 999;
    stash.pages.truncate(10);

    let decoded = read_stash(&write_stash(&stash, &constants, None)?, &constants, None)?;
    assert_eq!(decoded.page_count, 10);
    assert_eq!(decoded.pages.len(), 10);
    Ok(())
}

#[test]
fn test_edits_survive_roundtrip() -> Result<()> {
    let constants = constants();
    let stash = resurrected_stash();
    let bytes = write_stash(&stash, &constants, None)?;

    let mut edited = read_stash(&bytes, &constants, None)?;
    edited.shared_gold = 1;
    let moved = edited.pages[0].items.remove(0);
    edited.pages[2].items.push(moved);

    let reread = read_stash(&write_stash(&edited, &constants, None)?, &constants, None)?;
    assert_eq!(reread.shared_gold, 1);
    assert_eq!(reread.pages[0].items.len(), stash.pages[0].items.len() - 1);
    assert_eq!(reread.pages[2].items.len(), stash.pages[2].items.len() + 1);
    assert_eq!(reread.pages[2].items.last().and_then(|i| i.code()), Some("hp1"));
    Ok(())
}

#[test]
fn test_socketed_items_are_nested() -> Result<()> {
    let constants = constants();
    let bytes = write_stash(&resurrected_stash(), &constants, None)?;
    let decoded = read_stash(&bytes, &constants, None)?;

    // Page 2 holds the runeword sword; its runes are not page items
    let sword = decoded.pages[2]
        .items
        .iter()
        .find(|i| i.code() == Some("ssd"))
        .expect("runeword sword");
    let runes: Vec<_> = sword.socketed_items().iter().map(|i| i.code()).collect();
    assert_eq!(runes, vec![Some("r01"), Some("r08")]);
    assert_eq!(decoded.pages[2].items.len(), 3);

    let ItemBody::Extended(extended) = &sword.body else {
        panic!("expected an extended item");
    };
    let runeword = extended.runeword.as_ref().expect("runeword");
    assert_eq!(runeword.properties[0].values.len(), 2);
    Ok(())
}

#[test]
fn test_json_document_roundtrip() -> Result<()> {
    let constants = constants();
    let bytes = write_stash(&plugy_shared_stash(), &constants, None)?;
    let stash = read_stash(&bytes, &constants, None)?;

    let json = serde_json::to_string(&stash)?;
    let back: Stash = serde_json::from_str(&json)?;
    assert_eq!(back, stash);
    assert_eq!(write_stash(&back, &constants, None)?, bytes);
    Ok(())
}

#[test]
fn test_section_gold_survives_roundtrip() -> Result<()> {
    let constants = constants();
    let mut bytes = write_stash(&resurrected_stash(), &constants, None)?;

    // Zero the gold of the second section only
    let second = u32::from_le_bytes(bytes[16..20].try_into()?) as usize;
    bytes[second + 12..second + 16].copy_from_slice(&[0; 4]);

    let stash = read_stash(&bytes, &constants, None)?;
    assert_eq!(stash.shared_gold, 2_500_000);
    assert_eq!(stash.pages[0].gold, None);
    assert_eq!(stash.pages[1].gold, Some(0));
    assert_eq!(stash.pages[2].gold, None);
    assert_eq!(write_stash(&stash, &constants, None)?, bytes);
    Ok(())
}

#[test]
fn test_json_document_rejects_short_padding() -> Result<()> {
    let constants = constants();
    let bytes = write_stash(&plugy_shared_stash(), &constants, None)?;
    let stash = read_stash(&bytes, &constants, None)?;

    let mut json = serde_json::to_value(&stash)?;
    json["pages"][0]["items"][0]["padding"] = serde_json::json!({ "len": 7, "bytes": [] });
    assert!(serde_json::from_value::<Stash>(json).is_err());
    Ok(())
}
