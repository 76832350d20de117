//! Shared fixtures: a small constants table and synthetic stash documents
#![allow(dead_code)]

use d2stash::{
    Constants, Dialect, Durability, Ear, Extended, Item, ItemBody, ItemClass, ItemLayout,
    ItemType, OpaqueBits, Page, Placement, Property, Quality, RareName, Runeword, Schema,
    SetBonus, Simple, Stash, StatDef, StatValue,
};

pub const LEGACY: u32 = 0x60;
pub const RESURRECTED_98: u32 = 0x62;
pub const RESURRECTED_99: u32 = 0x63;
/// Custom revision: D2R records with 7-bit names
pub const CUSTOM: u32 = 0x99;

pub fn schema(revision: u32) -> Schema {
    let misc = ItemType::new(ItemClass::Misc);
    Schema::new(revision)
        .with_item("hp1", misc)
        .with_item("r01", misc)
        .with_item("r08", misc)
        .with_item("jew", misc)
        .with_item("cap", ItemType::new(ItemClass::Armor))
        .with_item("ssd", ItemType::new(ItemClass::Weapon))
        .with_item(
            "tbk",
            ItemType {
                stackable: true,
                tome: true,
                ..misc
            },
        )
        .with_item(
            "aqv",
            ItemType {
                stackable: true,
                ..misc
            },
        )
        .with_item(
            "bks",
            ItemType {
                quest: true,
                ..misc
            },
        )
        .with_stat(0, StatDef::new("strength", 8).with_bias(32))
        .with_stat(7, StatDef::new("maxhp", 9).with_bias(32))
        .with_stat(17, StatDef::new("item_maxdamage_percent", 9).with_group(2))
        .with_stat(18, StatDef::new("item_mindamage_percent", 9))
        .with_stat(107, StatDef::new("item_singleskill", 3).with_param_bits(9))
        .with_stat(204, StatDef::new("item_charged_skill", 16).with_param_bits(16))
}

pub fn constants() -> Constants {
    let mut custom = schema(CUSTOM);
    custom.items = ItemLayout {
        name_char_bits: 7,
        ..ItemLayout::resurrected()
    };

    Constants::new()
        .with_schema(schema(LEGACY))
        .with_schema(schema(RESURRECTED_98))
        .with_schema(schema(RESURRECTED_99))
        .with_schema(custom)
}

fn is_legacy(revision: u32) -> bool {
    revision <= LEGACY
}

fn base(revision: u32, column: u8, row: u8, body: ItemBody) -> Item {
    let mut reserved = vec![0u8; 3];
    // A stray bit in the first reserved run, as real files sometimes have
    reserved[0] = 0b0100;
    Item {
        identified: true,
        new: false,
        starter: false,
        ethereal: false,
        reserved: OpaqueBits::new(23, reserved),
        version: if is_legacy(revision) { 101 } else { 5 },
        placement: Placement {
            location: 0,
            equipped: 0,
            column,
            row,
            panel: 5,
        },
        body,
        padding: OpaqueBits::default(),
    }
}

pub fn simple(revision: u32, code: &str, column: u8, row: u8) -> Item {
    base(
        revision,
        column,
        row,
        ItemBody::Simple(Simple {
            code: code.to_string(),
            quest_difficulty: None,
            socket_fill: 0,
        }),
    )
}

pub fn quest_book(revision: u32) -> Item {
    base(
        revision,
        9,
        0,
        ItemBody::Simple(Simple {
            code: "bks".to_string(),
            quest_difficulty: (!is_legacy(revision)).then_some(1),
            socket_fill: 0,
        }),
    )
}

pub fn ear() -> Item {
    base(
        LEGACY,
        8,
        8,
        ItemBody::Ear(Ear {
            class: 3,
            level: 99,
            name: "Tyrael".to_string(),
        }),
    )
}

fn extended(code: &str, quality: Quality) -> Extended {
    Extended {
        code: code.to_string(),
        quest_difficulty: None,
        id: 0x1234_5678,
        level: 85,
        picture: None,
        auto_affix: None,
        quality,
        runeword: None,
        personalized_name: None,
        tome: None,
        timestamp: false,
        defense: None,
        durability: None,
        quantity: None,
        sockets: None,
        properties: Vec::new(),
        socketed_items: Vec::new(),
    }
}

fn stat(id: u16, value: i64) -> Property {
    Property {
        id,
        values: vec![StatValue::new(value)],
    }
}

pub fn magic_cap(revision: u32) -> Item {
    let mut cap = extended(
        "cap",
        Quality::Magic {
            prefix: 319,
            suffix: 703,
        },
    );
    cap.defense = Some(8);
    cap.durability = Some(Durability {
        max: 12,
        current: Some(11),
    });
    cap.sockets = Some(1);
    cap.properties = vec![stat(0, 12), stat(7, -10)];
    cap.socketed_items = vec![simple(revision, "jew", 0, 0)];
    base(revision, 0, 0, ItemBody::Extended(Box::new(cap)))
}

pub fn set_cap(revision: u32) -> Item {
    let mut cap = extended(
        "cap",
        Quality::Set {
            id: 27,
            bonuses: vec![
                SetBonus {
                    slot: 0,
                    properties: vec![stat(0, 5)],
                },
                SetBonus {
                    slot: 3,
                    properties: vec![stat(7, 40)],
                },
            ],
        },
    );
    cap.defense = Some(20);
    cap.durability = Some(Durability {
        max: 0,
        current: None,
    });
    cap.picture = Some(2);
    base(revision, 2, 0, ItemBody::Extended(Box::new(cap)))
}

pub fn rare_cap(revision: u32) -> Item {
    let mut cap = extended(
        "cap",
        Quality::Rare(RareName {
            first: 140,
            second: 18,
            affixes: vec![Some(410), None, Some(702), Some(12), None, None],
        }),
    );
    cap.defense = Some(5);
    cap.durability = Some(Durability {
        max: 12,
        current: Some(12),
    });
    cap.personalized_name = Some("Cain".to_string());
    cap.properties = vec![Property {
        id: 107,
        values: vec![StatValue::with_param(54, 3)],
    }];
    base(revision, 4, 0, ItemBody::Extended(Box::new(cap)))
}

/// Runeword short sword with two socketed runes
pub fn runeword_sword(revision: u32) -> Item {
    let mut sword = extended("ssd", Quality::Normal);
    sword.durability = Some(Durability {
        max: 24,
        current: Some(20),
    });
    sword.sockets = Some(2);
    sword.runeword = Some(Runeword {
        id: 27,
        marker: 5,
        properties: vec![Property {
            id: 17,
            values: vec![StatValue::new(150), StatValue::new(150)],
        }],
    });
    sword.properties = vec![Property {
        id: 204,
        values: vec![StatValue::with_param(0x0c36, 0x1414)],
    }];
    sword.socketed_items = vec![
        simple(revision, "r01", 0, 0),
        simple(revision, "r08", 1, 0),
    ];
    base(revision, 6, 0, ItemBody::Extended(Box::new(sword)))
}

pub fn tome(revision: u32) -> Item {
    let mut tome = extended("tbk", Quality::Low { kind: 0 });
    tome.tome = Some(0);
    tome.quantity = Some(20);
    tome.timestamp = true;
    base(revision, 8, 0, ItemBody::Extended(Box::new(tome)))
}

pub fn quiver(revision: u32) -> Item {
    let mut quiver = extended("aqv", Quality::Superior { kind: 1 });
    quiver.quantity = Some(350);
    quiver.auto_affix = Some(1040);
    base(revision, 8, 2, ItemBody::Extended(Box::new(quiver)))
}

pub fn unique_sword(revision: u32) -> Item {
    let mut sword = extended("ssd", Quality::Unique { id: 3 });
    sword.durability = Some(Durability {
        max: 24,
        current: Some(24),
    });
    sword.level = 99;
    base(revision, 0, 4, ItemBody::Extended(Box::new(sword)))
}

/// A page's worth of assorted items; `variant` rotates the mix
pub fn items(revision: u32, variant: usize) -> Vec<Item> {
    let mut items = vec![simple(revision, "hp1", (variant % 10) as u8, 9)];
    match variant % 4 {
        0 => items.extend([magic_cap(revision), tome(revision)]),
        1 => items.extend([set_cap(revision), rare_cap(revision), quest_book(revision)]),
        2 => items.extend([runeword_sword(revision), quiver(revision)]),
        _ => items.push(unique_sword(revision)),
    }
    if is_legacy(revision) && variant % 7 == 0 {
        items.push(ear());
    }
    items
}

/// D2R shared stash: three sections, 2.5M gold, revision 98
pub fn resurrected_stash() -> Stash {
    resurrected_stash_with(RESURRECTED_98)
}

pub fn resurrected_stash_with(revision: u32) -> Stash {
    let mut stash = Stash::new(Dialect::ResurrectedShared, &revision.to_string());
    stash.shared_gold = 2_500_000;
    stash.pages = (0..3).map(|i| Page::new(items(revision, i))).collect();
    stash.page_count = 3;
    stash
}

/// PlugY shared stash: 145 pages, version 02 with gold
pub fn plugy_shared_stash() -> Stash {
    let mut stash = Stash::new(Dialect::PlugyShared, "02");
    stash.shared_gold = 5_912_844;
    stash.pages = (0..145).map(|i| plugy_page(i, i % 5 == 0)).collect();
    stash.page_count = 145;
    stash
}

/// PlugY private stash: 56 pages, no gold
pub fn plugy_private_stash() -> Stash {
    let mut stash = Stash::new(Dialect::PlugyPrivate, "01");
    stash.pages = (0..56).map(|i| plugy_page(i, i % 3 == 1)).collect();
    stash.page_count = 56;
    stash
}

fn plugy_page(index: usize, named: bool) -> Page {
    let mut page = Page::new(if index % 2 == 0 {
        items(LEGACY, index)
    } else {
        Vec::new()
    });
    match index % 3 {
        0 => {}
        1 => page.flags = Some(1),
        _ => page.flags = Some(3),
    }
    if named && page.flags.is_some() {
        page.name = Some(format!("Page {index}"));
    }
    page
}
