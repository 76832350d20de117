//! Version-keyed constants describing every layout the codec reads and writes
//!
//! A [`Constants`] table is supplied by the caller. It holds the container
//! layouts (built in unless overridden) and one [`Schema`] per item-format
//! revision. Schemas carry the item layout (defaulted from the revision when
//! omitted) plus the base item catalog and stat table, which are always
//! external data.

mod container;
mod field;
mod layout;

pub use container::{
    ContainerLayout, Dialect, PageFraming, ITEM_LIST_MARKER, PAGE_MARKER, PLUGY_ITEM_REVISION,
    PLUGY_PRIVATE_MAGIC, PLUGY_SHARED_MAGIC, RESURRECTED_MAGIC,
};
pub use field::{Condition, FieldDescriptor, FieldKind, FieldRole, FieldValue, FieldValues};
pub use layout::{
    BiasedField, CodeEncoding, FlagSlot, ItemFlag, ItemLayout, LAST_LEGACY_REVISION,
};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemClass {
    Armor,
    Weapon,
    Misc,
}

impl ItemClass {
    pub fn has_defense(self) -> bool {
        self == Self::Armor
    }

    pub fn has_durability(self) -> bool {
        matches!(self, Self::Armor | Self::Weapon)
    }
}

/// Catalog entry for a base item code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemType {
    pub class: ItemClass,
    /// Carries a quantity field
    #[serde(default)]
    pub stackable: bool,
    /// Quest item; carries a difficulty field on D2R
    #[serde(default)]
    pub quest: bool,
    /// Tome; carries an extra 5-bit field
    #[serde(default)]
    pub tome: bool,
}

impl ItemType {
    pub fn new(class: ItemClass) -> Self {
        Self {
            class,
            stackable: false,
            quest: false,
            tome: false,
        }
    }
}

fn one() -> u16 {
    1
}

/// Stat table entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatDef {
    pub name: String,
    /// Save bits of the value
    pub bits: u32,
    /// Stored as `value + bias`
    #[serde(default)]
    pub bias: i64,
    /// Save bits of the parameter; 0 when the stat has none
    #[serde(default)]
    pub param_bits: u32,
    /// Number of consecutive stat ids encoded together (e.g. min/max damage)
    #[serde(default = "one")]
    pub group: u16,
}

impl StatDef {
    pub fn new(name: &str, bits: u32) -> Self {
        Self {
            name: name.to_string(),
            bits,
            bias: 0,
            param_bits: 0,
            group: 1,
        }
    }

    pub fn with_bias(mut self, bias: i64) -> Self {
        self.bias = bias;
        self
    }

    pub fn with_param_bits(mut self, bits: u32) -> Self {
        self.param_bits = bits;
        self
    }

    pub fn with_group(mut self, group: u16) -> Self {
        self.group = group;
        self
    }
}

/// Everything needed to read and write items of one revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SchemaDef")]
pub struct Schema {
    pub revision: u32,
    pub items: ItemLayout,
    pub catalog: BTreeMap<String, ItemType>,
    pub stats: BTreeMap<u16, StatDef>,
}

#[derive(Deserialize)]
struct SchemaDef {
    revision: u32,
    #[serde(default)]
    items: Option<ItemLayout>,
    #[serde(default)]
    catalog: BTreeMap<String, ItemType>,
    #[serde(default)]
    stats: BTreeMap<u16, StatDef>,
}

impl From<SchemaDef> for Schema {
    fn from(def: SchemaDef) -> Self {
        Self {
            revision: def.revision,
            items: def
                .items
                .unwrap_or_else(|| ItemLayout::for_revision(def.revision)),
            catalog: def.catalog,
            stats: def.stats,
        }
    }
}

impl Schema {
    /// Empty schema with the default item layout for `revision`
    pub fn new(revision: u32) -> Self {
        Self {
            revision,
            items: ItemLayout::for_revision(revision),
            catalog: BTreeMap::new(),
            stats: BTreeMap::new(),
        }
    }

    pub fn with_item(mut self, code: &str, item_type: ItemType) -> Self {
        self.catalog.insert(code.to_string(), item_type);
        self
    }

    pub fn with_stat(mut self, id: u16, stat: StatDef) -> Self {
        self.stats.insert(id, stat);
        self
    }

    /// Catalog lookup; trailing padding in the code is ignored
    pub fn item_type(&self, code: &str) -> Option<&ItemType> {
        self.catalog
            .get(code.trim_end_matches([' ', '\0']))
    }

    pub fn stat(&self, id: u16) -> Option<&StatDef> {
        self.stats.get(&id)
    }

    pub fn stat_name(&self, id: u16) -> Option<&str> {
        self.stat(id).map(|s| s.name.as_str())
    }
}

/// The caller-supplied constants table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constants {
    /// Container layouts in detection priority order
    #[serde(default = "ContainerLayout::builtin")]
    pub containers: Vec<ContainerLayout>,
    #[serde(default)]
    pub schemas: Vec<Schema>,
}

impl Default for Constants {
    fn default() -> Self {
        Self::new()
    }
}

impl Constants {
    /// Built-in container layouts and no schemas
    pub fn new() -> Self {
        Self {
            containers: ContainerLayout::builtin(),
            schemas: Vec::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.insert(schema);
        self
    }

    /// Add a schema, replacing any with the same revision
    pub fn insert(&mut self, schema: Schema) {
        match self
            .schemas
            .iter_mut()
            .find(|s| s.revision == schema.revision)
        {
            Some(existing) => *existing = schema,
            None => self.schemas.push(schema),
        }
    }

    pub fn find_schema(&self, revision: u32) -> Option<&Schema> {
        self.schemas.iter().find(|s| s.revision == revision)
    }

    pub fn schema(&self, revision: u32) -> Result<&Schema> {
        self.find_schema(revision)
            .ok_or(Error::UnknownVersion(revision))
    }

    pub fn container(&self, dialect: Dialect) -> Option<&ContainerLayout> {
        self.containers.iter().find(|c| c.dialect == dialect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_defaults_from_revision() {
        let constants = Constants::from_json(
            r#"{
                "schemas": [
                    { "revision": 96, "catalog": { "hp1": { "class": "misc" } } },
                    { "revision": 98, "stats": { "0": { "name": "strength", "bits": 8, "bias": 32 } } }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(constants.containers, ContainerLayout::builtin());
        assert_eq!(constants.schema(0x60).unwrap().items, ItemLayout::legacy());
        assert_eq!(
            constants.schema(0x62).unwrap().items,
            ItemLayout::resurrected()
        );

        let legacy = constants.schema(0x60).unwrap();
        assert_eq!(legacy.item_type("hp1 ").unwrap().class, ItemClass::Misc);

        let stat = constants.schema(0x62).unwrap().stat(0).unwrap();
        assert_eq!(stat.bias, 32);
        assert_eq!(stat.group, 1);
        assert_eq!(stat.param_bits, 0);
    }

    #[test]
    fn test_from_yaml() {
        let constants = Constants::from_yaml(
            "schemas:\n  - revision: 99\n    catalog:\n      cap:\n        class: armor\n",
        )
        .unwrap();
        let schema = constants.schema(0x63).unwrap();
        assert!(schema.item_type("cap").unwrap().class.has_defense());
    }

    #[test]
    fn test_unknown_version() {
        let constants = Constants::new();
        assert!(matches!(
            constants.schema(0x62),
            Err(Error::UnknownVersion(0x62))
        ));
    }

    #[test]
    fn test_insert_replaces_revision() {
        let mut constants = Constants::new().with_schema(Schema::new(0x62));
        constants.insert(Schema::new(0x62).with_stat(0, StatDef::new("strength", 8)));
        assert_eq!(constants.schemas.len(), 1);
        assert_eq!(constants.schema(0x62).unwrap().stat_name(0), Some("strength"));
    }

    #[test]
    fn test_schema_serde_roundtrip() {
        let schema = Schema::new(0x60)
            .with_item("tbk", ItemType {
                stackable: true,
                tome: true,
                ..ItemType::new(ItemClass::Misc)
            })
            .with_stat(17, StatDef::new("item_maxdamage_percent", 9).with_group(2));
        let json = serde_json::to_string(&schema).unwrap();
        let back: Schema = serde_json::from_str(&json).unwrap();
        assert_eq!(back, schema);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            Constants::from_json("{ not json"),
            Err(Error::Json(_))
        ));
    }
}
