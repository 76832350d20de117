//! Declarative header field descriptors

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Values decoded so far from one header, keyed by field name
pub type FieldValues = BTreeMap<String, FieldValue>;

/// How a header field is stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// Fixed marker bytes, validated on read and emitted from the schema on write
    Magic { bytes: Vec<u8> },
    /// Unsigned little-endian integer
    UInt { bits: u32 },
    /// Fixed-length text, one byte per character
    Text { len: usize },
    /// Bytes kept verbatim
    Reserved { len: usize },
}

impl FieldKind {
    /// Value written when a document carries nothing for this field
    pub fn default_value(&self) -> FieldValue {
        match self {
            Self::Magic { bytes } => FieldValue::Bytes(bytes.clone()),
            Self::UInt { .. } => FieldValue::UInt(0),
            Self::Text { len } => FieldValue::Text("\0".repeat(*len)),
            Self::Reserved { len } => FieldValue::Bytes(vec![0; *len]),
        }
    }
}

/// What the stash codec does with a field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRole {
    Marker,
    Version,
    Gold,
    PageCount,
    /// Byte length of the enclosing section, recomputed on write
    SectionSize,
    /// No semantic role; carried through the document by name
    #[default]
    Extra,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    UInt(u64),
    Text(String),
    Bytes(Vec<u8>),
}

impl FieldValue {
    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Self::UInt(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Presence predicate over fields already decoded from the same header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Equals { field: String, value: FieldValue },
    NotEquals { field: String, value: FieldValue },
    All(Vec<Condition>),
    Any(Vec<Condition>),
}

impl Condition {
    pub fn equals(field: &str, value: FieldValue) -> Self {
        Self::Equals {
            field: field.to_string(),
            value,
        }
    }

    /// A missing field compares unequal to everything
    pub fn eval(&self, values: &FieldValues) -> bool {
        match self {
            Self::Equals { field, value } => values.get(field) == Some(value),
            Self::NotEquals { field, value } => values.get(field) != Some(value),
            Self::All(all) => all.iter().all(|c| c.eval(values)),
            Self::Any(any) => any.iter().any(|c| c.eval(values)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub role: FieldRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<Condition>,
}

impl FieldDescriptor {
    pub fn new(name: &str, kind: FieldKind, role: FieldRole) -> Self {
        Self {
            name: name.to_string(),
            kind,
            role,
            when: None,
        }
    }

    pub fn magic(name: &str, bytes: &[u8]) -> Self {
        Self::new(
            name,
            FieldKind::Magic {
                bytes: bytes.to_vec(),
            },
            FieldRole::Marker,
        )
    }

    pub fn uint(name: &str, bits: u32, role: FieldRole) -> Self {
        Self::new(name, FieldKind::UInt { bits }, role)
    }

    pub fn text(name: &str, len: usize, role: FieldRole) -> Self {
        Self::new(name, FieldKind::Text { len }, role)
    }

    pub fn reserved(name: &str, len: usize) -> Self {
        Self::new(name, FieldKind::Reserved { len }, FieldRole::Extra)
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.when = Some(condition);
        self
    }

    pub fn is_present(&self, values: &FieldValues) -> bool {
        self.when.as_ref().map_or(true, |c| c.eval(values))
    }
}
