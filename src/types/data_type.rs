//! # Field Types and Type Tags
//!
//! `FieldType` is the single-byte type tag written in front of every value
//! whose type is not already fixed by the schema. The discriminants are part
//! of the persisted format: a new variant gets a new ordinal, an existing
//! ordinal is never reused.
//!
//! ## Tag Table
//!
//! | Tag | Type | Payload |
//! |-----|------|---------|
//! | 0 | Boolean | 1 byte |
//! | 1 | Integer | 4 bytes BE |
//! | 2 | Short | 2 bytes BE |
//! | 3 | Long | 8 bytes BE |
//! | 4 | Float | 4 bytes BE (IEEE-754) |
//! | 5 | Double | 8 bytes BE (IEEE-754) |
//! | 6 | DateTime | varint millis |
//! | 7 | String | varint length + UTF-8 |
//! | 8 | Binary | varint length + bytes |
//! | 9 | Embedded | nested record body |
//! | 10 | EmbeddedList | count + (tag, payload)* |
//! | 11 | EmbeddedSet | count + (tag, payload)* |
//! | 12 | EmbeddedMap | count + (key, tag, payload)* |
//! | 13 | Link | varint cluster + varint position |
//! | 14 | LinkList | count + RID* |
//! | 15 | LinkSet | count + RID* |
//! | 16 | LinkMap | count + (key, RID)* |
//! | 17 | Byte | 1 byte |
//! | 18 | *reserved* | never written |
//! | 19 | Date | varint days |
//! | 20 | Custom | type name + varint length + bytes |
//! | 21 | Decimal | varint scale + varint length + BE bytes |
//! | 22 | LinkBag | mode byte + count + sorted RID* |
//! | 23 | Any | schema-only: declares a slot of unfixed type |
//! | 255 | Null | no payload |
//!
//! ## Binary Comparability
//!
//! Index structures compare encoded values without decoding them. Only the
//! scalar types whose encoding the comparator understands qualify; embedded
//! records and every collection type are compared structurally by the
//! document layer instead.

use eyre::bail;

use crate::error::CodecError;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldType {
    Boolean = 0,
    Integer = 1,
    Short = 2,
    Long = 3,
    Float = 4,
    Double = 5,
    DateTime = 6,
    String = 7,
    Binary = 8,
    Embedded = 9,
    EmbeddedList = 10,
    EmbeddedSet = 11,
    EmbeddedMap = 12,
    Link = 13,
    LinkList = 14,
    LinkSet = 15,
    LinkMap = 16,
    Byte = 17,
    Date = 19,
    Custom = 20,
    Decimal = 21,
    LinkBag = 22,
    Any = 23,
    Null = 0xFF,
}

impl FieldType {
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Decodes a type tag read from a buffer.
    pub fn from_tag(tag: u8) -> eyre::Result<Self> {
        Self::try_from(tag)
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            FieldType::Byte
                | FieldType::Short
                | FieldType::Integer
                | FieldType::Long
                | FieldType::Float
                | FieldType::Double
                | FieldType::Decimal
        )
    }

    pub fn is_temporal(self) -> bool {
        matches!(self, FieldType::Date | FieldType::DateTime)
    }

    /// True for types whose encoded form the binary comparator can order.
    pub fn is_binary_comparable(self) -> bool {
        self.is_numeric()
            || self.is_temporal()
            || matches!(
                self,
                FieldType::Boolean | FieldType::String | FieldType::Binary | FieldType::Link
            )
    }

    /// True for collections of record identities.
    pub fn is_link_collection(self) -> bool {
        matches!(
            self,
            FieldType::LinkList | FieldType::LinkSet | FieldType::LinkMap | FieldType::LinkBag
        )
    }

    pub fn is_embedded_collection(self) -> bool {
        matches!(
            self,
            FieldType::EmbeddedList | FieldType::EmbeddedSet | FieldType::EmbeddedMap
        )
    }

    pub fn is_container(self) -> bool {
        self == FieldType::Embedded || self.is_embedded_collection() || self.is_link_collection()
    }

    /// Returns the fixed payload size for this type, or None for
    /// variable-length payloads.
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            FieldType::Boolean | FieldType::Byte => Some(1),
            FieldType::Short => Some(2),
            FieldType::Integer | FieldType::Float => Some(4),
            FieldType::Long | FieldType::Double => Some(8),
            FieldType::Null => Some(0),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FieldType::Boolean => "BOOLEAN",
            FieldType::Integer => "INTEGER",
            FieldType::Short => "SHORT",
            FieldType::Long => "LONG",
            FieldType::Float => "FLOAT",
            FieldType::Double => "DOUBLE",
            FieldType::DateTime => "DATETIME",
            FieldType::String => "STRING",
            FieldType::Binary => "BINARY",
            FieldType::Embedded => "EMBEDDED",
            FieldType::EmbeddedList => "EMBEDDEDLIST",
            FieldType::EmbeddedSet => "EMBEDDEDSET",
            FieldType::EmbeddedMap => "EMBEDDEDMAP",
            FieldType::Link => "LINK",
            FieldType::LinkList => "LINKLIST",
            FieldType::LinkSet => "LINKSET",
            FieldType::LinkMap => "LINKMAP",
            FieldType::Byte => "BYTE",
            FieldType::Date => "DATE",
            FieldType::Custom => "CUSTOM",
            FieldType::Decimal => "DECIMAL",
            FieldType::LinkBag => "LINKBAG",
            FieldType::Any => "ANY",
            FieldType::Null => "NULL",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for FieldType {
    type Error = eyre::Report;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FieldType::Boolean),
            1 => Ok(FieldType::Integer),
            2 => Ok(FieldType::Short),
            3 => Ok(FieldType::Long),
            4 => Ok(FieldType::Float),
            5 => Ok(FieldType::Double),
            6 => Ok(FieldType::DateTime),
            7 => Ok(FieldType::String),
            8 => Ok(FieldType::Binary),
            9 => Ok(FieldType::Embedded),
            10 => Ok(FieldType::EmbeddedList),
            11 => Ok(FieldType::EmbeddedSet),
            12 => Ok(FieldType::EmbeddedMap),
            13 => Ok(FieldType::Link),
            14 => Ok(FieldType::LinkList),
            15 => Ok(FieldType::LinkSet),
            16 => Ok(FieldType::LinkMap),
            17 => Ok(FieldType::Byte),
            19 => Ok(FieldType::Date),
            20 => Ok(FieldType::Custom),
            21 => Ok(FieldType::Decimal),
            22 => Ok(FieldType::LinkBag),
            23 => Ok(FieldType::Any),
            0xFF => Ok(FieldType::Null),
            _ => bail!(CodecError::unsupported(format!("unknown type tag: {}", value))),
        }
    }
}
