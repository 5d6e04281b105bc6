//! # Runtime Value Representation
//!
//! `Value` is the dynamically-typed field value of a record. Each variant
//! carries its own payload and maps to exactly one [`FieldType`] tag, so
//! encode and decode are a single exhaustive match.
//!
//! ## Value Variants
//!
//! | Variant | Rust Type | Notes |
//! |---------|-----------|-------|
//! | Null | - | explicit null, distinct from an absent field |
//! | Boolean | bool | |
//! | Byte / Short / Integer / Long | i8 / i16 / i32 / i64 | width is preserved |
//! | Float / Double | f32 / f64 | |
//! | Decimal | [`Decimal`] | exact |
//! | String | String | UTF-8 |
//! | Binary | Vec<u8> | |
//! | Date | i64 | epoch millis at midnight in the database timezone |
//! | DateTime | i64 | epoch millis |
//! | Link | [`RecordId`] | |
//! | Embedded | Box<[`Record`]> | nested record stored inline |
//! | EmbeddedList / EmbeddedSet | Vec<Value> | mixed element types allowed |
//! | EmbeddedMap | IndexMap<String, Value> | |
//! | LinkList / LinkSet | Vec<Value> | elements must be link-like |
//! | LinkMap | IndexMap<String, Value> | values must be link-like |
//! | LinkBag | [`RidSet`] | |
//! | Custom | [`CustomValue`] | externally registered type |
//!
//! ## Link-Like Elements
//!
//! Link collections hold `Value`s rather than bare RIDs so that a caller can
//! put a loaded record in place of its link, the same way the document layer
//! does. An element is link-like when it is a `Link`, `Null`, or an
//! `Embedded` record that carries a persistent identity. Anything else fails
//! with `TypeMismatch` at encode time.
//!
//! ## Equality
//!
//! Equality is structural with two relaxations that match the collection
//! semantics: sets compare as multisets (element order is irrelevant) and
//! maps compare by key regardless of insertion order. Floats compare by bit
//! pattern so that a decoded NaN equals the encoded one.

use std::sync::Arc;

use eyre::{bail, Result};
use indexmap::IndexMap;

use super::{Decimal, FieldType, RecordId};
use crate::error::CodecError;
use crate::records::{Record, RidSet};
use crate::schema::{CustomSerializable, RecordResolver};

/// An externally registered value type, shared by reference.
pub type CustomValue = Arc<dyn CustomSerializable>;

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
    String(String),
    Binary(Vec<u8>),
    Date(i64),
    DateTime(i64),
    Link(RecordId),
    Embedded(Box<Record>),
    EmbeddedList(Vec<Value>),
    EmbeddedSet(Vec<Value>),
    EmbeddedMap(IndexMap<String, Value>),
    LinkList(Vec<Value>),
    LinkSet(Vec<Value>),
    LinkMap(IndexMap<String, Value>),
    LinkBag(RidSet),
    Custom(CustomValue),
}

impl Value {
    pub fn field_type(&self) -> FieldType {
        match self {
            Value::Null => FieldType::Null,
            Value::Boolean(_) => FieldType::Boolean,
            Value::Byte(_) => FieldType::Byte,
            Value::Short(_) => FieldType::Short,
            Value::Integer(_) => FieldType::Integer,
            Value::Long(_) => FieldType::Long,
            Value::Float(_) => FieldType::Float,
            Value::Double(_) => FieldType::Double,
            Value::Decimal(_) => FieldType::Decimal,
            Value::String(_) => FieldType::String,
            Value::Binary(_) => FieldType::Binary,
            Value::Date(_) => FieldType::Date,
            Value::DateTime(_) => FieldType::DateTime,
            Value::Link(_) => FieldType::Link,
            Value::Embedded(_) => FieldType::Embedded,
            Value::EmbeddedList(_) => FieldType::EmbeddedList,
            Value::EmbeddedSet(_) => FieldType::EmbeddedSet,
            Value::EmbeddedMap(_) => FieldType::EmbeddedMap,
            Value::LinkList(_) => FieldType::LinkList,
            Value::LinkSet(_) => FieldType::LinkSet,
            Value::LinkMap(_) => FieldType::LinkMap,
            Value::LinkBag(_) => FieldType::LinkBag,
            Value::Custom(_) => FieldType::Custom,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns any integer variant widened to i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Byte(v) => Some(i64::from(*v)),
            Value::Short(v) => Some(i64::from(*v)),
            Value::Integer(v) => Some(i64::from(*v)),
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Embedded(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_record_mut(&mut self) -> Option<&mut Record> {
        match self {
            Value::Embedded(record) => Some(record),
            _ => None,
        }
    }

    /// Interprets this value as an element of a link collection.
    ///
    /// Returns `None` for `Null`, the identity for links and identified
    /// records, and `TypeMismatch` for anything else.
    pub fn link_identity(&self) -> Result<Option<RecordId>> {
        match self {
            Value::Null => Ok(None),
            Value::Link(rid) if rid.is_null() => Ok(None),
            Value::Link(rid) => Ok(Some(*rid)),
            Value::Embedded(record) => match record.identity() {
                Some(rid) if rid.is_persistent() => Ok(Some(rid)),
                _ => bail!(CodecError::type_mismatch(
                    "an embedded record without a persistent identity cannot be stored as a link"
                )),
            },
            other => bail!(CodecError::type_mismatch(format!(
                "{} value cannot be stored as a link",
                other.field_type()
            ))),
        }
    }

    /// Loads the record this value refers to.
    ///
    /// Links are resolved through `resolver`; embedded records are returned
    /// as they are; every other value yields `None`.
    pub fn resolve_link(&self, resolver: &dyn RecordResolver) -> Option<Record> {
        match self {
            Value::Link(rid) => resolver.resolve(*rid),
            Value::Embedded(record) => Some(record.as_ref().clone()),
            _ => None,
        }
    }
}

fn multiset_eq(a: &[Value], b: &[Value]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut used = vec![false; b.len()];
    a.iter().all(|x| {
        let found = b
            .iter()
            .enumerate()
            .position(|(i, y)| !used[i] && x == y);
        match found {
            Some(i) => {
                used[i] = true;
                true
            }
            None => false,
        }
    })
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Short(a), Value::Short(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Binary(a), Value::Binary(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Link(a), Value::Link(b)) => a == b,
            (Value::Embedded(a), Value::Embedded(b)) => a == b,
            (Value::EmbeddedList(a), Value::EmbeddedList(b)) => a == b,
            (Value::EmbeddedSet(a), Value::EmbeddedSet(b)) => multiset_eq(a, b),
            (Value::EmbeddedMap(a), Value::EmbeddedMap(b)) => a == b,
            (Value::LinkList(a), Value::LinkList(b)) => a == b,
            (Value::LinkSet(a), Value::LinkSet(b)) => multiset_eq(a, b),
            (Value::LinkMap(a), Value::LinkMap(b)) => a == b,
            (Value::LinkBag(a), Value::LinkBag(b)) => a == b,
            (Value::Custom(a), Value::Custom(b)) => {
                a.type_name() == b.type_name()
                    && matches!((a.to_bytes(), b.to_bytes()), (Ok(x), Ok(y)) if x == y)
            }
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Value::Byte(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Short(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Binary(v)
    }
}

impl From<RecordId> for Value {
    fn from(v: RecordId) -> Self {
        Value::Link(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Embedded(Box::new(v))
    }
}

impl From<RidSet> for Value {
    fn from(v: RidSet) -> Self {
        Value::LinkBag(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_type_follows_variant() {
        assert_eq!(Value::from(20i32).field_type(), FieldType::Integer);
        assert_eq!(Value::from(20i64).field_type(), FieldType::Long);
        assert_eq!(Value::from("x").field_type(), FieldType::String);
        assert_eq!(Value::Null.field_type(), FieldType::Null);
        assert_eq!(
            Value::LinkBag(RidSet::new()).field_type(),
            FieldType::LinkBag
        );
    }

    #[test]
    fn sets_compare_as_multisets() {
        let a = Value::EmbeddedSet(vec![1i32.into(), 2i32.into(), 2i32.into()]);
        let b = Value::EmbeddedSet(vec![2i32.into(), 1i32.into(), 2i32.into()]);
        let c = Value::EmbeddedSet(vec![1i32.into(), 1i32.into(), 2i32.into()]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn lists_are_ordered() {
        let a = Value::EmbeddedList(vec![1i32.into(), 2i32.into()]);
        let b = Value::EmbeddedList(vec![2i32.into(), 1i32.into()]);
        assert_ne!(a, b);
    }

    #[test]
    fn maps_ignore_insertion_order() {
        let mut a = IndexMap::new();
        a.insert("x".to_string(), Value::from(1i32));
        a.insert("y".to_string(), Value::from(2i32));
        let mut b = IndexMap::new();
        b.insert("y".to_string(), Value::from(2i32));
        b.insert("x".to_string(), Value::from(1i32));
        assert_eq!(Value::EmbeddedMap(a), Value::EmbeddedMap(b));
    }

    #[test]
    fn integer_widths_are_distinct() {
        assert_ne!(Value::Integer(20), Value::Long(20));
        assert_ne!(Value::Null, Value::String(String::new()));
    }

    #[test]
    fn link_identity_accepts_link_like_values() {
        let rid = RecordId::new(5, 9);
        assert_eq!(Value::Link(rid).link_identity().unwrap(), Some(rid));
        assert_eq!(Value::Null.link_identity().unwrap(), None);
        assert_eq!(Value::Link(RecordId::NULL).link_identity().unwrap(), None);

        let loaded = Record::new().with_identity(rid);
        assert_eq!(Value::from(loaded).link_identity().unwrap(), Some(rid));
    }

    #[test]
    fn link_identity_rejects_other_values() {
        for bad in [
            Value::from("not a link"),
            Value::from(7i32),
            Value::from(Record::new()),
        ] {
            let err = bad.link_identity().unwrap_err();
            assert!(matches!(
                CodecError::of(&err),
                Some(CodecError::TypeMismatch(_))
            ));
        }
    }

    struct OneRecord(RecordId, Record);

    impl RecordResolver for OneRecord {
        fn resolve(&self, rid: RecordId) -> Option<Record> {
            (rid == self.0).then(|| self.1.clone())
        }
    }

    #[test]
    fn resolve_link_loads_through_resolver() {
        let rid = RecordId::new(1, 1);
        let target = Record::new().with("name", "target");
        let resolver = OneRecord(rid, target.clone());

        assert_eq!(Value::Link(rid).resolve_link(&resolver), Some(target));
        assert_eq!(Value::Link(RecordId::new(1, 2)).resolve_link(&resolver), None);
        assert_eq!(Value::from(3i32).resolve_link(&resolver), None);
    }
}
