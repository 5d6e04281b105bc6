//! # Record
//!
//! A `Record` is an ordered mapping from field name to [`Value`], plus an
//! optional class name and an optional persistent identity. Field order is
//! insertion order and is what encoders write; equality ignores it.
//!
//! The declared type of a field is the type of its value. Schema-full
//! encoders look the class and field name up in a type registry to find a
//! property slot; a record never stores type metadata of its own.

use indexmap::IndexMap;

use crate::types::{FieldType, RecordId, Value};

#[derive(Debug, Clone, Default)]
pub struct Record {
    class_name: Option<String>,
    identity: Option<RecordId>,
    fields: IndexMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_class(class_name: impl Into<String>) -> Self {
        Self {
            class_name: Some(class_name.into()),
            ..Self::default()
        }
    }

    /// Builder-style field setter.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_identity(mut self, rid: RecordId) -> Self {
        self.identity = Some(rid);
        self
    }

    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    pub fn set_class_name(&mut self, class_name: Option<String>) {
        self.class_name = class_name;
    }

    pub fn identity(&self) -> Option<RecordId> {
        self.identity
    }

    pub fn set_identity(&mut self, rid: Option<RecordId>) {
        self.identity = rid;
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields.get_mut(name)
    }

    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.fields.get(name).map(Value::field_type)
    }

    /// Sets a field, keeping its position if it already exists.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    /// Removes a field and closes the gap it leaves in the field order.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn fields_mut(&mut self) -> impl Iterator<Item = (&str, &mut Value)> {
        self.fields.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the entry for `name`, for in-place create-or-update.
    pub fn entry(&mut self, name: impl Into<String>) -> indexmap::map::Entry<'_, String, Value> {
        self.fields.entry(name.into())
    }
}

/// Records are equal when their class and field contents match. Identity
/// is storage metadata and does not take part; field order does not either.
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.class_name == other.class_name && self.fields == other.fields
    }
}
