//! # Delta Operations
//!
//! The in-memory shape of a record delta. A [`Delta`] is an ordered list of
//! field-level operations; collection fields carry their own per-kind
//! operation lists so that a one-element change in a large list or map
//! does not ship the whole collection.
//!
//! ```text
//! Delta
//! ├── SetField(name, value)          overwrite or create
//! ├── RemoveField(name)              delete
//! ├── NestedDelta(name, Delta)       recurse into an embedded record
//! └── UpdateCollection(name, CollectionDelta)
//!     ├── EmbeddedList / LinkList    ListOp: Set, Insert, Remove, Nested
//!     ├── EmbeddedSet                SetOp:  Put, Remove
//!     ├── EmbeddedMap / LinkMap      MapOp:  Put, Remove, Nested
//!     └── LinkSet / LinkBag          RidOp:  Add, Remove
//! ```

use crate::records::RidSet;
use crate::types::{FieldType, RecordId, Value};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Delta {
    /// New class name, present only when the class changed. An empty string
    /// clears the class.
    pub class_name: Option<String>,
    pub ops: Vec<DeltaOp>,
}

impl Delta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.class_name.is_none() && self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn push(&mut self, op: DeltaOp) {
        self.ops.push(op);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DeltaOp> {
        self.ops.iter()
    }

    /// Names of the top-level fields this delta touches, in op order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().map(DeltaOp::name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeltaOp {
    SetField { name: String, value: Value },
    RemoveField { name: String },
    NestedDelta { name: String, delta: Delta },
    UpdateCollection { name: String, change: CollectionDelta },
}

impl DeltaOp {
    pub fn name(&self) -> &str {
        match self {
            DeltaOp::SetField { name, .. }
            | DeltaOp::RemoveField { name }
            | DeltaOp::NestedDelta { name, .. }
            | DeltaOp::UpdateCollection { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CollectionDelta {
    EmbeddedList(Vec<ListOp>),
    EmbeddedSet(Vec<SetOp>),
    EmbeddedMap(Vec<MapOp>),
    LinkList(Vec<ListOp>),
    LinkSet(Vec<RidOp>),
    LinkMap(Vec<MapOp>),
    LinkBag(Vec<RidOp>),
}

impl CollectionDelta {
    /// The container type this delta applies to.
    pub fn field_type(&self) -> FieldType {
        match self {
            CollectionDelta::EmbeddedList(_) => FieldType::EmbeddedList,
            CollectionDelta::EmbeddedSet(_) => FieldType::EmbeddedSet,
            CollectionDelta::EmbeddedMap(_) => FieldType::EmbeddedMap,
            CollectionDelta::LinkList(_) => FieldType::LinkList,
            CollectionDelta::LinkSet(_) => FieldType::LinkSet,
            CollectionDelta::LinkMap(_) => FieldType::LinkMap,
            CollectionDelta::LinkBag(_) => FieldType::LinkBag,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            CollectionDelta::EmbeddedList(ops) | CollectionDelta::LinkList(ops) => ops.len(),
            CollectionDelta::EmbeddedSet(ops) => ops.len(),
            CollectionDelta::EmbeddedMap(ops) | CollectionDelta::LinkMap(ops) => ops.len(),
            CollectionDelta::LinkSet(ops) | CollectionDelta::LinkBag(ops) => ops.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// An empty value of the container type, used when the target field is
    /// missing or holds something else.
    pub(crate) fn empty_container(&self) -> Value {
        match self {
            CollectionDelta::EmbeddedList(_) => Value::EmbeddedList(Vec::new()),
            CollectionDelta::EmbeddedSet(_) => Value::EmbeddedSet(Vec::new()),
            CollectionDelta::EmbeddedMap(_) => Value::EmbeddedMap(Default::default()),
            CollectionDelta::LinkList(_) => Value::LinkList(Vec::new()),
            CollectionDelta::LinkSet(_) => Value::LinkSet(Vec::new()),
            CollectionDelta::LinkMap(_) => Value::LinkMap(Default::default()),
            CollectionDelta::LinkBag(_) => Value::LinkBag(RidSet::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListOp {
    /// Overwrites the element at `index`; `index == len` appends.
    Set { index: usize, value: Value },
    /// Appends.
    Insert(Value),
    /// Removes the last occurrence.
    Remove(Value),
    Nested { index: usize, change: NestedChange },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SetOp {
    Put(Value),
    /// Removes one occurrence.
    Remove(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MapOp {
    Put { key: String, value: Value },
    Remove { key: String },
    Nested { key: String, change: NestedChange },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RidOp {
    Add(RecordId),
    Remove(RecordId),
}

/// An in-place change to a value held inside a collection.
#[derive(Debug, Clone, PartialEq)]
pub enum NestedChange {
    Record(Delta),
    Collection(CollectionDelta),
}
