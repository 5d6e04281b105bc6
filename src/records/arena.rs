//! # Record Arena with Dirty Tracking
//!
//! A document with embedded sub-records is a tree. Instead of giving each
//! sub-record an owner pointer and its own dirty flag, `RecordArena` stores
//! every record of the tree in one vector, addresses them by `NodeId`, and
//! keeps:
//!
//! - a parent index per slot (the weak back-reference)
//! - a child table per slot mapping field name to the embedded child
//! - one `RoaringBitmap` of dirty slots for the whole arena
//!
//! ## Dirty Propagation
//!
//! Changing an embedded record changes every record that contains it, so
//! [`RecordArena::mark_dirty`] walks the parent chain and marks each
//! ancestor. After edits, [`RecordArena::dirty_nodes`] lists every record
//! on a changed path and [`RecordArena::is_dirty`] tells whether a subtree
//! was touched at all.
//!
//! ```text
//!   0 (root, dirty)
//!   ├── "address" → 1 (dirty)
//!   │                └── "geo" → 3 (dirty)   <- mark_dirty(3)
//!   └── "owner"   → 2 (clean)
//! ```
//!
//! ## Flattening
//!
//! [`RecordArena::from_record`] moves every embedded field into its own slot
//! and leaves a `Null` placeholder in the parent so the field keeps its
//! position. [`RecordArena::to_record`] reverses this. Embedded records
//! nested inside collections stay inline in their collection value.

use eyre::{eyre, Result};
use roaring::RoaringBitmap;
use smallvec::SmallVec;

use super::Record;
use crate::types::Value;

pub type NodeId = u32;

#[derive(Debug, Clone)]
struct Slot {
    record: Record,
    parent: Option<NodeId>,
    children: SmallVec<[(String, NodeId); 4]>,
}

#[derive(Debug, Clone, Default)]
pub struct RecordArena {
    slots: Vec<Slot>,
    dirty: RoaringBitmap,
}

impl RecordArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flattens `record` and its embedded fields into a new arena. The root
    /// is always node 0.
    pub fn from_record(record: Record) -> Self {
        let mut arena = Self::new();
        arena.push(record, None);
        arena
    }

    /// Adds `record` as a root or as the embedded field `name` of `parent`.
    pub fn insert(&mut self, record: Record, parent: Option<(NodeId, &str)>) -> Result<NodeId> {
        let Some((parent_id, name)) = parent else {
            return Ok(self.push(record, None));
        };
        self.slot(parent_id)?;
        let id = self.push(record, Some(parent_id));
        let slot = &mut self.slots[parent_id as usize];
        slot.record.set(name, Value::Null);
        slot.children.retain(|(child, _)| child != name);
        slot.children.push((name.to_string(), id));
        self.mark_dirty(parent_id)?;
        Ok(id)
    }

    fn push(&mut self, mut record: Record, parent: Option<NodeId>) -> NodeId {
        let id = self.slots.len() as NodeId;
        let embedded: Vec<String> = record
            .fields()
            .filter(|(_, v)| matches!(v, Value::Embedded(_)))
            .map(|(name, _)| name.to_string())
            .collect();

        let mut extracted = Vec::with_capacity(embedded.len());
        for name in embedded {
            if let Some(Value::Embedded(child)) = record.set(name.as_str(), Value::Null) {
                extracted.push((name, *child));
            }
        }

        self.slots.push(Slot {
            record,
            parent,
            children: SmallVec::new(),
        });
        for (name, child) in extracted {
            let child_id = self.push(child, Some(id));
            self.slots[id as usize].children.push((name, child_id));
        }
        id
    }

    fn slot(&self, id: NodeId) -> Result<&Slot> {
        self.slots
            .get(id as usize)
            .ok_or_else(|| eyre!("record arena has no node {}", id))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns the node's own fields; embedded children appear as `Null`.
    pub fn get(&self, id: NodeId) -> Option<&Record> {
        self.slots.get(id as usize).map(|slot| &slot.record)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slots.get(id as usize).and_then(|slot| slot.parent)
    }

    pub fn child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.slots
            .get(id as usize)?
            .children
            .iter()
            .find(|(child, _)| child == name)
            .map(|(_, child_id)| *child_id)
    }

    /// Sets a scalar or collection field and marks the node dirty. Setting an
    /// embedded record detaches the previous child, if any.
    pub fn set_field(&mut self, id: NodeId, name: &str, value: impl Into<Value>) -> Result<()> {
        match value.into() {
            Value::Embedded(child) => {
                self.insert(*child, Some((id, name)))?;
            }
            value => {
                self.slot(id)?;
                let slot = &mut self.slots[id as usize];
                slot.children.retain(|(child, _)| child != name);
                slot.record.set(name, value);
                self.mark_dirty(id)?;
            }
        }
        Ok(())
    }

    pub fn remove_field(&mut self, id: NodeId, name: &str) -> Result<Option<Value>> {
        self.slot(id)?;
        let slot = &mut self.slots[id as usize];
        slot.children.retain(|(child, _)| child != name);
        let removed = slot.record.remove(name);
        if removed.is_some() {
            self.mark_dirty(id)?;
        }
        Ok(removed)
    }

    /// Marks `id` and every ancestor dirty.
    pub fn mark_dirty(&mut self, id: NodeId) -> Result<()> {
        self.slot(id)?;
        let mut current = Some(id);
        while let Some(node) = current {
            if !self.dirty.insert(node) {
                break;
            }
            current = self.slots[node as usize].parent;
        }
        Ok(())
    }

    pub fn is_dirty(&self, id: NodeId) -> bool {
        self.dirty.contains(id)
    }

    pub fn dirty_count(&self) -> u64 {
        self.dirty.len()
    }

    pub fn dirty_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.dirty.iter()
    }

    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
    }

    /// Rebuilds the record tree rooted at `id`.
    pub fn to_record(&self, id: NodeId) -> Result<Record> {
        let slot = self.slot(id)?;
        let mut record = slot.record.clone();
        for (name, child_id) in &slot.children {
            let child = self.to_record(*child_id)?;
            record.set(name.as_str(), child);
        }
        Ok(record)
    }
}
