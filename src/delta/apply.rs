//! # Delta Application
//!
//! Replays a [`Delta`] onto a copy of the original snapshot. Operations run
//! in order and last write wins: there is no check that the record still
//! holds the values the delta was computed against.
//!
//! Missing targets are created. A `NestedDelta` on an absent field starts
//! from an empty record, and a collection change on an absent field starts
//! from an empty container of the delta's kind. When the field exists but
//! holds a different kind of value, it is replaced by that empty value and
//! a warning is logged.

use eyre::{bail, Result};
use indexmap::IndexMap;
use tracing::{debug, warn};

use super::ops::{CollectionDelta, Delta, DeltaOp, ListOp, MapOp, NestedChange, RidOp, SetOp};
use crate::error::CodecError;
use crate::records::{Record, RidSet};
use crate::serializer::CodecContext;
use crate::types::{FieldType, Value};

/// Applies `delta` to a clone of `original`.
pub fn apply_delta(original: &Record, delta: &Delta, ctx: &CodecContext) -> Result<Record> {
    let mut record = original.clone();
    Applier { ctx }.apply_record(&mut record, delta, 0)?;
    debug!(ops = delta.len(), "applied record delta");
    Ok(record)
}

struct Applier<'c> {
    ctx: &'c CodecContext,
}

impl Applier<'_> {
    fn descend(&self, depth: usize) -> Result<usize> {
        let limit = self.ctx.config().max_nesting_depth();
        if depth >= limit {
            bail!(CodecError::corrupt(format!(
                "delta nests deeper than {} levels",
                limit
            )));
        }
        Ok(depth + 1)
    }

    fn apply_record(&self, record: &mut Record, delta: &Delta, depth: usize) -> Result<()> {
        let depth = self.descend(depth)?;
        if let Some(class) = &delta.class_name {
            record.set_class_name((!class.is_empty()).then(|| class.clone()));
        }
        for op in &delta.ops {
            match op {
                DeltaOp::SetField { name, value } => {
                    record.set(name.as_str(), value.clone());
                }
                DeltaOp::RemoveField { name } => {
                    record.remove(name);
                }
                DeltaOp::NestedDelta { name, delta } => {
                    let slot = record.entry(name.as_str()).or_insert(Value::Null);
                    self.apply_nested_record(name, slot, delta, depth)?;
                }
                DeltaOp::UpdateCollection { name, change } => {
                    let slot = record.entry(name.as_str()).or_insert(Value::Null);
                    self.apply_collection(name, slot, change, depth)?;
                }
            }
        }
        Ok(())
    }

    fn apply_nested(
        &self,
        at: &str,
        slot: &mut Value,
        change: &NestedChange,
        depth: usize,
    ) -> Result<()> {
        match change {
            NestedChange::Record(delta) => self.apply_nested_record(at, slot, delta, depth),
            NestedChange::Collection(change) => self.apply_collection(at, slot, change, depth),
        }
    }

    fn apply_nested_record(
        &self,
        at: &str,
        slot: &mut Value,
        delta: &Delta,
        depth: usize,
    ) -> Result<()> {
        match slot {
            Value::Embedded(record) => self.apply_record(record, delta, depth),
            other => {
                replace_slot(at, other, FieldType::Embedded, Value::Embedded(Box::default()));
                self.apply_nested_record(at, other, delta, depth)
            }
        }
    }

    fn apply_collection(
        &self,
        at: &str,
        slot: &mut Value,
        change: &CollectionDelta,
        depth: usize,
    ) -> Result<()> {
        match (slot, change) {
            (Value::EmbeddedList(items), CollectionDelta::EmbeddedList(ops)) => {
                self.apply_list(at, items, ops, same_value, depth)
            }
            (Value::LinkList(items), CollectionDelta::LinkList(ops)) => {
                self.apply_list(at, items, ops, same_link, depth)
            }
            (Value::EmbeddedSet(items), CollectionDelta::EmbeddedSet(ops)) => {
                apply_set(at, items, ops);
                Ok(())
            }
            (Value::EmbeddedMap(entries), CollectionDelta::EmbeddedMap(ops))
            | (Value::LinkMap(entries), CollectionDelta::LinkMap(ops)) => {
                self.apply_map(entries, ops, depth)
            }
            (Value::LinkSet(items), CollectionDelta::LinkSet(ops)) => {
                apply_link_set(items, ops);
                Ok(())
            }
            (Value::LinkBag(rids), CollectionDelta::LinkBag(ops)) => {
                apply_rids(rids, ops);
                Ok(())
            }
            (other, change) => {
                replace_slot(at, other, change.field_type(), change.empty_container());
                self.apply_collection(at, other, change, depth)
            }
        }
    }

    fn apply_list(
        &self,
        at: &str,
        items: &mut Vec<Value>,
        ops: &[ListOp],
        same: fn(&Value, &Value) -> bool,
        depth: usize,
    ) -> Result<()> {
        for op in ops {
            match op {
                ListOp::Set { index, value } => {
                    if *index < items.len() {
                        items[*index] = value.clone();
                    } else if *index == items.len() {
                        items.push(value.clone());
                    } else {
                        bail!(CodecError::corrupt(format!(
                            "list index {} out of bounds for '{}' (len {})",
                            index,
                            at,
                            items.len()
                        )));
                    }
                }
                ListOp::Insert(value) => items.push(value.clone()),
                ListOp::Remove(value) => {
                    match items.iter().rposition(|item| same(item, value)) {
                        Some(pos) => {
                            items.remove(pos);
                        }
                        None => warn!(field = at, "list removal did not find the element"),
                    }
                }
                ListOp::Nested { index, change } => {
                    let len = items.len();
                    let Some(item) = items.get_mut(*index) else {
                        bail!(CodecError::corrupt(format!(
                            "list index {} out of bounds for '{}' (len {})",
                            index, at, len
                        )));
                    };
                    self.apply_nested(at, item, change, depth)?;
                }
            }
        }
        Ok(())
    }

    fn apply_map(
        &self,
        entries: &mut IndexMap<String, Value>,
        ops: &[MapOp],
        depth: usize,
    ) -> Result<()> {
        for op in ops {
            match op {
                MapOp::Put { key, value } => {
                    entries.insert(key.clone(), value.clone());
                }
                MapOp::Remove { key } => {
                    entries.shift_remove(key);
                }
                MapOp::Nested { key, change } => {
                    let slot = entries.entry(key.clone()).or_insert(Value::Null);
                    self.apply_nested(key, slot, change, depth)?;
                }
            }
        }
        Ok(())
    }
}

fn same_value(item: &Value, value: &Value) -> bool {
    item == value
}

/// Link elements match by identity, so a loaded record matches its link.
fn same_link(item: &Value, value: &Value) -> bool {
    match (item.link_identity(), value.link_identity()) {
        (Ok(a), Ok(b)) => a == b,
        _ => item == value,
    }
}

fn replace_slot(at: &str, slot: &mut Value, expected: FieldType, empty: Value) {
    if !slot.is_null() {
        warn!(
            field = at,
            found = %slot.field_type(),
            expected = %expected,
            "delta target holds a different kind of value, replacing it"
        );
    }
    *slot = empty;
}

fn apply_set(at: &str, items: &mut Vec<Value>, ops: &[SetOp]) {
    for op in ops {
        match op {
            SetOp::Put(value) => items.push(value.clone()),
            SetOp::Remove(value) => match items.iter().position(|item| item == value) {
                Some(pos) => {
                    items.remove(pos);
                }
                None => warn!(field = at, "set removal did not find the element"),
            },
        }
    }
}

fn apply_link_set(items: &mut Vec<Value>, ops: &[RidOp]) {
    let identity = |item: &Value| item.link_identity().ok().flatten();
    for op in ops {
        match *op {
            RidOp::Add(rid) => {
                if !items.iter().any(|item| identity(item) == Some(rid)) {
                    items.push(Value::Link(rid));
                }
            }
            RidOp::Remove(rid) => items.retain(|item| identity(item) != Some(rid)),
        }
    }
}

fn apply_rids(rids: &mut RidSet, ops: &[RidOp]) {
    for op in ops {
        match *op {
            RidOp::Add(rid) => {
                rids.add(rid);
            }
            RidOp::Remove(rid) => {
                rids.remove(rid);
            }
        }
    }
}
