//! # Delta Computation
//!
//! Walks an original snapshot and the current record side by side and
//! emits the smallest set of operations that turns one into the other.
//!
//! ## Rules
//!
//! | Field state | Emitted |
//! |-------------|---------|
//! | only in current | `SetField` |
//! | only in original | `RemoveField` |
//! | embedded in both | `NestedDelta`, if the nested delta is non-empty |
//! | list in both | `Set` for changed prefix slots, `Insert` for a longer tail, `Remove` (tail first) for a shorter one |
//! | set in both | `Put` / `Remove` by membership |
//! | map in both | `Put` / `Remove` by key, `Nested` for embedded values |
//! | LinkSet / LinkBag in both | `Add` / `Remove` over the RID symmetric difference |
//! | type changed | `SetField` with the new value |
//! | scalar in both | `SetField` if unequal |
//!
//! Scalars of a binary-comparable type are compared through the
//! [`BinaryComparator`] on their encoded payloads. Decimals and floats are
//! compared structurally instead, because the comparator treats `1.0` and
//! `1.00` (or `-0.0` and `0.0`) as equal while a delta must reproduce the
//! exact value.

use eyre::Result;
use indexmap::IndexMap;
use tracing::debug;

use super::ops::{CollectionDelta, Delta, DeltaOp, ListOp, MapOp, NestedChange, RidOp, SetOp};
use crate::comparator::{BinaryComparator, EncodedField};
use crate::records::{Record, RidSet};
use crate::serializer::{encode_value, CodecContext};
use crate::types::{FieldType, Value};

/// Computes the delta that turns `original` into `current`.
pub fn compute_delta(original: &Record, current: &Record, ctx: &CodecContext) -> Result<Delta> {
    let differ = Differ::new(ctx);
    let delta = differ.diff_record(original, current)?;
    debug!(
        class = current.class_name().unwrap_or(""),
        ops = delta.len(),
        fields = current.len(),
        "computed record delta"
    );
    Ok(delta)
}

/// Outcome of comparing two values held in the same slot.
enum Change {
    Nested(NestedChange),
    Replace,
}

struct Differ<'c> {
    ctx: &'c CodecContext,
    comparator: BinaryComparator<'c>,
}

impl<'c> Differ<'c> {
    fn new(ctx: &'c CodecContext) -> Self {
        Self {
            ctx,
            comparator: BinaryComparator::new(ctx),
        }
    }

    fn diff_record(&self, original: &Record, current: &Record) -> Result<Delta> {
        let mut delta = Delta::new();
        if original.class_name() != current.class_name() {
            delta.class_name = Some(current.class_name().unwrap_or("").to_string());
        }

        for (name, value) in current.fields() {
            let op = match original.field(name) {
                None => Some(DeltaOp::SetField {
                    name: name.to_string(),
                    value: value.clone(),
                }),
                Some(before) => self.diff_value(before, value)?.map(|change| match change {
                    Change::Nested(NestedChange::Record(nested)) => DeltaOp::NestedDelta {
                        name: name.to_string(),
                        delta: nested,
                    },
                    Change::Nested(NestedChange::Collection(change)) => {
                        DeltaOp::UpdateCollection {
                            name: name.to_string(),
                            change,
                        }
                    }
                    Change::Replace => DeltaOp::SetField {
                        name: name.to_string(),
                        value: value.clone(),
                    },
                }),
            };
            delta.ops.extend(op);
        }

        for name in original.field_names() {
            if !current.contains(name) {
                delta.push(DeltaOp::RemoveField {
                    name: name.to_string(),
                });
            }
        }
        Ok(delta)
    }

    /// Returns `None` when `before` and `after` are equal.
    fn diff_value(&self, before: &Value, after: &Value) -> Result<Option<Change>> {
        let change = match (before, after) {
            (Value::Embedded(a), Value::Embedded(b)) => {
                let nested = self.diff_record(a, b)?;
                (!nested.is_empty()).then_some(NestedChange::Record(nested))
            }
            (Value::EmbeddedList(a), Value::EmbeddedList(b)) => {
                collection(self.diff_list(a, b)?, CollectionDelta::EmbeddedList)
            }
            (Value::EmbeddedSet(a), Value::EmbeddedSet(b)) => {
                collection(diff_set(a, b), CollectionDelta::EmbeddedSet)
            }
            (Value::EmbeddedMap(a), Value::EmbeddedMap(b)) => {
                collection(self.diff_map(a, b)?, CollectionDelta::EmbeddedMap)
            }
            (Value::LinkList(a), Value::LinkList(b)) => {
                let ops = self.diff_list(&link_values(a)?, &link_values(b)?)?;
                collection(ops, CollectionDelta::LinkList)
            }
            (Value::LinkMap(a), Value::LinkMap(b)) => {
                let ops = self.diff_map(&link_entries(a)?, &link_entries(b)?)?;
                collection(ops, CollectionDelta::LinkMap)
            }
            (Value::LinkSet(a), Value::LinkSet(b)) => match (rid_set(a)?, rid_set(b)?) {
                (Some(a), Some(b)) => collection(diff_rids(&a, &b), CollectionDelta::LinkSet),
                // Nulls or duplicates cannot be expressed as RID operations.
                _ => return Ok((before != after).then_some(Change::Replace)),
            },
            (Value::LinkBag(a), Value::LinkBag(b)) => {
                collection(diff_rids(a, b), CollectionDelta::LinkBag)
            }
            _ => return Ok((!self.values_equal(before, after)?).then_some(Change::Replace)),
        };
        Ok(change.map(Change::Nested))
    }

    fn values_equal(&self, a: &Value, b: &Value) -> Result<bool> {
        let ty = a.field_type();
        if ty != b.field_type() {
            return Ok(false);
        }
        let via_comparator = ty.is_binary_comparable()
            && !matches!(ty, FieldType::Decimal | FieldType::Float | FieldType::Double);
        if !via_comparator {
            return Ok(a == b);
        }
        let left = encode_value(a, self.ctx)?;
        let right = encode_value(b, self.ctx)?;
        self.comparator
            .is_equal(&EncodedField::new(ty, &left), &EncodedField::new(ty, &right))
    }

    fn diff_list(&self, before: &[Value], after: &[Value]) -> Result<Vec<ListOp>> {
        let common = before.len().min(after.len());
        let mut ops = Vec::new();

        for (index, (a, b)) in before.iter().zip(after).enumerate() {
            match self.diff_value(a, b)? {
                None => {}
                Some(Change::Nested(change)) => ops.push(ListOp::Nested { index, change }),
                Some(Change::Replace) => ops.push(ListOp::Set {
                    index,
                    value: b.clone(),
                }),
            }
        }
        ops.extend(after[common..].iter().cloned().map(ListOp::Insert));
        ops.extend(before[common..].iter().rev().cloned().map(ListOp::Remove));
        Ok(ops)
    }

    fn diff_map(
        &self,
        before: &IndexMap<String, Value>,
        after: &IndexMap<String, Value>,
    ) -> Result<Vec<MapOp>> {
        let mut ops = Vec::new();
        for (key, value) in after {
            let Some(old) = before.get(key) else {
                ops.push(MapOp::Put {
                    key: key.clone(),
                    value: value.clone(),
                });
                continue;
            };
            match self.diff_value(old, value)? {
                None => {}
                Some(Change::Nested(change)) => ops.push(MapOp::Nested {
                    key: key.clone(),
                    change,
                }),
                Some(Change::Replace) => ops.push(MapOp::Put {
                    key: key.clone(),
                    value: value.clone(),
                }),
            }
        }
        for key in before.keys() {
            if !after.contains_key(key) {
                ops.push(MapOp::Remove { key: key.clone() });
            }
        }
        Ok(ops)
    }
}

fn collection<T>(
    ops: Vec<T>,
    wrap: impl FnOnce(Vec<T>) -> CollectionDelta,
) -> Option<NestedChange> {
    (!ops.is_empty()).then(|| NestedChange::Collection(wrap(ops)))
}

/// Multiset difference: each element of `after` without a partner in
/// `before` is a `Put`, each unpartnered element of `before` a `Remove`.
fn diff_set(before: &[Value], after: &[Value]) -> Vec<SetOp> {
    let mut matched = vec![false; before.len()];
    let mut ops = Vec::new();
    for value in after {
        let partner = before
            .iter()
            .enumerate()
            .position(|(i, old)| !matched[i] && old == value);
        match partner {
            Some(i) => matched[i] = true,
            None => ops.push(SetOp::Put(value.clone())),
        }
    }
    for (old, _) in before.iter().zip(&matched).filter(|(_, m)| !**m) {
        ops.push(SetOp::Remove(old.clone()));
    }
    ops
}

fn diff_rids(before: &RidSet, after: &RidSet) -> Vec<RidOp> {
    after
        .difference(before)
        .map(RidOp::Add)
        .chain(before.difference(after).map(RidOp::Remove))
        .collect()
}

/// Builds a RidSet from link elements, or `None` if the elements hold a
/// null or a duplicate.
fn rid_set(items: &[Value]) -> Result<Option<RidSet>> {
    let mut rids = RidSet::new();
    for item in items {
        match item.link_identity()? {
            Some(rid) if rids.add(rid) => {}
            _ => return Ok(None),
        }
    }
    Ok(Some(rids))
}

fn link_value(item: &Value) -> Result<Value> {
    Ok(item.link_identity()?.map_or(Value::Null, Value::Link))
}

fn link_values(items: &[Value]) -> Result<Vec<Value>> {
    items.iter().map(link_value).collect()
}

fn link_entries(entries: &IndexMap<String, Value>) -> Result<IndexMap<String, Value>> {
    entries
        .iter()
        .map(|(k, v)| Ok((k.clone(), link_value(v)?)))
        .collect()
}
