//! # Delta Wire Format
//!
//! Byte layout of a serialized [`Delta`]. Values inside a delta use the
//! network body format, so embedded records carry their field names and no
//! absolute pointers.
//!
//! ```text
//! delta      := class_flag:u8 [class:string] op_count:varint top_op*
//! top_op     := kind:u8 name:string body_len:varint body
//!
//!   kind        body
//!   ---------   ------------------------------
//!   REPLACED    tag value                 SetField
//!   REMOVED     (empty)                   RemoveField
//!   CHANGED     change                    NestedDelta / UpdateCollection
//!
//! change     := EMBEDDED delta
//!             | collection_tag op_count:varint coll_op*
//!
//! list op    := CREATED tag value | REPLACED index tag value
//!             | REMOVED tag value | CHANGED index change
//! set op     := CREATED tag value | REMOVED tag value
//! map op     := REPLACED key tag value | REMOVED key | CHANGED key change
//! rid op     := CREATED rid | REMOVED rid
//! ```
//!
//! Operation kinds are `CREATED = 1`, `REPLACED = 2`, `CHANGED = 3`,
//! `REMOVED = 4`. Every top-level operation is length-prefixed, so a reader
//! interested in a few fields can skip the rest without decoding them
//! (see [`delta_field_names`]).

use eyre::{bail, Result};

use super::ops::{CollectionDelta, Delta, DeltaOp, ListOp, MapOp, NestedChange, RidOp, SetOp};
use crate::config::{DELTA_CHANGED, DELTA_CREATED, DELTA_REMOVED, DELTA_REPLACED};
use crate::encoding::{read_varint, read_varint_len, write_varint, ByteCursor};
use crate::error::CodecError;
use crate::serializer::{
    read_rid, read_str, write_rid, write_string, BodyFormat, CodecContext, ValueCodec,
};
use crate::types::FieldType;

pub fn serialize_delta(delta: &Delta, ctx: &CodecContext) -> Result<Vec<u8>> {
    let writer = DeltaWriter {
        codec: ValueCodec::new(ctx, BodyFormat::Network),
    };
    let mut cursor = ByteCursor::new();
    writer.write_delta(&mut cursor, delta)?;
    Ok(cursor.into_bytes())
}

pub fn deserialize_delta(bytes: &[u8], ctx: &CodecContext) -> Result<Delta> {
    let reader = DeltaReader {
        codec: ValueCodec::new(ctx, BodyFormat::Network),
    };
    let mut cursor = ByteCursor::wrap(bytes);
    let delta = reader.read_delta(&mut cursor, 0)?;
    expect_consumed(&cursor, "delta")?;
    Ok(delta)
}

/// Lists the top-level field names a serialized delta touches, skipping
/// every operation body.
pub fn delta_field_names(bytes: &[u8]) -> Result<Vec<String>> {
    let mut cursor = ByteCursor::wrap(bytes);
    read_class(&mut cursor)?;
    let count = read_varint_len(&mut cursor)?;
    let mut names = Vec::with_capacity(count);
    for _ in 0..count {
        read_kind(&mut cursor)?;
        names.push(read_str(&mut cursor)?.to_string());
        let len = read_varint_len(&mut cursor)?;
        cursor.skip(len)?;
    }
    expect_consumed(&cursor, "delta")?;
    Ok(names)
}

fn expect_consumed(cursor: &ByteCursor<&[u8]>, what: &str) -> Result<()> {
    if cursor.remaining() != 0 {
        bail!(CodecError::corrupt(format!(
            "{} trailing bytes after {}",
            cursor.remaining(),
            what
        )));
    }
    Ok(())
}

fn read_kind(cursor: &mut ByteCursor<&[u8]>) -> Result<u8> {
    let kind = cursor.read_u8()?;
    if !(DELTA_CREATED..=DELTA_REMOVED).contains(&kind) {
        bail!(CodecError::corrupt(format!(
            "unknown delta operation kind {}",
            kind
        )));
    }
    Ok(kind)
}

fn read_class(cursor: &mut ByteCursor<&[u8]>) -> Result<Option<String>> {
    match cursor.read_u8()? {
        0 => Ok(None),
        1 => Ok(Some(read_str(cursor)?.to_string())),
        flag => bail!(CodecError::corrupt(format!(
            "invalid delta class flag {}",
            flag
        ))),
    }
}

fn read_index(cursor: &mut ByteCursor<&[u8]>) -> Result<usize> {
    let index = read_varint(cursor)?;
    usize::try_from(index)
        .map_err(|_| CodecError::corrupt(format!("negative list index {}", index)).into())
}

fn unexpected(kind: u8, target: &str) -> eyre::Report {
    CodecError::corrupt(format!(
        "operation kind {} is not valid for {}",
        kind, target
    ))
    .into()
}

struct DeltaWriter<'c> {
    codec: ValueCodec<'c>,
}

impl DeltaWriter<'_> {
    fn write_delta(&self, cursor: &mut ByteCursor, delta: &Delta) -> Result<()> {
        match &delta.class_name {
            None => {
                cursor.write_u8(0);
            }
            Some(class) => {
                cursor.write_u8(1);
                write_string(cursor, class);
            }
        }
        write_varint(cursor, delta.ops.len() as i64);

        for op in &delta.ops {
            let mut body = ByteCursor::new();
            let kind = match op {
                DeltaOp::SetField { value, .. } => {
                    self.codec.write_typed(&mut body, value)?;
                    DELTA_REPLACED
                }
                DeltaOp::RemoveField { .. } => DELTA_REMOVED,
                DeltaOp::NestedDelta { delta, .. } => {
                    body.write_u8(FieldType::Embedded.tag());
                    self.write_delta(&mut body, delta)?;
                    DELTA_CHANGED
                }
                DeltaOp::UpdateCollection { change, .. } => {
                    self.write_collection(&mut body, change)?;
                    DELTA_CHANGED
                }
            };
            let body = body.into_bytes();
            cursor.write_u8(kind);
            write_string(cursor, op.name());
            write_varint(cursor, body.len() as i64);
            cursor.write_bytes(&body);
        }
        Ok(())
    }

    fn write_nested(&self, cursor: &mut ByteCursor, change: &NestedChange) -> Result<()> {
        match change {
            NestedChange::Record(delta) => {
                cursor.write_u8(FieldType::Embedded.tag());
                self.write_delta(cursor, delta)
            }
            NestedChange::Collection(change) => self.write_collection(cursor, change),
        }
    }

    fn write_collection(&self, cursor: &mut ByteCursor, change: &CollectionDelta) -> Result<()> {
        cursor.write_u8(change.field_type().tag());
        write_varint(cursor, change.len() as i64);
        match change {
            CollectionDelta::EmbeddedList(ops) | CollectionDelta::LinkList(ops) => {
                for op in ops {
                    self.write_list_op(cursor, op)?;
                }
            }
            CollectionDelta::EmbeddedSet(ops) => {
                for op in ops {
                    let (kind, value) = match op {
                        SetOp::Put(value) => (DELTA_CREATED, value),
                        SetOp::Remove(value) => (DELTA_REMOVED, value),
                    };
                    cursor.write_u8(kind);
                    self.codec.write_typed(cursor, value)?;
                }
            }
            CollectionDelta::EmbeddedMap(ops) | CollectionDelta::LinkMap(ops) => {
                for op in ops {
                    self.write_map_op(cursor, op)?;
                }
            }
            CollectionDelta::LinkSet(ops) | CollectionDelta::LinkBag(ops) => {
                for op in ops {
                    let (kind, rid) = match *op {
                        RidOp::Add(rid) => (DELTA_CREATED, rid),
                        RidOp::Remove(rid) => (DELTA_REMOVED, rid),
                    };
                    cursor.write_u8(kind);
                    write_rid(cursor, rid);
                }
            }
        }
        Ok(())
    }

    fn write_list_op(&self, cursor: &mut ByteCursor, op: &ListOp) -> Result<()> {
        match op {
            ListOp::Set { index, value } => {
                cursor.write_u8(DELTA_REPLACED);
                write_varint(cursor, *index as i64);
                self.codec.write_typed(cursor, value)
            }
            ListOp::Insert(value) => {
                cursor.write_u8(DELTA_CREATED);
                self.codec.write_typed(cursor, value)
            }
            ListOp::Remove(value) => {
                cursor.write_u8(DELTA_REMOVED);
                self.codec.write_typed(cursor, value)
            }
            ListOp::Nested { index, change } => {
                cursor.write_u8(DELTA_CHANGED);
                write_varint(cursor, *index as i64);
                self.write_nested(cursor, change)
            }
        }
    }

    fn write_map_op(&self, cursor: &mut ByteCursor, op: &MapOp) -> Result<()> {
        match op {
            MapOp::Put { key, value } => {
                cursor.write_u8(DELTA_REPLACED);
                write_string(cursor, key);
                self.codec.write_typed(cursor, value)
            }
            MapOp::Remove { key } => {
                cursor.write_u8(DELTA_REMOVED);
                write_string(cursor, key);
                Ok(())
            }
            MapOp::Nested { key, change } => {
                cursor.write_u8(DELTA_CHANGED);
                write_string(cursor, key);
                self.write_nested(cursor, change)
            }
        }
    }
}

struct DeltaReader<'c> {
    codec: ValueCodec<'c>,
}

impl DeltaReader<'_> {
    fn read_delta(&self, cursor: &mut ByteCursor<&[u8]>, depth: usize) -> Result<Delta> {
        let class_name = read_class(cursor)?;
        let count = read_varint_len(cursor)?;
        let mut ops = Vec::with_capacity(count);

        for _ in 0..count {
            let kind = read_kind(cursor)?;
            let name = read_str(cursor)?.to_string();
            let len = read_varint_len(cursor)?;
            let mut body = ByteCursor::wrap(cursor.read_slice(len)?);
            let op = match kind {
                DELTA_REPLACED => DeltaOp::SetField {
                    name,
                    value: self.codec.read_typed(&mut body, depth)?,
                },
                DELTA_REMOVED => DeltaOp::RemoveField { name },
                DELTA_CHANGED => match self.read_nested(&mut body, depth)? {
                    NestedChange::Record(delta) => DeltaOp::NestedDelta { name, delta },
                    NestedChange::Collection(change) => {
                        DeltaOp::UpdateCollection { name, change }
                    }
                },
                other => return Err(unexpected(other, "a field")),
            };
            expect_consumed(&body, "delta operation")?;
            ops.push(op);
        }
        Ok(Delta { class_name, ops })
    }

    fn read_nested(&self, cursor: &mut ByteCursor<&[u8]>, depth: usize) -> Result<NestedChange> {
        let depth = self.codec.descend(depth)?;
        let ty = FieldType::from_tag(cursor.read_u8()?)?;
        if ty == FieldType::Embedded {
            return Ok(NestedChange::Record(self.read_delta(cursor, depth)?));
        }

        let count = read_varint_len(cursor)?;
        let change = match ty {
            FieldType::EmbeddedList => {
                CollectionDelta::EmbeddedList(self.read_ops(cursor, count, depth, Self::read_list_op)?)
            }
            FieldType::LinkList => {
                CollectionDelta::LinkList(self.read_ops(cursor, count, depth, Self::read_list_op)?)
            }
            FieldType::EmbeddedSet => {
                CollectionDelta::EmbeddedSet(self.read_ops(cursor, count, depth, Self::read_set_op)?)
            }
            FieldType::EmbeddedMap => {
                CollectionDelta::EmbeddedMap(self.read_ops(cursor, count, depth, Self::read_map_op)?)
            }
            FieldType::LinkMap => {
                CollectionDelta::LinkMap(self.read_ops(cursor, count, depth, Self::read_map_op)?)
            }
            FieldType::LinkSet => {
                CollectionDelta::LinkSet(self.read_ops(cursor, count, depth, Self::read_rid_op)?)
            }
            FieldType::LinkBag => {
                CollectionDelta::LinkBag(self.read_ops(cursor, count, depth, Self::read_rid_op)?)
            }
            other => bail!(CodecError::corrupt(format!(
                "{} is not a collection type",
                other
            ))),
        };
        Ok(NestedChange::Collection(change))
    }

    fn read_ops<T>(
        &self,
        cursor: &mut ByteCursor<&[u8]>,
        count: usize,
        depth: usize,
        read_op: fn(&Self, &mut ByteCursor<&[u8]>, usize) -> Result<T>,
    ) -> Result<Vec<T>> {
        let mut ops = Vec::with_capacity(count);
        for _ in 0..count {
            ops.push(read_op(self, cursor, depth)?);
        }
        Ok(ops)
    }

    fn read_list_op(&self, cursor: &mut ByteCursor<&[u8]>, depth: usize) -> Result<ListOp> {
        let op = match read_kind(cursor)? {
            DELTA_CREATED => ListOp::Insert(self.codec.read_typed(cursor, depth)?),
            DELTA_REPLACED => ListOp::Set {
                index: read_index(cursor)?,
                value: self.codec.read_typed(cursor, depth)?,
            },
            DELTA_REMOVED => ListOp::Remove(self.codec.read_typed(cursor, depth)?),
            _ => ListOp::Nested {
                index: read_index(cursor)?,
                change: self.read_nested(cursor, depth)?,
            },
        };
        Ok(op)
    }

    fn read_set_op(&self, cursor: &mut ByteCursor<&[u8]>, depth: usize) -> Result<SetOp> {
        match read_kind(cursor)? {
            DELTA_CREATED => Ok(SetOp::Put(self.codec.read_typed(cursor, depth)?)),
            DELTA_REMOVED => Ok(SetOp::Remove(self.codec.read_typed(cursor, depth)?)),
            other => Err(unexpected(other, "a set")),
        }
    }

    fn read_map_op(&self, cursor: &mut ByteCursor<&[u8]>, depth: usize) -> Result<MapOp> {
        let kind = read_kind(cursor)?;
        let key = read_str(cursor)?.to_string();
        match kind {
            DELTA_REPLACED => Ok(MapOp::Put {
                key,
                value: self.codec.read_typed(cursor, depth)?,
            }),
            DELTA_REMOVED => Ok(MapOp::Remove { key }),
            DELTA_CHANGED => Ok(MapOp::Nested {
                key,
                change: self.read_nested(cursor, depth)?,
            }),
            other => Err(unexpected(other, "a map")),
        }
    }

    fn read_rid_op(&self, cursor: &mut ByteCursor<&[u8]>, _depth: usize) -> Result<RidOp> {
        match read_kind(cursor)? {
            DELTA_CREATED => Ok(RidOp::Add(read_rid(cursor)?)),
            DELTA_REMOVED => Ok(RidOp::Remove(read_rid(cursor)?)),
            other => Err(unexpected(other, "a link collection")),
        }
    }
}
