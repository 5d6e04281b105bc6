//! # Value Codec
//!
//! Encodes and decodes a single [`Value`] payload, dispatching on its
//! [`FieldType`]. The record formats build on it: they decide where the type
//! tag goes (inline or implied by the schema) and how an embedded record's
//! body is laid out, and delegate every payload to this module.
//!
//! ## Payload Formats
//!
//! | Type | Payload |
//! |------|---------|
//! | Boolean, Byte | 1 byte |
//! | Short, Integer, Long | 2/4/8 bytes big-endian |
//! | Float, Double | IEEE-754 bits, big-endian |
//! | Decimal | varint scale, varint length, minimal BE two's complement |
//! | String, Binary | varint length, bytes |
//! | Date | varint day count (database timezone → UTC) |
//! | DateTime | varint epoch millis |
//! | Link | varint cluster id, varint cluster position |
//! | Embedded | record body in the active [`BodyFormat`] |
//! | EmbeddedList, EmbeddedSet | varint count, then (tag, payload)* |
//! | EmbeddedMap | varint count, then (key string, tag, payload)* |
//! | LinkList, LinkSet | varint count, then RID* (null element = `#-1:-1`) |
//! | LinkMap | varint count, then (key string, RID)* |
//! | LinkBag | mode byte (1 = embedded), varint count, sorted RID* |
//! | Custom | type name string, varint length, bytes |
//! | Null | nothing |
//!
//! ## Nesting Limit
//!
//! Each embedded record or collection level counts toward the context's
//! `max_nesting_depth` while decoding. Input nested deeper than the limit is
//! rejected as `CorruptData` before it can exhaust the stack.

use eyre::{bail, Result};
use indexmap::IndexMap;

use super::context::CodecContext;
use super::{network, storage};
use crate::config::LINKBAG_EMBEDDED;
use crate::encoding::{read_varint, read_varint_i32, read_varint_len, write_varint, ByteCursor};
use crate::error::CodecError;
use crate::records::{Record, RidSet};
use crate::types::{Decimal, FieldType, RecordId, Value};

/// Layout of an embedded record body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    /// Field directory with value pointers and schema-resolved property ids.
    Storage,
    /// Field count followed by inline (name, tag, payload) triples.
    Network,
}

pub fn write_string(cursor: &mut ByteCursor, value: &str) {
    write_binary(cursor, value.as_bytes());
}

pub fn write_binary(cursor: &mut ByteCursor, value: &[u8]) {
    write_varint(cursor, value.len() as i64);
    cursor.write_bytes(value);
}

pub fn read_binary<'a>(cursor: &mut ByteCursor<&'a [u8]>) -> Result<&'a [u8]> {
    let len = read_varint_len(cursor)?;
    cursor.read_slice(len)
}

pub fn read_str<'a>(cursor: &mut ByteCursor<&'a [u8]>) -> Result<&'a str> {
    let bytes = read_binary(cursor)?;
    std::str::from_utf8(bytes).map_err(|e| CodecError::corrupt(format!("invalid UTF-8: {}", e)).into())
}

pub fn write_rid(cursor: &mut ByteCursor, rid: RecordId) {
    write_varint(cursor, i64::from(rid.cluster_id));
    write_varint(cursor, rid.cluster_position);
}

pub fn read_rid<B: AsRef<[u8]>>(cursor: &mut ByteCursor<B>) -> Result<RecordId> {
    let cluster_id = read_varint_i32(cursor)?;
    let cluster_position = read_varint(cursor)?;
    Ok(RecordId::new(cluster_id, cluster_position))
}

fn write_link_element(cursor: &mut ByteCursor, element: &Value) -> Result<()> {
    let rid = element.link_identity()?.unwrap_or(RecordId::NULL);
    write_rid(cursor, rid);
    Ok(())
}

fn read_link_element<B: AsRef<[u8]>>(cursor: &mut ByteCursor<B>) -> Result<Value> {
    let rid = read_rid(cursor)?;
    Ok(if rid.is_null() {
        Value::Null
    } else {
        Value::Link(rid)
    })
}

#[derive(Debug, Clone, Copy)]
pub struct ValueCodec<'c> {
    ctx: &'c CodecContext,
    format: BodyFormat,
}

impl<'c> ValueCodec<'c> {
    pub fn new(ctx: &'c CodecContext, format: BodyFormat) -> Self {
        Self { ctx, format }
    }

    pub fn context(&self) -> &'c CodecContext {
        self.ctx
    }

    pub fn format(&self) -> BodyFormat {
        self.format
    }

    /// Writes the type tag followed by the payload.
    pub fn write_typed(&self, cursor: &mut ByteCursor, value: &Value) -> Result<()> {
        cursor.write_u8(value.field_type().tag());
        self.write_value(cursor, value)
    }

    /// Writes the payload of `value`, without a type tag.
    pub fn write_value(&self, cursor: &mut ByteCursor, value: &Value) -> Result<()> {
        match value {
            Value::Null => {}
            Value::Boolean(v) => {
                cursor.write_u8(u8::from(*v));
            }
            Value::Byte(v) => {
                cursor.write_bytes(&v.to_be_bytes());
            }
            Value::Short(v) => {
                cursor.write_bytes(&v.to_be_bytes());
            }
            Value::Integer(v) => {
                cursor.write_bytes(&v.to_be_bytes());
            }
            Value::Long(v) => {
                cursor.write_bytes(&v.to_be_bytes());
            }
            Value::Float(v) => {
                cursor.write_bytes(&v.to_bits().to_be_bytes());
            }
            Value::Double(v) => {
                cursor.write_bytes(&v.to_bits().to_be_bytes());
            }
            Value::Decimal(d) => {
                if !d.has_encodable_scale() {
                    bail!(CodecError::unsupported(format!(
                        "decimal scale {} is outside the encodable range",
                        d.scale()
                    )));
                }
                write_varint(cursor, i64::from(d.scale()));
                write_binary(cursor, &d.to_be_bytes_minimal());
            }
            Value::String(s) => write_string(cursor, s),
            Value::Binary(b) => write_binary(cursor, b),
            Value::Date(millis) => {
                write_varint(cursor, self.ctx.date_to_days(*millis));
            }
            Value::DateTime(millis) => {
                write_varint(cursor, *millis);
            }
            Value::Link(rid) => write_rid(cursor, *rid),
            Value::Embedded(record) => self.write_body(cursor, record)?,
            Value::EmbeddedList(items) | Value::EmbeddedSet(items) => {
                write_varint(cursor, items.len() as i64);
                for item in items {
                    self.write_typed(cursor, item)?;
                }
            }
            Value::EmbeddedMap(entries) => {
                write_varint(cursor, entries.len() as i64);
                for (key, item) in entries {
                    write_string(cursor, key);
                    self.write_typed(cursor, item)?;
                }
            }
            Value::LinkList(items) | Value::LinkSet(items) => {
                write_varint(cursor, items.len() as i64);
                for item in items {
                    write_link_element(cursor, item)?;
                }
            }
            Value::LinkMap(entries) => {
                write_varint(cursor, entries.len() as i64);
                for (key, item) in entries {
                    write_string(cursor, key);
                    write_link_element(cursor, item)?;
                }
            }
            Value::LinkBag(rids) => {
                cursor.write_u8(LINKBAG_EMBEDDED);
                write_varint(cursor, rids.len() as i64);
                for rid in rids {
                    write_rid(cursor, rid);
                }
            }
            Value::Custom(custom) => {
                let bytes = self.ctx.custom_types().encode(custom)?;
                write_string(cursor, custom.type_name());
                write_binary(cursor, &bytes);
            }
        }
        Ok(())
    }

    pub fn write_body(&self, cursor: &mut ByteCursor, record: &Record) -> Result<()> {
        match self.format {
            BodyFormat::Storage => storage::write_body(self, cursor, record),
            BodyFormat::Network => network::write_body(self, cursor, record),
        }
    }

    pub fn read_body(&self, cursor: &mut ByteCursor<&[u8]>, depth: usize) -> Result<Record> {
        match self.format {
            BodyFormat::Storage => storage::read_body(self, cursor, depth),
            BodyFormat::Network => network::read_body(self, cursor, depth),
        }
    }

    /// Returns the depth one level below `depth`, or `CorruptData` when that
    /// exceeds the configured limit.
    pub fn descend(&self, depth: usize) -> Result<usize> {
        let next = depth + 1;
        let limit = self.ctx.config().max_nesting_depth();
        if next > limit {
            bail!(CodecError::corrupt(format!(
                "nesting deeper than {} levels",
                limit
            )));
        }
        Ok(next)
    }

    /// Reads a type tag followed by the payload.
    pub fn read_typed(&self, cursor: &mut ByteCursor<&[u8]>, depth: usize) -> Result<Value> {
        let ty = FieldType::from_tag(cursor.read_u8()?)?;
        self.read_value(cursor, ty, depth)
    }

    /// Reads a payload of type `ty`.
    pub fn read_value(
        &self,
        cursor: &mut ByteCursor<&[u8]>,
        ty: FieldType,
        depth: usize,
    ) -> Result<Value> {
        let value = match ty {
            FieldType::Null => Value::Null,
            FieldType::Boolean => Value::Boolean(cursor.read_u8()? != 0),
            FieldType::Byte => Value::Byte(i8::from_be_bytes(cursor.read_array()?)),
            FieldType::Short => Value::Short(i16::from_be_bytes(cursor.read_array()?)),
            FieldType::Integer => Value::Integer(i32::from_be_bytes(cursor.read_array()?)),
            FieldType::Long => Value::Long(i64::from_be_bytes(cursor.read_array()?)),
            FieldType::Float => Value::Float(f32::from_bits(u32::from_be_bytes(
                cursor.read_array()?,
            ))),
            FieldType::Double => Value::Double(f64::from_bits(u64::from_be_bytes(
                cursor.read_array()?,
            ))),
            FieldType::Decimal => {
                let scale = read_varint_i32(cursor)?;
                let bytes = read_binary(cursor)?;
                Value::Decimal(Decimal::from_be_bytes(bytes, scale)?)
            }
            FieldType::String => Value::String(read_str(cursor)?.to_string()),
            FieldType::Binary => Value::Binary(read_binary(cursor)?.to_vec()),
            FieldType::Date => Value::Date(self.ctx.days_to_date(read_varint(cursor)?)?),
            FieldType::DateTime => Value::DateTime(read_varint(cursor)?),
            FieldType::Link => Value::Link(read_rid(cursor)?),
            FieldType::Embedded => {
                let depth = self.descend(depth)?;
                Value::Embedded(Box::new(self.read_body(cursor, depth)?))
            }
            FieldType::EmbeddedList | FieldType::EmbeddedSet => {
                let depth = self.descend(depth)?;
                let count = read_varint_len(cursor)?;
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(self.read_typed(cursor, depth)?);
                }
                if ty == FieldType::EmbeddedList {
                    Value::EmbeddedList(items)
                } else {
                    Value::EmbeddedSet(items)
                }
            }
            FieldType::EmbeddedMap => {
                let depth = self.descend(depth)?;
                let count = read_varint_len(cursor)?;
                let mut entries = IndexMap::with_capacity(count);
                for _ in 0..count {
                    let key = read_str(cursor)?.to_string();
                    let item = self.read_typed(cursor, depth)?;
                    entries.insert(key, item);
                }
                Value::EmbeddedMap(entries)
            }
            FieldType::LinkList | FieldType::LinkSet => {
                let count = read_varint_len(cursor)?;
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(read_link_element(cursor)?);
                }
                if ty == FieldType::LinkList {
                    Value::LinkList(items)
                } else {
                    Value::LinkSet(items)
                }
            }
            FieldType::LinkMap => {
                let count = read_varint_len(cursor)?;
                let mut entries = IndexMap::with_capacity(count);
                for _ in 0..count {
                    let key = read_str(cursor)?.to_string();
                    entries.insert(key, read_link_element(cursor)?);
                }
                Value::LinkMap(entries)
            }
            FieldType::LinkBag => {
                let mode = cursor.read_u8()?;
                if mode != LINKBAG_EMBEDDED {
                    bail!(CodecError::unsupported(format!(
                        "link bag storage mode {} is not embedded",
                        mode
                    )));
                }
                let count = read_varint_len(cursor)?;
                let mut rids = RidSet::new();
                for _ in 0..count {
                    rids.add(read_rid(cursor)?);
                }
                Value::LinkBag(rids)
            }
            FieldType::Custom => {
                let type_name = read_str(cursor)?;
                let bytes = read_binary(cursor)?;
                Value::Custom(self.ctx.decode_custom(type_name, bytes)?)
            }
            FieldType::Any => bail!(CodecError::corrupt("ANY is not a value type")),
        };
        Ok(value)
    }

    /// Advances past a payload of type `ty` without keeping it.
    pub fn skip_value(
        &self,
        cursor: &mut ByteCursor<&[u8]>,
        ty: FieldType,
        depth: usize,
    ) -> Result<()> {
        match ty.fixed_size() {
            Some(size) => cursor.skip(size),
            None => match ty {
                FieldType::String | FieldType::Binary => {
                    let len = read_varint_len(cursor)?;
                    cursor.skip(len)
                }
                FieldType::DateTime => read_varint(cursor).map(|_| ()),
                FieldType::Link => read_rid(cursor).map(|_| ()),
                _ => self.read_value(cursor, ty, depth).map(|_| ()),
            },
        }
    }
}
