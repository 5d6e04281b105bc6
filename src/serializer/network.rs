//! # Network Record Format
//!
//! The self-describing layout used when a record travels to a client that
//! may not share the server's schema. Every field carries its name and type
//! tag inline; no property ids, no pointers.
//!
//! ```text
//! +------------+--------------+------------------------------------------+
//! | class name | varint count | (name string, tag, payload) * count      |
//! +------------+--------------+------------------------------------------+
//! ```
//!
//! A null field is its name followed by the NULL tag and no payload.
//! Because values are inline, locating a field means walking the fields
//! before it; partial fetch stops as soon as every requested field is found.

use eyre::Result;
use smallvec::SmallVec;
use tracing::trace;

use super::context::CodecContext;
use super::value::{read_str, write_string, BodyFormat, ValueCodec};
use super::RecordSerializer;
use crate::config::RECORD_BUFFER_CAPACITY;
use crate::encoding::{read_varint_len, write_varint, ByteCursor};
use crate::records::Record;
use crate::types::FieldType;

pub(crate) fn write_body(
    codec: &ValueCodec<'_>,
    cursor: &mut ByteCursor,
    record: &Record,
) -> Result<()> {
    write_string(cursor, record.class_name().unwrap_or(""));
    write_varint(cursor, record.len() as i64);
    for (name, value) in record.fields() {
        write_string(cursor, name);
        codec.write_typed(cursor, value)?;
    }
    Ok(())
}

fn read_header(cursor: &mut ByteCursor<&[u8]>) -> Result<(Record, usize)> {
    let class = read_str(cursor)?;
    let record = if class.is_empty() {
        Record::new()
    } else {
        Record::with_class(class)
    };
    let count = read_varint_len(cursor)?;
    Ok((record, count))
}

pub(crate) fn read_body(
    codec: &ValueCodec<'_>,
    cursor: &mut ByteCursor<&[u8]>,
    depth: usize,
) -> Result<Record> {
    let (mut record, count) = read_header(cursor)?;
    for _ in 0..count {
        let name = read_str(cursor)?;
        let value = codec.read_typed(cursor, depth)?;
        record.set(name, value);
    }
    Ok(record)
}

/// The network format: schema-less, fields carried inline.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkSerializer;

impl RecordSerializer for NetworkSerializer {
    fn name(&self) -> &'static str {
        "network"
    }

    fn serialize(&self, record: &Record, ctx: &CodecContext) -> Result<Vec<u8>> {
        let codec = ValueCodec::new(ctx, BodyFormat::Network);
        let mut cursor = ByteCursor::with_capacity(RECORD_BUFFER_CAPACITY);
        write_body(&codec, &mut cursor, record)?;
        Ok(cursor.into_bytes())
    }

    fn deserialize(&self, bytes: &[u8], ctx: &CodecContext) -> Result<Record> {
        let codec = ValueCodec::new(ctx, BodyFormat::Network);
        read_body(&codec, &mut ByteCursor::wrap(bytes), 0)
    }

    fn deserialize_partial(
        &self,
        bytes: &[u8],
        fields: &[&str],
        ctx: &CodecContext,
    ) -> Result<Record> {
        let codec = ValueCodec::new(ctx, BodyFormat::Network);
        let mut cursor = ByteCursor::wrap(bytes);
        let (mut record, count) = read_header(&mut cursor)?;
        let mut wanted: SmallVec<[&str; 8]> = fields.iter().copied().collect();

        for _ in 0..count {
            if wanted.is_empty() {
                break;
            }
            let name = read_str(&mut cursor)?;
            let ty = FieldType::from_tag(cursor.read_u8()?)?;
            match wanted.iter().position(|w| *w == name) {
                Some(idx) => {
                    wanted.swap_remove(idx);
                    let value = codec.read_value(&mut cursor, ty, 0)?;
                    record.set(name, value);
                }
                None => codec.skip_value(&mut cursor, ty, 0)?,
            }
        }

        for missing in &wanted {
            trace!(field = *missing, "partial fetch: field not present in record");
        }
        Ok(record)
    }

    fn field_names(&self, bytes: &[u8], ctx: &CodecContext) -> Result<Vec<String>> {
        let codec = ValueCodec::new(ctx, BodyFormat::Network);
        let mut cursor = ByteCursor::wrap(bytes);
        let (_, count) = read_header(&mut cursor)?;
        let mut names = Vec::with_capacity(count);
        for _ in 0..count {
            names.push(read_str(&mut cursor)?.to_string());
            let ty = FieldType::from_tag(cursor.read_u8()?)?;
            codec.skip_value(&mut cursor, ty, 0)?;
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;
    use crate::error::CodecError;
    use crate::records::RidSet;
    use crate::types::{Decimal, RecordId, Value};

    fn sample() -> Record {
        let mut scores = IndexMap::new();
        scores.insert("math".to_string(), Value::from(9i32));
        scores.insert("art".to_string(), Value::Null);
        Record::with_class("Student")
            .with("name", "Ada")
            .with("age", 20i32)
            .with("gpa", Decimal::new(385, 2))
            .with("scores", Value::EmbeddedMap(scores))
            .with(
                "address",
                Record::new()
                    .with("city", "Turin")
                    .with("tags", Value::EmbeddedSet(vec!["a".into(), "b".into()])),
            )
            .with(
                "friends",
                Value::LinkBag([RecordId::new(5, 1), RecordId::new(5, 2)].into_iter().collect::<RidSet>()),
            )
    }

    #[test]
    fn layout_is_byte_exact() {
        let ctx = CodecContext::default();
        let bytes = NetworkSerializer
            .serialize(&Record::new().with("a", true).with("n", Value::Null), &ctx)
            .unwrap();
        assert_eq!(
            bytes,
            vec![0x00, 0x04, 0x02, b'a', 0x00, 0x01, 0x02, b'n', 0xFF]
        );
    }

    #[test]
    fn round_trip_preserves_everything() {
        let ctx = CodecContext::default();
        let record = sample();
        let bytes = NetworkSerializer.serialize(&record, &ctx).unwrap();
        let back = NetworkSerializer.deserialize(&bytes, &ctx).unwrap();
        assert_eq!(back, record);
        assert_eq!(
            back.field_names().collect::<Vec<_>>(),
            record.field_names().collect::<Vec<_>>()
        );
    }

    #[test]
    fn partial_fetch_tolerates_missing_names() {
        let ctx = CodecContext::default();
        let bytes = NetworkSerializer.serialize(&sample(), &ctx).unwrap();
        let partial = NetworkSerializer
            .deserialize_partial(&bytes, &["friends", "nope", "name"], &ctx)
            .unwrap();
        assert_eq!(partial.field_names().collect::<Vec<_>>(), vec!["name", "friends"]);
        assert_eq!(partial.class_name(), Some("Student"));
    }

    #[test]
    fn field_names_skips_values() {
        let ctx = CodecContext::default();
        let bytes = NetworkSerializer.serialize(&sample(), &ctx).unwrap();
        assert_eq!(
            NetworkSerializer.field_names(&bytes, &ctx).unwrap(),
            vec!["name", "age", "gpa", "scores", "address", "friends"]
        );
    }

    #[test]
    fn unknown_tag_is_unsupported() {
        let ctx = CodecContext::default();
        let bytes = [0x00, 0x02, 0x02, b'x', 0x63];
        let err = NetworkSerializer.deserialize(&bytes, &ctx).unwrap_err();
        assert!(matches!(
            CodecError::of(&err),
            Some(CodecError::UnsupportedType(_))
        ));
    }
}
