//! # Storage Record Format
//!
//! The on-disk layout of a record. A field directory up front lets readers
//! find one field, list field names, or fetch a subset of fields without
//! decoding the rest.
//!
//! ## Body Layout
//!
//! ```text
//! +------------+--------------------------------------+---+-----------------+
//! | class name | directory entry*                     | 0 | value payloads  |
//! | (string)   |                                      |   |                 |
//! +------------+--------------------------------------+---+-----------------+
//!
//! directory entry, by name:      varint len>0 | name | u32 pointer | tag
//! directory entry, by property:  varint -(id+1) | u32 pointer | [tag if ANY]
//! ```
//!
//! - The class name is a length-prefixed string; length 0 means no class.
//! - Pointers are absolute big-endian offsets into the buffer. Pointer 0
//!   marks a null field, which has no payload.
//! - A field is written by property id when the record's class declares it
//!   and the value's type matches the declared one (or the property is
//!   `ANY`, in which case the tag follows the pointer). Otherwise the field
//!   is written by name with an explicit tag. This is schema drift; it is
//!   logged and tolerated.
//! - Embedded records nest the same body layout inside a value payload.
//!
//! ## Decoding Guarantees
//!
//! Value payloads are read in directory order and must not overlap: each
//! pointer must lie at or after the end of the previous payload. After a
//! body is decoded the cursor sits at the furthest byte any payload used,
//! which is where the enclosing value ends.

use eyre::{bail, ensure, Result};
use smallvec::SmallVec;
use tracing::{debug, trace};

use super::context::CodecContext;
use super::value::{read_str, write_string, BodyFormat, ValueCodec};
use super::RecordSerializer;
use crate::comparator::EncodedField;
use crate::config::{NULL_VALUE_POINTER, RECORD_BUFFER_CAPACITY, VALUE_POINTER_SIZE};
use crate::encoding::{read_varint, write_varint, ByteCursor};
use crate::error::CodecError;
use crate::records::Record;
use crate::schema::PropertyDef;
use crate::types::{FieldType, Value};

#[derive(Debug, Clone, Copy)]
enum EntryName<'a, 'c> {
    Inline(&'a str),
    Property(&'c PropertyDef),
}

#[derive(Debug, Clone, Copy)]
struct DirEntry<'a, 'c> {
    name: EntryName<'a, 'c>,
    pointer: u32,
    field_type: FieldType,
}

impl<'a, 'c> DirEntry<'a, 'c> {
    fn name(&self) -> &str {
        match self.name {
            EntryName::Inline(name) => name,
            EntryName::Property(prop) => &prop.name,
        }
    }

    fn is_null(&self) -> bool {
        self.pointer == NULL_VALUE_POINTER
    }
}

fn property_key(id: i32) -> i64 {
    -(i64::from(id) + 1)
}

fn read_entry<'a, 'c>(
    ctx: &'c CodecContext,
    cursor: &mut ByteCursor<&'a [u8]>,
) -> Result<Option<DirEntry<'a, 'c>>> {
    let key = read_varint(cursor)?;
    if key == 0 {
        return Ok(None);
    }
    if key > 0 {
        let Ok(len) = usize::try_from(key) else {
            bail!(CodecError::corrupt(format!("invalid field name length {}", key)));
        };
        let name = std::str::from_utf8(cursor.read_slice(len)?)
            .map_err(|e| CodecError::corrupt(format!("invalid UTF-8 in field name: {}", e)))?;
        let pointer = u32::from_be_bytes(cursor.read_array()?);
        let field_type = FieldType::from_tag(cursor.read_u8()?)?;
        return Ok(Some(DirEntry {
            name: EntryName::Inline(name),
            pointer,
            field_type,
        }));
    }

    let Ok(id) = i32::try_from(-(key + 1)) else {
        bail!(CodecError::corrupt(format!("invalid property id key {}", key)));
    };
    let Some(prop) = ctx.schema().property_by_id(id) else {
        bail!(CodecError::corrupt(format!("unknown property id {}", id)));
    };
    let pointer = u32::from_be_bytes(cursor.read_array()?);
    let field_type = if prop.has_fixed_type() {
        prop.field_type
    } else {
        FieldType::from_tag(cursor.read_u8()?)?
    };
    Ok(Some(DirEntry {
        name: EntryName::Property(prop),
        pointer,
        field_type,
    }))
}

/// Reads the class name and positions the cursor at the first directory
/// entry.
fn read_header<'a>(cursor: &mut ByteCursor<&'a [u8]>) -> Result<Record> {
    let class = read_str(cursor)?;
    Ok(if class.is_empty() {
        Record::new()
    } else {
        Record::with_class(class)
    })
}

pub(crate) fn write_body(
    codec: &ValueCodec<'_>,
    cursor: &mut ByteCursor,
    record: &Record,
) -> Result<()> {
    let ctx = codec.context();
    write_string(cursor, record.class_name().unwrap_or(""));

    let mut pending: SmallVec<[(usize, &Value); 16]> = SmallVec::new();
    for (name, value) in record.fields() {
        let ty = value.field_type();
        match ctx.property(record.class_name(), name) {
            Some(prop) if !prop.has_fixed_type() => {
                write_varint(cursor, property_key(prop.id));
                pending.push((cursor.alloc(VALUE_POINTER_SIZE), value));
                cursor.write_u8(ty.tag());
            }
            Some(prop) if prop.field_type == ty || ty == FieldType::Null => {
                write_varint(cursor, property_key(prop.id));
                pending.push((cursor.alloc(VALUE_POINTER_SIZE), value));
            }
            found => {
                if let Some(prop) = found {
                    debug!(
                        class = record.class_name().unwrap_or_default(),
                        field = name,
                        declared = %prop.field_type,
                        actual = %ty,
                        "schema drift: writing field by name with explicit type"
                    );
                }
                ensure!(!name.is_empty(), "cannot encode a field with an empty name");
                write_string(cursor, name);
                pending.push((cursor.alloc(VALUE_POINTER_SIZE), value));
                cursor.write_u8(ty.tag());
            }
        }
    }
    write_varint(cursor, 0);

    for (slot, value) in pending {
        if value.is_null() {
            cursor.write_at(slot, &NULL_VALUE_POINTER.to_be_bytes());
            continue;
        }
        let Ok(pointer) = u32::try_from(cursor.offset()) else {
            bail!("record exceeds the 4 GiB addressable by value pointers");
        };
        codec.write_value(cursor, value)?;
        cursor.write_at(slot, &pointer.to_be_bytes());
    }
    Ok(())
}

pub(crate) fn read_body(
    codec: &ValueCodec<'_>,
    cursor: &mut ByteCursor<&[u8]>,
    depth: usize,
) -> Result<Record> {
    let ctx = codec.context();
    let mut record = read_header(cursor)?;

    let mut entries: SmallVec<[DirEntry<'_, '_>; 16]> = SmallVec::new();
    while let Some(entry) = read_entry(ctx, cursor)? {
        entries.push(entry);
    }

    let mut next_free = cursor.offset();
    for entry in &entries {
        let value = if entry.is_null() {
            Value::Null
        } else {
            let pointer = entry.pointer as usize;
            if pointer < next_free {
                bail!(CodecError::corrupt(format!(
                    "value pointer {} for field '{}' overlaps earlier data ending at {}",
                    pointer,
                    entry.name(),
                    next_free
                )));
            }
            cursor.set_offset(pointer);
            let value = codec.read_value(cursor, entry.field_type, depth)?;
            next_free = cursor.offset();
            value
        };
        record.set(entry.name(), value);
    }
    cursor.set_offset(next_free);
    Ok(record)
}

/// The storage format: schema-resolved, directory-indexed record bodies.
#[derive(Debug, Clone, Copy, Default)]
pub struct StorageSerializer;

impl StorageSerializer {
    /// Locates `name` in an encoded record and returns a view of its payload
    /// for the binary comparator. Absent fields, null fields and types the
    /// comparator cannot handle yield `None`.
    pub fn field<'a>(
        &self,
        bytes: &'a [u8],
        name: &str,
        ctx: &'a CodecContext,
    ) -> Result<Option<EncodedField<'a>>> {
        let mut cursor = ByteCursor::wrap(bytes);
        let record = read_header(&mut cursor)?;
        while let Some(entry) = read_entry(ctx, &mut cursor)? {
            if entry.name() != name {
                continue;
            }
            if entry.is_null() || !entry.field_type.is_binary_comparable() {
                return Ok(None);
            }
            let prop = match entry.name {
                EntryName::Property(prop) => Some(prop),
                EntryName::Inline(_) => ctx.property(record.class_name(), name),
            };
            let collate = prop
                .and_then(|p| p.collate.as_deref())
                .and_then(|c| ctx.collations().get(c))
                .map(|c| c.as_ref());
            let Some(data) = bytes.get(entry.pointer as usize..) else {
                bail!(CodecError::corrupt(format!(
                    "value pointer {} for field '{}' is past the end of the record",
                    entry.pointer, name
                )));
            };
            return Ok(Some(EncodedField {
                field_type: entry.field_type,
                data,
                collate,
            }));
        }
        Ok(None)
    }
}

impl RecordSerializer for StorageSerializer {
    fn name(&self) -> &'static str {
        "storage"
    }

    fn serialize(&self, record: &Record, ctx: &CodecContext) -> Result<Vec<u8>> {
        let codec = ValueCodec::new(ctx, BodyFormat::Storage);
        let mut cursor = ByteCursor::with_capacity(RECORD_BUFFER_CAPACITY);
        write_body(&codec, &mut cursor, record)?;
        Ok(cursor.into_bytes())
    }

    fn deserialize(&self, bytes: &[u8], ctx: &CodecContext) -> Result<Record> {
        let codec = ValueCodec::new(ctx, BodyFormat::Storage);
        read_body(&codec, &mut ByteCursor::wrap(bytes), 0)
    }

    fn deserialize_partial(
        &self,
        bytes: &[u8],
        fields: &[&str],
        ctx: &CodecContext,
    ) -> Result<Record> {
        let codec = ValueCodec::new(ctx, BodyFormat::Storage);
        let mut cursor = ByteCursor::wrap(bytes);
        let mut record = read_header(&mut cursor)?;
        let mut wanted: SmallVec<[&str; 8]> = fields.iter().copied().collect();

        while !wanted.is_empty() {
            let Some(entry) = read_entry(ctx, &mut cursor)? else {
                break;
            };
            let Some(idx) = wanted.iter().position(|w| *w == entry.name()) else {
                continue;
            };
            wanted.swap_remove(idx);

            let value = if entry.is_null() {
                Value::Null
            } else {
                let resume = cursor.offset();
                cursor.set_offset(entry.pointer as usize);
                let value = codec.read_value(&mut cursor, entry.field_type, 0)?;
                cursor.set_offset(resume);
                value
            };
            record.set(entry.name(), value);
        }

        for missing in &wanted {
            trace!(field = *missing, "partial fetch: field not present in record");
        }
        Ok(record)
    }

    fn field_names(&self, bytes: &[u8], ctx: &CodecContext) -> Result<Vec<String>> {
        let mut cursor = ByteCursor::wrap(bytes);
        read_header(&mut cursor)?;
        let mut names = Vec::new();
        while let Some(entry) = read_entry(ctx, &mut cursor)? {
            names.push(entry.name().to_string());
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::CodecConfig;
    use crate::encoding::varint::zigzag_encode;
    use crate::schema::SchemaRegistry;
    use crate::types::RecordId;

    fn person_ctx() -> CodecContext {
        let mut schema = SchemaRegistry::new();
        schema.create_class("Person").unwrap();
        schema
            .create_property("Person", "name", FieldType::String)
            .unwrap();
        schema
            .create_property("Person", "age", FieldType::Integer)
            .unwrap();
        schema.create_property("Person", "extra", FieldType::Any).unwrap();
        let tag = schema
            .create_property("Person", "tag", FieldType::String)
            .unwrap();
        schema.set_collate(tag, "ci").unwrap();
        CodecContext::builder()
            .schema(Arc::new(schema))
            .build()
            .unwrap()
    }

    #[test]
    fn schemaless_layout_is_byte_exact() {
        let ctx = CodecContext::default();
        let record = Record::new().with("a", 1i32);
        let bytes = StorageSerializer.serialize(&record, &ctx).unwrap();
        assert_eq!(
            bytes,
            vec![
                0x00, // no class
                0x02, b'a', 0, 0, 0, 9, 1, // "a" -> pointer 9, INTEGER
                0x00, // end of directory
                0, 0, 0, 1, // value
            ]
        );
    }

    #[test]
    fn schemaless_round_trip_keeps_order_and_width() {
        let ctx = CodecContext::default();
        let record = Record::new().with("name", "name").with("age", 20i32);
        let bytes = StorageSerializer.serialize(&record, &ctx).unwrap();
        let back = StorageSerializer.deserialize(&bytes, &ctx).unwrap();
        assert_eq!(back.field_names().collect::<Vec<_>>(), vec!["name", "age"]);
        assert_eq!(back.field("age"), Some(&Value::Integer(20)));
    }

    #[test]
    fn declared_properties_are_written_by_id_without_tag() {
        let ctx = person_ctx();
        let record = Record::with_class("Person").with("age", 20i32);
        let bytes = StorageSerializer.serialize(&record, &ctx).unwrap();
        let age_id = ctx.property(Some("Person"), "age").unwrap().id;

        // class "Person", then -(id+1) zigzagged, pointer, terminator, value
        let dir = 1 + "Person".len();
        assert_eq!(u64::from(bytes[dir]), zigzag_encode(property_key(age_id)));
        assert_eq!(bytes[dir + 5], 0x00);
        assert_eq!(bytes.len(), dir + 6 + 4);

        let back = StorageSerializer.deserialize(&bytes, &ctx).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn schema_drift_falls_back_to_named_entry() {
        let ctx = person_ctx();
        let record = Record::with_class("Person")
            .with("age", "twenty")
            .with("name", "Ada");
        let bytes = StorageSerializer.serialize(&record, &ctx).unwrap();
        let back = StorageSerializer.deserialize(&bytes, &ctx).unwrap();
        assert_eq!(back.field("age"), Some(&Value::from("twenty")));
        assert_eq!(back, record);
    }

    #[test]
    fn any_property_carries_a_tag() {
        let ctx = person_ctx();
        let record = Record::with_class("Person")
            .with("extra", 3.5f64)
            .with("name", Value::Null);
        let bytes = StorageSerializer.serialize(&record, &ctx).unwrap();
        let back = StorageSerializer.deserialize(&bytes, &ctx).unwrap();
        assert_eq!(back, record);
        assert_eq!(back.field("name"), Some(&Value::Null));
    }

    #[test]
    fn embedded_records_nest_bodies() {
        let ctx = person_ctx();
        let inner = Record::with_class("Person").with("name", "Bob").with("age", 7i32);
        let record = Record::with_class("Person")
            .with("name", "Ada")
            .with("child", inner)
            .with("age", 36i32);
        let bytes = StorageSerializer.serialize(&record, &ctx).unwrap();
        assert_eq!(StorageSerializer.deserialize(&bytes, &ctx).unwrap(), record);
    }

    #[test]
    fn partial_fetch_returns_requested_fields_only() {
        let ctx = person_ctx();
        let record = Record::with_class("Person")
            .with("name", "Ada")
            .with("age", 36i32)
            .with("city", "London");
        let bytes = StorageSerializer.serialize(&record, &ctx).unwrap();

        let partial = StorageSerializer
            .deserialize_partial(&bytes, &["city", "missing", "age"], &ctx)
            .unwrap();
        assert_eq!(partial.field_names().collect::<Vec<_>>(), vec!["age", "city"]);
        assert_eq!(partial.field("age"), Some(&Value::Integer(36)));
        assert!(!partial.contains("missing"));
        assert_eq!(partial.class_name(), Some("Person"));
    }

    #[test]
    fn field_names_reads_directory_only() {
        let ctx = person_ctx();
        let record = Record::with_class("Person")
            .with("name", "Ada")
            .with("nick", "A");
        let bytes = StorageSerializer.serialize(&record, &ctx).unwrap();
        assert_eq!(
            StorageSerializer.field_names(&bytes, &ctx).unwrap(),
            vec!["name".to_string(), "nick".to_string()]
        );
    }

    #[test]
    fn field_extraction_carries_collate() {
        let ctx = person_ctx();
        let record = Record::with_class("Person")
            .with("tag", "Hot")
            .with("age", 5i32)
            .with("list", Value::EmbeddedList(vec![]))
            .with("gone", Value::Null);
        let bytes = StorageSerializer.serialize(&record, &ctx).unwrap();

        let tag = StorageSerializer.field(&bytes, "tag", &ctx).unwrap().unwrap();
        assert_eq!(tag.field_type, FieldType::String);
        assert_eq!(tag.collate.map(|c| c.name()), Some("ci"));

        let age = StorageSerializer.field(&bytes, "age", &ctx).unwrap().unwrap();
        assert_eq!(age.field_type, FieldType::Integer);
        assert_eq!(&age.data[..4], &[0, 0, 0, 5]);
        assert!(age.collate.is_none());

        assert!(StorageSerializer.field(&bytes, "list", &ctx).unwrap().is_none());
        assert!(StorageSerializer.field(&bytes, "gone", &ctx).unwrap().is_none());
        assert!(StorageSerializer.field(&bytes, "nope", &ctx).unwrap().is_none());
    }

    #[test]
    fn unknown_property_id_is_corrupt() {
        let ctx = person_ctx();
        let bytes = StorageSerializer
            .serialize(&Record::with_class("Person").with("age", 1i32), &ctx)
            .unwrap();
        let err = StorageSerializer
            .deserialize(&bytes, &CodecContext::default())
            .unwrap_err();
        assert!(matches!(
            CodecError::of(&err),
            Some(CodecError::CorruptData(_))
        ));
    }

    #[test]
    fn overlapping_pointers_are_corrupt() {
        let ctx = CodecContext::default();
        let record = Record::new().with("a", 1i32).with("b", 2i32);
        let mut bytes = StorageSerializer.serialize(&record, &ctx).unwrap();
        // Point "b" at "a"'s payload.
        let a_ptr = bytes[3..7].to_vec();
        bytes[10..14].copy_from_slice(&a_ptr);
        assert!(StorageSerializer.deserialize(&bytes, &ctx).is_err());
    }

    #[test]
    fn truncated_input_is_corrupt() {
        let ctx = CodecContext::default();
        let record = Record::new().with("name", "a long enough value").with("n", 1i64);
        let bytes = StorageSerializer.serialize(&record, &ctx).unwrap();
        for cut in [1, 5, bytes.len() - 1] {
            let err = StorageSerializer.deserialize(&bytes[..cut], &ctx).unwrap_err();
            assert!(CodecError::of(&err).unwrap().is_serialization_error());
        }
    }

    #[test]
    fn self_referencing_embedded_pointer_is_rejected() {
        let ctx = CodecContext::builder()
            .config(CodecConfig::default().with_max_nesting_depth(8))
            .build()
            .unwrap();
        // "e" points at offset 1, inside its own directory.
        let bytes = vec![0x00, 0x02, b'e', 0, 0, 0, 1, FieldType::Embedded.tag(), 0x00];
        assert!(StorageSerializer.deserialize(&bytes, &ctx).is_err());
    }

    #[test]
    fn link_fields_round_trip() {
        let ctx = CodecContext::default();
        let record = Record::new()
            .with("owner", RecordId::new(9, 1))
            .with("friends", Value::LinkList(vec![Value::Link(RecordId::new(9, 2))]));
        let bytes = StorageSerializer.serialize(&record, &ctx).unwrap();
        assert_eq!(StorageSerializer.deserialize(&bytes, &ctx).unwrap(), record);
    }
}
