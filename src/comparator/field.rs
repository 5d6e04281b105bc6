//! # Encoded Fields
//!
//! An [`EncodedField`] is a view into an already-encoded buffer: the
//! declared type, the bytes starting at the value payload, and the collate
//! of the field it came from. Index structures hand pairs of these to the
//! comparator without ever building a `Value`.
//!
//! Only the scalar payloads the comparator needs are decoded here, and
//! strings and binaries stay borrowed from the buffer.

use chrono::DateTime;
use eyre::{bail, Result};

use crate::encoding::{read_varint, read_varint_i32, read_varint_len, ByteCursor};
use crate::error::CodecError;
use crate::schema::Collate;
use crate::serializer::CodecContext;
use crate::types::{Decimal, FieldType, RecordId};

#[derive(Debug, Clone, Copy)]
pub struct EncodedField<'a> {
    pub field_type: FieldType,
    pub data: &'a [u8],
    pub collate: Option<&'a dyn Collate>,
}

impl<'a> EncodedField<'a> {
    pub fn new(field_type: FieldType, data: &'a [u8]) -> Self {
        Self {
            field_type,
            data,
            collate: None,
        }
    }

    pub fn with_collate(mut self, collate: &'a dyn Collate) -> Self {
        self.collate = Some(collate);
        self
    }

    /// Decodes the payload into a comparable scalar.
    pub(crate) fn scalar(&self, ctx: &CodecContext) -> Result<Scalar<'a>> {
        let mut cursor = ByteCursor::wrap(self.data);
        let scalar = match self.field_type {
            FieldType::Boolean => Scalar::Boolean(cursor.read_u8()? != 0),
            FieldType::Byte => Scalar::Number(Number::Int(i64::from(i8::from_be_bytes(
                cursor.read_array()?,
            )))),
            FieldType::Short => Scalar::Number(Number::Int(i64::from(i16::from_be_bytes(
                cursor.read_array()?,
            )))),
            FieldType::Integer => Scalar::Number(Number::Int(i64::from(i32::from_be_bytes(
                cursor.read_array()?,
            )))),
            FieldType::Long => Scalar::Number(Number::Int(i64::from_be_bytes(cursor.read_array()?))),
            FieldType::Float => Scalar::Number(Number::Float(f32::from_bits(u32::from_be_bytes(
                cursor.read_array()?,
            )))),
            FieldType::Double => Scalar::Number(Number::Double(f64::from_bits(
                u64::from_be_bytes(cursor.read_array()?),
            ))),
            FieldType::Decimal => {
                let scale = read_varint_i32(&mut cursor)?;
                let len = read_varint_len(&mut cursor)?;
                Scalar::Number(Number::Decimal(Decimal::from_be_bytes(
                    cursor.read_slice(len)?,
                    scale,
                )?))
            }
            FieldType::String => {
                let len = read_varint_len(&mut cursor)?;
                let text = std::str::from_utf8(cursor.read_slice(len)?)
                    .map_err(|e| CodecError::corrupt(format!("invalid UTF-8: {}", e)))?;
                Scalar::String(text)
            }
            FieldType::Binary => {
                let len = read_varint_len(&mut cursor)?;
                Scalar::Binary(cursor.read_slice(len)?)
            }
            FieldType::Date => Scalar::Date(ctx.days_to_date(read_varint(&mut cursor)?)?),
            FieldType::DateTime => Scalar::DateTime(read_varint(&mut cursor)?),
            FieldType::Link => {
                let cluster_id = read_varint_i32(&mut cursor)?;
                let position = read_varint(&mut cursor)?;
                Scalar::Link(RecordId::new(cluster_id, position))
            }
            other => bail!(CodecError::Incomparable {
                left: other,
                right: other
            }),
        };
        Ok(scalar)
    }
}

/// A numeric payload, widened without loss.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Number {
    Int(i64),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
}

impl Number {
    pub(crate) fn canonical_text(&self) -> String {
        match self {
            Number::Int(v) => v.to_string(),
            Number::Float(v) => v.to_string(),
            Number::Double(v) => v.to_string(),
            Number::Decimal(v) => v.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Scalar<'a> {
    Boolean(bool),
    Number(Number),
    String(&'a str),
    Binary(&'a [u8]),
    /// Epoch millis at midnight in the database timezone.
    Date(i64),
    DateTime(i64),
    Link(RecordId),
}

/// Renders epoch millis with a chrono pattern in the given timezone.
pub(crate) fn format_millis(ctx: &CodecContext, millis: i64, pattern: &str) -> Result<String> {
    use std::fmt::Write;

    let Some(utc) = DateTime::from_timestamp_millis(millis) else {
        bail!("timestamp {} is out of range", millis);
    };
    let mut out = String::new();
    if write!(out, "{}", utc.with_timezone(&ctx.timezone()).format(pattern)).is_err() {
        bail!("invalid date format pattern '{}'", pattern);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::encode_value;
    use crate::types::Value;

    fn scalar_of(value: Value) -> Scalar<'static> {
        let ctx = CodecContext::default();
        let ty = value.field_type();
        let bytes: &'static [u8] = Box::leak(encode_value(&value, &ctx).unwrap().into_boxed_slice());
        EncodedField::new(ty, bytes).scalar(&ctx).unwrap()
    }

    #[test]
    fn integer_widths_decode_to_int() {
        assert_eq!(scalar_of(Value::Byte(-3)), Scalar::Number(Number::Int(-3)));
        assert_eq!(scalar_of(Value::Short(300)), Scalar::Number(Number::Int(300)));
        assert_eq!(scalar_of(Value::Integer(10)), Scalar::Number(Number::Int(10)));
        assert_eq!(scalar_of(Value::Long(i64::MIN)), Scalar::Number(Number::Int(i64::MIN)));
    }

    #[test]
    fn strings_borrow_from_the_buffer() {
        let ctx = CodecContext::default();
        let bytes = encode_value(&Value::from("hello"), &ctx).unwrap();
        let field = EncodedField::new(FieldType::String, &bytes);
        match field.scalar(&ctx).unwrap() {
            Scalar::String(s) => {
                assert_eq!(s, "hello");
                assert!(std::ptr::eq(s.as_ptr(), bytes[1..].as_ptr()));
            }
            other => panic!("unexpected scalar {:?}", other),
        }
    }

    #[test]
    fn structural_types_are_incomparable() {
        let ctx = CodecContext::default();
        let field = EncodedField::new(FieldType::EmbeddedList, &[0x00]);
        let err = field.scalar(&ctx).unwrap_err();
        assert!(matches!(
            CodecError::of(&err),
            Some(CodecError::Incomparable { .. })
        ));
    }

    #[test]
    fn format_millis_uses_context_timezone() {
        let ctx = CodecContext::default();
        assert_eq!(
            format_millis(&ctx, 0, "%Y-%m-%d %H:%M:%S").unwrap(),
            "1970-01-01 00:00:00"
        );
    }
}
