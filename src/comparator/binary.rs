//! # Binary Comparator
//!
//! Orders two [`EncodedField`]s straight from their encoded bytes. Index
//! lookups and range scans use it to compare a stored key against a probe
//! without decoding either into a `Value`.
//!
//! ## Coercion Matrix
//!
//! | Left \ Right | numeric | String | Date/DateTime |
//! |--------------|---------|--------|---------------|
//! | numeric | exact numeric | parse as left's type | epoch millis |
//! | Date/DateTime | epoch millis | parse, else formatted text | epoch millis |
//! | Link | - | `#c:p` text | - |
//! | Boolean | - | `"true"` / `"false"` text | - |
//!
//! String vs String goes through a collate, Binary vs Binary is plain byte
//! order, Link vs Link orders by cluster then position. Every rule is
//! symmetric: `compare(b, a)` is always `compare(a, b).reverse()`.
//!
//! Pairs outside the matrix fail with [`CodecError::Incomparable`] from both
//! [`BinaryComparator::compare`] and [`BinaryComparator::is_equal`], which is
//! defined as `compare(a, b) == Equal`.
//!
//! ## Numeric Exactness
//!
//! Integers are widened to `i64`, floats to `f64`. Integer vs float compares
//! the float's integral and fractional parts separately so no integer is
//! rounded. Decimals compare by rescaling, and a float meets a decimal
//! through its shortest round-trip text. NaN sorts above every number and
//! equals itself, `-0.0` equals `0.0`.

use std::cmp::Ordering;

use chrono::{NaiveDate, NaiveDateTime, TimeZone};
use eyre::{bail, Result};

use super::field::{format_millis, EncodedField, Number, Scalar};
use crate::error::CodecError;
use crate::schema::Collate;
use crate::serializer::CodecContext;
use crate::types::{Decimal, FieldType};

/// 2^63 as a float, the first value above every `i64`.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

#[derive(Debug, Clone, Copy)]
pub struct BinaryComparator<'c> {
    ctx: &'c CodecContext,
}

impl<'c> BinaryComparator<'c> {
    pub fn new(ctx: &'c CodecContext) -> Self {
        Self { ctx }
    }

    pub fn is_binary_comparable(field_type: FieldType) -> bool {
        field_type.is_binary_comparable()
    }

    pub fn is_equal(&self, a: &EncodedField<'_>, b: &EncodedField<'_>) -> Result<bool> {
        Ok(self.compare(a, b)? == Ordering::Equal)
    }

    pub fn compare(&self, a: &EncodedField<'_>, b: &EncodedField<'_>) -> Result<Ordering> {
        let incomparable = || CodecError::Incomparable {
            left: a.field_type,
            right: b.field_type,
        };
        if !a.field_type.is_binary_comparable() || !b.field_type.is_binary_comparable() {
            bail!(incomparable());
        }
        let left = a.scalar(self.ctx)?;
        let right = b.scalar(self.ctx)?;

        match self.compare_scalars(a, &left, b, &right)? {
            Some(ord) => Ok(ord),
            None => match self.compare_scalars(b, &right, a, &left)? {
                Some(ord) => Ok(ord.reverse()),
                None => bail!(incomparable()),
            },
        }
    }

    /// Handles one orientation of each mixed pair; `compare` tries the
    /// mirrored orientation when this returns `None`.
    fn compare_scalars(
        &self,
        a: &EncodedField<'_>,
        left: &Scalar<'_>,
        b: &EncodedField<'_>,
        right: &Scalar<'_>,
    ) -> Result<Option<Ordering>> {
        let ord = match (left, right) {
            (Scalar::Number(x), Scalar::Number(y)) => compare_numbers(x, y),
            (Scalar::Number(x), Scalar::Date(m) | Scalar::DateTime(m)) => {
                compare_numbers(x, &Number::Int(*m))
            }
            (Scalar::Number(x), Scalar::String(s)) => match parse_number(a.field_type, s) {
                Some(parsed) => compare_numbers(x, &parsed),
                None => x.canonical_text().as_str().cmp(s),
            },
            (
                Scalar::Date(x) | Scalar::DateTime(x),
                Scalar::Date(y) | Scalar::DateTime(y),
            ) => x.cmp(y),
            (Scalar::Date(m), Scalar::String(s)) => self.compare_temporal(*m, true, s)?,
            (Scalar::DateTime(m), Scalar::String(s)) => self.compare_temporal(*m, false, s)?,
            (Scalar::String(x), Scalar::String(y)) => {
                select_collate(self.ctx, a.collate, b.collate).compare(x, y)
            }
            (Scalar::Boolean(x), Scalar::Boolean(y)) => x.cmp(y),
            (Scalar::Boolean(x), Scalar::String(s)) => bool_text(*x).cmp(s),
            (Scalar::Binary(x), Scalar::Binary(y)) => x.cmp(y),
            (Scalar::Link(x), Scalar::Link(y)) => x.cmp(y),
            (Scalar::Link(rid), Scalar::String(s)) => rid.to_string().as_str().cmp(s),
            _ => return Ok(None),
        };
        Ok(Some(ord))
    }

    /// Compares a temporal value against text. Digit-only text is epoch
    /// millis; otherwise the datetime pattern is tried, then the date pattern.
    /// Text that parses as neither is compared against the formatted value.
    fn compare_temporal(&self, millis: i64, whole_days: bool, text: &str) -> Result<Ordering> {
        match self.parse_temporal(text) {
            Some(parsed) => {
                let parsed = if whole_days {
                    self.ctx.days_to_date(self.ctx.date_to_days(parsed))?
                } else {
                    parsed
                };
                Ok(millis.cmp(&parsed))
            }
            None => {
                let config = self.ctx.config();
                let pattern = if whole_days {
                    config.date_format()
                } else {
                    config.datetime_format()
                };
                let formatted = format_millis(self.ctx, millis, pattern)?;
                Ok(formatted.as_str().cmp(text))
            }
        }
    }

    fn parse_temporal(&self, text: &str) -> Option<i64> {
        if is_long(text) {
            return text.parse().ok();
        }
        let config = self.ctx.config();
        let tz = self.ctx.timezone();
        let local = NaiveDateTime::parse_from_str(text, config.datetime_format())
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(text, config.date_format())
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })?;
        tz.from_local_datetime(&local)
            .single()
            .map(|dt| dt.timestamp_millis())
    }
}

fn is_long(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn bool_text(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Picks the collate for a String pair. A non-default collate wins over the
/// default one; between two non-default collates the name sorting first
/// wins, so the choice does not depend on argument order.
fn select_collate<'a>(
    ctx: &'a CodecContext,
    a: Option<&'a dyn Collate>,
    b: Option<&'a dyn Collate>,
) -> &'a dyn Collate {
    let a = a.filter(|c| !c.is_default());
    let b = b.filter(|c| !c.is_default());
    match (a, b) {
        (Some(x), Some(y)) => {
            if y.name() < x.name() {
                y
            } else {
                x
            }
        }
        (Some(x), None) | (None, Some(x)) => x,
        (None, None) => ctx.collate(None),
    }
}

/// Parses text as a number of the given type, as it would be read from a
/// query literal.
fn parse_number(field_type: FieldType, text: &str) -> Option<Number> {
    match field_type {
        FieldType::Byte => text.parse::<i8>().ok().map(|v| Number::Int(v.into())),
        FieldType::Short => text.parse::<i16>().ok().map(|v| Number::Int(v.into())),
        FieldType::Integer => text.parse::<i32>().ok().map(|v| Number::Int(v.into())),
        FieldType::Long => text.parse::<i64>().ok().map(Number::Int),
        FieldType::Float => text.parse::<f32>().ok().map(Number::Float),
        FieldType::Double => text.parse::<f64>().ok().map(Number::Double),
        FieldType::Decimal => text.parse::<Decimal>().ok().map(Number::Decimal),
        _ => None,
    }
}

fn compare_numbers(a: &Number, b: &Number) -> Ordering {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x.cmp(y),
        (Number::Decimal(x), Number::Decimal(y)) => x.numeric_cmp(y),
        (Number::Int(x), Number::Decimal(d)) => Decimal::from_i64(*x).numeric_cmp(d),
        (Number::Decimal(d), Number::Int(x)) => d.numeric_cmp(&Decimal::from_i64(*x)),
        (Number::Int(x), _) => compare_int_float(*x, float_of(b)),
        (_, Number::Int(y)) => compare_int_float(*y, float_of(a)).reverse(),
        (Number::Decimal(d), _) => compare_decimal_float(d, float_of(b)),
        (_, Number::Decimal(d)) => compare_decimal_float(d, float_of(a)).reverse(),
        _ => compare_floats(float_of(a), float_of(b)),
    }
}

fn float_of(n: &Number) -> f64 {
    match n {
        Number::Int(v) => *v as f64,
        Number::Float(v) => f64::from(*v),
        Number::Double(v) => *v,
        Number::Decimal(d) => d.to_f64(),
    }
}

fn compare_floats(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

fn compare_int_float(i: i64, f: f64) -> Ordering {
    if f.is_nan() || f >= I64_BOUND {
        return Ordering::Less;
    }
    if f < -I64_BOUND {
        return Ordering::Greater;
    }
    let whole = f.trunc();
    match i.cmp(&(whole as i64)) {
        Ordering::Equal => compare_floats(0.0, f - whole),
        ord => ord,
    }
}

fn compare_decimal_float(d: &Decimal, f: f64) -> Ordering {
    if f.is_nan() || f == f64::INFINITY {
        return Ordering::Less;
    }
    if f == f64::NEG_INFINITY {
        return Ordering::Greater;
    }
    match Decimal::from_f64(f) {
        Ok(converted) => d.numeric_cmp(&converted),
        Err(_) => compare_floats(d.to_f64(), f),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CaseInsensitiveCollate, DefaultCollate};
    use crate::serializer::encode_value;
    use crate::types::{RecordId, Value};

    fn encoded(value: impl Into<Value>, ctx: &CodecContext) -> (FieldType, Vec<u8>) {
        let value = value.into();
        (value.field_type(), encode_value(&value, ctx).unwrap())
    }

    fn cmp(a: impl Into<Value>, b: impl Into<Value>) -> Ordering {
        let ctx = CodecContext::default();
        let (ta, da) = encoded(a, &ctx);
        let (tb, db) = encoded(b, &ctx);
        let comparator = BinaryComparator::new(&ctx);
        let fa = EncodedField::new(ta, &da);
        let fb = EncodedField::new(tb, &db);
        let ord = comparator.compare(&fa, &fb).unwrap();
        assert_eq!(comparator.compare(&fb, &fa).unwrap(), ord.reverse());
        assert_eq!(comparator.is_equal(&fa, &fb).unwrap(), ord == Ordering::Equal);
        ord
    }

    #[test]
    fn integer_against_string() {
        assert_eq!(cmp(10i32, "10"), Ordering::Equal);
        assert_eq!(cmp(10i32, "11"), Ordering::Less);
        assert_eq!(cmp(10i32, "9"), Ordering::Greater);
    }

    #[test]
    fn unparseable_string_compares_textually() {
        assert_eq!(cmp(10i32, "abc"), Ordering::Less);
        assert_eq!(cmp(10i32, "1"), Ordering::Greater);
        // Out of range for a byte, so "300" is compared as text.
        assert_eq!(cmp(3i8, "300"), "3".cmp("300"));
    }

    #[test]
    fn mixed_widths_compare_numerically() {
        assert_eq!(cmp(5i8, 5i64), Ordering::Equal);
        assert_eq!(cmp(i64::MAX, 9.3e18f64), Ordering::Less);
        assert_eq!(cmp(i64::MAX - 1, i64::MAX as f64), Ordering::Less);
        assert_eq!(cmp(3i32, 3.5f32), Ordering::Less);
        assert_eq!(cmp(-3i32, -3.5f64), Ordering::Greater);
        assert_eq!(cmp(1.5f32, 1.5f64), Ordering::Equal);
    }

    #[test]
    fn decimals_compare_exactly() {
        assert_eq!(cmp(Decimal::new(100, 2), 1i32), Ordering::Equal);
        assert_eq!(cmp(Decimal::new(1, 1), 0.1f64), Ordering::Equal);
        assert_eq!(cmp(Decimal::new(10000000000000001, 16), 1.0f64), Ordering::Greater);
        assert_eq!(cmp(Decimal::new(15, 1), "1.50"), Ordering::Equal);
    }

    #[test]
    fn nan_and_signed_zero() {
        assert_eq!(cmp(f64::NAN, f64::INFINITY), Ordering::Greater);
        assert_eq!(cmp(f64::NAN, f64::NAN), Ordering::Equal);
        assert_eq!(cmp(-0.0f64, 0.0f64), Ordering::Equal);
        assert_eq!(cmp(f64::NAN, i64::MAX), Ordering::Greater);
    }

    #[test]
    fn boolean_against_string() {
        assert_eq!(cmp(true, "true"), Ordering::Equal);
        assert_eq!(cmp(false, "false"), Ordering::Equal);
        assert_eq!(cmp(false, "true"), Ordering::Less);
        assert_eq!(cmp(true, "TRUE"), "true".cmp("TRUE"));
        assert_eq!(cmp(false, true), Ordering::Less);
    }

    #[test]
    fn link_against_string_and_link() {
        assert_eq!(cmp(RecordId::new(12, 5), "#12:5"), Ordering::Equal);
        assert_eq!(cmp(RecordId::new(12, 5), RecordId::new(12, 6)), Ordering::Less);
        assert_eq!(cmp(RecordId::new(13, 0), RecordId::new(12, 6)), Ordering::Greater);
    }

    #[test]
    fn binary_is_byte_order() {
        assert_eq!(cmp(vec![1u8, 2], vec![1u8, 2, 0]), Ordering::Less);
        assert_eq!(cmp(vec![2u8], vec![1u8, 9]), Ordering::Greater);
        assert_eq!(cmp(vec![7u8], vec![7u8]), Ordering::Equal);
    }

    #[test]
    fn datetime_against_string() {
        let millis = 1_710_072_000_000i64; // 2024-03-10 12:00:00 UTC
        assert_eq!(cmp(Value::DateTime(millis), "2024-03-10 12:00:00"), Ordering::Equal);
        assert_eq!(cmp(Value::DateTime(millis), "2024-03-10 12:00:01"), Ordering::Less);
        assert_eq!(cmp(Value::DateTime(millis), millis.to_string()), Ordering::Equal);
        assert_eq!(cmp(Value::DateTime(millis), "2024-03-10"), Ordering::Greater);
        assert_eq!(cmp(Value::DateTime(millis), "not a date"), "2024-03-10 12:00:00".cmp("not a date"));
    }

    #[test]
    fn date_truncates_to_whole_days() {
        let midnight = 1_710_028_800_000i64; // 2024-03-10 00:00:00 UTC
        assert_eq!(cmp(Value::Date(midnight), "2024-03-10"), Ordering::Equal);
        assert_eq!(cmp(Value::Date(midnight), "2024-03-10 17:45:00"), Ordering::Equal);
        assert_eq!(cmp(Value::Date(midnight), "2024-03-11"), Ordering::Less);
        assert_eq!(cmp(Value::Date(midnight), Value::DateTime(midnight)), Ordering::Equal);
        assert_eq!(cmp(Value::Date(midnight), midnight), Ordering::Equal);
    }

    #[test]
    fn strings_use_the_non_default_collate() {
        let ctx = CodecContext::default();
        let comparator = BinaryComparator::new(&ctx);
        let (_, upper) = encoded("Alice", &ctx);
        let (_, lower) = encoded("alice", &ctx);

        let plain = EncodedField::new(FieldType::String, &upper);
        let ci = EncodedField::new(FieldType::String, &lower).with_collate(&CaseInsensitiveCollate);
        assert!(comparator.is_equal(&plain, &ci).unwrap());
        assert!(comparator.is_equal(&ci, &plain).unwrap());

        let default = EncodedField::new(FieldType::String, &lower).with_collate(&DefaultCollate);
        assert!(!comparator.is_equal(&plain, &default).unwrap());
        assert_eq!(comparator.compare(&plain, &default).unwrap(), Ordering::Less);
    }

    #[test]
    fn structural_pairs_are_incomparable() {
        let ctx = CodecContext::default();
        let comparator = BinaryComparator::new(&ctx);
        let (_, text) = encoded("x", &ctx);
        let (_, bin) = encoded(vec![1u8], &ctx);
        let a = EncodedField::new(FieldType::String, &text);
        let b = EncodedField::new(FieldType::Binary, &bin);
        for err in [
            comparator.compare(&a, &b).unwrap_err(),
            comparator.is_equal(&b, &a).unwrap_err(),
        ] {
            assert!(matches!(
                CodecError::of(&err),
                Some(CodecError::Incomparable { .. })
            ));
        }
        assert!(!BinaryComparator::is_binary_comparable(FieldType::EmbeddedMap));
        assert!(BinaryComparator::is_binary_comparable(FieldType::Decimal));
    }
}
