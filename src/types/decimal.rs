//! # Exact Decimal Values
//!
//! `Decimal` is an unscaled 128-bit integer with a base-10 scale:
//! `value = unscaled × 10^-scale`. It covers the precision the codec needs
//! for exact comparison without pulling in an arbitrary-precision library.
//!
//! ## Equality vs Numeric Order
//!
//! `PartialEq` is structural: `1.0` (unscaled 10, scale 1) and `1.00`
//! (unscaled 100, scale 2) are different values, which is what a codec
//! round-trip must preserve. [`Decimal::numeric_cmp`] orders by numeric
//! value and treats those two as equal.
//!
//! ## Encoding
//!
//! [`Decimal::to_be_bytes_minimal`] produces the shortest big-endian two's
//! complement form of the unscaled value (at least one byte);
//! [`Decimal::from_be_bytes`] sign-extends it back.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use eyre::{bail, ensure, Result};

use crate::config::MAX_DECIMAL_SCALE;
use crate::error::CodecError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decimal {
    unscaled: i128,
    scale: i32,
}

fn pow10(exp: u32) -> Option<i128> {
    10i128.checked_pow(exp)
}

impl Decimal {
    pub const fn new(unscaled: i128, scale: i32) -> Self {
        Self { unscaled, scale }
    }

    pub fn unscaled(&self) -> i128 {
        self.unscaled
    }

    pub fn scale(&self) -> i32 {
        self.scale
    }

    pub fn from_i64(value: i64) -> Self {
        Self::new(i128::from(value), 0)
    }

    /// Converts a float through its shortest round-trip text, so `0.1f64`
    /// becomes exactly `0.1` rather than its binary expansion.
    pub fn from_f64(value: f64) -> Result<Self> {
        ensure!(value.is_finite(), "cannot convert {} to a decimal", value);
        value.to_string().parse()
    }

    pub fn to_f64(&self) -> f64 {
        let v = self.unscaled as f64;
        if self.scale >= 0 {
            v / 10f64.powi(self.scale)
        } else {
            v * 10f64.powi(-self.scale)
        }
    }

    /// True if the scale lies within `±MAX_DECIMAL_SCALE`.
    pub fn has_encodable_scale(&self) -> bool {
        self.scale.unsigned_abs() <= MAX_DECIMAL_SCALE.unsigned_abs()
    }

    pub fn signum(&self) -> i32 {
        self.unscaled.signum() as i32
    }

    /// Orders two decimals by numeric value regardless of scale.
    pub fn numeric_cmp(&self, other: &Decimal) -> Ordering {
        if self.scale == other.scale {
            return self.unscaled.cmp(&other.unscaled);
        }
        let (sa, sb) = (self.signum(), other.signum());
        if sa != sb {
            return sa.cmp(&sb);
        }
        if sa == 0 {
            return Ordering::Equal;
        }
        // Rescale the side with the smaller scale up to the larger one. If
        // that overflows, its magnitude exceeds anything the other side can
        // hold, so the shared sign decides.
        let (lower, higher, flipped) = if self.scale < other.scale {
            (self, other, false)
        } else {
            (other, self, true)
        };
        let diff = (i64::from(higher.scale) - i64::from(lower.scale)) as u64;
        let rescaled = u32::try_from(diff)
            .ok()
            .and_then(pow10)
            .and_then(|factor| lower.unscaled.checked_mul(factor));
        let ord = match rescaled {
            Some(v) => v.cmp(&higher.unscaled),
            None if sa > 0 => Ordering::Greater,
            None => Ordering::Less,
        };
        if flipped {
            ord.reverse()
        } else {
            ord
        }
    }

    pub fn numeric_eq(&self, other: &Decimal) -> bool {
        self.numeric_cmp(other) == Ordering::Equal
    }

    pub fn to_be_bytes_minimal(&self) -> Vec<u8> {
        let bytes = self.unscaled.to_be_bytes();
        let negative = self.unscaled < 0;
        let filler = if negative { 0xFF } else { 0x00 };
        let mut start = 0;
        while start < bytes.len() - 1 {
            let next_sign = bytes[start + 1] & 0x80 != 0;
            if bytes[start] == filler && next_sign == negative {
                start += 1;
            } else {
                break;
            }
        }
        bytes[start..].to_vec()
    }

    pub fn from_be_bytes(bytes: &[u8], scale: i32) -> Result<Self> {
        if bytes.is_empty() || bytes.len() > 16 {
            bail!(CodecError::corrupt(format!(
                "invalid decimal width: {} bytes",
                bytes.len()
            )));
        }
        let filler = if bytes[0] & 0x80 != 0 { 0xFF } else { 0x00 };
        let mut buf = [filler; 16];
        buf[16 - bytes.len()..].copy_from_slice(bytes);
        let decimal = Self::new(i128::from_be_bytes(buf), scale);
        if !decimal.has_encodable_scale() {
            bail!(CodecError::corrupt(format!(
                "decimal scale {} outside ±{}",
                scale, MAX_DECIMAL_SCALE
            )));
        }
        Ok(decimal)
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Self::from_i64(value)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale <= 0 {
            write!(f, "{}", self.unscaled)?;
            for _ in 0..self.scale.unsigned_abs() {
                f.write_str("0")?;
            }
            return Ok(());
        }
        let digits = self.unscaled.unsigned_abs().to_string();
        let scale = self.scale as usize;
        let sign = if self.unscaled < 0 { "-" } else { "" };
        if digits.len() > scale {
            let (int, frac) = digits.split_at(digits.len() - scale);
            write!(f, "{}{}.{}", sign, int, frac)
        } else {
            write!(f, "{}0.{:0>width$}", sign, digits, width = scale)
        }
    }
}

impl FromStr for Decimal {
    type Err = eyre::Report;

    /// Parses `[+-]digits[.digits][e[+-]digits]`.
    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim();
        let (mantissa, exponent) = match text.find(['e', 'E']) {
            Some(pos) => (&text[..pos], text[pos + 1..].parse::<i32>().ok()),
            None => (text, Some(0)),
        };
        let Some(exponent) = exponent else {
            bail!("invalid decimal '{}'", s);
        };
        let (negative, unsigned) = match mantissa.as_bytes().first() {
            Some(b'-') => (true, &mantissa[1..]),
            Some(b'+') => (false, &mantissa[1..]),
            _ => (false, mantissa),
        };
        let (int, frac) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        ensure!(
            !(int.is_empty() && frac.is_empty())
                && int.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()),
            "invalid decimal '{}'",
            s
        );

        let mut unscaled: i128 = 0;
        for b in int.bytes().chain(frac.bytes()) {
            let digit = i128::from(b - b'0');
            unscaled = match unscaled.checked_mul(10).and_then(|v| v.checked_add(digit)) {
                Some(v) => v,
                None => bail!("decimal '{}' exceeds 128-bit precision", s),
            };
        }
        if negative {
            unscaled = -unscaled;
        }
        let frac_len = i32::try_from(frac.len())?;
        let Some(scale) = frac_len.checked_sub(exponent) else {
            bail!("decimal exponent out of range in '{}'", s);
        };
        let decimal = Self::new(unscaled, scale);
        ensure!(
            decimal.has_encodable_scale(),
            "decimal exponent out of range in '{}'",
            s
        );
        Ok(decimal)
    }
}
