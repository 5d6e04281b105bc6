//! # Type System
//!
//! The value model shared by every codec in the crate.
//!
//! ## Module Structure
//!
//! - `data_type`: `FieldType`, the single-byte type tag
//! - `rid`: `RecordId`, the `(cluster, position)` record identity
//! - `decimal`: `Decimal`, an exact scaled 128-bit number
//! - `value`: `Value`, the dynamically-typed field value
//!
//! ## Key Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | `FieldType` | Type tag written in front of untyped values |
//! | `RecordId` | Identity of a persisted record (`#12:345`) |
//! | `Decimal` | Exact decimal with numeric ordering |
//! | `Value` | Field value of a record |
//!
//! ## Usage
//!
//! ```ignore
//! use docbin::types::{FieldType, RecordId, Value};
//!
//! let link = Value::Link(RecordId::new(12, 345));
//! assert_eq!(link.field_type(), FieldType::Link);
//! ```

mod data_type;
mod decimal;
mod rid;
mod value;

pub use data_type::FieldType;
pub use decimal::Decimal;
pub use rid::RecordId;
pub use value::{CustomValue, Value};
