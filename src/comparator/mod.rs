//! # Encoded Field Comparison
//!
//! Comparison of values in their encoded form, for index keys and query
//! predicates evaluated against stored records.
//!
//! - `field`: [`EncodedField`], a typed view into an encoded buffer
//! - `binary`: [`BinaryComparator`], ordering and equality with coercion
//!
//! Fields are usually obtained from [`StorageSerializer::field`], which
//! locates a single field inside a stored record and attaches the
//! property's collate.
//!
//! [`StorageSerializer::field`]: crate::serializer::StorageSerializer::field

mod binary;
mod field;

pub use binary::BinaryComparator;
pub use field::EncodedField;
