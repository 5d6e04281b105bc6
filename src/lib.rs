//! # docbin - Binary Record Codec
//!
//! docbin is the record codec of a document/graph database. It turns
//! dynamically typed records (ordered named fields holding primitives,
//! embedded records, collections, maps and links to other records) into
//! compact bytes and back, and provides the three operations the rest of an
//! engine builds on:
//!
//! - **Field comparison without decoding**: index structures compare two
//!   encoded fields, possibly of different declared types, straight from
//!   their bytes
//! - **Record deltas**: the minimal change-set between two versions of a
//!   record, its byte format, and its replay onto the original
//! - **RID sets**: compact sets of record identities, used as a field type
//!   and as the working set of the delta engine
//!
//! ## Quick Start
//!
//! ```ignore
//! use docbin::{compute_delta, apply_delta, CodecContext, Record, RecordSerializer, StorageSerializer};
//!
//! let ctx = CodecContext::default();
//! let original = Record::with_class("Person").with("name", "Ada").with("age", 36i32);
//!
//! let bytes = StorageSerializer.serialize(&original, &ctx)?;
//! let loaded = StorageSerializer.deserialize(&bytes, &ctx)?;
//!
//! let mut current = loaded.clone();
//! current.set("age", 37i32);
//! let delta = compute_delta(&loaded, &current, &ctx)?;
//! assert_eq!(apply_delta(&loaded, &delta, &ctx)?, current);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │  delta: compute / apply / wire format     │
//! ├────────────────────┬─────────────────────┤
//! │ comparator          │ serializer          │
//! │ EncodedField        │ storage / network   │
//! │ BinaryComparator    │ ValueCodec          │
//! ├────────────────────┴─────────────────────┤
//! │  records: Record, RidSet, RecordArena     │
//! ├──────────────────────────────────────────┤
//! │  encoding: ByteCursor, zigzag varints     │
//! └──────────────────────────────────────────┘
//!        schema (collaborator traits) · config · error
//! ```
//!
//! Everything outside the codec is a collaborator reached through a
//! trait: the [`TypeRegistry`] supplies declared property types, the
//! [`CollationRegistry`] string comparison, and a [`RecordResolver`] loads
//! the record behind a link. All of them travel in the [`CodecContext`]
//! passed to every call; the codec keeps no global state.
//!
//! ## Errors
//!
//! Every fallible call returns `eyre::Result`. Failures a caller may branch
//! on are [`CodecError`] variants inside the report; use
//! [`CodecError::of`] to recover them.
//!
//! ## Module Overview
//!
//! - [`encoding`]: byte cursor and variable-length integers
//! - [`types`]: type tags, values, record ids, decimals
//! - [`records`]: records, RID sets, the dirty-tracking record arena
//! - [`schema`]: type registry, collations, custom types
//! - [`serializer`]: storage and network record formats
//! - [`comparator`]: binary comparison of encoded fields
//! - [`delta`]: record deltas
//! - [`config`]: constants and codec configuration

pub mod comparator;
pub mod config;
pub mod delta;
pub mod encoding;
pub mod error;
pub mod records;
pub mod schema;
pub mod serializer;
pub mod types;

pub use comparator::{BinaryComparator, EncodedField};
pub use config::CodecConfig;
pub use delta::{apply_delta, compute_delta, deserialize_delta, serialize_delta, Delta, DeltaOp};
pub use encoding::ByteCursor;
pub use error::CodecError;
pub use records::{Record, RecordArena, RidSet};
pub use schema::{CollationRegistry, RecordResolver, SchemaRegistry, TypeRegistry};
pub use serializer::{
    encode_value, CodecContext, NetworkSerializer, RecordSerializer, StorageSerializer,
};
pub use types::{Decimal, FieldType, RecordId, Value};
