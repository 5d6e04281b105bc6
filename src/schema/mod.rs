//! # Schema Collaborators
//!
//! The codec consumes three services from the surrounding database and
//! models each as a trait with an in-memory implementation:
//!
//! | Service | Trait | In-memory impl |
//! |---------|-------|----------------|
//! | Declared property types and ids | [`TypeRegistry`] | [`SchemaRegistry`] |
//! | String comparison strategies | [`Collate`] | [`CollationRegistry`] |
//! | Application value types | [`CustomSerializable`] | [`CustomTypeRegistry`] |
//! | Loading linked records | [`RecordResolver`] | `HashMap<RecordId, Record>` |
//!
//! None of them hold global state; they are reached through the
//! `CodecContext` passed into every codec call.

mod collate;
mod custom;
mod registry;

pub use collate::{
    CaseInsensitiveCollate, Collate, CollationRegistry, DefaultCollate, CASE_INSENSITIVE_COLLATE,
    DEFAULT_COLLATE,
};
pub use custom::{CustomDecoder, CustomSerializable, CustomTypeRegistry};
pub use registry::{PropertyDef, RecordResolver, SchemaRegistry, TypeRegistry};
