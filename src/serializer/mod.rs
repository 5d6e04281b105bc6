//! # Record Serialization
//!
//! Turns [`Record`]s into bytes and back. Two wire variants share one value
//! codec and differ only in how a record body is laid out:
//!
//! | Format | Type | Body layout | Used for |
//! |--------|------|-------------|----------|
//! | Storage | [`StorageSerializer`] | field directory + pointers, schema-resolved ids | on-disk persistence, index field extraction |
//! | Network | [`NetworkSerializer`] | inline (name, tag, payload) triples | clients without the schema |
//!
//! ## Module Structure
//!
//! - `context`: `CodecContext`, the explicit configuration of every call
//! - `value`: `ValueCodec`, per-type payload encoding
//! - `storage`: storage format bodies, partial fetch and field extraction
//! - `network`: network format bodies
//!
//! ## Usage
//!
//! ```ignore
//! let ctx = CodecContext::default();
//! let record = Record::new().with("name", "name").with("age", 20i32);
//!
//! let bytes = StorageSerializer.serialize(&record, &ctx)?;
//! let back = StorageSerializer.deserialize(&bytes, &ctx)?;
//! assert_eq!(back.field("age"), Some(&Value::Integer(20)));
//! ```

mod context;
mod network;
mod storage;
mod value;

pub use context::{CodecContext, CodecContextBuilder};
pub use network::NetworkSerializer;
pub use storage::StorageSerializer;
pub use value::{read_rid, read_str, write_rid, write_string, BodyFormat, ValueCodec};

use eyre::Result;

use crate::encoding::ByteCursor;
use crate::records::Record;
use crate::types::Value;

/// A complete record format.
pub trait RecordSerializer {
    fn name(&self) -> &'static str;

    fn serialize(&self, record: &Record, ctx: &CodecContext) -> Result<Vec<u8>>;

    fn deserialize(&self, bytes: &[u8], ctx: &CodecContext) -> Result<Record>;

    /// Decodes only the named fields. Names that do not occur in the record
    /// are skipped; the result holds the found fields in encoded order.
    fn deserialize_partial(
        &self,
        bytes: &[u8],
        fields: &[&str],
        ctx: &CodecContext,
    ) -> Result<Record>;

    fn field_names(&self, bytes: &[u8], ctx: &CodecContext) -> Result<Vec<String>>;
}

/// Encodes the payload of a single value, without a type tag, in the layout
/// the binary comparator reads.
pub fn encode_value(value: &Value, ctx: &CodecContext) -> Result<Vec<u8>> {
    let codec = ValueCodec::new(ctx, BodyFormat::Storage);
    let mut cursor = ByteCursor::new();
    codec.write_value(&mut cursor, value)?;
    Ok(cursor.into_bytes())
}
