//! # Encoding Module
//!
//! Low-level byte plumbing shared by every codec in the crate:
//!
//! - **ByteCursor**: growable buffer with a single read/write offset
//! - **Varint encoding**: zigzag variable-length integers for every length,
//!   count, property id and record-identity component

pub mod cursor;
pub mod varint;

pub use cursor::ByteCursor;
pub use varint::{
    decode_varint, encode_varint, read_varint, read_varint_i32, read_varint_len, varint_len,
    write_varint,
};
