//! # Codec Configuration Module
//!
//! This module centralizes the configuration of the record codec. Byte-format
//! constants live in [`constants`]; runtime settings that used to be pulled
//! from an ambient "current database" live in [`CodecConfig`] and travel with
//! every call inside a `CodecContext`.
//!
//! ## Module Organization
//!
//! - [`constants`]: Wire-format constants with dependency documentation
//! - [`settings`]: `CodecConfig` (date formats, timezone, nesting limit)

pub mod constants;
pub mod settings;

pub use constants::*;
pub use settings::CodecConfig;
