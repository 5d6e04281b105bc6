//! # Codec Error Kinds
//!
//! Every fallible operation in this crate returns `eyre::Result`. When a
//! failure is one a caller may want to branch on, the report carries a
//! [`CodecError`] that can be recovered with [`CodecError::of`], even after
//! context has been attached with `wrap_err`.
//!
//! ## Taxonomy
//!
//! | Variant | Raised when | Serialization error? |
//! |---------|-------------|----------------------|
//! | `CorruptData` | truncated buffer, unterminated varint, invalid UTF-8, malformed delta | yes |
//! | `UnsupportedType` | unknown type tag, unregistered custom type, tree-backed link bag | yes |
//! | `TypeMismatch` | a link-collection element is not a record identity | **no** |
//! | `Incomparable` | two encoded fields have no coercion rule between them | no |
//!
//! `TypeMismatch` is deliberately kept out of the serialization family:
//! callers that handle "bad bytes" generically must not swallow it.
//!
//! ## Usage
//!
//! ```ignore
//! match codec.encode(&record) {
//!     Err(report) if matches!(CodecError::of(&report), Some(CodecError::TypeMismatch(_))) => {
//!         // reject the caller's input
//!     }
//!     other => other?,
//! }
//! ```

use thiserror::Error;

use crate::types::FieldType;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("corrupt data: {0}")]
    CorruptData(String),

    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("cannot compare {left:?} with {right:?}")]
    Incomparable { left: FieldType, right: FieldType },
}

impl CodecError {
    pub fn corrupt(msg: impl Into<String>) -> Self {
        CodecError::CorruptData(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        CodecError::UnsupportedType(msg.into())
    }

    pub fn type_mismatch(msg: impl Into<String>) -> Self {
        CodecError::TypeMismatch(msg.into())
    }

    /// Returns the codec error carried by `report`, if any.
    pub fn of(report: &eyre::Report) -> Option<&CodecError> {
        report.downcast_ref::<CodecError>()
    }

    /// True for the generic "could not (de)serialize these bytes" family.
    pub fn is_serialization_error(&self) -> bool {
        matches!(
            self,
            CodecError::CorruptData(_) | CodecError::UnsupportedType(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::WrapErr;

    fn failing() -> eyre::Result<()> {
        Err(CodecError::type_mismatch("expected a record identity").into())
    }

    #[test]
    fn codec_error_survives_wrap_err() {
        let report = failing().wrap_err("while encoding field 'friends'").unwrap_err();
        assert_eq!(
            CodecError::of(&report),
            Some(&CodecError::TypeMismatch(
                "expected a record identity".to_string()
            ))
        );
    }

    #[test]
    fn type_mismatch_is_not_a_serialization_error() {
        assert!(!CodecError::type_mismatch("x").is_serialization_error());
        assert!(CodecError::corrupt("x").is_serialization_error());
        assert!(CodecError::unsupported("x").is_serialization_error());
    }

    #[test]
    fn plain_reports_have_no_codec_error() {
        let report = eyre::eyre!("something else");
        assert!(CodecError::of(&report).is_none());
    }
}
