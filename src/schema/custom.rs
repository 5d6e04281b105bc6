//! # Custom Value Types
//!
//! Applications can store their own binary-serializable types in a field.
//! The value side implements [`CustomSerializable`]; the decoding side is a
//! function registered on a [`CustomTypeRegistry`] under the same stable
//! type name. The name is written inline in front of the payload, so a
//! reader needs nothing else to find the decoder.
//!
//! Both encoding and decoding require the type name to be registered. An
//! unregistered name is an `UnsupportedType` error on either path, so a
//! value can never be written that the same context could not read back.

use std::fmt;
use std::sync::Arc;

use eyre::{bail, Result};
use hashbrown::HashMap;

use crate::error::CodecError;
use crate::types::CustomValue;

pub trait CustomSerializable: fmt::Debug + Send + Sync {
    /// Stable name the decoder is registered under.
    fn type_name(&self) -> &str;

    fn to_bytes(&self) -> Result<Vec<u8>>;
}

pub type CustomDecoder = Arc<dyn Fn(&[u8]) -> Result<CustomValue> + Send + Sync>;

#[derive(Clone, Default)]
pub struct CustomTypeRegistry {
    decoders: HashMap<String, CustomDecoder>,
}

impl CustomTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, type_name: impl Into<String>, decoder: F)
    where
        F: Fn(&[u8]) -> Result<CustomValue> + Send + Sync + 'static,
    {
        self.decoders.insert(type_name.into(), Arc::new(decoder));
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.decoders.contains_key(type_name)
    }

    /// Serializes `value`, failing if its type is not registered.
    pub fn encode(&self, value: &CustomValue) -> Result<Vec<u8>> {
        if !self.contains(value.type_name()) {
            bail!(CodecError::unsupported(format!(
                "no custom type registered as '{}'",
                value.type_name()
            )));
        }
        value.to_bytes()
    }

    pub fn decode(&self, type_name: &str, bytes: &[u8]) -> Result<CustomValue> {
        match self.decoders.get(type_name) {
            Some(decoder) => decoder(bytes),
            None => bail!(CodecError::unsupported(format!(
                "no custom type registered as '{}'",
                type_name
            ))),
        }
    }
}

impl fmt::Debug for CustomTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.decoders.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Point(i32, i32);

    impl CustomSerializable for Point {
        fn type_name(&self) -> &str {
            "point"
        }

        fn to_bytes(&self) -> Result<Vec<u8>> {
            let mut out = self.0.to_be_bytes().to_vec();
            out.extend_from_slice(&self.1.to_be_bytes());
            Ok(out)
        }
    }

    fn decode_point(bytes: &[u8]) -> Result<CustomValue> {
        let Ok(raw) = <[u8; 8]>::try_from(bytes) else {
            bail!(CodecError::corrupt("point payload must be 8 bytes"));
        };
        let x = i32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
        let y = i32::from_be_bytes([raw[4], raw[5], raw[6], raw[7]]);
        Ok(Arc::new(Point(x, y)))
    }

    #[test]
    fn registered_type_round_trips() {
        let mut registry = CustomTypeRegistry::new();
        registry.register("point", decode_point);

        let value: CustomValue = Arc::new(Point(3, -4));
        let bytes = registry.encode(&value).unwrap();
        let back = registry.decode("point", &bytes).unwrap();
        assert_eq!(back.type_name(), "point");
        assert_eq!(back.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn unregistered_type_is_unsupported_both_ways() {
        let registry = CustomTypeRegistry::new();
        let value: CustomValue = Arc::new(Point(1, 2));

        let err = registry.encode(&value).unwrap_err();
        assert!(matches!(
            CodecError::of(&err),
            Some(CodecError::UnsupportedType(_))
        ));
        let err = registry.decode("point", &[0; 8]).unwrap_err();
        assert!(matches!(
            CodecError::of(&err),
            Some(CodecError::UnsupportedType(_))
        ));
    }
}
