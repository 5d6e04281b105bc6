//! # Codec Context
//!
//! Every encode, decode and compare call receives a `CodecContext`. It
//! bundles what would otherwise be ambient process state: date formats and
//! database timezone, the collation registry, the custom type registry and
//! the schema.
//!
//! ## Builder Pattern
//!
//! `CodecContextBuilder` collects the pieces and validates them once in
//! `build()`, so codec calls never re-check configuration.
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | config | `CodecConfig::default()` | formats, timezone, nesting limit |
//! | schema | empty `SchemaRegistry` | property types and ids |
//! | collate | `default`, `ci` | additional named collates |
//! | custom_type | none | decoders for custom value types |
//!
//! ```ignore
//! let ctx = CodecContext::builder()
//!     .schema(Arc::new(schema))
//!     .config(CodecConfig::default().with_timezone_offset_secs(3600))
//!     .custom_type("point", decode_point)
//!     .build()?;
//! ```
//!
//! ## Thread Safety
//!
//! A built context is immutable and `Send + Sync`; one context can serve
//! any number of concurrent codec calls.

use std::sync::Arc;

use chrono::{FixedOffset, Offset, Utc};
use eyre::{bail, Result};

use crate::config::{CodecConfig, MILLIS_PER_DAY};
use crate::error::CodecError;
use crate::schema::{
    Collate, CollationRegistry, CustomTypeRegistry, PropertyDef, SchemaRegistry, TypeRegistry,
};
use crate::types::CustomValue;

#[derive(Debug, Clone)]
pub struct CodecContext {
    config: CodecConfig,
    timezone: FixedOffset,
    collations: CollationRegistry,
    custom_types: CustomTypeRegistry,
    schema: Arc<dyn TypeRegistry>,
}

impl Default for CodecContext {
    fn default() -> Self {
        Self {
            config: CodecConfig::default(),
            timezone: Utc.fix(),
            collations: CollationRegistry::new(),
            custom_types: CustomTypeRegistry::new(),
            schema: Arc::new(SchemaRegistry::new()),
        }
    }
}

impl CodecContext {
    pub fn builder() -> CodecContextBuilder {
        CodecContextBuilder::new()
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn timezone(&self) -> FixedOffset {
        self.timezone
    }

    pub fn collations(&self) -> &CollationRegistry {
        &self.collations
    }

    pub fn custom_types(&self) -> &CustomTypeRegistry {
        &self.custom_types
    }

    pub fn schema(&self) -> &dyn TypeRegistry {
        self.schema.as_ref()
    }

    /// Resolves the property `name` of `class_name`, if the record has a
    /// class and the schema declares it.
    pub fn property(&self, class_name: Option<&str>, name: &str) -> Option<&PropertyDef> {
        class_name.and_then(|class| self.schema.property(class, name))
    }

    /// Resolves a collate by name. Unknown names fall back to the default
    /// collate.
    pub fn collate(&self, name: Option<&str>) -> &dyn Collate {
        name.and_then(|n| self.collations.get(n))
            .unwrap_or_else(|| self.collations.default_collate())
            .as_ref()
    }

    fn offset_millis(&self) -> i64 {
        i64::from(self.timezone.local_minus_utc()) * 1000
    }

    /// Converts a Date value to the whole-day count stored on the wire: the
    /// calendar day in the database timezone, counted from the UTC epoch.
    pub fn date_to_days(&self, millis: i64) -> i64 {
        millis
            .saturating_add(self.offset_millis())
            .div_euclid(MILLIS_PER_DAY)
    }

    /// Inverse of [`CodecContext::date_to_days`]: midnight of that day in the
    /// database timezone.
    pub fn days_to_date(&self, days: i64) -> Result<i64> {
        match days
            .checked_mul(MILLIS_PER_DAY)
            .and_then(|m| m.checked_sub(self.offset_millis()))
        {
            Some(millis) => Ok(millis),
            None => bail!(CodecError::corrupt(format!("date out of range: {} days", days))),
        }
    }

    pub fn decode_custom(&self, type_name: &str, bytes: &[u8]) -> Result<CustomValue> {
        self.custom_types.decode(type_name, bytes)
    }
}

pub struct CodecContextBuilder {
    config: CodecConfig,
    collations: CollationRegistry,
    custom_types: CustomTypeRegistry,
    schema: Option<Arc<dyn TypeRegistry>>,
}

impl Default for CodecContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CodecContextBuilder {
    pub fn new() -> Self {
        Self {
            config: CodecConfig::default(),
            collations: CollationRegistry::new(),
            custom_types: CustomTypeRegistry::new(),
            schema: None,
        }
    }

    pub fn config(mut self, config: CodecConfig) -> Self {
        self.config = config;
        self
    }

    pub fn schema(mut self, schema: Arc<dyn TypeRegistry>) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn collate(mut self, collate: Arc<dyn Collate>) -> Self {
        self.collations.register(collate);
        self
    }

    pub fn custom_type<F>(mut self, type_name: impl Into<String>, decoder: F) -> Self
    where
        F: Fn(&[u8]) -> Result<CustomValue> + Send + Sync + 'static,
    {
        self.custom_types.register(type_name, decoder);
        self
    }

    /// Validates the configuration and builds the context.
    pub fn build(self) -> Result<CodecContext> {
        let timezone = self.config.timezone()?;
        Ok(CodecContext {
            config: self.config,
            timezone,
            collations: self.collations,
            custom_types: self.custom_types,
            schema: self
                .schema
                .unwrap_or_else(|| Arc::new(SchemaRegistry::new())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldType;

    #[test]
    fn default_context_is_utc_with_builtin_collates() {
        let ctx = CodecContext::default();
        assert_eq!(ctx.timezone().local_minus_utc(), 0);
        assert_eq!(ctx.collate(Some("ci")).name(), "ci");
        assert_eq!(ctx.collate(None).name(), "default");
        assert_eq!(ctx.collate(Some("unknown")).name(), "default");
    }

    #[test]
    fn build_rejects_invalid_timezone() {
        let result = CodecContext::builder()
            .config(CodecConfig::default().with_timezone_offset_secs(100_000))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn property_requires_a_class() {
        let mut schema = SchemaRegistry::new();
        schema.create_class("Person").unwrap();
        schema
            .create_property("Person", "age", FieldType::Integer)
            .unwrap();
        let ctx = CodecContext::builder()
            .schema(Arc::new(schema))
            .build()
            .unwrap();

        assert!(ctx.property(Some("Person"), "age").is_some());
        assert!(ctx.property(None, "age").is_none());
    }

    #[test]
    fn date_days_round_trip_in_database_timezone() {
        let ctx = CodecContext::builder()
            .config(CodecConfig::default().with_timezone_offset_secs(2 * 3600))
            .build()
            .unwrap();

        // 2024-03-10 00:00 at UTC+2 is 2024-03-09 22:00 UTC.
        let local_midnight = 1_710_021_600_000;
        let days = ctx.date_to_days(local_midnight);
        assert_eq!(days, 19_792);
        assert_eq!(ctx.days_to_date(days).unwrap(), local_midnight);
    }

    #[test]
    fn negative_dates_floor_to_the_previous_day() {
        let ctx = CodecContext::default();
        assert_eq!(ctx.date_to_days(-1), -1);
        assert_eq!(ctx.days_to_date(-1).unwrap(), -MILLIS_PER_DAY);
        assert!(ctx.days_to_date(i64::MAX).is_err());
    }
}
