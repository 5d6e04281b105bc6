//! # Runtime Codec Settings
//!
//! `CodecConfig` carries the settings the codec needs at encode, decode and
//! compare time: how dates are rendered and parsed as text, which timezone
//! the database considers "local" for Date values, and how deeply nested
//! input may be.
//!
//! ## Usage
//!
//! ```ignore
//! let config = CodecConfig::default()
//!     .with_timezone_offset_secs(3600)
//!     .with_date_format("%d/%m/%Y");
//! ```

use chrono::FixedOffset;
use eyre::{eyre, Result};

use super::constants::{DEFAULT_DATETIME_FORMAT, DEFAULT_DATE_FORMAT, DEFAULT_MAX_NESTING_DEPTH};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecConfig {
    date_format: String,
    datetime_format: String,
    timezone_offset_secs: i32,
    max_nesting_depth: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            datetime_format: DEFAULT_DATETIME_FORMAT.to_string(),
            timezone_offset_secs: 0,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }
}

impl CodecConfig {
    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    pub fn with_datetime_format(mut self, format: impl Into<String>) -> Self {
        self.datetime_format = format.into();
        self
    }

    /// Sets the database timezone as a fixed offset east of UTC.
    pub fn with_timezone_offset_secs(mut self, secs: i32) -> Self {
        self.timezone_offset_secs = secs;
        self
    }

    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    pub fn date_format(&self) -> &str {
        &self.date_format
    }

    pub fn datetime_format(&self) -> &str {
        &self.datetime_format
    }

    pub fn max_nesting_depth(&self) -> usize {
        self.max_nesting_depth
    }

    pub fn timezone_offset_secs(&self) -> i32 {
        self.timezone_offset_secs
    }

    /// Returns the database timezone, rejecting offsets of a day or more.
    pub fn timezone(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.timezone_offset_secs).ok_or_else(|| {
            eyre!(
                "invalid timezone offset: {} seconds",
                self.timezone_offset_secs
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_utc_and_iso_formats() {
        let config = CodecConfig::default();
        assert_eq!(config.date_format(), "%Y-%m-%d");
        assert_eq!(config.datetime_format(), "%Y-%m-%d %H:%M:%S");
        assert_eq!(config.timezone().unwrap().local_minus_utc(), 0);
        assert_eq!(config.max_nesting_depth(), DEFAULT_MAX_NESTING_DEPTH);
    }

    #[test]
    fn out_of_range_timezone_is_rejected() {
        let config = CodecConfig::default().with_timezone_offset_secs(86_400);
        assert!(config.timezone().is_err());
    }

    #[test]
    fn builder_setters_chain() {
        let config = CodecConfig::default()
            .with_date_format("%d/%m/%Y")
            .with_timezone_offset_secs(-3600)
            .with_max_nesting_depth(4);
        assert_eq!(config.date_format(), "%d/%m/%Y");
        assert_eq!(config.timezone().unwrap().local_minus_utc(), -3600);
        assert_eq!(config.max_nesting_depth(), 4);
    }
}
