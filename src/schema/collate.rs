//! # Collations
//!
//! A collate decides how two strings of the same field compare. The codec
//! only needs one operation from it: map a string to the form that is
//! compared by codepoint order. Two strings are equal under a collate iff
//! their transformed forms are equal.
//!
//! ## Built-in Collates
//!
//! | Name | Behavior |
//! |------|----------|
//! | `default` | identity, plain codepoint order |
//! | `ci` | Unicode lowercase before comparing |
//!
//! Further collates are registered on a [`CollationRegistry`] by name.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt::Debug;
use std::sync::Arc;

use hashbrown::HashMap;

pub const DEFAULT_COLLATE: &str = "default";
pub const CASE_INSENSITIVE_COLLATE: &str = "ci";

pub trait Collate: Debug + Send + Sync {
    fn name(&self) -> &str;

    fn transform<'a>(&self, value: &'a str) -> Cow<'a, str>;

    fn compare(&self, a: &str, b: &str) -> Ordering {
        self.transform(a).cmp(&self.transform(b))
    }

    fn is_default(&self) -> bool {
        self.name() == DEFAULT_COLLATE
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCollate;

impl Collate for DefaultCollate {
    fn name(&self) -> &str {
        DEFAULT_COLLATE
    }

    fn transform<'a>(&self, value: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CaseInsensitiveCollate;

impl Collate for CaseInsensitiveCollate {
    fn name(&self) -> &str {
        CASE_INSENSITIVE_COLLATE
    }

    fn transform<'a>(&self, value: &'a str) -> Cow<'a, str> {
        if value.chars().any(char::is_uppercase) {
            Cow::Owned(value.to_lowercase())
        } else {
            Cow::Borrowed(value)
        }
    }
}

#[derive(Debug, Clone)]
pub struct CollationRegistry {
    collates: HashMap<String, Arc<dyn Collate>>,
    default: Arc<dyn Collate>,
}

impl Default for CollationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CollationRegistry {
    /// Creates a registry holding the built-in collates.
    pub fn new() -> Self {
        let default: Arc<dyn Collate> = Arc::new(DefaultCollate);
        let mut registry = Self {
            collates: HashMap::new(),
            default: default.clone(),
        };
        registry.register(default);
        registry.register(Arc::new(CaseInsensitiveCollate));
        registry
    }

    /// Registers `collate` under its name, replacing any previous entry.
    pub fn register(&mut self, collate: Arc<dyn Collate>) {
        self.collates.insert(collate.name().to_string(), collate);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Collate>> {
        self.collates.get(name)
    }

    pub fn default_collate(&self) -> &Arc<dyn Collate> {
        &self.default
    }
}
