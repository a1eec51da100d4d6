//! Compiled-in default values, the last resolution tier

use crate::keys;
use std::collections::HashMap;

/// Table of default values keyed by setting key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Defaults {
    values: HashMap<String, String>,
}

impl Defaults {
    /// The defaults shipped with the application
    #[must_use]
    pub fn builtin() -> Self {
        Self::empty()
            .with(keys::GEMINI_MODEL, "gemini-2.0-flash")
            .with(keys::GEMINI_MODEL_FALLBACK, "gemini-1.5-flash")
            .with(keys::OPENAI_MODEL, "gpt-4o-mini")
            .with(keys::SCHEDULE_ENABLED, "false")
            .with(keys::SCHEDULE_TIME, "18:00")
            .with(keys::MARKET_REVIEW_ENABLED, "true")
    }

    /// No defaults at all
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add or replace a default. An empty value removes it.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub(crate) fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let (key, value) = (key.into(), value.into());
        if value.is_empty() {
            self.values.remove(&key);
        } else {
            self.values.insert(key, value);
        }
    }

    /// Default for `key`, if any
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
