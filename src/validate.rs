//! Caller-supplied validators run before a save
//!
//! The crate has no opinion on what a valid stock code, address or time
//! looks like. The form layer registers pure functions per key, and
//! [`crate::ConfigManager::save`] runs them before anything is written.

use crate::error::{Error, Result};
use crate::sync::RwLockExt;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Type alias for a validator function
pub type Validator = Arc<dyn Fn(&str) -> std::result::Result<(), String> + Send + Sync>;

/// Validators per key
#[derive(Default)]
pub struct Validators {
    by_key: RwLock<HashMap<String, Vec<Validator>>>,
}

impl fmt::Debug for Validators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.by_key.read_recovered();
        f.debug_struct("Validators")
            .field("keys", &guard.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Validators {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a validator for a setting key
    ///
    /// Validators for the same key run in registration order; the first
    /// error rejects the value.
    pub fn add<F>(&self, key: &str, validator: F)
    where
        F: Fn(&str) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        self.add_arc(key, Arc::new(validator));
    }

    pub(crate) fn add_arc(&self, key: &str, validator: Validator) {
        self.by_key
            .write_recovered()
            .entry(key.to_string())
            .or_default()
            .push(validator);
    }

    /// Check a value against every validator for `key`
    ///
    /// # Errors
    ///
    /// Returns `Error::ValidationRejected` carrying the rejected input and the
    /// first validator message.
    pub fn validate(&self, key: &str, value: &str) -> Result<()> {
        let guard = self.by_key.read_recovered();
        let Some(validators) = guard.get(key) else {
            return Ok(());
        };
        for validator in validators {
            validator(value).map_err(|reason| Error::ValidationRejected {
                key: key.to_string(),
                value: value.to_string(),
                reason,
            })?;
        }
        Ok(())
    }

    /// Whether any validator is registered for `key`
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.by_key.read_recovered().contains_key(key)
    }
}

// =============================================================================
// Tests
// =============================================================================
