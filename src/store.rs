//! Encryption-aware key/value API over a [`SettingRepository`]
//!
//! `ConfigStore` is the authoritative write target. It decides per key,
//! from the static classification in [`crate::keys`], whether a value is
//! sealed by the [`CryptoBox`] before it reaches the repository.

use crate::crypto::CryptoBox;
use crate::error::{Error, Result};
use crate::keys::{self, Sensitivity};
use crate::repository::SettingRepository;
use crate::setting::{Category, Setting};
use log::{debug, error};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Per-key outcome of a batch write
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Keys written (or deleted for empty values), in application order
    pub succeeded: Vec<String>,
    /// Keys that failed, with the reason
    pub failed: Vec<(String, Error)>,
}

impl BatchReport {
    /// Whether every entry was applied
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Names of the keys that failed
    pub fn failed_keys(&self) -> impl Iterator<Item = &str> {
        self.failed.iter().map(|(k, _)| k.as_str())
    }

    pub(crate) fn record(&mut self, key: &str, outcome: Result<()>) {
        match outcome {
            Ok(()) => self.succeeded.push(key.to_string()),
            Err(e) => self.failed.push((key.to_string(), e)),
        }
    }

    /// Fold another report into this one, keeping the first failure per key
    pub(crate) fn merge(&mut self, other: BatchReport) {
        for (key, err) in other.failed {
            self.succeeded.retain(|k| *k != key);
            if !self.failed.iter().any(|(k, _)| *k == key) {
                self.failed.push((key, err));
            }
        }
    }
}

/// Typed, encryption-aware settings store
#[derive(Clone)]
pub struct ConfigStore {
    repository: Arc<dyn SettingRepository>,
    crypto: CryptoBox,
}

impl fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigStore")
            .field("backend", &self.repository.backend_name())
            .finish_non_exhaustive()
    }
}

impl ConfigStore {
    /// Create a store over a repository and a derived crypto box
    pub fn new(repository: Arc<dyn SettingRepository>, crypto: CryptoBox) -> Self {
        Self { repository, crypto }
    }

    /// Name of the underlying repository backend
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.repository.backend_name()
    }

    /// Storage class of a key
    #[must_use]
    pub fn sensitivity(&self, key: &str) -> Sensitivity {
        keys::sensitivity(key)
    }

    /// Read one value, decrypting it if needed.
    ///
    /// A row that fails to decrypt is logged and reported as absent.
    ///
    /// # Errors
    ///
    /// Returns `Error::StorageUnavailable` if the repository cannot be read.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .repository
            .get(key)?
            .and_then(|setting| self.reveal(setting)))
    }

    /// Read every value, optionally limited to one category.
    ///
    /// Rows that fail to decrypt are omitted.
    ///
    /// # Errors
    ///
    /// Returns `Error::StorageUnavailable` if the repository cannot be read.
    pub fn get_all(&self, category: Option<Category>) -> Result<BTreeMap<String, String>> {
        Ok(self
            .repository
            .get_all(category)?
            .into_iter()
            .filter_map(|setting| {
                let key = setting.key.clone();
                self.reveal(setting).map(|value| (key, value))
            })
            .collect())
    }

    /// Whether a readable value exists for `key`
    ///
    /// # Errors
    ///
    /// Returns `Error::StorageUnavailable` if the repository cannot be read.
    pub fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Write one value. An empty value deletes the row.
    ///
    /// # Errors
    ///
    /// Returns an error if encryption fails or the repository cannot be written.
    pub fn set(&self, key: &str, value: &str, category: Category) -> Result<()> {
        self.set_with_description(key, value, category, None)
    }

    /// Write one value with a description. An empty value deletes the row.
    ///
    /// # Errors
    ///
    /// Returns an error if encryption fails or the repository cannot be written.
    pub fn set_with_description(
        &self,
        key: &str,
        value: &str,
        category: Category,
        description: Option<&str>,
    ) -> Result<()> {
        if value.is_empty() {
            return self.delete(key);
        }

        let sensitivity = self.sensitivity(key);
        let stored = match sensitivity {
            Sensitivity::Secret => self.crypto.encrypt(value)?,
            Sensitivity::Plain => value.to_string(),
        };

        let mut setting = Setting::new(key, stored, sensitivity.is_secret(), category);
        setting.description = description.map(str::to_string);
        self.repository.upsert(&setting)?;

        debug!("Setting {key} saved ({})", self.repository.backend_name());
        Ok(())
    }

    /// Write every entry, reporting the outcome per key.
    ///
    /// A failing entry does not stop the remaining ones.
    pub fn set_batch<'a, I>(&self, entries: I, category: Category) -> BatchReport
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut report = BatchReport::default();
        for (key, value) in entries {
            report.record(key, self.set(key, value, category));
        }
        if !report.is_complete() {
            error!(
                "Batch write for {category} failed for: {}",
                report.failed_keys().collect::<Vec<_>>().join(", ")
            );
        }
        report
    }

    /// Remove a value. Removing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns `Error::StorageUnavailable` if the repository cannot be written.
    pub fn delete(&self, key: &str) -> Result<()> {
        self.repository.delete(key)?;
        debug!("Setting {key} deleted");
        Ok(())
    }

    fn reveal(&self, setting: Setting) -> Option<String> {
        if !setting.is_encrypted {
            return Some(setting.value);
        }
        match self.crypto.decrypt(&setting.value) {
            Ok(value) => Some(value),
            Err(_) => {
                let err = Error::DecryptionFailed {
                    key: Some(setting.key),
                };
                error!("{err}");
                None
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
