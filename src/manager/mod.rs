//! Layered configuration manager
//!
//! This module contains the [`ConfigManager`] struct which is the primary entry point
//! for reading configuration.
//!
//! A lookup walks three tiers in a fixed order and stops at the first answer:
//!
//! 1. the [`ConfigStore`] (database, encrypted where needed)
//! 2. the legacy env file, shadowed by process variables
//! 3. compiled defaults
//!
//! Whatever answered is cached until [`ConfigManager::reload`].

mod builder;
mod cache;
mod writer;

pub use builder::ConfigManagerBuilder;
pub use writer::{SettingSink, SinkTable};

use crate::config::CoreConfig;
use crate::error::Result;
use crate::events::{ChangeNotifier, SubscriberId};
use crate::keys;
use crate::mask::mask_secret;
use crate::schedule::ScheduleSettings;
use crate::setting::Category;
use crate::source::{Defaults, FileSource};
use crate::store::{BatchReport, ConfigStore};
use crate::validate::Validators;
use cache::ResolutionCache;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use crate::sync::MutexExt;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};

/// Resolution tier that produced a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// The settings database
    Store,
    /// The env file or a process variable
    File,
    /// A compiled default
    Default,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tier::Store => "store",
            Tier::File => "file",
            Tier::Default => "default",
        })
    }
}

/// A resolved value and where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub value: String,
    pub tier: Tier,
}

struct Shared {
    config: CoreConfig,
    store: ConfigStore,
    file: Arc<dyn FileSource>,
    defaults: Defaults,
    cache: ResolutionCache,
    sinks: SinkTable,
    validators: Validators,
    notifier: ChangeNotifier,
    /// Serializes saves so every sink ends up with the same last writer
    save_lock: Mutex<()>,
}

/// Single source of truth for configuration values.
///
/// Cheap to clone; clones share the cache, store and notifier.
///
/// # Example
///
/// ```rust,no_run
/// use tiercfg::{Category, ConfigManager};
///
/// let manager = ConfigManager::builder()
///     .database_path("./data/stock_analysis.db")
///     .env_file("./.env")
///     .build()
///     .unwrap();
///
/// let stocks = manager.get_list("stock_list");
/// manager
///     .save(Category::Stocks, [("stock_list", "600519,hk00700")])
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConfigManager {
    shared: Arc<Shared>,
}

impl fmt::Debug for ConfigManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigManager")
            .field("config", &self.shared.config)
            .field("store", &self.shared.store)
            .field("file", &self.shared.file.source_name())
            .field("sinks", &self.shared.sinks)
            .field("cached", &self.shared.cache.len())
            .finish_non_exhaustive()
    }
}

impl ConfigManager {
    /// Create a new builder for ConfigManager
    #[must_use]
    pub fn builder() -> ConfigManagerBuilder {
        ConfigManagerBuilder::new()
    }

    /// Create a manager from a finished config, with the default collaborators
    ///
    /// # Errors
    ///
    /// Returns `Error::KeyDerivation` if the encryption key cannot be derived,
    /// or `Error::StorageUnavailable` if the database cannot be opened.
    pub fn new(config: CoreConfig) -> Result<Self> {
        ConfigManagerBuilder::new().build_from(config)
    }

    pub(crate) fn from_parts(
        config: CoreConfig,
        store: ConfigStore,
        file: Arc<dyn FileSource>,
        sinks: SinkTable,
        validators: Validators,
    ) -> Self {
        debug!(
            "Config manager ready (store: {}, file tier: {})",
            store.backend_name(),
            file.source_name()
        );
        Self {
            shared: Arc::new(Shared {
                defaults: config.defaults.clone(),
                config,
                store,
                file,
                cache: ResolutionCache::new(),
                sinks,
                validators,
                notifier: ChangeNotifier::new(),
                save_lock: Mutex::new(()),
            }),
        }
    }

    /// The configuration this manager was built from
    #[must_use]
    pub fn config(&self) -> &CoreConfig {
        &self.shared.config
    }

    /// The authoritative store, for direct writes
    ///
    /// Direct writes bypass the cache; call [`Self::reload`] afterwards.
    #[must_use]
    pub fn store(&self) -> &ConfigStore {
        &self.shared.store
    }

    /// Change notifications
    #[must_use]
    pub fn notifier(&self) -> &ChangeNotifier {
        &self.shared.notifier
    }

    /// Validators run by [`Self::save`]
    #[must_use]
    pub fn validators(&self) -> &Validators {
        &self.shared.validators
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Value for `key`, or `None` if no tier has one
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.resolve(key).map(|r| r.value)
    }

    /// Value for `key` together with the tier that answered
    ///
    /// A storage failure is logged and the lookup continues with the file
    /// tier; it never reaches the caller.
    #[must_use]
    pub fn resolve(&self, key: &str) -> Option<Resolved> {
        let cache = &self.shared.cache;
        if let Some(hit) = cache.lookup(key) {
            return hit;
        }

        let generation = cache.generation();
        let resolved = self.resolve_uncached(key);
        cache.insert(generation, key, resolved.clone());
        resolved
    }

    fn resolve_uncached(&self, key: &str) -> Option<Resolved> {
        let shared = &self.shared;

        match shared.store.get(key) {
            Ok(Some(value)) => return Some(Resolved::new(value, Tier::Store)),
            Ok(None) => {}
            Err(e) => warn!(
                "Store lookup for '{key}' failed, falling back to {}: {e}",
                shared.file.source_name()
            ),
        }

        match shared.file.get(key) {
            Ok(Some(value)) => return Some(Resolved::new(value, Tier::File)),
            Ok(None) => {}
            Err(e) => warn!("File tier lookup for '{key}' failed, using default: {e}"),
        }

        shared
            .defaults
            .get(key)
            .map(|value| Resolved::new(value, Tier::Default))
    }

    /// Resolve many keys, caching every miss with a single snapshot swap
    fn resolve_all(&self, names: Vec<String>) -> Vec<(String, Option<Resolved>)> {
        let cache = &self.shared.cache;
        let generation = cache.generation();

        let mut misses = Vec::new();
        let resolved = names
            .into_iter()
            .map(|key| {
                let value = cache.lookup(&key).unwrap_or_else(|| {
                    let value = self.resolve_uncached(&key);
                    misses.push((key.clone(), value.clone()));
                    value
                });
                (key, value)
            })
            .collect();

        if !misses.is_empty() {
            cache.insert_all(generation, &misses);
        }
        resolved
    }

    /// Value for `key`, or `fallback` if unset
    #[must_use]
    pub fn get_or(&self, key: &str, fallback: &str) -> String {
        self.get(key).unwrap_or_else(|| fallback.to_string())
    }

    /// Whether `key` is set to `true` (case-insensitive). Unset reads as false.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    }

    /// Comma or newline separated list; entries are trimmed, empties dropped
    #[must_use]
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|v| split_list(&v))
            .unwrap_or_default()
    }

    /// Resolved values of a category with secrets masked, for previews
    ///
    /// Covers every catalogued key of the category plus any extra keys
    /// stored under it. Unset keys are omitted.
    #[must_use]
    pub fn masked_view(&self, category: Category) -> BTreeMap<String, String> {
        let mut names: Vec<String> = keys::keys_in(category).map(str::to_string).collect();
        match self.shared.store.get_all(Some(category)) {
            Ok(stored) => names.extend(stored.into_keys()),
            Err(e) => warn!("Listing stored {category} settings failed: {e}"),
        }

        names.sort();
        names.dedup();

        self.resolve_all(names)
            .into_iter()
            .filter_map(|(key, resolved)| {
                let value = resolved?.value;
                let shown = if keys::sensitivity(&key).is_secret() {
                    mask_secret(&value)
                } else {
                    value
                };
                Some((key, shown))
            })
            .collect()
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Save a category's values through its sinks, then reload and notify.
    ///
    /// Values are trimmed. Every value is validated before anything is
    /// written. Empty values delete. Concurrent saves are applied one at a
    /// time.
    ///
    /// # Errors
    ///
    /// Returns `Error::ValidationRejected` for the first rejected value; in
    /// that case nothing was written. Write failures are reported per key in
    /// the returned [`BatchReport`].
    pub fn save<I, K, V>(&self, category: Category, values: I) -> Result<BatchReport>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let entries: Vec<(String, String)> = values
            .into_iter()
            .map(|(k, v)| (k.as_ref().trim().to_string(), v.as_ref().trim().to_string()))
            .collect();

        for (key, value) in &entries {
            self.shared.validators.validate(key, value)?;
        }

        let report = {
            let _guard = self.shared.save_lock.lock_recovered();
            let report = self.shared.sinks.write(category, &entries);
            self.reload();
            report
        };

        if report.succeeded.is_empty() {
            warn!("Saving {category} settings wrote nothing");
        } else {
            info!("{category} settings saved ({} key(s))", report.succeeded.len());
            self.shared.notifier.publish(category);
        }
        Ok(report)
    }

    /// Drop every cached resolution
    ///
    /// Safe to call while other threads are reading; they see either the old
    /// snapshot or the new one.
    pub fn reload(&self) {
        self.shared.cache.invalidate();
        info!("Configuration reloaded");
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Call `listener` with fresh schedule settings whenever the schedule
    /// category changes
    ///
    /// # Errors
    ///
    /// Returns an error if the subscriber thread cannot be started.
    pub fn on_schedule_change<F>(&self, listener: F) -> Result<SubscriberId>
    where
        F: Fn(ScheduleSettings) + Send + 'static,
    {
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        self.shared.notifier.subscribe(move |category| {
            if category != Category::Schedule {
                return;
            }
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let manager = ConfigManager { shared };
            manager.reload();
            listener(ScheduleSettings::load(&manager));
        })
    }
}

impl Resolved {
    fn new(value: impl Into<String>, tier: Tier) -> Self {
        Self {
            value: value.into(),
            tier,
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split([',', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
