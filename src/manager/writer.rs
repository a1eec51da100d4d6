//! Write routing for category saves
//!
//! Every category is written to the store. Some categories are additionally
//! mirrored into other sinks (the stock list goes to the legacy env file as
//! well), listed per category in a [`SinkTable`]. Mirrors are plaintext
//! sinks: they only ever see plain keys that belong to the saved category.

use crate::keys;
use crate::setting::Category;
use crate::source::EnvFileSource;
use crate::store::{BatchReport, ConfigStore};
use log::{debug, error};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A destination a category save writes to
pub trait SettingSink: Send + Sync {
    /// Write every entry, reporting the outcome per key
    fn write_batch(&self, entries: &[(String, String)], category: Category) -> BatchReport;

    /// Sink name for logging/debugging
    fn sink_name(&self) -> &'static str;
}

impl SettingSink for ConfigStore {
    fn write_batch(&self, entries: &[(String, String)], category: Category) -> BatchReport {
        self.set_batch(entries.iter().map(|(k, v)| (k.as_str(), v.as_str())), category)
    }

    fn sink_name(&self) -> &'static str {
        "store"
    }
}

impl SettingSink for EnvFileSource {
    fn write_batch(&self, entries: &[(String, String)], _category: Category) -> BatchReport {
        let mut report = BatchReport::default();
        for (key, value) in entries {
            report.record(key, self.write(key, value));
        }
        report
    }

    fn sink_name(&self) -> &'static str {
        "env_file"
    }
}

/// Category -> sinks, with the store always first
pub struct SinkTable {
    primary: Arc<dyn SettingSink>,
    mirrors: HashMap<Category, Vec<Arc<dyn SettingSink>>>,
}

impl fmt::Debug for SinkTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mirrors: HashMap<_, Vec<_>> = self
            .mirrors
            .iter()
            .map(|(c, sinks)| (c.as_str(), sinks.iter().map(|s| s.sink_name()).collect()))
            .collect();
        f.debug_struct("SinkTable")
            .field("primary", &self.primary.sink_name())
            .field("mirrors", &mirrors)
            .finish()
    }
}

impl SinkTable {
    /// Table that writes every category to `primary` only
    pub fn new(primary: Arc<dyn SettingSink>) -> Self {
        Self {
            primary,
            mirrors: HashMap::new(),
        }
    }

    /// Also write `category` to `sink`
    #[must_use]
    pub fn mirror(mut self, category: Category, sink: Arc<dyn SettingSink>) -> Self {
        self.mirrors.entry(category).or_default().push(sink);
        self
    }

    /// Names of the sinks `category` is written to, in write order
    pub fn sink_names(&self, category: Category) -> Vec<&'static str> {
        std::iter::once(self.primary.sink_name())
            .chain(self.mirrors_for(category).map(|s| s.sink_name()))
            .collect()
    }

    fn mirrors_for(&self, category: Category) -> impl Iterator<Item = &Arc<dyn SettingSink>> {
        self.mirrors.get(&category).into_iter().flatten()
    }

    /// Write through every sink for `category`.
    ///
    /// Mirrors only receive entries the previous sinks accepted, so a value
    /// that failed to reach the store never shows up in a mirror alone.
    /// Secrets and keys from other categories stay in the store.
    pub fn write(&self, category: Category, entries: &[(String, String)]) -> BatchReport {
        let mut report = self.primary.write_batch(entries, category);

        for sink in self.mirrors_for(category) {
            let accepted: Vec<(String, String)> = entries
                .iter()
                .filter(|(k, _)| report.succeeded.contains(k) && mirrorable(k, category))
                .cloned()
                .collect();
            if accepted.is_empty() {
                break;
            }

            let mirrored = sink.write_batch(&accepted, category);
            if mirrored.is_complete() {
                debug!("Mirrored {} {category} key(s) to {}", accepted.len(), sink.sink_name());
            } else {
                error!(
                    "Mirroring {category} to {} failed for: {}",
                    sink.sink_name(),
                    mirrored.failed_keys().collect::<Vec<_>>().join(", ")
                );
            }
            report.merge(mirrored);
        }
        report
    }
}

fn mirrorable(key: &str, category: Category) -> bool {
    keys::category_of(key) == category && !keys::sensitivity(key).is_secret()
}
