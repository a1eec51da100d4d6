//! Durable storage of setting rows
//!
//! Repositories are pure persistence: no encryption awareness, no retries,
//! no policy. Values go in and come out byte-for-byte.
//! - **SQLite**: the default on-disk store (requires `sqlite` feature)
//! - **Memory**: in-process only, for tests and ephemeral tools

mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use memory::MemoryRepository;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteRepository;

use crate::error::Result;
use crate::setting::{Category, Setting};

/// Trait for setting storage backends
///
/// Implementations must be safe to share between request-handling threads.
/// A failure to reach the underlying storage is reported as
/// `Error::StorageUnavailable` and never retried internally.
pub trait SettingRepository: Send + Sync {
    /// Fetch one row
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<Setting>>;

    /// Fetch all rows, optionally filtered by category, ordered by key
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be read.
    fn get_all(&self, category: Option<Category>) -> Result<Vec<Setting>>;

    /// Insert or update a row keyed by `setting.key`.
    ///
    /// An existing row keeps its `created_at`; every other column is replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be written.
    fn upsert(&self, setting: &Setting) -> Result<()>;

    /// Remove a row. Removing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be written.
    fn delete(&self, key: &str) -> Result<()>;

    /// Backend name for logging/debugging
    fn backend_name(&self) -> &'static str;
}
