//! Common test utilities for tiercfg integration tests
//!
//! Provides shared fixtures, a repository that can be told to fail, and a
//! logger that records what the crate logged.

#![allow(dead_code)]

use log::{Level, LevelFilter, Log, Metadata, Record};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tiercfg::{
    Category, ConfigManager, ConfigManagerBuilder, Error, MemoryRepository, Result, Setting,
    SettingRepository,
};

// =============================================================================
// Failing Repository
// =============================================================================

/// In-memory repository that reports `StorageUnavailable` on demand
#[derive(Default)]
pub struct FailingRepository {
    inner: MemoryRepository,
    fail_reads: AtomicBool,
    fail_writes: Mutex<HashSet<String>>,
}

impl FailingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every read fail (or succeed again)
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make writes of `key` fail
    pub fn fail_writes_for(&self, key: &str) {
        self.fail_writes.lock().unwrap().insert(key.to_string());
    }

    /// Raw row, bypassing the failure switches
    pub fn raw(&self, key: &str) -> Option<Setting> {
        self.inner.get(key).unwrap()
    }

    fn check_read(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            Err(Error::storage("failing", "database is locked"))
        } else {
            Ok(())
        }
    }

    fn check_write(&self, key: &str) -> Result<()> {
        if self.fail_writes.lock().unwrap().contains(key) {
            Err(Error::storage("failing", format!("disk full writing {key}")))
        } else {
            Ok(())
        }
    }
}

impl SettingRepository for FailingRepository {
    fn get(&self, key: &str) -> Result<Option<Setting>> {
        self.check_read()?;
        self.inner.get(key)
    }

    fn get_all(&self, category: Option<Category>) -> Result<Vec<Setting>> {
        self.check_read()?;
        self.inner.get_all(category)
    }

    fn upsert(&self, setting: &Setting) -> Result<()> {
        self.check_write(&setting.key)?;
        self.inner.upsert(setting)
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.check_write(key)?;
        self.inner.delete(key)
    }

    fn backend_name(&self) -> &'static str {
        "failing"
    }
}

// =============================================================================
// Capturing Logger
// =============================================================================

/// Records every log line so tests can assert on warnings
pub struct CapturingLogger {
    records: Mutex<Vec<(Level, String)>>,
}

static LOGGER: CapturingLogger = CapturingLogger {
    records: Mutex::new(Vec::new()),
};

impl Log for CapturingLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.target().starts_with("tiercfg")
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            let line = record.args().to_string();
            self.records.lock().unwrap().push((record.level(), line));
        }
    }

    fn flush(&self) {}
}

/// Install the capturing logger (idempotent)
pub fn capture_logs() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }
}

/// Whether a line at `level` containing every needle was logged
pub fn logged(level: Level, needles: &[&str]) -> bool {
    LOGGER
        .records
        .lock()
        .unwrap()
        .iter()
        .any(|(l, line)| *l == level && needles.iter().all(|n| line.contains(n)))
}

/// All captured lines, for checking that nothing sensitive was logged
pub fn all_logged() -> Vec<String> {
    LOGGER
        .records
        .lock()
        .unwrap()
        .iter()
        .map(|(_, line)| line.clone())
        .collect()
}

// =============================================================================
// Test Fixtures
// =============================================================================

/// Temporary directory, injectable repository and a manager wired to both
pub struct TestFixture {
    pub temp_dir: TempDir,
    pub repo: Arc<FailingRepository>,
    pub manager: ConfigManager,
}

impl TestFixture {
    /// Fixture with no env file, no process variables and built-in defaults
    pub fn new() -> Self {
        Self::with(|builder| builder)
    }

    /// Fixture whose env file starts with `content`
    pub fn with_env_file(content: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::write(temp_dir.path().join(".env"), content).expect("Failed to write env file");
        Self::build(temp_dir, |builder| builder)
    }

    /// Fixture with extra builder configuration
    pub fn with(configure: impl FnOnce(ConfigManagerBuilder) -> ConfigManagerBuilder) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        Self::build(temp_dir, configure)
    }

    fn build(
        temp_dir: TempDir,
        configure: impl FnOnce(ConfigManagerBuilder) -> ConfigManagerBuilder,
    ) -> Self {
        let repo = Arc::new(FailingRepository::new());
        let builder = ConfigManager::builder()
            .database_path(temp_dir.path().join("stock_analysis.db"))
            .env_file(temp_dir.path().join(".env"))
            .repository(repo.clone())
            .env_source(Arc::new(HashMap::<String, String>::new()));
        let manager = configure(builder).build().expect("Failed to create manager");

        Self {
            temp_dir,
            repo,
            manager,
        }
    }

    /// Path of the legacy env file
    pub fn env_path(&self) -> PathBuf {
        self.temp_dir.path().join(".env")
    }

    /// Current env file contents (empty if missing)
    pub fn env_content(&self) -> String {
        std::fs::read_to_string(self.env_path()).unwrap_or_default()
    }
}

/// Environment map from pairs
pub fn env_map(pairs: &[(&str, &str)]) -> Arc<HashMap<String, String>> {
    Arc::new(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    )
}
