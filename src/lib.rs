//! # tiercfg - layered, encrypted-at-rest configuration
//!
//! Read and write named settings without caring whether a value lives in the
//! settings database, a legacy env file, or a compiled-in default.
//!
//! ## Features
//!
//! - **Three-tier resolution**: database, then env file (shadowed by process
//!   variables), then defaults. The order is fixed for every key.
//! - **Encrypted secrets**: keys in [`keys::SENSITIVE_KEYS`] are sealed with
//!   AES-256-GCM under a key derived from the database path (PBKDF2, 100k
//!   iterations). A moved database reads its secrets as absent.
//! - **Snapshot cache**: resolutions are cached in an immutable snapshot;
//!   `reload` swaps it out atomically.
//! - **Category saves**: validate, write through the category's sinks (the
//!   stock list is mirrored into the env file), reload, notify.
//! - **Change notifications**: subscribers run on their own threads, so
//!   publishing never blocks.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tiercfg::{Category, ConfigManager};
//!
//! # fn example() -> tiercfg::Result<()> {
//! let manager = ConfigManager::builder()
//!     .database_path("./data/stock_analysis.db")
//!     .env_file("./.env")
//!     .build()?;
//!
//! // Resolve through store -> env file -> defaults
//! let model = manager.get_or("gemini_model", "gemini-2.0-flash");
//! let stocks = manager.get_list("stock_list");
//!
//! // Secrets are encrypted before they reach the database
//! let report = manager.save(Category::ApiKeys, [("gemini_api_key", "sk-abcdefg123")])?;
//! assert!(report.is_complete());
//!
//! // Form previews never show whole secrets
//! let preview = manager.masked_view(Category::ApiKeys);
//! assert_eq!(preview["gemini_api_key"], "sk****g123");
//! # Ok(())
//! # }
//! ```
//!
//! ## Reacting to schedule changes
//!
//! ```rust,no_run
//! use tiercfg::{Category, ConfigManager};
//!
//! # fn example(manager: ConfigManager) -> tiercfg::Result<()> {
//! manager.on_schedule_change(|schedule| {
//!     println!("run at {:?} (enabled: {})", schedule.times, schedule.enabled);
//! })?;
//!
//! manager.save(Category::Schedule, [("schedule_enabled", "true"), ("schedule_time", "09:30")])?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Direct store access
//!
//! ```rust
//! use std::sync::Arc;
//! use tiercfg::{Category, ConfigStore, CryptoBox, MemoryRepository};
//!
//! let crypto = CryptoBox::derive("/tmp/settings.db", tiercfg::DEFAULT_APP_SECRET).unwrap();
//! let store = ConfigStore::new(Arc::new(MemoryRepository::new()), crypto);
//!
//! store.set("tushare_token", "T-123", Category::ApiKeys).unwrap();
//! assert_eq!(store.get("tushare_token").unwrap().as_deref(), Some("T-123"));
//!
//! // An empty value deletes
//! store.set("tushare_token", "", Category::ApiKeys).unwrap();
//! assert_eq!(store.get("tushare_token").unwrap(), None);
//! ```

// Core modules
mod crypto;
mod error;
mod events;
mod manager;
mod mask;
mod schedule;
pub mod security;
mod setting;
mod store;
mod sync;
mod validate;

// Grouped modules
pub mod config;
pub mod keys;
pub mod repository;
pub mod source;

// Re-exports from core
pub use crypto::{CryptoBox, DEFAULT_APP_SECRET, PBKDF2_ITERATIONS};
pub use error::{Error, Result};
pub use events::{ChangeNotifier, SubscriberId};
pub use manager::{ConfigManager, ConfigManagerBuilder, Resolved, SettingSink, SinkTable, Tier};
pub use mask::mask_secret;
pub use schedule::ScheduleSettings;
pub use setting::{Category, Setting};
pub use store::{BatchReport, ConfigStore};
pub use validate::{Validator, Validators};

// Re-exports from grouped modules
pub use config::{CoreConfig, CoreConfigBuilder};
pub use keys::Sensitivity;
#[cfg(feature = "sqlite")]
pub use repository::SqliteRepository;
pub use repository::{MemoryRepository, SettingRepository};
pub use source::{Defaults, EnvFileSource, EnvSource, FileSource, ProcessEnv};
