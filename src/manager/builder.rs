//! Builder for ConfigManager
//!
//! This module contains [`ConfigManagerBuilder`] which provides a fluent API
//! for creating a [`ConfigManager`](super::ConfigManager).

use super::{ConfigManager, SettingSink, SinkTable};
use crate::config::{CoreConfig, CoreConfigBuilder};
use crate::crypto::CryptoBox;
use crate::error::Result;
use crate::repository::SettingRepository;
use crate::setting::Category;
use crate::source::{Defaults, EnvFileSource, EnvSource, FileSource, ProcessEnv};
use crate::store::ConfigStore;
use crate::validate::{Validator, Validators};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Builder for creating a [`ConfigManager`] with a fluent API.
///
/// Collaborators that are not injected are created from the configuration:
/// a SQLite repository at `database_path`, an env-file source at `env_file`
/// and the real process environment.
///
/// # Example
///
/// ```rust,no_run
/// use tiercfg::ConfigManager;
///
/// let manager = ConfigManager::builder()
///     .database_path("~/.local/share/stocks/settings.db")
///     .env_file("./.env")
///     .default_value("schedule_time", "09:30")
///     .validator("schedule_time", |v| {
///         if v.contains(':') { Ok(()) } else { Err("use HH:MM".into()) }
///     })
///     .build()
///     .unwrap();
/// ```
pub struct ConfigManagerBuilder {
    config_builder: CoreConfigBuilder,
    repository: Option<Arc<dyn SettingRepository>>,
    env: Option<Arc<dyn EnvSource>>,
    file_source: Option<EnvFileSource>,
    validators: Vec<(String, Validator)>,
    mirrors: Vec<(Category, Arc<dyn SettingSink>)>,
}

impl Default for ConfigManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManagerBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config_builder: CoreConfigBuilder::new(),
            repository: None,
            env: None,
            file_source: None,
            validators: Vec::new(),
            mirrors: Vec::new(),
        }
    }

    /// Set the settings database location.
    ///
    /// Supports `~` expansion for home directory. The path is also what the
    /// encryption key is derived from.
    #[must_use]
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_builder = self.config_builder.database_path(path);
        self
    }

    /// Set the legacy env file (default: "./.env").
    #[must_use]
    pub fn env_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_builder = self.config_builder.env_file(path);
        self
    }

    /// Replace the application constant used in key derivation.
    #[must_use]
    pub fn app_secret(mut self, secret: impl Into<Vec<u8>>) -> Self {
        self.config_builder = self.config_builder.app_secret(secret);
        self
    }

    /// Prefix tier-2 variable names (`{PREFIX}_{KEY}`).
    #[must_use]
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.env_prefix(prefix);
        self
    }

    /// Whether process environment variables shadow the env file (default: true).
    #[must_use]
    pub fn process_env(mut self, enabled: bool) -> Self {
        self.config_builder = self.config_builder.process_env(enabled);
        self
    }

    /// Add or override a compiled default.
    #[must_use]
    pub fn default_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.default_value(key, value);
        self
    }

    /// Replace the whole defaults table.
    #[must_use]
    pub fn defaults(mut self, defaults: Defaults) -> Self {
        self.config_builder = self.config_builder.defaults(defaults);
        self
    }

    /// Use this repository instead of opening the database file.
    #[must_use]
    pub fn repository(mut self, repository: Arc<dyn SettingRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Read environment variables from `env` instead of the process.
    ///
    /// Used for `DATABASE_PATH` and for the variables that shadow the env file.
    #[must_use]
    pub fn env_source(mut self, env: Arc<dyn EnvSource>) -> Self {
        self.env = Some(env);
        self
    }

    /// Use this file source as tier 2 and as the stock-list mirror.
    ///
    /// Taken as-is: `env_prefix` and `process_env` are not applied to it.
    #[must_use]
    pub fn file_source(mut self, source: EnvFileSource) -> Self {
        self.file_source = Some(source);
        self
    }

    /// Register a validator run by [`ConfigManager::save`].
    #[must_use]
    pub fn validator<F>(mut self, key: impl Into<String>, validator: F) -> Self
    where
        F: Fn(&str) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        self.validators.push((key.into(), Arc::new(validator)));
        self
    }

    /// Also write saves of `category` to `sink`.
    #[must_use]
    pub fn mirror(mut self, category: Category, sink: Arc<dyn SettingSink>) -> Self {
        self.mirrors.push((category, sink));
        self
    }

    /// Build the [`ConfigManager`].
    ///
    /// # Errors
    ///
    /// Returns `Error::KeyDerivation` if the encryption key cannot be derived
    /// (the manager never falls back to storing secrets in plaintext), or
    /// `Error::StorageUnavailable` if the database cannot be opened.
    pub fn build(mut self) -> Result<ConfigManager> {
        let env = self.env.take().unwrap_or_else(|| Arc::new(ProcessEnv));
        let config_builder = std::mem::take(&mut self.config_builder);
        let config = config_builder.build_with_env(env.as_ref());
        self.env = Some(env);
        self.build_from(config)
    }

    pub(crate) fn build_from(self, config: CoreConfig) -> Result<ConfigManager> {
        let crypto = CryptoBox::for_database(&config.database_path, &config.app_secret)?;

        let repository = match self.repository {
            Some(repository) => repository,
            None => open_repository(&config.database_path)?,
        };
        let store = ConfigStore::new(repository, crypto);

        let file = Arc::new(self.file_source.unwrap_or_else(|| {
            let mut source = EnvFileSource::new(&config.env_file);
            if let Some(prefix) = &config.env_prefix {
                source = source.with_prefix(prefix);
            }
            if config.process_env {
                let env = self.env.unwrap_or_else(|| Arc::new(ProcessEnv));
                source = source.with_env(env);
            }
            source
        }));

        let mut sinks = SinkTable::new(Arc::new(store.clone()))
            .mirror(Category::Stocks, Arc::clone(&file) as Arc<dyn SettingSink>);
        for (category, sink) in self.mirrors {
            sinks = sinks.mirror(category, sink);
        }

        let validators = Validators::new();
        for (key, validator) in self.validators {
            validators.add_arc(&key, validator);
        }

        Ok(ConfigManager::from_parts(
            config,
            store,
            file as Arc<dyn FileSource>,
            sinks,
            validators,
        ))
    }
}

#[cfg(feature = "sqlite")]
fn open_repository(path: &Path) -> Result<Arc<dyn SettingRepository>> {
    Ok(Arc::new(crate::repository::SqliteRepository::open(path)?))
}

#[cfg(not(feature = "sqlite"))]
fn open_repository(path: &Path) -> Result<Arc<dyn SettingRepository>> {
    Err(crate::error::Error::Config(format!(
        "no repository for {}: enable the `sqlite` feature or inject one",
        path.display()
    )))
}
