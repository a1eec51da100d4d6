//! Core configuration types

use crate::crypto::DEFAULT_APP_SECRET;
use crate::source::{Defaults, EnvSource, ProcessEnv};
use std::path::PathBuf;

/// Environment variable naming the settings database
pub const DATABASE_PATH_VAR: &str = "DATABASE_PATH";

/// Database location used when nothing else is configured
pub const DEFAULT_DATABASE_PATH: &str = "./data/stock_analysis.db";

/// Legacy env-style file used when nothing else is configured
pub const DEFAULT_ENV_FILE: &str = "./.env";

/// Configuration for initializing the ConfigManager
#[derive(Clone)]
pub struct CoreConfig {
    /// Settings database location. Also the identifier the encryption key is
    /// derived from, so moving the file invalidates stored secrets.
    pub database_path: PathBuf,

    /// Legacy `KEY=value` file consulted as the second tier
    pub env_file: PathBuf,

    /// Application constant mixed into key derivation
    pub app_secret: Vec<u8>,

    /// Prefix for tier-2 variable names (e.g. "APP" -> `APP_STOCK_LIST`)
    pub env_prefix: Option<String>,

    /// Let real process environment variables shadow the env file
    pub process_env: bool,

    /// Compiled defaults, the last tier
    pub defaults: Defaults,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database_path", &self.database_path)
            .field("env_file", &self.env_file)
            .field("env_prefix", &self.env_prefix)
            .field("process_env", &self.process_env)
            .field("defaults", &self.defaults.len())
            .finish_non_exhaustive()
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        CoreConfigBuilder::new().build()
    }
}

impl CoreConfig {
    /// Create a new builder for CoreConfig
    ///
    /// # Example
    /// ```rust
    /// use tiercfg::CoreConfig;
    ///
    /// let config = CoreConfig::builder()
    ///     .database_path("~/.local/share/stocks/settings.db")
    ///     .env_file("/etc/stocks/.env")
    ///     .build();
    /// ```
    #[must_use]
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::new()
    }
}

/// Builder for creating CoreConfig with a fluent API
#[derive(Clone, Debug)]
pub struct CoreConfigBuilder {
    database_path: Option<PathBuf>,
    env_file: Option<PathBuf>,
    app_secret: Vec<u8>,
    env_prefix: Option<String>,
    process_env: bool,
    defaults: Defaults,
}

impl Default for CoreConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CoreConfigBuilder {
    /// Builder with the shipped defaults
    #[must_use]
    pub fn new() -> Self {
        Self {
            database_path: None,
            env_file: None,
            app_secret: DEFAULT_APP_SECRET.to_vec(),
            env_prefix: None,
            process_env: true,
            defaults: Defaults::builtin(),
        }
    }

    /// Set the settings database location
    ///
    /// Supports `~` expansion for home directory.
    #[must_use]
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(expand_home(path.into()));
        self
    }

    /// Set the legacy env file (default: "./.env")
    ///
    /// Supports `~` expansion for home directory.
    #[must_use]
    pub fn env_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.env_file = Some(expand_home(path.into()));
        self
    }

    /// Replace the application constant used in key derivation
    #[must_use]
    pub fn app_secret(mut self, secret: impl Into<Vec<u8>>) -> Self {
        self.app_secret = secret.into();
        self
    }

    /// Prefix tier-2 variable names
    ///
    /// The format is: `{PREFIX}_{KEY}` (all uppercase, dots become underscores)
    #[must_use]
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Whether process environment variables shadow the env file (default: true)
    #[must_use]
    pub fn process_env(mut self, enabled: bool) -> Self {
        self.process_env = enabled;
        self
    }

    /// Add or override a compiled default. An empty value removes it.
    #[must_use]
    pub fn default_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.insert(key, value);
        self
    }

    /// Replace the whole defaults table
    #[must_use]
    pub fn defaults(mut self, defaults: Defaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Build the CoreConfig
    ///
    /// If `database_path` is not set, reads `DATABASE_PATH` from the process
    /// environment and falls back to `./data/stock_analysis.db`.
    #[must_use]
    pub fn build(self) -> CoreConfig {
        self.build_with_env(&ProcessEnv)
    }

    pub(crate) fn build_with_env(self, env: &dyn EnvSource) -> CoreConfig {
        let database_path = self.database_path.unwrap_or_else(|| {
            env.var(DATABASE_PATH_VAR)
                .filter(|p| !p.is_empty())
                .map(|p| expand_home(PathBuf::from(p)))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH))
        });

        CoreConfig {
            database_path,
            env_file: self
                .env_file
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ENV_FILE)),
            app_secret: self.app_secret,
            env_prefix: self.env_prefix,
            process_env: self.process_env,
            defaults: self.defaults,
        }
    }
}

fn expand_home(path: PathBuf) -> PathBuf {
    if let (Ok(rest), Some(home)) = (path.strip_prefix("~"), dirs::home_dir()) {
        return home.join(rest);
    }
    path
}
