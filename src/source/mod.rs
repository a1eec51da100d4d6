//! Fallback tiers behind the store
//!
//! - **File tier**: a legacy flat `KEY=value` file, optionally shadowed by
//!   real process environment variables
//! - **Defaults**: values compiled into the binary

mod defaults;
mod env;
mod env_file;

pub use defaults::Defaults;
pub use env::{EnvSource, ProcessEnv, var_name};
pub use env_file::EnvFileSource;

use crate::error::Result;

/// Read side of the second resolution tier
pub trait FileSource: Send + Sync {
    /// Look up a setting key. Empty values read as absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing file exists but cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Source name for logging/debugging
    fn source_name(&self) -> &'static str;
}
