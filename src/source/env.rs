//! Environment variable lookup for the file tier

use std::collections::HashMap;

/// Source of environment variables
///
/// Abstracted so tests can inject variables without touching the real
/// process environment.
pub trait EnvSource: Send + Sync {
    /// Value of `name`, if set
    fn var(&self, name: &str) -> Option<String>;
}

/// The real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Variable name for a setting key.
///
/// Format: `{PREFIX}_{KEY}` or just `{KEY}`, all uppercase, dots become
/// underscores (`gemini_api_key` -> `GEMINI_API_KEY`).
#[must_use]
pub fn var_name(prefix: Option<&str>, key: &str) -> String {
    let env_key = key.replace('.', "_").to_uppercase();
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{}_{env_key}", prefix.to_uppercase()),
        _ => env_key,
    }
}
