//! Legacy `KEY=value` file source
//!
//! Reads the flat env-style file the application used before settings moved
//! into the database. Real process variables of the same name win over the
//! file when an [`EnvSource`] overlay is configured, matching how dotenv
//! never overrides an already-set variable.

use super::FileSource;
use super::env::{EnvSource, var_name};
use crate::error::{Error, Result};
use crate::sync::MutexExt;
use log::debug;
use regex::{NoExpand, Regex};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// File tier backed by an env-style file
///
/// Clones share one write lock, so concurrent writes through any of them
/// are applied one after another.
#[derive(Clone)]
pub struct EnvFileSource {
    path: PathBuf,
    prefix: Option<String>,
    env: Option<Arc<dyn EnvSource>>,
    write_lock: Arc<Mutex<()>>,
}

impl fmt::Debug for EnvFileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvFileSource")
            .field("path", &self.path)
            .field("prefix", &self.prefix)
            .field("env_overlay", &self.env.is_some())
            .finish()
    }
}

impl EnvFileSource {
    /// File-only source
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            prefix: None,
            env: None,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Prefix variable names (`{PREFIX}_{KEY}`)
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Let variables from `env` shadow the file contents
    #[must_use]
    pub fn with_env(mut self, env: Arc<dyn EnvSource>) -> Self {
        self.env = Some(env);
        self
    }

    /// Path of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Variable name used for a setting key
    #[must_use]
    pub fn var_name(&self, key: &str) -> String {
        var_name(self.prefix.as_deref(), key)
    }

    /// Parse the whole file. A missing file is empty.
    ///
    /// # Errors
    ///
    /// Returns `Error::FileRead` if the file exists but cannot be read.
    pub fn entries(&self) -> Result<HashMap<String, String>> {
        Ok(self
            .read_content()?
            .lines()
            .filter_map(parse_line)
            .collect())
    }

    /// Replace the variable for `key` in place, or append it.
    ///
    /// The file is rewritten atomically (temp file + rename) and created if
    /// missing. Values that would not read back unchanged (surrounding
    /// quotes or whitespace, ` #`) are written double-quoted. Writing an
    /// empty value leaves `KEY=` behind, which reads as absent.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for multi-line values, or an I/O error if the
    /// file cannot be read or written.
    pub fn write(&self, key: &str, value: &str) -> Result<()> {
        if value.contains(['\n', '\r']) {
            return Err(Error::Config(format!(
                "value for {key} spans multiple lines and cannot be written to {}",
                self.path.display()
            )));
        }

        let name = self.var_name(key);
        let line = format!("{name}={}", render_value(value));
        let pattern = Regex::new(&format!(
            r"(?m)^[ \t]*(?:export[ \t]+)?{}[ \t]*=.*$",
            regex::escape(&name)
        ))
        .map_err(|e| Error::Config(format!("invalid variable name {name}: {e}")))?;

        let _guard = self.write_lock.lock_recovered();
        let content = self.read_content()?;
        let mut updated = if pattern.is_match(&content) {
            pattern.replace_all(&content, NoExpand(&line)).into_owned()
        } else {
            let mut appended = content;
            if !appended.is_empty() && !appended.ends_with('\n') {
                appended.push('\n');
            }
            appended.push_str(&line);
            appended
        };
        if !updated.ends_with('\n') {
            updated.push('\n');
        }

        self.write_atomic(&updated)?;
        debug!("Updated {name} in {}", self.path.display());
        Ok(())
    }

    fn read_content(&self) -> Result<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(Error::FileRead {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    fn write_atomic(&self, content: &str) -> Result<()> {
        if self.path.file_name().is_none() {
            return Err(Error::Config(format!(
                "Invalid path '{}': must have a filename",
                self.path.display()
            )));
        }
        let parent = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                std::fs::create_dir_all(parent).map_err(|e| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
                parent
            }
            None => Path::new("."),
        };

        let write_err = |source: std::io::Error| Error::FileWrite {
            path: self.path.clone(),
            source,
        };
        let mut temp = NamedTempFile::new_in(parent).map_err(write_err)?;
        temp.write_all(content.as_bytes()).map_err(write_err)?;
        temp.persist(&self.path).map_err(|e| write_err(e.error))?;
        Ok(())
    }
}

impl FileSource for EnvFileSource {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let name = self.var_name(key);

        if let Some(env) = &self.env {
            if let Some(value) = env.var(&name).filter(|v| !v.is_empty()) {
                return Ok(Some(value));
            }
        }

        Ok(self.entries()?.remove(&name).filter(|v| !v.is_empty()))
    }

    fn source_name(&self) -> &'static str {
        "env_file"
    }
}

/// Value as written after `KEY=`, quoted when the bare form would not
/// parse back to the same string.
fn render_value(value: &str) -> Cow<'_, str> {
    let bare_round_trips = parse_line(&format!("K={value}")).is_some_and(|(_, v)| v == value);
    if bare_round_trips {
        Cow::Borrowed(value)
    } else {
        Cow::Owned(format!("\"{value}\""))
    }
}

/// Parse one `KEY=value` line. Comments, blanks and malformed lines yield `None`.
fn parse_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let line = line.strip_prefix("export ").map_or(line, str::trim_start);

    let (name, raw) = line.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let raw = raw.trim();
    let value = match raw.chars().next() {
        Some(quote @ ('"' | '\'')) if raw.len() >= 2 && raw.ends_with(quote) => {
            &raw[1..raw.len() - 1]
        }
        _ => raw.split_once(" #").map_or(raw, |(v, _)| v.trim_end()),
    };
    Some((name.to_string(), value.to_string()))
}

// =============================================================================
// Tests
// =============================================================================
