//! SQLite-backed setting repository
//!
//! One table, `system_settings`, keyed uniquely by `key`. Every write is a
//! single statement, so a concurrent reader sees either the old row or the
//! new one, never a mix.

use super::SettingRepository;
use crate::error::{Error, Result};
use crate::setting::{Category, Setting};
use crate::sync::MutexExt;
use log::{debug, warn};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// How long a writer waits on a locked database before reporting failure
pub const BUSY_TIMEOUT: Duration = Duration::from_millis(5_000);

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS system_settings (
    key          TEXT PRIMARY KEY NOT NULL,
    value        TEXT NOT NULL,
    is_encrypted INTEGER NOT NULL DEFAULT 0,
    category     TEXT NOT NULL DEFAULT 'general',
    description  TEXT,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_system_settings_category ON system_settings (category);
";

const SELECT_COLUMNS: &str =
    "SELECT key, value, is_encrypted, category, description, created_at, updated_at FROM system_settings";

/// Setting repository over a single SQLite connection
pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

impl SqliteRepository {
    /// Open (or create) the database file and ensure the schema exists.
    ///
    /// A newly created file and its parent directory are restricted to the
    /// current user.
    ///
    /// # Errors
    ///
    /// Returns `Error::StorageUnavailable` if the database cannot be opened,
    /// or an I/O error if its directory cannot be created.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            crate::security::ensure_secure_dir(parent)?;
        }
        let is_new = !path.exists();

        let conn = Connection::open(path)?;
        let repo = Self::from_connection(conn)?;

        if is_new {
            crate::security::set_secure_file_permissions(path)?;
        }
        debug!("Opened settings database at {}", path.display());
        Ok(repo)
    }

    /// In-memory database, for tests
    ///
    /// # Errors
    ///
    /// Returns `Error::StorageUnavailable` if SQLite cannot allocate it.
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Wrap an existing connection, applying the schema idempotently
    ///
    /// # Errors
    ///
    /// Returns `Error::StorageUnavailable` if the schema cannot be applied.
    pub fn from_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<OffsetDateTime> {
    let raw: String = row.get(idx)?;
    OffsetDateTime::parse(&raw, &Rfc3339)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn format_timestamp(ts: OffsetDateTime) -> Result<String> {
    ts.format(&Rfc3339)
        .map_err(|e| Error::storage("sqlite", format!("invalid timestamp: {e}")))
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<Setting> {
    let key: String = row.get(0)?;
    let tag: String = row.get(3)?;
    let category = tag.parse().unwrap_or_else(|_| {
        warn!("Setting '{key}' has unknown category '{tag}', treating as general");
        Category::General
    });

    Ok(Setting {
        value: row.get(1)?,
        is_encrypted: row.get(2)?,
        category,
        description: row.get(4)?,
        created_at: parse_timestamp(row, 5)?,
        updated_at: parse_timestamp(row, 6)?,
        key,
    })
}

impl SettingRepository for SqliteRepository {
    fn get(&self, key: &str) -> Result<Option<Setting>> {
        let conn = self.conn.lock_recovered();
        let setting = conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE key = ?1"),
                params![key],
                map_row,
            )
            .optional()?;
        Ok(setting)
    }

    fn get_all(&self, category: Option<Category>) -> Result<Vec<Setting>> {
        let conn = self.conn.lock_recovered();
        let tag = category.map(|c| c.as_str());
        let mut stmt = conn.prepare(&format!(
            "{SELECT_COLUMNS} WHERE (?1 IS NULL OR category = ?1) ORDER BY key"
        ))?;
        let rows = stmt
            .query_map(params![tag], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn upsert(&self, setting: &Setting) -> Result<()> {
        let created_at = format_timestamp(setting.created_at)?;
        let updated_at = format_timestamp(setting.updated_at)?;

        let conn = self.conn.lock_recovered();
        conn.execute(
            "INSERT INTO system_settings
                 (key, value, is_encrypted, category, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(key) DO UPDATE SET
                 value = excluded.value,
                 is_encrypted = excluded.is_encrypted,
                 category = excluded.category,
                 description = excluded.description,
                 updated_at = excluded.updated_at",
            params![
                setting.key,
                setting.value,
                setting.is_encrypted,
                setting.category.as_str(),
                setting.description,
                created_at,
                updated_at,
            ],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let conn = self.conn.lock_recovered();
        conn.execute("DELETE FROM system_settings WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

// =============================================================================
// Tests
// =============================================================================
