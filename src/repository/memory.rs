//! In-memory setting repository for testing

use super::SettingRepository;
use crate::error::Result;
use crate::setting::{Category, Setting};
use crate::sync::RwLockExt;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// In-memory setting storage (not persisted)
#[derive(Default)]
pub struct MemoryRepository {
    rows: RwLock<BTreeMap<String, Setting>>,
}

impl MemoryRepository {
    /// Create an empty memory repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read_recovered().len()
    }

    /// Whether no rows are stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.read_recovered().is_empty()
    }
}

impl SettingRepository for MemoryRepository {
    fn get(&self, key: &str) -> Result<Option<Setting>> {
        Ok(self.rows.read_recovered().get(key).cloned())
    }

    fn get_all(&self, category: Option<Category>) -> Result<Vec<Setting>> {
        Ok(self
            .rows
            .read_recovered()
            .values()
            .filter(|s| category.is_none_or(|c| s.category == c))
            .cloned()
            .collect())
    }

    fn upsert(&self, setting: &Setting) -> Result<()> {
        let mut rows = self.rows.write_recovered();
        let mut row = setting.clone();
        if let Some(existing) = rows.get(&setting.key) {
            row.created_at = existing.created_at;
        }
        rows.insert(row.key.clone(), row);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.rows.write_recovered().remove(key);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

// =============================================================================
// Tests
// =============================================================================
