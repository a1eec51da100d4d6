//! The persisted setting row and its category tag

use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;

/// Grouping tag for settings.
///
/// Categories drive grouped retrieval and the write-sink table; they are
/// never used for access control.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// Provider API keys, tokens and model names
    ApiKeys,
    /// Outgoing mail account and recipients
    Email,
    /// Scheduler switches and run times
    Schedule,
    /// The watched stock list
    Stocks,
    #[default]
    General,
}

impl Category {
    /// All categories, in display order
    pub const ALL: [Category; 5] = [
        Category::ApiKeys,
        Category::Email,
        Category::Schedule,
        Category::Stocks,
        Category::General,
    ];

    /// Tag as stored in the `category` column
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::ApiKeys => "api_keys",
            Category::Email => "email",
            Category::Schedule => "schedule",
            Category::Stocks => "stocks",
            Category::General => "general",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| crate::Error::Config(format!("unknown setting category '{s}'")))
    }
}

/// A single persisted configuration row.
///
/// `value` is ciphertext whenever `is_encrypted` is set. Repositories store
/// and return it byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub is_encrypted: bool,
    pub category: Category,
    pub description: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Setting {
    /// Create a fresh row stamped with the current time
    pub fn new(
        key: impl Into<String>,
        value: impl Into<String>,
        is_encrypted: bool,
        category: Category,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            key: key.into(),
            value: value.into(),
            is_encrypted,
            category,
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach a human-readable annotation
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
