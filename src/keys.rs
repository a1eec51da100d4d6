//! Known setting keys and their static classification
//!
//! Sensitivity is a property of the key name alone. It is looked up here at
//! write time and never inferred from what a value looks like.

use crate::setting::Category;

pub const GEMINI_API_KEY: &str = "gemini_api_key";
pub const GEMINI_MODEL: &str = "gemini_model";
pub const GEMINI_MODEL_FALLBACK: &str = "gemini_model_fallback";
pub const OPENAI_API_KEY: &str = "openai_api_key";
pub const OPENAI_BASE_URL: &str = "openai_base_url";
pub const OPENAI_MODEL: &str = "openai_model";
pub const DEEPSEEK_API_KEY: &str = "deepseek_api_key";
pub const ZHIPU_API_KEY: &str = "zhipu_api_key";
pub const TUSHARE_TOKEN: &str = "tushare_token";
pub const TAVILY_API_KEYS: &str = "tavily_api_keys";
pub const SERPAPI_KEYS: &str = "serpapi_keys";
pub const BOCHA_API_KEYS: &str = "bocha_api_keys";

pub const EMAIL_SENDER: &str = "email_sender";
pub const EMAIL_PASSWORD: &str = "email_password";
pub const EMAIL_RECEIVERS: &str = "email_receivers";

pub const TELEGRAM_BOT_TOKEN: &str = "telegram_bot_token";
pub const DISCORD_BOT_TOKEN: &str = "discord_bot_token";
pub const FEISHU_APP_SECRET: &str = "feishu_app_secret";
pub const DINGTALK_APP_SECRET: &str = "dingtalk_app_secret";

pub const SCHEDULE_ENABLED: &str = "schedule_enabled";
pub const SCHEDULE_TIME: &str = "schedule_time";
pub const MARKET_REVIEW_ENABLED: &str = "market_review_enabled";

pub const STOCK_LIST: &str = "stock_list";

/// Keys whose values are encrypted before they reach the repository
pub const SENSITIVE_KEYS: &[&str] = &[
    GEMINI_API_KEY,
    TUSHARE_TOKEN,
    TAVILY_API_KEYS,
    SERPAPI_KEYS,
    BOCHA_API_KEYS,
    EMAIL_PASSWORD,
    OPENAI_API_KEY,
    DEEPSEEK_API_KEY,
    ZHIPU_API_KEY,
    TELEGRAM_BOT_TOKEN,
    DISCORD_BOT_TOKEN,
    FEISHU_APP_SECRET,
    DINGTALK_APP_SECRET,
];

/// Home category of every known key
const KEY_CATEGORIES: &[(&str, Category)] = &[
    (GEMINI_API_KEY, Category::ApiKeys),
    (GEMINI_MODEL, Category::ApiKeys),
    (GEMINI_MODEL_FALLBACK, Category::ApiKeys),
    (OPENAI_API_KEY, Category::ApiKeys),
    (OPENAI_BASE_URL, Category::ApiKeys),
    (OPENAI_MODEL, Category::ApiKeys),
    (DEEPSEEK_API_KEY, Category::ApiKeys),
    (ZHIPU_API_KEY, Category::ApiKeys),
    (TUSHARE_TOKEN, Category::ApiKeys),
    (TAVILY_API_KEYS, Category::ApiKeys),
    (SERPAPI_KEYS, Category::ApiKeys),
    (BOCHA_API_KEYS, Category::ApiKeys),
    (EMAIL_SENDER, Category::Email),
    (EMAIL_PASSWORD, Category::Email),
    (EMAIL_RECEIVERS, Category::Email),
    (SCHEDULE_ENABLED, Category::Schedule),
    (SCHEDULE_TIME, Category::Schedule),
    (MARKET_REVIEW_ENABLED, Category::Schedule),
    (STOCK_LIST, Category::Stocks),
];

/// How a key's value is stored at rest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sensitivity {
    /// Stored as plaintext
    Plain,
    /// Encrypted before persisting
    Secret,
}

impl Sensitivity {
    /// Whether values of this class are encrypted at rest
    #[must_use]
    pub fn is_secret(self) -> bool {
        self == Sensitivity::Secret
    }
}

/// Classify a key. Unknown keys are plain.
#[must_use]
pub fn sensitivity(key: &str) -> Sensitivity {
    if SENSITIVE_KEYS.contains(&key) {
        Sensitivity::Secret
    } else {
        Sensitivity::Plain
    }
}

/// Category a known key belongs to, or `General` for unknown keys
#[must_use]
pub fn category_of(key: &str) -> Category {
    KEY_CATEGORIES
        .iter()
        .find(|(k, _)| *k == key)
        .map_or(Category::General, |(_, c)| *c)
}

/// Known keys in a category, in catalogue order
pub fn keys_in(category: Category) -> impl Iterator<Item = &'static str> {
    KEY_CATEGORIES
        .iter()
        .filter(move |(_, c)| *c == category)
        .map(|(k, _)| *k)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensitivity_is_by_name() {
        assert_eq!(sensitivity("gemini_api_key"), Sensitivity::Secret);
        assert_eq!(sensitivity("email_password"), Sensitivity::Secret);
        assert_eq!(sensitivity("schedule_time"), Sensitivity::Plain);
        // A value that looks like a token does not matter, only the name does
        assert_eq!(sensitivity("gemini_model"), Sensitivity::Plain);
        assert_eq!(sensitivity("unknown_key"), Sensitivity::Plain);
    }

    #[test]
    fn test_category_lookup() {
        assert_eq!(category_of(STOCK_LIST), Category::Stocks);
        assert_eq!(category_of(EMAIL_RECEIVERS), Category::Email);
        assert_eq!(category_of("something_else"), Category::General);

        let schedule: Vec<_> = keys_in(Category::Schedule).collect();
        assert_eq!(
            schedule,
            vec![SCHEDULE_ENABLED, SCHEDULE_TIME, MARKET_REVIEW_ENABLED]
        );
    }
}
