//! Store Integration Tests
//!
//! Tests for the encryption-aware store:
//! - Secrets encrypted at rest and round-tripped
//! - Save/delete duality
//! - Per-key batch reports when the repository fails
//! - Stale ciphertext read as absent, never as garbage

mod common;

use common::{FailingRepository, capture_logs, logged};
use log::Level;
use std::sync::Arc;
use tiercfg::{
    Category, ConfigStore, CryptoBox, DEFAULT_APP_SECRET, MemoryRepository, SettingRepository,
    keys, mask_secret,
};

fn store_over(repo: Arc<dyn SettingRepository>, db_path: &str) -> ConfigStore {
    let crypto = CryptoBox::derive(db_path, DEFAULT_APP_SECRET).unwrap();
    ConfigStore::new(repo, crypto)
}

// =============================================================================
// Encryption at Rest
// =============================================================================

#[test]
fn test_every_sensitive_key_round_trips_encrypted() {
    let repo = Arc::new(MemoryRepository::new());
    let store = store_over(repo.clone(), "/srv/stock_analysis.db");
    let samples = ["short!", "sk-abcdefg123", "密钥 with spaces", "a,b,c\nd"];

    for key in keys::SENSITIVE_KEYS {
        for value in samples {
            store.set(key, value, keys::category_of(key)).unwrap();

            let row = repo.get(key).unwrap().unwrap();
            assert!(row.is_encrypted, "{key} stored in plaintext");
            assert!(!row.value.contains(value), "{key} ciphertext leaks plaintext");
            assert_eq!(store.get(key).unwrap().as_deref(), Some(value));
        }
    }
}

#[test]
fn test_gemini_key_scenario() {
    let repo = Arc::new(MemoryRepository::new());
    let store = store_over(repo.clone(), "/srv/stock_analysis.db");

    store
        .set(keys::GEMINI_API_KEY, "sk-abcdefg123", Category::ApiKeys)
        .unwrap();

    let row = repo.get(keys::GEMINI_API_KEY).unwrap().unwrap();
    assert!(row.is_encrypted);
    assert_ne!(row.value, "sk-abcdefg123");

    let value = store.get(keys::GEMINI_API_KEY).unwrap().unwrap();
    assert_eq!(value, "sk-abcdefg123");
    assert_eq!(mask_secret(&value), "sk****g123");
}

#[test]
fn test_plain_keys_stay_plain() {
    let repo = Arc::new(MemoryRepository::new());
    let store = store_over(repo.clone(), "/srv/stock_analysis.db");

    store
        .set(keys::EMAIL_SENDER, "bot@example.com", Category::Email)
        .unwrap();
    store
        .set("custom_flag", "on", Category::General)
        .unwrap();

    assert!(!repo.get(keys::EMAIL_SENDER).unwrap().unwrap().is_encrypted);
    assert_eq!(repo.get("custom_flag").unwrap().unwrap().value, "on");
}

#[test]
fn test_classification_does_not_change_between_writes() {
    let repo = Arc::new(MemoryRepository::new());
    let store = store_over(repo.clone(), "/srv/stock_analysis.db");

    store
        .set(keys::EMAIL_PASSWORD, "first", Category::Email)
        .unwrap();
    store
        .set(keys::EMAIL_PASSWORD, "second", Category::Email)
        .unwrap();

    let row = repo.get(keys::EMAIL_PASSWORD).unwrap().unwrap();
    assert!(row.is_encrypted);
    assert_eq!(store.get(keys::EMAIL_PASSWORD).unwrap().as_deref(), Some("second"));
}

// =============================================================================
// Save / Delete Duality
// =============================================================================

#[test]
fn test_set_then_get_and_empty_then_absent() {
    let repo = Arc::new(MemoryRepository::new());
    let store = store_over(repo.clone(), "/srv/stock_analysis.db");

    for key in [keys::STOCK_LIST, keys::TUSHARE_TOKEN, "anything_else"] {
        store.set(key, "value", Category::General).unwrap();
        assert_eq!(store.get(key).unwrap().as_deref(), Some("value"));
        assert!(store.exists(key).unwrap());

        store.set(key, "", Category::General).unwrap();
        assert_eq!(store.get(key).unwrap(), None);
        assert!(!store.exists(key).unwrap());
    }
    assert!(repo.is_empty());
}

#[test]
fn test_delete_is_idempotent() {
    let store = store_over(Arc::new(MemoryRepository::new()), "/srv/stock_analysis.db");
    store.delete(keys::STOCK_LIST).unwrap();
    store.delete(keys::STOCK_LIST).unwrap();
}

#[test]
fn test_get_all_groups_by_category() {
    let store = store_over(Arc::new(MemoryRepository::new()), "/srv/stock_analysis.db");
    store
        .set_batch(
            [
                (keys::EMAIL_SENDER, "bot@example.com"),
                (keys::EMAIL_PASSWORD, "hunter2"),
            ],
            Category::Email,
        );
    store
        .set(keys::STOCK_LIST, "600519", Category::Stocks)
        .unwrap();

    let email = store.get_all(Some(Category::Email)).unwrap();
    assert_eq!(
        email.keys().map(String::as_str).collect::<Vec<_>>(),
        vec![keys::EMAIL_PASSWORD, keys::EMAIL_SENDER]
    );
    assert_eq!(email[keys::EMAIL_PASSWORD], "hunter2");
    assert_eq!(store.get_all(None).unwrap().len(), 3);
}

// =============================================================================
// Batch Reports
// =============================================================================

#[test]
fn test_batch_reports_failed_keys_and_keeps_going() {
    capture_logs();
    let repo = Arc::new(FailingRepository::new());
    repo.fail_writes_for(keys::EMAIL_PASSWORD);
    let store = store_over(repo.clone(), "/srv/stock_analysis.db");

    let report = store.set_batch(
        [
            (keys::EMAIL_SENDER, "bot@example.com"),
            (keys::EMAIL_PASSWORD, "hunter2"),
            (keys::EMAIL_RECEIVERS, "a@example.com,b@example.com"),
        ],
        Category::Email,
    );

    assert!(!report.is_complete());
    assert_eq!(report.succeeded, vec![keys::EMAIL_SENDER, keys::EMAIL_RECEIVERS]);
    assert_eq!(report.failed_keys().collect::<Vec<_>>(), vec![keys::EMAIL_PASSWORD]);
    assert!(report.failed[0].1.is_storage_unavailable());

    assert!(repo.raw(keys::EMAIL_RECEIVERS).is_some());
    assert!(repo.raw(keys::EMAIL_PASSWORD).is_none());
    assert!(logged(Level::Error, &["email", "email_password"]));
}

#[test]
fn test_store_surfaces_storage_errors() {
    let repo = Arc::new(FailingRepository::new());
    let store = store_over(repo.clone(), "/srv/stock_analysis.db");
    repo.fail_reads(true);

    let err = store.get(keys::STOCK_LIST).unwrap_err();
    assert!(err.is_storage_unavailable());
    assert!(store.get_all(None).is_err());
}

// =============================================================================
// Stale Keys
// =============================================================================

#[test]
fn test_moved_database_reads_secrets_as_absent() {
    capture_logs();
    let repo = Arc::new(MemoryRepository::new());
    let original = store_over(repo.clone(), "/srv/old/stock_analysis.db");
    original
        .set(keys::DEEPSEEK_API_KEY, "ds-very-secret", Category::ApiKeys)
        .unwrap();
    original
        .set(keys::OPENAI_MODEL, "gpt-4o", Category::ApiKeys)
        .unwrap();

    let moved = store_over(repo, "/srv/new/stock_analysis.db");

    assert_eq!(moved.get(keys::DEEPSEEK_API_KEY).unwrap(), None);
    assert_eq!(moved.get(keys::OPENAI_MODEL).unwrap().as_deref(), Some("gpt-4o"));

    let api_keys = moved.get_all(Some(Category::ApiKeys)).unwrap();
    assert!(!api_keys.contains_key(keys::DEEPSEEK_API_KEY));
    assert!(api_keys.values().all(|v| v != "ds-very-secret"));

    assert!(logged(Level::Error, &["deepseek_api_key"]));
    assert!(
        common::all_logged()
            .iter()
            .all(|line| !line.contains("ds-very-secret"))
    );
}

#[test]
fn test_different_app_secret_cannot_decrypt() {
    let repo = Arc::new(MemoryRepository::new());
    let path = "/srv/stock_analysis.db";
    store_over(repo.clone(), path)
        .set(keys::TUSHARE_TOKEN, "T-123", Category::ApiKeys)
        .unwrap();

    let other = ConfigStore::new(repo, CryptoBox::derive(path, b"another-app").unwrap());
    assert_eq!(other.get(keys::TUSHARE_TOKEN).unwrap(), None);
}
