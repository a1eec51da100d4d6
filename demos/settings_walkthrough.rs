// Walkthrough of the tiered settings core
//
// Run with: RUST_LOG=debug cargo run --example settings_walkthrough

use std::sync::mpsc;
use std::time::Duration;
use tiercfg::{Category, ConfigManager, keys};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let dir = std::env::temp_dir().join("tiercfg-walkthrough");
    std::fs::create_dir_all(&dir)?;
    std::fs::write(
        dir.join(".env"),
        "# legacy settings\nSTOCK_LIST=600519,000001\nTUSHARE_TOKEN=T-from-env-file\n",
    )?;

    let manager = ConfigManager::builder()
        .database_path(dir.join("stock_analysis.db"))
        .env_file(dir.join(".env"))
        .validator(keys::SCHEDULE_TIME, |value| {
            let ok = value.split(',').map(str::trim).all(|t| {
                t.split_once(':')
                    .is_some_and(|(h, m)| h.parse::<u8>().is_ok() && m.len() == 2)
            });
            if ok { Ok(()) } else { Err(format!("time format error: {value}, use HH:MM")) }
        })
        .build()?;

    println!("⚙️  tiercfg walkthrough ({})\n", dir.display());

    // Resolution tiers
    println!("📖 Resolving before anything is saved:");
    for key in [keys::STOCK_LIST, keys::TUSHARE_TOKEN, keys::SCHEDULE_TIME] {
        match manager.resolve(key) {
            Some(r) => println!("   {key:<16} = {:<24} ({})", r.value, r.tier),
            None => println!("   {key:<16} is unset"),
        }
    }

    // Secrets and masking
    println!("\n🔐 Saving API keys (encrypted at rest):");
    let report = manager.save(
        Category::ApiKeys,
        [(keys::GEMINI_API_KEY, "sk-abcdefg123"), (keys::TUSHARE_TOKEN, "T-123456789")],
    )?;
    println!("   saved: {:?}", report.succeeded);
    for (key, shown) in manager.masked_view(Category::ApiKeys) {
        println!("   {key:<22} {shown}");
    }

    // Dual write
    println!("\n📈 Saving the stock list (store + env file):");
    manager.save(Category::Stocks, [(keys::STOCK_LIST, "600519, hk00700, AAPL")])?;
    println!("   manager:  {:?}", manager.get_list(keys::STOCK_LIST));
    println!("   env file: {}", std::fs::read_to_string(dir.join(".env"))?.trim());

    // Validation
    println!("\n🚫 Rejected save:");
    if let Err(e) = manager.save(Category::Schedule, [(keys::SCHEDULE_TIME, "half past nine")]) {
        println!("   {e}");
    }

    // Schedule notifications
    println!("\n⏰ Schedule change notification:");
    let (tx, rx) = mpsc::channel();
    manager.on_schedule_change(move |schedule| {
        let _ = tx.send(schedule);
    })?;
    manager.save(
        Category::Schedule,
        [(keys::SCHEDULE_ENABLED, "true"), (keys::SCHEDULE_TIME, "09:30,15:05")],
    )?;
    if let Ok(schedule) = rx.recv_timeout(Duration::from_secs(2)) {
        println!(
            "   enabled={} times={:?} review={}",
            schedule.enabled, schedule.run_times(), schedule.market_review_enabled
        );
    }

    println!("\n✅ Done");
    Ok(())
}
