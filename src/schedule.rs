//! Scheduler-facing view of the schedule category
//!
//! The scheduler only needs the raw switches and run times. Computing the
//! next run is its own business.

use crate::keys;
use crate::manager::ConfigManager;
use log::warn;
use time::Time;
use time::macros::format_description;

/// Snapshot of the schedule settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleSettings {
    /// Whether the daily analysis runs at all
    pub enabled: bool,
    /// Configured run times, as written (`HH:MM`)
    pub times: Vec<String>,
    /// Whether the market review runs after the analysis
    pub market_review_enabled: bool,
}

impl ScheduleSettings {
    /// Read the current values from `manager`
    #[must_use]
    pub fn load(manager: &ConfigManager) -> Self {
        Self {
            enabled: manager.get_bool(keys::SCHEDULE_ENABLED),
            times: manager.get_list(keys::SCHEDULE_TIME),
            market_review_enabled: manager.get_bool(keys::MARKET_REVIEW_ENABLED),
        }
    }

    /// Run times that parse as `H:MM` or `HH:MM`; others are logged and skipped
    #[must_use]
    pub fn run_times(&self) -> Vec<Time> {
        let format = format_description!("[hour padding:none]:[minute]");
        self.times
            .iter()
            .filter_map(|raw| match Time::parse(raw, &format) {
                Ok(t) => Some(t),
                Err(e) => {
                    warn!("Ignoring schedule time '{raw}': {e}");
                    None
                }
            })
            .collect()
    }
}
