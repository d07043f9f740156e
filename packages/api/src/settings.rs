//! Ledger configuration, loaded from the environment with compiled-in
//! defaults.

use bloom_types::{Result, anyhow};
use chrono::Duration;

use crate::ledger::rate_table::RateTable;

const DEFAULT_MATURATION_WINDOW_HOURS: i64 = 7 * 24;
const DEFAULT_CODE_QUOTA: i32 = 10;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Commission percentages by tier and level.
    pub rate_table: RateTable,
    /// Delay between a commission being created and becoming payable,
    /// covering the refund window.
    pub maturation_window_hours: i64,
    /// Quota granted by generated codes when the batch does not specify one.
    pub default_code_quota: i32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rate_table: RateTable::default(),
            maturation_window_hours: DEFAULT_MATURATION_WINDOW_HOURS,
            default_code_quota: DEFAULT_CODE_QUOTA,
        }
    }
}

impl Settings {
    /// Reads `RATE_TABLE_JSON`, `MATURATION_WINDOW_HOURS` and
    /// `DEFAULT_CODE_QUOTA`, falling back to defaults per variable.
    pub fn from_env() -> Result<Self> {
        let rate_table = match std::env::var("RATE_TABLE_JSON") {
            Ok(raw) => RateTable::from_json(&raw)
                .map_err(|e| anyhow!("RATE_TABLE_JSON is not a valid rate table: {}", e))?,
            Err(_) => RateTable::default(),
        };

        let maturation_window_hours = match std::env::var("MATURATION_WINDOW_HOURS") {
            Ok(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|h| *h > 0)
                .ok_or_else(|| anyhow!("MATURATION_WINDOW_HOURS must be a positive integer"))?,
            Err(_) => DEFAULT_MATURATION_WINDOW_HOURS,
        };

        let default_code_quota = match std::env::var("DEFAULT_CODE_QUOTA") {
            Ok(raw) => raw
                .parse::<i32>()
                .ok()
                .filter(|q| *q > 0)
                .ok_or_else(|| anyhow!("DEFAULT_CODE_QUOTA must be a positive integer"))?,
            Err(_) => DEFAULT_CODE_QUOTA,
        };

        Ok(Self {
            rate_table,
            maturation_window_hours,
            default_code_quota,
        })
    }

    pub fn maturation_window(&self) -> Duration {
        Duration::hours(self.maturation_window_hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_window_covers_a_week() {
        let settings = Settings::default();
        assert_eq!(settings.maturation_window(), Duration::days(7));
    }
}
