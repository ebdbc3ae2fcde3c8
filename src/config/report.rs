use serde::Deserialize;

use super::ConfigError;

/// What counts as inactive, and how the summary is printed.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    /// Users whose last login is older than this many days are reported.
    #[serde(default = "default_inactivity_days")]
    pub inactivity_days: u32,

    /// Include the list of sites next to each user in the printed summary.
    #[serde(default = "default_true")]
    pub print_sites: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            inactivity_days: default_inactivity_days(),
            print_sites: true,
        }
    }
}

impl ReportConfig {
    pub fn threshold(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.inactivity_days))
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if self.inactivity_days == 0 {
            return Err(ConfigError::Validation(
                "report.inactivity_days must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Interval for `watch` mode.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduleConfig {
    /// Seconds to wait between two passes.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

impl ScheduleConfig {
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_secs)
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_secs == 0 {
            return Err(ConfigError::Validation(
                "schedule.interval_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

fn default_inactivity_days() -> u32 {
    90
}

fn default_interval_secs() -> u64 {
    3600
}

fn default_true() -> bool {
    true
}
