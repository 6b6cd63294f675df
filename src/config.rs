use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::engine::{EngineConfig, StayPolicy};
use crate::limits::*;

/// Process settings, read from `CAMPSITE_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    /// Load the last snapshot at startup.
    pub restore: bool,
    /// Take periodic snapshots.
    pub backup: bool,
    pub backup_interval: Duration,
    pub max_stay_days: u32,
    pub window_days: u32,
    pub metrics_port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            restore: true,
            backup: true,
            backup_interval: Duration::from_secs(3600),
            max_stay_days: DEFAULT_MAX_STAY_DAYS,
            window_days: DEFAULT_WINDOW_DAYS,
            metrics_port: None,
        }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|s| s.trim().parse().ok())
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    match lookup(key).map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset or unparsable values fall back to the
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            data_dir: lookup("CAMPSITE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            restore: flag(&lookup, "CAMPSITE_RESTORE", defaults.restore),
            backup: flag(&lookup, "CAMPSITE_BACKUP", defaults.backup),
            backup_interval: parsed::<u64>(&lookup, "CAMPSITE_BACKUP_INTERVAL_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.backup_interval),
            max_stay_days: parsed::<u32>(&lookup, "CAMPSITE_MAX_STAY_DAYS")
                .filter(|d| *d > 0)
                .unwrap_or(defaults.max_stay_days),
            window_days: parsed::<u32>(&lookup, "CAMPSITE_WINDOW_DAYS")
                .filter(|d| *d > 0)
                .unwrap_or(defaults.window_days),
            metrics_port: parsed(&lookup, "CAMPSITE_METRICS_PORT"),
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            snapshot_dir: Some(self.data_dir.clone()),
            restore_on_start: self.restore,
            policy: StayPolicy {
                max_stay_days: self.max_stay_days,
                window_days: self.window_days,
            },
        }
    }
}
