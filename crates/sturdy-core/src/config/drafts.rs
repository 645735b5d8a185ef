//! Local draft store configuration.

use serde::{Deserialize, Serialize};

/// Settings for the durable draft store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftsConfig {
    /// Path of the draft database snapshot file.
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Drafts older than this many days are removed by the cleanup sweep.
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,
    /// Interval between background sweep runs, in minutes.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_minutes: u64,
}

impl Default for DraftsConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            retention_days: default_retention_days(),
            sweep_interval_minutes: default_sweep_interval(),
        }
    }
}

fn default_db_path() -> String {
    "data/drafts/codesturdy-db.json".to_string()
}

fn default_retention_days() -> u64 {
    7
}

fn default_sweep_interval() -> u64 {
    60
}
