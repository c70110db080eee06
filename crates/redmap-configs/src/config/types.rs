use super::defaults::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Main redmap configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedmapConfig {
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub index: IndexSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Backing store connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// `redis://host:port[/db]`, `rediss://...`, or `memory://` for the
    /// process-local backend
    #[serde(default = "default_store_url")]
    pub url: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            url: default_store_url(),
        }
    }
}

/// Secondary index maintenance settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSettings {
    /// Batches with at least this many records group index writes by
    /// (field, value); smaller batches are maintained record by record.
    #[serde(default = "default_batch_threshold")]
    pub batch_threshold: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            batch_threshold: default_batch_threshold(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "compact" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_true")]
    pub log_to_console: bool,
    /// Optional log file; appended to when set
    #[serde(default)]
    pub file_path: Option<String>,
    /// Optional per-target log level overrides
    /// [logging.targets]
    /// redis = "warn"
    #[serde(default)]
    pub targets: HashMap<String, String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_to_console: default_true(),
            file_path: None,
            targets: HashMap::new(),
        }
    }
}
