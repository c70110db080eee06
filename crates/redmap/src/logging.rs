// Logging, powered by tracing-subscriber
//
// Library code logs through the `log` facade. `init_logging` installs a
// tracing subscriber and a `tracing_log::LogTracer` bridge so those records
// reach the configured console and file layers.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::path::Path;

use redmap_configs::LoggingSettings;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Log format type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact text format: timestamp LEVEL target - message
    Compact,
    /// JSON Lines format for structured logging
    Json,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" | "jsonl" => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Base level, quieter defaults for chatty dependencies, then per-target overrides.
fn build_env_filter(
    level: &str,
    target_levels: &HashMap<String, String>,
) -> anyhow::Result<EnvFilter> {
    let mut directives = vec![level.to_string()];

    let noisy: &[(&str, &str)] = &[("redis", "warn"), ("tokio", "warn"), ("tracing", "warn")];
    for (target, lvl) in noisy {
        directives.push(format!("{}={}", target, lvl));
    }

    for (target, lvl) in target_levels {
        directives.push(format!("{}={}", target, lvl));
    }

    let filter_str = directives.join(",");
    EnvFilter::try_new(&filter_str)
        .map_err(|e| anyhow::anyhow!("Invalid tracing filter '{}': {}", filter_str, e))
}

fn console_layer(settings: &LoggingSettings) -> anyhow::Result<BoxedLayer> {
    let filter = build_env_filter(&settings.level, &settings.targets)?;
    let layer = match LogFormat::parse(&settings.format) {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_filter(filter)
            .boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .with_ansi(true)
            .with_target(true)
            .with_filter(filter)
            .boxed(),
    };
    Ok(layer)
}

fn file_layer(settings: &LoggingSettings, file_path: &str) -> anyhow::Result<BoxedLayer> {
    if let Some(parent) = Path::new(file_path).parent() {
        fs::create_dir_all(parent)?;
    }
    let log_file = OpenOptions::new().create(true).append(true).open(file_path)?;

    let filter = build_env_filter(&settings.level, &settings.targets)?;
    let layer = match LogFormat::parse(&settings.format) {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(log_file)
            .with_target(true)
            .with_filter(filter)
            .boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(log_file)
            .with_target(true)
            .with_filter(filter)
            .boxed(),
    };
    Ok(layer)
}

/// Initialize logging based on configuration.
///
/// Installs a global subscriber with:
///  - a console layer (when `log_to_console` is true)
///  - a file layer appending to `file_path` (when set)
///  - `tracing_log::LogTracer` so every `log::*` call is captured
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(settings: &LoggingSettings) -> anyhow::Result<()> {
    let mut layers: Vec<BoxedLayer> = Vec::new();
    if settings.log_to_console {
        layers.push(console_layer(settings)?);
    }
    if let Some(path) = &settings.file_path {
        layers.push(file_layer(settings, path)?);
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {}", e))?;

    // Bridge `log` crate → tracing; ok() since try_init may have installed it
    tracing_log::LogTracer::init().ok();

    tracing::trace!(
        "Logging initialized: level={}, format={}, console={}, file={:?}",
        settings.level,
        settings.format,
        settings.log_to_console,
        settings.file_path
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("jsonl"), LogFormat::Json);
        assert_eq!(LogFormat::parse("compact"), LogFormat::Compact);
        assert_eq!(LogFormat::parse("anything"), LogFormat::Compact);
    }

    #[test]
    fn test_env_filter_accepts_targets() {
        let mut targets = HashMap::new();
        targets.insert("redmap_store".to_string(), "trace".to_string());
        assert!(build_env_filter("info", &targets).is_ok());

        targets.insert("redmap_store".to_string(), "not a level!".to_string());
        assert!(build_env_filter("info", &targets).is_err());
    }

    #[test]
    fn test_init_logging_with_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("redmap.log");

        let settings = LoggingSettings {
            log_to_console: false,
            file_path: Some(path.to_string_lossy().into_owned()),
            format: "json".to_string(),
            ..LoggingSettings::default()
        };
        init_logging(&settings).unwrap();
        log::info!("bridged record");

        assert!(path.exists());
        // Only one global subscriber per process
        assert!(init_logging(&settings).is_err());
    }
}
