use super::types::RedmapConfig;
use std::fs;
use std::path::Path;

const VALID_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
const VALID_FORMATS: [&str; 2] = ["compact", "json"];
const VALID_SCHEMES: [&str; 3] = ["redis://", "rediss://", "memory://"];

impl RedmapConfig {
    /// Load configuration from a TOML file and validate it.
    ///
    /// Note: Environment overrides are applied separately via `apply_env_overrides()`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

        let config = Self::from_toml_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    /// Parse configuration from TOML text without env overrides or validation.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).map_err(|e| anyhow::anyhow!("Failed to parse config file: {}", e))
    }

    /// Apply environment variable overrides.
    ///
    /// Supported environment variables:
    /// - REDMAP_STORE_URL: Override store.url
    /// - REDMAP_BATCH_THRESHOLD: Override index.batch_threshold
    /// - REDMAP_LOG_LEVEL: Override logging.level
    /// - REDMAP_LOG_FORMAT: Override logging.format
    /// - REDMAP_LOG_TO_CONSOLE: Override logging.log_to_console
    pub fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        use std::env;

        if let Ok(url) = env::var("REDMAP_STORE_URL") {
            self.store.url = url;
        }

        if let Ok(threshold) = env::var("REDMAP_BATCH_THRESHOLD") {
            self.index.batch_threshold = threshold
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid REDMAP_BATCH_THRESHOLD value: {}", threshold))?;
        }

        if let Ok(level) = env::var("REDMAP_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(format) = env::var("REDMAP_LOG_FORMAT") {
            self.logging.format = format;
        }

        if let Ok(val) = env::var("REDMAP_LOG_TO_CONSOLE") {
            self.logging.log_to_console =
                val.eq_ignore_ascii_case("true") || val == "1" || val.eq_ignore_ascii_case("yes");
        }

        Ok(())
    }

    /// Validate configuration settings
    pub fn validate(&self) -> anyhow::Result<()> {
        if !VALID_SCHEMES.iter().any(|scheme| self.store.url.starts_with(scheme)) {
            return Err(anyhow::anyhow!(
                "Invalid store url '{}'. Must start with one of: {}",
                self.store.url,
                VALID_SCHEMES.join(", ")
            ));
        }

        if self.index.batch_threshold == 0 {
            return Err(anyhow::anyhow!("batch_threshold cannot be 0"));
        }

        if !VALID_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                VALID_LEVELS.join(", ")
            ));
        }

        if !VALID_FORMATS.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                VALID_FORMATS.join(", ")
            ));
        }

        for (target, level) in &self.logging.targets {
            if !VALID_LEVELS.contains(&level.as_str()) {
                return Err(anyhow::anyhow!(
                    "Invalid log level '{}' for target '{}'. Must be one of: {}",
                    level,
                    target,
                    VALID_LEVELS.join(", ")
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = RedmapConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.store.url, "redis://127.0.0.1:6379");
        assert_eq!(config.index.batch_threshold, 2);
    }

    #[test]
    fn test_invalid_store_url() {
        let mut config = RedmapConfig::default();
        config.store.url = "http://localhost".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_batch_threshold() {
        let mut config = RedmapConfig::default();
        config.index.batch_threshold = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = RedmapConfig::default();
        config.logging.level = "invalid".to_string();
        assert!(config.validate().is_err());

        let mut config = RedmapConfig::default();
        config
            .logging
            .targets
            .insert("redis".to_string(), "loud".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = RedmapConfig::from_toml_str(
            r#"
            [store]
            url = "memory://"

            [logging.targets]
            redis = "warn"
            "#,
        )
        .unwrap();

        assert_eq!(config.store.url, "memory://");
        assert_eq!(config.index.batch_threshold, 2);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.targets.get("redis").map(String::as_str), Some("warn"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[store]\nurl = \"redis://cache:6380/2\"\n\n[index]\nbatch_threshold = 16"
        )
        .unwrap();

        let config = RedmapConfig::from_file(file.path()).unwrap();
        assert_eq!(config.store.url, "redis://cache:6380/2");
        assert_eq!(config.index.batch_threshold, 16);
    }

    #[test]
    fn test_from_file_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[store\nurl = ").unwrap();
        assert!(RedmapConfig::from_file(file.path()).is_err());
        assert!(RedmapConfig::from_file("/nonexistent/redmap.toml").is_err());
    }

    // All env-var assertions live in one test; the process environment is shared
    // between concurrently running tests.
    #[test]
    fn test_env_overrides() {
        env::set_var("REDMAP_STORE_URL", "memory://");
        env::set_var("REDMAP_LOG_LEVEL", "debug");
        env::set_var("REDMAP_BATCH_THRESHOLD", "8");
        env::set_var("REDMAP_LOG_TO_CONSOLE", "no");

        let mut config = RedmapConfig::default();
        config.apply_env_overrides().unwrap();
        assert_eq!(config.store.url, "memory://");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.index.batch_threshold, 8);
        assert!(!config.logging.log_to_console);

        env::set_var("REDMAP_LOG_TO_CONSOLE", "1");
        config.apply_env_overrides().unwrap();
        assert!(config.logging.log_to_console);

        env::set_var("REDMAP_BATCH_THRESHOLD", "many");
        assert!(config.apply_env_overrides().is_err());

        for var in [
            "REDMAP_STORE_URL",
            "REDMAP_LOG_LEVEL",
            "REDMAP_BATCH_THRESHOLD",
            "REDMAP_LOG_TO_CONSOLE",
        ] {
            env::remove_var(var);
        }
    }
}
