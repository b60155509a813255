//! Configuration management for the `zangli` service
//!
//! Configuration is layered: built-in defaults, an optional TOML file,
//! `ZANGLI__SECTION__KEY` environment variables and finally the flat
//! deployment variables (`PORT`, `FLASK_HOST`, `CORS_ORIGINS`, ...) that the
//! container images set.

use crate::ZangliError;
use anyhow::{Context, Result};
use chrono_tz::Tz;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Secret shipped in the defaults; production deployments are expected to override it.
pub const DEFAULT_SECRET_KEY: &str = "dev-secret-key-change-in-production";

/// Runtime profile, selected with `FLASK_CONFIG` or `ZANGLI__PROFILE`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    #[default]
    Development,
    Production,
    Testing,
}

impl Profile {
    /// Parse a profile name; `default` is an alias for development
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "development" | "default" | "dev" => Some(Profile::Development),
            "production" | "prod" => Some(Profile::Production),
            "testing" | "test" => Some(Profile::Testing),
            _ => None,
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ZangliConfig {
    pub profile: Profile,
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub ai: AiConfig,
    pub knowledge: KnowledgeConfig,
    pub astronomy: AstronomyConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
    pub telemetry: TelemetryConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Tokio worker threads; 0 means one per CPU core
    pub workers: usize,
    pub debug: bool,
    pub secret_key: String,
    pub request_timeout_seconds: u64,
    pub max_body_bytes: usize,
    /// PEM certificate and key, only used when built with the `tls` feature
    pub tls_cert_path: Option<String>,
    pub tls_key_path: Option<String>,
}

/// Cross-origin settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub origins: Vec<String>,
    /// Also accept localhost and private network origins on any port
    pub allow_local_network: bool,
}

/// Chat provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub system_prompt: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
}

/// Retrieval knowledge base settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    pub path: String,
    /// Number of leading entries to ignore when loading
    pub skip: usize,
    pub top_k: usize,
}

/// Astronomy defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AstronomyConfig {
    /// IANA time zone used to report event times
    pub timezone: String,
    /// Observer altitude in meters
    pub altitude: f64,
}

/// Persistent answer cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub location: String,
    pub ttl_hours: u32,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (pretty or json)
    pub format: String,
}

/// Trace export settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Export spans over OTLP/HTTP; endpoint comes from `OTEL_EXPORTER_OTLP_ENDPOINT`
    pub otlp_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            workers: 0,
            debug: true,
            secret_key: DEFAULT_SECRET_KEY.to_string(),
            request_timeout_seconds: 90,
            max_body_bytes: 64 * 1024,
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origins: vec!["http://localhost:3000".to_string()],
            allow_local_network: true,
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.deepseek.com".to_string(),
            model: "deepseek-chat".to_string(),
            system_prompt: "你是一个知识渊博的AI天文藏历助手，请根据用户提供的内容回答问题。"
                .to_string(),
            timeout_seconds: 60,
            max_retries: 2,
        }
    }
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            path: "data/knowledge_base.json".to_string(),
            skip: 0,
            top_k: 3,
        }
    }
}

impl Default for AstronomyConfig {
    fn default() -> Self {
        Self {
            timezone: "Asia/Shanghai".to_string(),
            altitude: 0.0,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            location: default_cache_location(),
            ttl_hours: 24,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

fn default_cache_location() -> String {
    dirs::cache_dir()
        .map(|dir| dir.join("zangli").to_string_lossy().into_owned())
        .unwrap_or_else(|| ".cache/zangli".to_string())
}

impl ZangliConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        let path = env::var("ZANGLI_CONFIG_FILE").ok().map(PathBuf::from);
        Self::load_from_path(path)
    }

    /// Load configuration from the specified path, falling back to the default locations
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.or_else(|| {
            Self::get_config_path()
                .filter(|path| path.exists())
                .or_else(|| Some(PathBuf::from("config.toml")))
        });

        if let Some(config_file) = config_file.filter(|path| path.exists()) {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix("ZANGLI")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("cors.origins"),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: ZangliConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_env_overrides(|name| env::var(name).ok());
        config.apply_profile_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("zangli").join("config.toml"))
    }

    /// Apply the flat deployment variables on top of the layered configuration
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(profile) = lookup("FLASK_CONFIG").as_deref().and_then(Profile::parse) {
            self.profile = profile;
        }
        if let Some(host) = lookup("FLASK_HOST").filter(|h| !h.trim().is_empty()) {
            self.server.host = host.trim().to_string();
        }
        // PORT wins over FLASK_PORT, matching the container images
        if let Some(port) = lookup("PORT")
            .or_else(|| lookup("FLASK_PORT"))
            .and_then(|p| p.trim().parse::<u16>().ok())
        {
            self.server.port = port;
        }
        if let Some(debug) = lookup("FLASK_DEBUG").as_deref().and_then(parse_bool) {
            self.server.debug = debug;
        }
        if let Some(secret) = lookup("SECRET_KEY").filter(|s| !s.is_empty()) {
            self.server.secret_key = secret;
        }
        if let Some(origins) = lookup("CORS_ORIGINS") {
            self.cors.origins = split_origins(&origins);
        }
        if let Some(key) = lookup("DEEPSEEK_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.ai.api_key = Some(key.trim().to_string());
        }
        if let Some(workers) = lookup("WEB_CONCURRENCY").and_then(|w| w.trim().parse().ok()) {
            self.server.workers = workers;
        }
    }

    /// Adjust values whose defaults differ per profile
    pub fn apply_profile_defaults(&mut self) {
        match self.profile {
            Profile::Development => {}
            Profile::Production => {
                self.cors.allow_local_network = false;
            }
            Profile::Testing => {
                self.cors.allow_local_network = false;
                self.cache.enabled = false;
            }
        }
        if self.ai.api_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            self.ai.api_key = None;
        }
    }

    /// Resolve the configured reporting time zone
    pub fn timezone(&self) -> Result<Tz> {
        self.astronomy
            .timezone
            .parse::<Tz>()
            .map_err(|_| {
                ZangliError::config(format!(
                    "Unknown time zone '{}'",
                    self.astronomy.timezone
                ))
                .into()
            })
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_keys()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;

        if self.profile == Profile::Production && self.server.secret_key == DEFAULT_SECRET_KEY {
            tracing::warn!("SECRET_KEY is not set; using the development default in production");
        }
        Ok(())
    }

    /// Validate API keys and credentials
    pub fn validate_api_keys(&self) -> Result<()> {
        if let Some(api_key) = &self.ai.api_key {
            if api_key.len() < 8 {
                return Err(ZangliError::config(
                    "AI API key appears to be invalid (too short). Please check DEEPSEEK_API_KEY.",
                )
                .into());
            }
            if api_key.chars().any(char::is_whitespace) {
                return Err(
                    ZangliError::config("AI API key must not contain whitespace").into(),
                );
            }
        }
        Ok(())
    }

    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(ZangliError::config("Server port must be non-zero").into());
        }
        if self.server.workers > 256 {
            return Err(ZangliError::config("Worker count cannot exceed 256").into());
        }
        if self.server.request_timeout_seconds == 0 || self.server.request_timeout_seconds > 600 {
            return Err(ZangliError::config(
                "Request timeout must be between 1 and 600 seconds",
            )
            .into());
        }
        if self.server.max_body_bytes == 0 {
            return Err(ZangliError::config("Maximum body size must be non-zero").into());
        }
        if self.ai.timeout_seconds == 0 || self.ai.timeout_seconds > 300 {
            return Err(
                ZangliError::config("AI timeout must be between 1 and 300 seconds").into(),
            );
        }
        if self.ai.max_retries > 10 {
            return Err(ZangliError::config("AI max retries cannot exceed 10").into());
        }
        if self.knowledge.top_k == 0 || self.knowledge.top_k > 20 {
            return Err(ZangliError::config("Knowledge top_k must be between 1 and 20").into());
        }
        if self.cache.ttl_hours > 720 {
            return Err(ZangliError::config("Cache TTL cannot exceed 720 hours (30 days)").into());
        }
        if !(-500.0..=9000.0).contains(&self.astronomy.altitude) {
            return Err(
                ZangliError::config("Observer altitude must be between -500 and 9000 m").into(),
            );
        }
        Ok(())
    }

    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(ZangliError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(ZangliError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        if !self.ai.base_url.starts_with("http://") && !self.ai.base_url.starts_with("https://") {
            return Err(
                ZangliError::config("AI base URL must be a valid HTTP or HTTPS URL").into(),
            );
        }

        if self.server.host.trim().is_empty() {
            return Err(ZangliError::config("Server host cannot be empty").into());
        }

        self.timezone()?;
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn split_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ZangliConfig::default();
        assert_eq!(config.profile, Profile::Development);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert!(config.server.debug);
        assert_eq!(config.cors.origins, vec!["http://localhost:3000"]);
        assert_eq!(config.ai.model, "deepseek-chat");
        assert_eq!(config.astronomy.timezone, "Asia/Shanghai");
        assert_eq!(config.knowledge.top_k, 3);
        assert!(config.ai.api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_profile_parsing() {
        assert_eq!(Profile::parse("production"), Some(Profile::Production));
        assert_eq!(Profile::parse("DEFAULT"), Some(Profile::Development));
        assert_eq!(Profile::parse(" testing "), Some(Profile::Testing));
        assert_eq!(Profile::parse("staging"), None);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ZangliConfig::default();
        config.apply_env_overrides(lookup_from(&[
            ("FLASK_CONFIG", "production"),
            ("FLASK_HOST", "127.0.0.1"),
            ("FLASK_PORT", "5001"),
            ("PORT", "8080"),
            ("FLASK_DEBUG", "False"),
            ("SECRET_KEY", "s3cret-value"),
            ("CORS_ORIGINS", "https://a.example, https://b.example,,"),
            ("DEEPSEEK_API_KEY", "sk-test-1234567890"),
        ]));
        config.apply_profile_defaults();

        assert_eq!(config.profile, Profile::Production);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert!(!config.server.debug);
        assert_eq!(config.server.secret_key, "s3cret-value");
        assert_eq!(
            config.cors.origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert!(!config.cors.allow_local_network);
        assert_eq!(config.ai.api_key.as_deref(), Some("sk-test-1234567890"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_flask_port_used_without_port() {
        let mut config = ZangliConfig::default();
        config.apply_env_overrides(lookup_from(&[("FLASK_PORT", "5050")]));
        assert_eq!(config.server.port, 5050);
    }

    #[test]
    fn test_unparsable_values_are_ignored() {
        let mut config = ZangliConfig::default();
        config.apply_env_overrides(lookup_from(&[
            ("PORT", "eighty"),
            ("FLASK_DEBUG", "maybe"),
            ("FLASK_CONFIG", "staging"),
        ]));
        assert_eq!(config.server.port, 5000);
        assert!(config.server.debug);
        assert_eq!(config.profile, Profile::Development);
    }

    #[test]
    fn test_testing_profile_disables_cache() {
        let mut config = ZangliConfig {
            profile: Profile::Testing,
            ..ZangliConfig::default()
        };
        config.apply_profile_defaults();
        assert!(!config.cache.enabled);
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = ZangliConfig::default();
        config.logging.level = "verbose".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = ZangliConfig::default();
        config.ai.timeout_seconds = 500;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("AI timeout"));

        let mut config = ZangliConfig::default();
        config.knowledge.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_short_api_key() {
        let mut config = ZangliConfig::default();
        config.ai.api_key = Some("short".to_string());
        assert!(config.validate_api_keys().is_err());
    }

    #[test]
    fn test_unknown_timezone_rejected() {
        let mut config = ZangliConfig::default();
        config.astronomy.timezone = "Mars/Olympus".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Unknown time zone"));
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[server]\nport = 9090\n\n[astronomy]\ntimezone = \"Asia/Kathmandu\"\n\n[knowledge]\ntop_k = 5\n",
        )
        .unwrap();

        let config = ZangliConfig::load_from_path(Some(path)).unwrap();
        assert_eq!(config.astronomy.timezone, "Asia/Kathmandu");
        assert_eq!(config.knowledge.top_k, 5);
        // Untouched sections keep their defaults
        assert_eq!(config.ai.model, "deepseek-chat");
    }

    #[test]
    fn test_config_path_generation() {
        if let Some(path) = ZangliConfig::get_config_path() {
            assert!(path.to_string_lossy().contains("zangli"));
            assert!(path.to_string_lossy().ends_with("config.toml"));
        }
    }
}
