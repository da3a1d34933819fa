use std::path::{Path, PathBuf};

use crate::config::schema::{ClientConfig, MAX_POLL_INTERVAL_SECS, MIN_POLL_INTERVAL_SECS};
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../schema/client-config-v1.json");

pub const ENV_API_URL: &str = "TRANSDOC_API_URL";
pub const ENV_POLL_INTERVAL: &str = "TRANSDOC_POLL_INTERVAL_SECS";
pub const ENV_TOKEN_FILE: &str = "TRANSDOC_TOKEN_FILE";
pub const ENV_LOG_LEVEL: &str = "TRANSDOC_LOG_LEVEL";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                ConfigFormat::Yaml
            }
            _ => ConfigFormat::Json,
        }
    }
}

/// Loads a config file, applies environment overrides and validates it.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ClientConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut config = parse_config(&content, ConfigFormat::from_path(path))?;
    apply_env_overrides(&mut config)?;
    validate_config(&config)?;

    Ok(config)
}

/// Parses and validates config text without consulting the environment.
pub fn load_config_from_str(content: &str, format: ConfigFormat) -> Result<ClientConfig, ConfigError> {
    let config = parse_config(content, format)?;
    validate_config(&config)?;
    Ok(config)
}

/// Defaults plus environment overrides, for running without a config file.
pub fn config_from_env() -> Result<ClientConfig, ConfigError> {
    let mut config = ClientConfig::default();
    apply_env_overrides(&mut config)?;
    validate_config(&config)?;
    Ok(config)
}

fn parse_config(content: &str, format: ConfigFormat) -> Result<ClientConfig, ConfigError> {
    let json_value: serde_json::Value = match format {
        ConfigFormat::Json => serde_json::from_str(content)?,
        ConfigFormat::Yaml => serde_yaml::from_str(content)?,
    };

    validate_schema(&json_value)?;

    let config: ClientConfig = serde_json::from_value(json_value)?;
    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

/// Overrides config fields from `TRANSDOC_*` environment variables.
pub fn apply_env_overrides(config: &mut ClientConfig) -> Result<(), ConfigError> {
    if let Some(url) = env_value(ENV_API_URL) {
        config.api_base_url = url;
    }
    if let Some(raw) = env_value(ENV_POLL_INTERVAL) {
        config.poll_interval_secs = raw.parse().map_err(|_| ConfigError::Validation {
            message: format!("{} must be a whole number of seconds, got '{}'", ENV_POLL_INTERVAL, raw),
        })?;
    }
    if let Some(path) = env_value(ENV_TOKEN_FILE) {
        config.token_file = Some(PathBuf::from(path));
    }
    if let Some(level) = env_value(ENV_LOG_LEVEL) {
        config.logging.level = level;
    }
    Ok(())
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn validate_config(config: &ClientConfig) -> Result<(), ConfigError> {
    let url = reqwest::Url::parse(&config.api_base_url).map_err(|e| ConfigError::Validation {
        message: format!("Invalid apiBaseUrl '{}': {}", config.api_base_url, e),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            message: format!("apiBaseUrl must use http or https, got '{}'", url.scheme()),
        });
    }

    if !(MIN_POLL_INTERVAL_SECS..=MAX_POLL_INTERVAL_SECS).contains(&config.poll_interval_secs) {
        return Err(ConfigError::Validation {
            message: format!(
                "pollIntervalSecs must be between {} and {}, got {}",
                MIN_POLL_INTERVAL_SECS, MAX_POLL_INTERVAL_SECS, config.poll_interval_secs
            ),
        });
    }

    for (name, value) in [
        ("connectTimeoutSecs", config.connect_timeout_secs),
        ("requestTimeoutSecs", config.request_timeout_secs),
        ("uploadTimeoutSecs", config.upload_timeout_secs),
    ] {
        if value == 0 {
            return Err(ConfigError::Validation {
                message: format!("{} must be greater than 0", name),
            });
        }
    }

    if config.event_capacity == 0 {
        return Err(ConfigError::Validation {
            message: "eventCapacity must be greater than 0".to_string(),
        });
    }

    if let Err(e) = tracing_subscriber::EnvFilter::try_new(&config.logging.level) {
        return Err(ConfigError::Validation {
            message: format!("Invalid logging level '{}': {}", config.logging.level, e),
        });
    }

    Ok(())
}
