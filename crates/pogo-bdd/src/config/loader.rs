use std::path::Path;

use crate::config::schema::HarnessConfig;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/harness-config-v1.json");

/// Environment variable naming an optional harness config file.
pub const CONFIG_ENV_VAR: &str = "POGO_BDD_CONFIG";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<HarnessConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<HarnessConfig, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: HarnessConfig = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

impl HarnessConfig {
    /// Loads the file named by `POGO_BDD_CONFIG`, or returns the defaults
    /// when the variable is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) if !path.is_empty() => {
                log::info!("Loading harness config from {:?}", path);
                load_config(path)
            }
            _ => Ok(Self::default()),
        }
    }
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

fn validate_config(config: &HarnessConfig) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.tool_name.trim().is_empty() || config.tool_name.contains(char::is_whitespace) {
        return Err(ConfigError::Validation {
            message: format!("Invalid tool name: '{}'", config.tool_name),
        });
    }

    if config.command_timeout_secs == 0 || config.health_timeout_ms == 0 {
        return Err(ConfigError::Validation {
            message: "Timeouts must be positive".to_string(),
        });
    }

    if config.health_poll_interval_ms == 0
        || config.health_poll_interval_ms >= config.health_timeout_ms
    {
        return Err(ConfigError::Validation {
            message: format!(
                "Health poll interval ({}ms) must be positive and below the health timeout ({}ms)",
                config.health_poll_interval_ms, config.health_timeout_ms
            ),
        });
    }

    if !(config.similarity_threshold > 0.0 && config.similarity_threshold <= 1.0) {
        return Err(ConfigError::Validation {
            message: format!(
                "Similarity threshold must be in (0, 1], got {}",
                config.similarity_threshold
            ),
        });
    }

    Ok(())
}
