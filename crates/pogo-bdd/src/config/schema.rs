use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings shared by every directive of a scenario.
///
/// A value of this type is handed explicitly to each execution rather than
/// living in a process-global store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    pub version: String,
    #[serde(default = "default_tool_name")]
    pub tool_name: String,
    /// Program run when a server directive starts with a flag.
    #[serde(default = "default_server_program")]
    pub server_program: String,
    #[serde(default = "default_build_dirs")]
    pub build_dirs: Vec<String>,
    #[serde(default = "default_models_dir_env")]
    pub models_dir_env: String,
    #[serde(default = "default_models_dir_flag")]
    pub models_dir_flag: String,
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    #[serde(default = "default_health_poll_interval_ms")]
    pub health_poll_interval_ms: u64,
    #[serde(default = "default_health_timeout_ms")]
    pub health_timeout_ms: u64,
    #[serde(default = "default_stop_grace_ms")]
    pub stop_grace_ms: u64,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    #[serde(default = "default_host")]
    pub default_host: String,
    #[serde(default = "default_port")]
    pub default_port: u16,
    #[serde(default = "default_mock_max_upload_bytes")]
    pub mock_max_upload_bytes: usize,
}

fn default_tool_name() -> String {
    "pogo".to_string()
}

fn default_server_program() -> String {
    "pogo-server".to_string()
}

fn default_build_dirs() -> Vec<String> {
    vec!["target/release".to_string(), "target/debug".to_string()]
}

fn default_models_dir_env() -> String {
    "POGO_MODELS_DIR".to_string()
}

fn default_models_dir_flag() -> String {
    "--models-dir".to_string()
}

fn default_command_timeout_secs() -> u64 {
    30
}

fn default_health_poll_interval_ms() -> u64 {
    100
}

fn default_health_timeout_ms() -> u64 {
    10_000
}

fn default_stop_grace_ms() -> u64 {
    5_000
}

fn default_similarity_threshold() -> f64 {
    0.8
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_mock_max_upload_bytes() -> usize {
    1024 * 1024
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            tool_name: default_tool_name(),
            server_program: default_server_program(),
            build_dirs: default_build_dirs(),
            models_dir_env: default_models_dir_env(),
            models_dir_flag: default_models_dir_flag(),
            command_timeout_secs: default_command_timeout_secs(),
            health_poll_interval_ms: default_health_poll_interval_ms(),
            health_timeout_ms: default_health_timeout_ms(),
            stop_grace_ms: default_stop_grace_ms(),
            similarity_threshold: default_similarity_threshold(),
            default_host: default_host(),
            default_port: default_port(),
            mock_max_upload_bytes: default_mock_max_upload_bytes(),
        }
    }
}

impl HarnessConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn health_poll_interval(&self) -> Duration {
        Duration::from_millis(self.health_poll_interval_ms)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_millis(self.health_timeout_ms)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }
}
