//! Configuration structures
//!
//! Loaded by `rentkenya-infra::config` from environment variables or a
//! JSON/TOML file. Every section except `backend` has usable defaults.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BACKEND_MAX_ATTEMPTS, DEFAULT_BACKEND_TIMEOUT_SECS, MAX_PROFILE_ATTEMPTS,
    PROFILE_RETRY_DELAY_MS, SIGN_IN_PATH,
};

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub backend: BackendConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Build a configuration with defaults for everything but the backend.
    pub fn new(backend: BackendConfig) -> Self {
        Self {
            backend,
            reconcile: ReconcileConfig::default(),
            gate: GateConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Hosted backend connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Project URL, e.g. `https://abc.supabase.co`
    pub url: String,
    /// Public anonymous API key sent as `apikey`
    pub anon_key: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Total HTTP attempts for transport-level failures of safe reads
    #[serde(default = "default_http_attempts")]
    pub max_attempts: usize,
}

impl BackendConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
            timeout_seconds: DEFAULT_BACKEND_TIMEOUT_SECS,
            max_attempts: DEFAULT_BACKEND_MAX_ATTEMPTS,
        }
    }
}

/// Profile reconciliation retry budget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    #[serde(default = "default_profile_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_profile_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self { max_attempts: MAX_PROFILE_ATTEMPTS, base_delay_ms: PROFILE_RETRY_DELAY_MS }
    }
}

/// View gate settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(default = "default_sign_in_path")]
    pub sign_in_path: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self { sign_in_path: SIGN_IN_PATH.to_string() }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` wins when set
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: default_log_filter(), json: false }
    }
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_BACKEND_TIMEOUT_SECS
}

fn default_http_attempts() -> usize {
    DEFAULT_BACKEND_MAX_ATTEMPTS
}

fn default_profile_attempts() -> u32 {
    MAX_PROFILE_ATTEMPTS
}

fn default_profile_delay_ms() -> u64 {
    PROFILE_RETRY_DELAY_MS
}

fn default_sign_in_path() -> String {
    SIGN_IN_PATH.to_string()
}

fn default_log_filter() -> String {
    "info".to_string()
}
