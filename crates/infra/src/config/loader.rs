//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If the required ones are missing, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `RENTKENYA_BACKEND_URL`: hosted backend project URL (required)
//! - `RENTKENYA_ANON_KEY`: public anonymous API key (required)
//! - `RENTKENYA_BACKEND_TIMEOUT`: request timeout in seconds
//! - `RENTKENYA_PROFILE_MAX_ATTEMPTS`: profile reads before giving up
//! - `RENTKENYA_PROFILE_RETRY_DELAY_MS`: base delay between profile reads
//! - `RENTKENYA_SIGN_IN_PATH`: redirect target for signed-out users
//! - `RENTKENYA_LOG`: log filter directive
//! - `RENTKENYA_LOG_JSON`: emit JSON logs (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./rentkenya.json` or `./rentkenya.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use rentkenya_domain::{BackendConfig, Config, RentalError, Result};

pub const ENV_BACKEND_URL: &str = "RENTKENYA_BACKEND_URL";
pub const ENV_ANON_KEY: &str = "RENTKENYA_ANON_KEY";
pub const ENV_BACKEND_TIMEOUT: &str = "RENTKENYA_BACKEND_TIMEOUT";
pub const ENV_PROFILE_MAX_ATTEMPTS: &str = "RENTKENYA_PROFILE_MAX_ATTEMPTS";
pub const ENV_PROFILE_RETRY_DELAY_MS: &str = "RENTKENYA_PROFILE_RETRY_DELAY_MS";
pub const ENV_SIGN_IN_PATH: &str = "RENTKENYA_SIGN_IN_PATH";
pub const ENV_LOG: &str = "RENTKENYA_LOG";
pub const ENV_LOG_JSON: &str = "RENTKENYA_LOG_JSON";

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `RentalError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - Required fields are missing
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// `RENTKENYA_BACKEND_URL` and `RENTKENYA_ANON_KEY` are required; everything
/// else falls back to defaults.
///
/// # Errors
/// Returns `RentalError::Config` if required variables are missing
/// or have invalid values.
pub fn load_from_env() -> Result<Config> {
    let url = env_var(ENV_BACKEND_URL)?;
    let anon_key = env_var(ENV_ANON_KEY)?;

    let mut config = Config::new(BackendConfig::new(url, anon_key));
    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Overlay the optional environment variables onto `config`.
///
/// # Errors
/// Returns `RentalError::Config` when a variable is set but unparseable.
pub fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Some(timeout) = env_parse::<u64>(ENV_BACKEND_TIMEOUT)? {
        config.backend.timeout_seconds = timeout;
    }
    if let Some(attempts) = env_parse::<u32>(ENV_PROFILE_MAX_ATTEMPTS)? {
        config.reconcile.max_attempts = attempts;
    }
    if let Some(delay) = env_parse::<u64>(ENV_PROFILE_RETRY_DELAY_MS)? {
        config.reconcile.base_delay_ms = delay;
    }
    if let Ok(path) = std::env::var(ENV_SIGN_IN_PATH) {
        config.gate.sign_in_path = path;
    }
    if let Ok(filter) = std::env::var(ENV_LOG) {
        config.logging.filter = filter;
    }
    config.logging.json = env_bool(ENV_LOG_JSON, config.logging.json);
    Ok(())
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `RentalError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Required fields are missing
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(RentalError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            RentalError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| RentalError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `RentalError::Config` if format is invalid or parsing fails.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| RentalError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| RentalError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(RentalError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    const NAMES: [&str; 6] = [
        "config.json",
        "config.toml",
        "rentkenya.json",
        "rentkenya.toml",
        "../config.json",
        "../config.toml",
    ];

    let mut roots = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd);
    }
    if let Some(exe_dir) =
        std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        roots.push(exe_dir);
    }

    roots
        .iter()
        .flat_map(|root| NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
///
/// # Errors
/// Returns `RentalError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| RentalError::Config(format!("Missing required environment variable: {key}")))
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| RentalError::Config(format!("Invalid value for {key}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map_or(default, |s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    const ALL_VARS: [&str; 8] = [
        ENV_BACKEND_URL,
        ENV_ANON_KEY,
        ENV_BACKEND_TIMEOUT,
        ENV_PROFILE_MAX_ATTEMPTS,
        ENV_PROFILE_RETRY_DELAY_MS,
        ENV_SIGN_IN_PATH,
        ENV_LOG,
        ENV_LOG_JSON,
    ];

    fn clear_env() {
        for key in ALL_VARS {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_env_bool_parsing() {
        std::env::set_var("RENTKENYA_TEST_BOOL_YES", "yes");
        std::env::set_var("RENTKENYA_TEST_BOOL_UPPER", "TRUE");
        std::env::set_var("RENTKENYA_TEST_BOOL_OFF", "off");

        assert!(env_bool("RENTKENYA_TEST_BOOL_YES", false));
        assert!(env_bool("RENTKENYA_TEST_BOOL_UPPER", false));
        assert!(!env_bool("RENTKENYA_TEST_BOOL_OFF", true));

        std::env::remove_var("RENTKENYA_TEST_BOOL_MISSING");
        assert!(env_bool("RENTKENYA_TEST_BOOL_MISSING", true));

        std::env::remove_var("RENTKENYA_TEST_BOOL_YES");
        std::env::remove_var("RENTKENYA_TEST_BOOL_UPPER");
        std::env::remove_var("RENTKENYA_TEST_BOOL_OFF");
    }

    #[test]
    #[serial]
    fn test_load_from_env_required_only() {
        clear_env();
        std::env::set_var(ENV_BACKEND_URL, "https://abc.supabase.co");
        std::env::set_var(ENV_ANON_KEY, "anon-key");

        let config = load_from_env().expect("config from env");
        assert_eq!(config.backend.url, "https://abc.supabase.co");
        assert_eq!(config.backend.timeout_seconds, 30);
        assert_eq!(config.reconcile.max_attempts, 3);
        assert_eq!(config.reconcile.base_delay_ms, 1000);
        assert_eq!(config.gate.sign_in_path, "/signin");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_load_from_env_all_vars_set() {
        clear_env();
        std::env::set_var(ENV_BACKEND_URL, "https://abc.supabase.co");
        std::env::set_var(ENV_ANON_KEY, "anon-key");
        std::env::set_var(ENV_BACKEND_TIMEOUT, "5");
        std::env::set_var(ENV_PROFILE_MAX_ATTEMPTS, "5");
        std::env::set_var(ENV_PROFILE_RETRY_DELAY_MS, "250");
        std::env::set_var(ENV_SIGN_IN_PATH, "/login");
        std::env::set_var(ENV_LOG, "debug");
        std::env::set_var(ENV_LOG_JSON, "true");

        let config = load_from_env().expect("config from env");
        assert_eq!(config.backend.timeout_seconds, 5);
        assert_eq!(config.reconcile.max_attempts, 5);
        assert_eq!(config.reconcile.base_delay_ms, 250);
        assert_eq!(config.gate.sign_in_path, "/login");
        assert_eq!(config.logging.filter, "debug");
        assert!(config.logging.json);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_load_from_env_missing_var() {
        clear_env();
        std::env::set_var(ENV_BACKEND_URL, "https://abc.supabase.co");

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, RentalError::Config(msg) if msg.contains(ENV_ANON_KEY)));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_load_from_env_invalid_number() {
        clear_env();
        std::env::set_var(ENV_BACKEND_URL, "https://abc.supabase.co");
        std::env::set_var(ENV_ANON_KEY, "anon-key");
        std::env::set_var(ENV_PROFILE_MAX_ATTEMPTS, "three");

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, RentalError::Config(msg) if msg.contains(ENV_PROFILE_MAX_ATTEMPTS)));

        clear_env();
    }

    #[test]
    fn test_load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/config.json")));
        assert!(matches!(result, Err(RentalError::Config(_))));
    }

    #[test]
    fn test_parse_config_json() {
        let json = r#"{ "backend": { "url": "https://abc.supabase.co", "anon_key": "k" } }"#;
        let config = parse_config(json, Path::new("test.json")).expect("valid JSON");
        assert_eq!(config.backend.anon_key, "k");
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_parse_config_toml() {
        let toml_content = r#"
[backend]
url = "https://abc.supabase.co"
anon_key = "k"

[reconcile]
max_attempts = 4
"#;
        let config = parse_config(toml_content, Path::new("test.toml")).expect("valid TOML");
        assert_eq!(config.reconcile.max_attempts, 4);
        assert_eq!(config.reconcile.base_delay_ms, 1000);
    }

    #[test]
    fn test_parse_config_missing_backend() {
        let result = parse_config("{}", Path::new("test.json"));
        assert!(matches!(result, Err(RentalError::Config(msg)) if msg.contains("JSON")));
    }

    #[test]
    fn test_parse_config_unsupported_format() {
        let result = parse_config("some content", Path::new("test.yaml"));
        assert!(result.is_err(), "Should fail with unsupported format");
    }
}
