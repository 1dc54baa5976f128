//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Profile reconciliation
pub const MAX_PROFILE_ATTEMPTS: u32 = 3;
pub const PROFILE_RETRY_DELAY_MS: u64 = 1000;

// Session handling
pub const SESSION_EXPIRY_LEEWAY_SECS: i64 = 30;
pub const AUTO_REFRESH_IDLE_SECS: u64 = 60;

// Routing
pub const SIGN_IN_PATH: &str = "/signin";

// Backend tables
pub const PROFILES_TABLE: &str = "profiles";

// HTTP defaults
pub const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_BACKEND_MAX_ATTEMPTS: usize = 3;
