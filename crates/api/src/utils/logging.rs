use std::time::Duration;

use rentkenya_domain::RentalError;
use tracing::{info, warn};

/// Log the outcome of a command execution with structured fields.
///
/// # Parameters
/// * `command` - Logical command identifier (e.g. `"auth::sign_in"`).
/// * `elapsed` - Duration the command execution took.
/// * `error` - The failure, if the command did not succeed.
///
/// Callers must avoid forwarding credentials in `command`.
#[inline]
pub fn log_command_execution(command: &str, elapsed: Duration, error: Option<&RentalError>) {
    let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

    match error {
        None => info!(command, duration_ms, "command_execution_success"),
        Some(err) => {
            warn!(command, duration_ms, error_type = error_label(err), error = %err, "command_execution_failure");
        }
    }
}

/// Convert a `RentalError` into a stable label suitable for logging.
#[inline]
pub const fn error_label(error: &RentalError) -> &'static str {
    match error {
        RentalError::Config(_) => "config",
        RentalError::Network(_) => "network",
        RentalError::Auth(_) => "auth",
        RentalError::Backend(_) => "backend",
        RentalError::NotFound(_) => "not_found",
        RentalError::InvalidInput(_) => "invalid_input",
        RentalError::Internal(_) => "internal",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        assert_eq!(error_label(&RentalError::Auth("x".into())), "auth");
        assert_eq!(error_label(&RentalError::Backend("x".into())), "backend");
        assert_eq!(error_label(&RentalError::InvalidInput("x".into())), "invalid_input");
    }
}
