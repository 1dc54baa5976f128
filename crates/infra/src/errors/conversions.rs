//! Conversions from external infrastructure errors into domain errors.

use rentkenya_domain::RentalError;
use reqwest::Error as HttpError;
use serde_json::Error as JsonError;
use url::ParseError as UrlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub RentalError);

impl From<InfraError> for RentalError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<RentalError> for InfraError {
    fn from(value: RentalError) -> Self {
        Self(value)
    }
}

trait IntoRentalError {
    fn into_rental(self) -> RentalError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → RentalError */
/* -------------------------------------------------------------------------- */

impl IntoRentalError for HttpError {
    fn into_rental(self) -> RentalError {
        if self.is_timeout() {
            return RentalError::Network("HTTP request timed out".into());
        }

        #[cfg(not(target_arch = "wasm32"))]
        if self.is_connect() {
            return RentalError::Network("HTTP connection failure".into());
        }

        if self.is_decode() {
            return RentalError::Backend(format!("undecodable HTTP response: {self}"));
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => RentalError::Auth(message),
                404 => RentalError::NotFound(message),
                400..=499 => RentalError::InvalidInput(message),
                _ => RentalError::Backend(message),
            };
        }

        RentalError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        Self(value.into_rental())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → RentalError */
/* -------------------------------------------------------------------------- */

impl IntoRentalError for JsonError {
    fn into_rental(self) -> RentalError {
        RentalError::Backend(format!("malformed backend payload: {self}"))
    }
}

impl From<JsonError> for InfraError {
    fn from(value: JsonError) -> Self {
        Self(value.into_rental())
    }
}

/* -------------------------------------------------------------------------- */
/* url::ParseError → RentalError */
/* -------------------------------------------------------------------------- */

impl IntoRentalError for UrlError {
    fn into_rental(self) -> RentalError {
        RentalError::Config(format!("invalid backend URL: {self}"))
    }
}

impl From<UrlError> for InfraError {
    fn from(value: UrlError) -> Self {
        Self(value.into_rental())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
