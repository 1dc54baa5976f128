//! Backend error classification
//!
//! Turns non-success responses from the auth and data APIs into domain
//! errors, keeping the backend's own message when it sends one.

use rentkenya_domain::RentalError;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use thiserror::Error;

/// Which API produced the response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    /// `/auth/v1`: client errors are credential or account problems
    Auth,
    /// `/rest/v1`: client errors are permission or payload problems
    Data,
}

/// Failure reported by the hosted backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    Server(String),
}

impl BackendError {
    /// Classify a non-success status.
    pub fn from_status(scope: ErrorScope, status: StatusCode, body: &str) -> Self {
        let message = extract_message(body).unwrap_or_else(|| {
            format!("HTTP {} {}", status.as_u16(), status.canonical_reason().unwrap_or("error"))
        });

        match (scope, status.as_u16()) {
            (_, 500..=599) => Self::Server(message),
            (ErrorScope::Auth, 400 | 401 | 403 | 422 | 429) | (ErrorScope::Data, 401 | 403) => {
                Self::Auth(message)
            }
            (ErrorScope::Data, 404) => Self::NotFound(message),
            _ => Self::Rejected(message),
        }
    }

    /// Read the body of a failed response and classify it.
    pub async fn from_response(scope: ErrorScope, response: Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Self::from_status(scope, status, &body)
    }
}

impl From<BackendError> for RentalError {
    fn from(value: BackendError) -> Self {
        match value {
            BackendError::Auth(message) => Self::Auth(message),
            BackendError::NotFound(message) => Self::NotFound(message),
            BackendError::Rejected(message) | BackendError::Server(message) => {
                Self::Backend(message)
            }
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    msg: Option<String>,
    error_description: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

/// Pull the human-readable message out of an auth or data API error body.
fn extract_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    [parsed.msg, parsed.error_description, parsed.message, parsed.error]
        .into_iter()
        .flatten()
        .find(|message| !message.trim().is_empty())
}
