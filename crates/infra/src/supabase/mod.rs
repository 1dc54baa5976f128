//! Hosted backend adapters
//!
//! - **[`auth`]**: GoTrue-style authentication API (`/auth/v1/*`)
//! - **[`profiles`]**: PostgREST-style `profiles` table (`/rest/v1/profiles`)
//! - **[`errors`]**: backend error body parsing and status mapping
//!
//! Every request carries the project's anonymous key as `apikey`; the
//! `Authorization` bearer is the session's access token when one exists.

pub mod auth;
pub mod errors;
pub mod profiles;

use async_trait::async_trait;
use rentkenya_domain::{BackendConfig, RentalError, Result};
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::RequestBuilder;
use tracing::warn;
use url::Url;

use crate::errors::InfraError;

pub use auth::GoTrueAuthClient;
pub use profiles::PostgrestProfileStore;

/// Source of the bearer token for data requests.
///
/// Allows the profile store to act as the signed-in user without owning the
/// session.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// A token valid for the next request.
    async fn access_token(&self) -> Result<String>;
}

/// Project base URL and anonymous key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendEndpoint {
    base: Url,
    anon_key: String,
}

impl BackendEndpoint {
    /// # Errors
    /// Returns `RentalError::Config` for an unparseable URL or an empty key.
    pub fn new(url: &str, anon_key: impl Into<String>) -> Result<Self> {
        let anon_key = anon_key.into();
        if anon_key.trim().is_empty() {
            return Err(RentalError::Config("backend anon key is empty".into()));
        }

        let mut base = Url::parse(url).map_err(|err| RentalError::from(InfraError::from(err)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { base, anon_key })
    }

    /// # Errors
    /// See [`BackendEndpoint::new`].
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        Self::new(&config.url, config.anon_key.clone())
    }

    #[must_use]
    pub fn anon_key(&self) -> &str {
        &self.anon_key
    }

    /// Resolve `path` (no leading slash) against the project URL.
    ///
    /// # Errors
    /// Returns `RentalError::Config` if the joined URL is invalid.
    pub fn url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|err| RentalError::from(InfraError::from(err)))
    }

    /// Attach `apikey`, `Accept` and a bearer token.
    ///
    /// # Errors
    /// Returns `RentalError::Auth` if `bearer` cannot be sent as a header.
    /// The request is never sent without one.
    pub(crate) fn authorize(
        &self,
        builder: RequestBuilder,
        bearer: &str,
    ) -> Result<RequestBuilder> {
        let mut value = HeaderValue::from_str(&format!("Bearer {bearer}")).map_err(|_| {
            warn!("bearer token contains characters not allowed in a header");
            RentalError::Auth("access token is not a valid header value".into())
        })?;
        value.set_sensitive(true);

        Ok(builder
            .header("apikey", &self.anon_key)
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, value))
    }
}
