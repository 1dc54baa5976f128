//! `profiles` table adapter

use std::sync::Arc;

use async_trait::async_trait;
use rentkenya_core::ProfileStore;
use rentkenya_domain::constants::PROFILES_TABLE;
use rentkenya_domain::{NewProfile, Profile, RentalError, Result, UserId};
use reqwest::{Method, Response};
use tracing::debug;

use super::errors::{BackendError, ErrorScope};
use super::{AccessTokenProvider, BackendEndpoint};
use crate::errors::InfraError;
use crate::http::HttpClient;

/// `ProfileStore` over the data API's `profiles` table.
///
/// Requests run as the signed-in user so row-level policies apply.
pub struct PostgrestProfileStore {
    http: HttpClient,
    endpoint: BackendEndpoint,
    tokens: Arc<dyn AccessTokenProvider>,
}

impl PostgrestProfileStore {
    pub fn new(
        http: HttpClient,
        endpoint: BackendEndpoint,
        tokens: Arc<dyn AccessTokenProvider>,
    ) -> Self {
        Self { http, endpoint, tokens }
    }

    fn table_url(&self) -> Result<url::Url> {
        self.endpoint.url(&format!("rest/v1/{PROFILES_TABLE}"))
    }

    async fn rows(response: Response) -> Result<Vec<Profile>> {
        if !response.status().is_success() {
            return Err(BackendError::from_response(ErrorScope::Data, response).await.into());
        }
        let bytes = response.bytes().await.map_err(|err| RentalError::from(InfraError::from(err)))?;
        serde_json::from_slice(&bytes).map_err(|err| InfraError::from(err).into())
    }
}

#[async_trait]
impl ProfileStore for PostgrestProfileStore {
    async fn read_profile(&self, user_id: &UserId) -> Result<Option<Profile>> {
        let mut url = self.table_url()?;
        url.query_pairs_mut()
            .append_pair("id", &format!("eq.{user_id}"))
            .append_pair("select", "*");

        let bearer = self.tokens.access_token().await?;
        let request = self.endpoint.authorize(self.http.request(Method::GET, url), &bearer)?;
        // Reconciliation owns the retry budget for reads.
        let rows = Self::rows(self.http.send_once(request).await?).await?;

        debug!(%user_id, rows = rows.len(), "profile read");
        Ok(rows.into_iter().next())
    }

    async fn insert_profile(&self, row: NewProfile) -> Result<Profile> {
        let url = self.table_url()?;
        let bearer = self.tokens.access_token().await?;
        let request = self
            .endpoint
            .authorize(self.http.request(Method::POST, url), &bearer)?
            .header("Prefer", "return=representation")
            .json(&row);

        let rows = Self::rows(self.http.send(request).await?).await?;
        rows.into_iter().next().ok_or_else(|| {
            RentalError::Backend(format!("insert into {PROFILES_TABLE} returned no row"))
        })
    }
}
