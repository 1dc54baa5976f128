//! Auth API client
//!
//! Implements [`AuthBackend`] against a GoTrue-compatible `/auth/v1` API.
//! The client caches the current session in memory and fans every change
//! out to its subscribers in the order the changes happen, the same way the
//! hosted JavaScript client reports `onAuthStateChange` events.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rentkenya_core::{AuthBackend, SessionSubscription};
use rentkenya_domain::constants::{AUTO_REFRESH_IDLE_SECS, SESSION_EXPIRY_LEEWAY_SECS};
use rentkenya_domain::{
    AuthUser, RentalError, Result, Session, SessionChange, SessionEvent, UserId,
};
use reqwest::{Method, Response};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::errors::{BackendError, ErrorScope};
use super::{AccessTokenProvider, BackendEndpoint};
use crate::errors::InfraError;
use crate::http::HttpClient;

const SIGNUP_PATH: &str = "auth/v1/signup";
const TOKEN_PATH: &str = "auth/v1/token";
const LOGOUT_PATH: &str = "auth/v1/logout";
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Serialize)]
struct PasswordCredentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct UserBody {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl From<UserBody> for AuthUser {
    fn from(body: UserBody) -> Self {
        Self { id: UserId::new(body.id), email: body.email }
    }
}

/// Token grant response.
///
/// Sign-up answers with either this shape (auto-confirmed accounts) or a
/// bare user object (confirmation pending), so every field is optional.
#[derive(Debug, Default, Deserialize)]
struct TokenBody {
    access_token: Option<String>,
    token_type: Option<String>,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    refresh_token: Option<String>,
    user: Option<UserBody>,
    id: Option<String>,
    email: Option<String>,
}

impl TokenBody {
    fn into_session(self, now: DateTime<Utc>) -> Option<Session> {
        let access_token = self.access_token?;
        let user = self.user?;
        let expires_at = self
            .expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .or_else(|| self.expires_in.map(|secs| now + chrono::Duration::seconds(secs)))
            .unwrap_or(now);

        Some(Session {
            access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type.unwrap_or_else(|| "bearer".into()),
            expires_at,
            user: user.into(),
        })
    }

    /// Sign-up result: the new user, plus a session when one was issued.
    fn into_sign_up(self, now: DateTime<Utc>) -> Result<(AuthUser, Option<Session>)> {
        if self.access_token.is_some() && self.user.is_some() {
            if let Some(session) = self.into_session(now) {
                return Ok((session.user.clone(), Some(session)));
            }
            return Err(RentalError::Auth("no user returned from sign up".into()));
        }

        let user = match (self.user, self.id) {
            (Some(user), _) => user.into(),
            (None, Some(id)) => AuthUser { id: UserId::new(id), email: self.email },
            (None, None) => return Err(RentalError::Auth("no user returned from sign up".into())),
        };
        Ok((user, None))
    }
}

#[derive(Default)]
struct Shared {
    session: Option<Session>,
    subscribers: Vec<UnboundedSender<SessionChange>>,
}

/// Session-owning client for the hosted auth API
pub struct GoTrueAuthClient {
    http: HttpClient,
    endpoint: BackendEndpoint,
    shared: Mutex<Shared>,
    refresh_gate: tokio::sync::Mutex<()>,
}

impl GoTrueAuthClient {
    pub fn new(http: HttpClient, endpoint: BackendEndpoint) -> Self {
        Self {
            http,
            endpoint,
            shared: Mutex::new(Shared::default()),
            refresh_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Seed the client with a previously persisted session.
    #[must_use]
    pub fn with_session(self, session: Session) -> Self {
        self.lock().session = Some(session);
        self
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached session, without expiry checks
    #[must_use]
    pub fn cached_session(&self) -> Option<Session> {
        self.lock().session.clone()
    }

    /// Replace the cached session and notify subscribers under one lock, so
    /// notification order always matches state order.
    fn store(&self, event: SessionEvent, session: Option<Session>) {
        let mut shared = self.lock();
        shared.session.clone_from(&session);
        let change = SessionChange::new(event, session);
        shared.subscribers.retain(|tx| tx.send(change.clone()).is_ok());
        debug!(%event, subscribers = shared.subscribers.len(), "session change emitted");
    }

    async fn post_json<B: Serialize + Sync>(
        &self,
        url: url::Url,
        bearer: &str,
        body: &B,
    ) -> Result<Response> {
        let request =
            self.endpoint.authorize(self.http.request(Method::POST, url), bearer)?.json(body);
        let response = self.http.send(request).await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(BackendError::from_response(ErrorScope::Auth, response).await.into())
        }
    }

    async fn read_token_body(response: Response) -> Result<TokenBody> {
        let bytes = response.bytes().await.map_err(|err| RentalError::from(InfraError::from(err)))?;
        serde_json::from_slice(&bytes).map_err(|err| InfraError::from(err).into())
    }

    async fn grant<B: Serialize + Sync>(&self, grant_type: &str, body: &B) -> Result<Session> {
        let mut url = self.endpoint.url(TOKEN_PATH)?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);

        let response = self.post_json(url, self.endpoint.anon_key(), body).await?;
        Self::read_token_body(response)
            .await?
            .into_session(Utc::now())
            .ok_or_else(|| RentalError::Backend("token response did not contain a session".into()))
    }

    /// Exchange the refresh token for a new session.
    async fn refresh(&self, refresh_token: &str) -> Result<Session> {
        self.grant("refresh_token", &RefreshGrant { refresh_token }).await
    }

    /// Refresh or drop an expired session. Serialized so concurrent callers
    /// trigger one exchange.
    async fn renew_expired(&self) -> Result<Option<Session>> {
        let _gate = self.refresh_gate.lock().await;

        let Some(session) = self.cached_session() else {
            return Ok(None);
        };
        if !session.is_expired(Utc::now(), SESSION_EXPIRY_LEEWAY_SECS) {
            return Ok(Some(session));
        }

        let Some(refresh_token) = session.refresh_token.as_deref() else {
            info!(user_id = %session.user_id(), "session expired without refresh token; signing out");
            self.store(SessionEvent::SignedOut, None);
            return Ok(None);
        };

        match self.refresh(refresh_token).await {
            Ok(renewed) => {
                info!(user_id = %renewed.user_id(), "session refreshed");
                self.store(SessionEvent::TokenRefreshed, Some(renewed.clone()));
                Ok(Some(renewed))
            }
            Err(RentalError::Auth(message)) => {
                warn!(user_id = %session.user_id(), %message, "refresh token rejected; signing out");
                self.store(SessionEvent::SignedOut, None);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Invalidate the refresh token server-side.
    async fn revoke(&self, access_token: &str) -> Result<()> {
        let url = self.endpoint.url(LOGOUT_PATH)?;
        let request = self.endpoint.authorize(self.http.request(Method::POST, url), access_token)?;
        let response = self.http.send(request).await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(BackendError::from_response(ErrorScope::Auth, response).await.into())
        }
    }

    /// Keep the session fresh in the background.
    ///
    /// Sleeps until shortly before expiry, then refreshes. Stops once the
    /// client is dropped.
    pub fn spawn_auto_refresh(self: &Arc<Self>) -> JoinHandle<()> {
        let client = Arc::downgrade(self);
        tokio::spawn(auto_refresh_loop(client))
    }
}

/// How long the auto-refresh task may sleep before looking again.
fn refresh_wake(session: Option<&Session>, now: DateTime<Utc>) -> Duration {
    session.map_or(Duration::from_secs(AUTO_REFRESH_IDLE_SECS), |session| {
        session.refresh_due_in(now, SESSION_EXPIRY_LEEWAY_SECS)
    })
}

async fn auto_refresh_loop(client: Weak<GoTrueAuthClient>) {
    let idle = Duration::from_secs(AUTO_REFRESH_IDLE_SECS);

    loop {
        let wake = {
            let Some(client) = client.upgrade() else {
                debug!("auth client dropped; stopping auto-refresh");
                return;
            };
            refresh_wake(client.cached_session().as_ref(), Utc::now())
        };

        if !wake.is_zero() {
            tokio::time::sleep(wake).await;
        }

        let Some(client) = client.upgrade() else {
            return;
        };
        if client.cached_session().is_none() {
            continue;
        }
        let pause = match client.renew_expired().await {
            // Issued token lives shorter than the leeway.
            Ok(Some(session)) if session.is_expired(Utc::now(), SESSION_EXPIRY_LEEWAY_SECS) => {
                MIN_REFRESH_INTERVAL
            }
            Ok(_) => Duration::ZERO,
            Err(err) => {
                error!(error = %err, "auto-refresh failed");
                idle
            }
        };
        drop(client);

        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }
}

#[async_trait]
impl AuthBackend for GoTrueAuthClient {
    async fn current_session(&self) -> Result<Option<Session>> {
        match self.cached_session() {
            Some(session) if session.is_expired(Utc::now(), SESSION_EXPIRY_LEEWAY_SECS) => {
                self.renew_expired().await
            }
            cached => Ok(cached),
        }
    }

    fn subscribe(&self) -> SessionSubscription {
        let (tx, subscription) = SessionSubscription::channel();
        let mut shared = self.lock();
        let initial = SessionChange::new(SessionEvent::InitialSession, shared.session.clone());
        if tx.send(initial).is_ok() {
            shared.subscribers.push(tx);
        }
        subscription
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<()> {
        let session = self.grant("password", &PasswordCredentials { email, password }).await?;
        info!(user_id = %session.user_id(), "signed in with password");
        self.store(SessionEvent::SignedIn, Some(session));
        Ok(())
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser> {
        let url = self.endpoint.url(SIGNUP_PATH)?;
        let response =
            self.post_json(url, self.endpoint.anon_key(), &PasswordCredentials { email, password }).await?;
        let (user, session) = Self::read_token_body(response).await?.into_sign_up(Utc::now())?;

        match session {
            Some(session) => self.store(SessionEvent::SignedIn, Some(session)),
            None => info!(user_id = %user.id, "account created; awaiting email confirmation"),
        }
        Ok(user)
    }

    async fn sign_out(&self) -> Result<()> {
        if let Some(session) = self.cached_session() {
            if let Err(err) = self.revoke(&session.access_token).await {
                warn!(user_id = %session.user_id(), error = %err, "remote logout failed; clearing local session");
            }
        }

        self.store(SessionEvent::SignedOut, None);
        Ok(())
    }
}

#[async_trait]
impl AccessTokenProvider for GoTrueAuthClient {
    async fn access_token(&self) -> Result<String> {
        Ok(self
            .current_session()
            .await?
            .map_or_else(|| self.endpoint.anon_key().to_string(), |session| session.access_token))
    }
}
