//! Authentication types
//!
//! Sessions and user identities are issued and owned by the hosted auth
//! backend. The application only ever holds read-only copies.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "ts-gen")]
use ts_rs::TS;

use crate::impl_wire_name_conversions;

/// Stable identifier assigned by the auth backend at account creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export, type = "string"))]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Signed-in user as reported by the auth backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
}

/// Cached copy of an authenticated session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub user: AuthUser,
}

impl Session {
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user.id
    }

    /// True once `now` is within `leeway_secs` of the expiry instant.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>, leeway_secs: i64) -> bool {
        now + Duration::seconds(leeway_secs) >= self.expires_at
    }

    /// Time left until [`Session::is_expired`] turns true for the same
    /// leeway. Zero exactly when it already has.
    #[must_use]
    pub fn refresh_due_in(&self, now: DateTime<Utc>, leeway_secs: i64) -> std::time::Duration {
        (self.expires_at - Duration::seconds(leeway_secs) - now).to_std().unwrap_or_default()
    }
}

/// Kind of session-change notification emitted by the auth backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
pub enum SessionEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

impl_wire_name_conversions!(SessionEvent {
    InitialSession => "initial_session",
    SignedIn => "signed_in",
    SignedOut => "signed_out",
    TokenRefreshed => "token_refreshed",
    UserUpdated => "user_updated",
});

/// One session-change notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionChange {
    pub event: SessionEvent,
    pub session: Option<Session>,
}

impl SessionChange {
    pub fn new(event: SessionEvent, session: Option<Session>) -> Self {
        Self { event, session }
    }
}
