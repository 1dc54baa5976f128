//! Port interfaces for authentication and profile storage
//!
//! These traits define the boundaries between core business logic
//! and the hosted backend adapters.

use async_trait::async_trait;
use rentkenya_domain::{AuthUser, NewProfile, Profile, Result, Session, SessionChange, UserId};
use tokio::sync::mpsc;

/// Ordered stream of session-change notifications for one subscriber.
///
/// Notifications arrive in emission order and are never coalesced. The
/// subscription ends when the backend drops its sender.
#[derive(Debug)]
pub struct SessionSubscription {
    receiver: mpsc::UnboundedReceiver<SessionChange>,
}

impl SessionSubscription {
    pub fn new(receiver: mpsc::UnboundedReceiver<SessionChange>) -> Self {
        Self { receiver }
    }

    /// Create a connected sender/subscription pair.
    pub fn channel() -> (mpsc::UnboundedSender<SessionChange>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self::new(rx))
    }

    /// Next notification, or `None` once the backend hung up.
    pub async fn recv(&mut self) -> Option<SessionChange> {
        self.receiver.recv().await
    }
}

/// Hosted authentication backend
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Current session, if any
    async fn current_session(&self) -> Result<Option<Session>>;

    /// Subscribe to session-change notifications
    fn subscribe(&self) -> SessionSubscription;

    /// Password sign-in; the resulting session arrives as a notification
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<()>;

    /// Create an account and return the newly issued identity
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser>;

    /// Sign out the current session
    async fn sign_out(&self) -> Result<()>;
}

/// Trait for profile row persistence and retrieval
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Read the profile for a user identity; `Ok(None)` when no row is visible
    async fn read_profile(&self, user_id: &UserId) -> Result<Option<Profile>>;

    /// Insert the profile row created at sign-up
    async fn insert_profile(&self, profile: NewProfile) -> Result<Profile>;
}
