//! Mock authentication backend
//!
//! Keeps one session, broadcasts every change to all subscribers in call
//! order, and supports scripted failures.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rentkenya_core::{AuthBackend, SessionSubscription};
use rentkenya_domain::{
    AuthUser, RentalError, Result as DomainResult, Session, SessionChange, SessionEvent,
};
use tokio::sync::mpsc::UnboundedSender;

use super::session_for;

#[derive(Default)]
struct State {
    session: Option<Session>,
    subscribers: Vec<UnboundedSender<SessionChange>>,
    initial_response: Option<(Option<Session>, Duration)>,
    current_session_error: Option<RentalError>,
    sign_in_error: Option<RentalError>,
    sign_up_error: Option<RentalError>,
    sign_out_error: Option<RentalError>,
    sign_out_calls: usize,
}

/// In-memory `AuthBackend`.
///
/// `sign_in_with_password` and `sign_up` derive the user id from the part of
/// the email before `@`.
#[derive(Default, Clone)]
pub struct MockAuthBackend {
    state: Arc<Mutex<State>>,
}

impl MockAuthBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `user` already signed in.
    pub fn signed_in_as(user: &str) -> Self {
        let backend = Self::new();
        backend.state.lock().unwrap().session = Some(session_for(user));
        backend
    }

    /// Answer the next `current_session` call with `session` after `delay`,
    /// regardless of the live session.
    pub fn with_initial_response(self, session: Option<Session>, delay: Duration) -> Self {
        self.state.lock().unwrap().initial_response = Some((session, delay));
        self
    }

    pub fn fail_current_session(self, error: RentalError) -> Self {
        self.state.lock().unwrap().current_session_error = Some(error);
        self
    }

    pub fn fail_sign_in(self, error: RentalError) -> Self {
        self.state.lock().unwrap().sign_in_error = Some(error);
        self
    }

    pub fn fail_sign_up(self, error: RentalError) -> Self {
        self.state.lock().unwrap().sign_up_error = Some(error);
        self
    }

    pub fn fail_sign_out(self, error: RentalError) -> Self {
        self.state.lock().unwrap().sign_out_error = Some(error);
        self
    }

    /// Replace the session and notify subscribers.
    pub fn emit(&self, event: SessionEvent, session: Option<Session>) {
        let mut state = self.state.lock().unwrap();
        state.session.clone_from(&session);
        let change = SessionChange::new(event, session);
        state.subscribers.retain(|tx| tx.send(change.clone()).is_ok());
    }

    pub fn session(&self) -> Option<Session> {
        self.state.lock().unwrap().session.clone()
    }

    pub fn sign_out_calls(&self) -> usize {
        self.state.lock().unwrap().sign_out_calls
    }
}

fn user_for(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

#[async_trait]
impl AuthBackend for MockAuthBackend {
    async fn current_session(&self) -> DomainResult<Option<Session>> {
        let scripted = {
            let mut state = self.state.lock().unwrap();
            if let Some(error) = state.current_session_error.take() {
                return Err(error);
            }
            state.initial_response.take()
        };

        match scripted {
            Some((session, delay)) => {
                tokio::time::sleep(delay).await;
                Ok(session)
            }
            None => Ok(self.session()),
        }
    }

    fn subscribe(&self) -> SessionSubscription {
        let (tx, subscription) = SessionSubscription::channel();
        self.state.lock().unwrap().subscribers.push(tx);
        subscription
    }

    async fn sign_in_with_password(&self, email: &str, _password: &str) -> DomainResult<()> {
        if let Some(error) = self.state.lock().unwrap().sign_in_error.clone() {
            return Err(error);
        }
        self.emit(SessionEvent::SignedIn, Some(session_for(&user_for(email))));
        Ok(())
    }

    async fn sign_up(&self, email: &str, _password: &str) -> DomainResult<AuthUser> {
        if let Some(error) = self.state.lock().unwrap().sign_up_error.clone() {
            return Err(error);
        }
        let session = session_for(&user_for(email));
        let user = session.user.clone();
        self.emit(SessionEvent::SignedIn, Some(session));
        Ok(user)
    }

    async fn sign_out(&self) -> DomainResult<()> {
        {
            let mut state = self.state.lock().unwrap();
            state.sign_out_calls += 1;
            if let Some(error) = state.sign_out_error.clone() {
                return Err(error);
            }
        }
        self.emit(SessionEvent::SignedOut, None);
        Ok(())
    }
}
