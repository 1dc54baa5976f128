//! Authentication snapshot and reconciliation transitions
//!
//! Every transition takes the current [`AuthSnapshot`] by reference and
//! returns a [`Step`]: the next snapshot plus the side effects the driver
//! must perform. Nothing here touches the network or a clock, which keeps
//! the state machine testable without a runtime.
//!
//! Reads and retry timers carry a [`ReconcileToken`]. A token is current only
//! while its identity and generation match the snapshot, so results that
//! arrive after a sign-out or identity switch are dropped.

use std::time::Duration;

use rentkenya_domain::{AuthUser, Profile, RentalError, Role, Session, UserId};
use serde::Serialize;

use super::policy::ReconcilePolicy;

/// Where profile resolution stands for the current identity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReconcileState {
    /// No user identity
    #[default]
    Idle,
    /// A read for the profile is in flight
    Fetching,
    /// The profile row was read and cached
    Found,
    /// Waiting `delay_ms` before the next read
    Retrying { delay_ms: u64 },
    /// Retry budget exhausted; no further automatic reads for this identity
    GaveUp,
}

/// Identifies one reconciliation run for one identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ReconcileToken {
    pub user_id: UserId,
    pub generation: u64,
}

/// Result of one profile read
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    Found(Profile),
    Missing,
    Failed(RentalError),
}

/// Side effect requested by a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Issue a profile read for the token's identity
    Read(ReconcileToken),
    /// Start the retry timer
    Schedule { token: ReconcileToken, delay: Duration },
    /// Abort the retry timer started for this token
    Cancel(ReconcileToken),
}

/// Outcome of a transition
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub snapshot: AuthSnapshot,
    pub effects: Vec<Effect>,
}

impl Step {
    fn unchanged(snapshot: &AuthSnapshot) -> Self {
        Self { snapshot: snapshot.clone(), effects: Vec::new() }
    }

    fn with(snapshot: AuthSnapshot, effects: Vec<Effect>) -> Self {
        Self { snapshot, effects }
    }
}

/// Immutable view of session, identity and profile resolution.
///
/// Published to the presentation layer on every change.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuthSnapshot {
    session: Option<Session>,
    profile: Option<Profile>,
    state: ReconcileState,
    attempts: u32,
    pending: Option<ReconcileToken>,
    generation: u64,
    resolved: bool,
}

impl AuthSnapshot {
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn user(&self) -> Option<&AuthUser> {
        self.session.as_ref().map(|session| &session.user)
    }

    #[must_use]
    pub fn user_id(&self) -> Option<&UserId> {
        self.session.as_ref().map(Session::user_id)
    }

    #[must_use]
    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    /// Role from the resolved profile; `None` means "not yet known".
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.profile.as_ref().map(|profile| profile.role)
    }

    #[must_use]
    pub fn state(&self) -> ReconcileState {
        self.state
    }

    /// Reads issued for the current identity since the last reset
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Token of the outstanding retry timer, if any
    #[must_use]
    pub fn pending(&self) -> Option<&ReconcileToken> {
        self.pending.as_ref()
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True until the first session resolution (eager fetch or notification)
    #[must_use]
    pub fn loading(&self) -> bool {
        !self.resolved
    }

    /// Profile resolution is still in progress
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self.state, ReconcileState::Fetching | ReconcileState::Retrying { .. })
    }

    #[must_use]
    pub fn gave_up(&self) -> bool {
        self.state == ReconcileState::GaveUp
    }

    fn is_current(&self, token: &ReconcileToken) -> bool {
        token.generation == self.generation && self.user_id() == Some(&token.user_id)
    }

    fn begin_read(&mut self, user_id: UserId) -> ReconcileToken {
        self.attempts += 1;
        self.state = ReconcileState::Fetching;
        ReconcileToken { user_id, generation: self.generation }
    }

    /// Apply a session-change notification.
    ///
    /// A notification for the same identity (token refresh, user update)
    /// only replaces the cached session. A new identity cancels any pending
    /// retry, drops the cached profile and starts a fresh read; no identity
    /// returns to `Idle`.
    #[must_use]
    pub fn apply_session(&self, session: Option<Session>) -> Step {
        let previous = self.user_id().cloned();
        let incoming = session.as_ref().map(|s| s.user_id().clone());

        let mut next = self.clone();
        next.session = session;
        next.resolved = true;

        if previous == incoming {
            return Step::with(next, Vec::new());
        }

        let mut effects = Vec::new();
        if let Some(token) = next.pending.take() {
            effects.push(Effect::Cancel(token));
        }
        next.profile = None;
        next.attempts = 0;
        next.generation += 1;

        match incoming {
            Some(user_id) => {
                let token = next.begin_read(user_id);
                effects.push(Effect::Read(token));
            }
            None => next.state = ReconcileState::Idle,
        }

        Step::with(next, effects)
    }

    /// Apply the result of the eager session fetch done at startup.
    ///
    /// Ignored once any notification has resolved the session, so a slow
    /// fetch cannot resurrect an identity a later sign-out removed.
    #[must_use]
    pub fn apply_initial_session(&self, session: Option<Session>) -> Step {
        if self.resolved {
            return Step::unchanged(self);
        }
        self.apply_session(session)
    }

    /// Apply the outcome of a profile read.
    #[must_use]
    pub fn read_finished(
        &self,
        token: &ReconcileToken,
        outcome: ReadOutcome,
        policy: &ReconcilePolicy,
    ) -> Step {
        if !self.is_current(token) || self.state != ReconcileState::Fetching {
            return Step::unchanged(self);
        }

        let mut next = self.clone();
        let delay = match outcome {
            ReadOutcome::Found(profile) => {
                next.profile = Some(profile);
                next.state = ReconcileState::Found;
                next.attempts = 0;
                return Step::with(next, Vec::new());
            }
            ReadOutcome::Missing => policy.not_found_delay(),
            ReadOutcome::Failed(_) => policy.error_delay(self.attempts),
        };

        if !policy.can_retry(self.attempts) {
            next.state = ReconcileState::GaveUp;
            return Step::with(next, Vec::new());
        }

        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        next.state = ReconcileState::Retrying { delay_ms };
        next.pending = Some(token.clone());
        Step::with(next, vec![Effect::Schedule { token: token.clone(), delay }])
    }

    /// Apply a fired retry timer.
    ///
    /// Only the timer recorded as pending may issue the next read.
    #[must_use]
    pub fn retry_elapsed(&self, token: &ReconcileToken) -> Step {
        if self.pending.as_ref() != Some(token) || !self.is_current(token) {
            return Step::unchanged(self);
        }

        let mut next = self.clone();
        next.pending = None;
        let token = next.begin_read(token.user_id.clone());
        Step::with(next, vec![Effect::Read(token)])
    }

    /// Re-read the profile on explicit request.
    ///
    /// A found profile is otherwise never re-validated. Ignored without an
    /// identity or while a read or retry is outstanding.
    #[must_use]
    pub fn refresh_requested(&self) -> Step {
        let Some(user_id) = self.user_id().cloned() else {
            return Step::unchanged(self);
        };
        if self.is_pending() {
            return Step::unchanged(self);
        }

        let mut next = self.clone();
        next.generation += 1;
        next.attempts = 0;
        next.profile = None;
        let token = next.begin_read(user_id);
        Step::with(next, vec![Effect::Read(token)])
    }

    /// Reset the attempt counter after a successful sign-up.
    ///
    /// An in-flight run keeps its counter so the budget still bounds it.
    #[must_use]
    pub fn sign_up_completed(&self) -> Step {
        if self.is_pending() || self.attempts == 0 {
            return Step::unchanged(self);
        }
        let mut next = self.clone();
        next.attempts = 0;
        Step::with(next, Vec::new())
    }
}
