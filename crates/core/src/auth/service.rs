//! Authentication service
//!
//! Owns the [`AuthSnapshot`] on a single tokio task. Session notifications,
//! read completions and retry timers are all funnelled into that task and
//! applied one at a time, in arrival order, so no two transitions ever race.
//! Callers observe the result through a `watch` channel.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rentkenya_domain::{AuthUser, NewProfile, Profile, RentalError, Result, Role, Session, SessionChange};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::policy::ReconcilePolicy;
use super::ports::{AuthBackend, ProfileStore, SessionSubscription};
use super::state::{AuthSnapshot, Effect, ReadOutcome, ReconcileToken, Step};

/// Internal messages delivered to the event loop
#[derive(Debug)]
enum Command {
    InitialSession(Option<Session>),
    ReadFinished { token: ReconcileToken, outcome: ReadOutcome },
    RetryElapsed(ReconcileToken),
    Refresh,
    SignUpCompleted,
}

/// Session and profile context shared by every protected view.
///
/// Provides `{session, user, profile, loading}` through [`AuthService::snapshot`]
/// and [`AuthService::watch`], plus sign-in, sign-up and sign-out.
pub struct AuthService {
    auth: Arc<dyn AuthBackend>,
    profiles: Arc<dyn ProfileStore>,
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<AuthSnapshot>,
    event_loop: JoinHandle<()>,
}

impl AuthService {
    /// Subscribe to the auth backend, start the event loop and issue the
    /// eager session fetch.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        auth: Arc<dyn AuthBackend>,
        profiles: Arc<dyn ProfileStore>,
        policy: ReconcilePolicy,
    ) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (publisher, snapshots) = watch::channel(AuthSnapshot::default());

        // Subscribe before the eager fetch so no notification falls between.
        let subscription = auth.subscribe();

        let event_loop = EventLoop {
            profiles: Arc::clone(&profiles),
            policy,
            snapshot: AuthSnapshot::default(),
            publisher,
            commands: commands.clone(),
            timer: None,
        };
        let event_loop = tokio::spawn(event_loop.run(subscription, command_rx));

        let eager_auth = Arc::clone(&auth);
        let eager_tx = commands.clone();
        tokio::spawn(async move {
            let session = match eager_auth.current_session().await {
                Ok(session) => session,
                Err(err) => {
                    warn!(error = %err, "initial session fetch failed; treating as signed out");
                    None
                }
            };
            let _ = eager_tx.send(Command::InitialSession(session));
        });

        Self { auth, profiles, commands, snapshots, event_loop }
    }

    /// Latest published snapshot
    #[must_use]
    pub fn snapshot(&self) -> AuthSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified on every snapshot change
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<AuthSnapshot> {
        self.snapshots.clone()
    }

    /// Wait until `predicate` holds, or `timeout` elapses.
    ///
    /// Returns the matching snapshot, or `None` on timeout or shutdown.
    pub async fn wait_until<F>(&self, timeout: Duration, mut predicate: F) -> Option<AuthSnapshot>
    where
        F: FnMut(&AuthSnapshot) -> bool,
    {
        let mut rx = self.snapshots.clone();
        let wait = async move { rx.wait_for(|snapshot| predicate(snapshot)).await.map(|s| s.clone()) };
        match tokio::time::timeout(timeout, wait).await {
            Ok(Ok(snapshot)) => Some(snapshot),
            Ok(Err(_)) | Err(_) => None,
        }
    }

    /// Wait for the first session resolution.
    pub async fn wait_until_resolved(&self, timeout: Duration) -> Option<AuthSnapshot> {
        self.wait_until(timeout, |snapshot| !snapshot.loading()).await
    }

    /// Wait for the profile of the signed-in user.
    ///
    /// Returns `None` if reconciliation gives up or `timeout` elapses first.
    pub async fn wait_for_profile(&self, timeout: Duration) -> Option<Profile> {
        self.wait_until(timeout, |snapshot| snapshot.profile().is_some() || snapshot.gave_up())
            .await
            .and_then(|snapshot| snapshot.profile().cloned())
    }

    /// Password sign-in.
    ///
    /// The session arrives through the backend's change notification.
    ///
    /// # Errors
    /// Returns the backend's authentication error unchanged.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<()> {
        validate_credentials(email, password)?;
        self.auth.sign_in_with_password(email, password).await?;
        info!("sign in accepted");
        Ok(())
    }

    /// Create an account and its profile row.
    ///
    /// If the profile insert fails the new account is signed back out before
    /// the insert error is returned, so no signed-in user is left without a
    /// profile.
    ///
    /// # Errors
    /// Returns the sign-up error, or the profile insertion error.
    pub async fn sign_up(&self, email: &str, password: &str, role: Role) -> Result<AuthUser> {
        validate_credentials(email, password)?;

        let user = self
            .auth
            .sign_up(email, password)
            .await
            .inspect_err(|err| error!(error = %err, "sign up failed"))?;

        let row = NewProfile::for_user(user.id.clone(), role, Utc::now());
        if let Err(err) = self.profiles.insert_profile(row).await {
            error!(user_id = %user.id, error = %err, "profile creation failed; signing new account out");
            if let Err(sign_out_err) = self.auth.sign_out().await {
                error!(user_id = %user.id, error = %sign_out_err, "compensating sign out failed");
            }
            return Err(err);
        }

        let _ = self.commands.send(Command::SignUpCompleted);
        info!(user_id = %user.id, %role, "account and profile created");
        Ok(user)
    }

    /// Sign out the current session.
    ///
    /// # Errors
    /// Returns the backend error if sign-out fails.
    pub async fn sign_out(&self) -> Result<()> {
        self.auth.sign_out().await?;
        info!("signed out");
        Ok(())
    }

    /// Re-read the profile of the current identity.
    ///
    /// No-op while a read or retry is already outstanding.
    pub fn refresh_profile(&self) {
        let _ = self.commands.send(Command::Refresh);
    }
}

impl Drop for AuthService {
    fn drop(&mut self) {
        self.event_loop.abort();
    }
}

fn validate_credentials(email: &str, password: &str) -> Result<()> {
    if email.trim().is_empty() {
        return Err(RentalError::InvalidInput("email is required".into()));
    }
    if password.is_empty() {
        return Err(RentalError::InvalidInput("password is required".into()));
    }
    Ok(())
}

/// State owned by the event-loop task
struct EventLoop {
    profiles: Arc<dyn ProfileStore>,
    policy: ReconcilePolicy,
    snapshot: AuthSnapshot,
    publisher: watch::Sender<AuthSnapshot>,
    commands: mpsc::UnboundedSender<Command>,
    timer: Option<(ReconcileToken, JoinHandle<()>)>,
}

impl EventLoop {
    async fn run(
        mut self,
        mut subscription: SessionSubscription,
        mut commands: mpsc::UnboundedReceiver<Command>,
    ) {
        let mut subscribed = true;

        loop {
            tokio::select! {
                biased;

                change = subscription.recv(), if subscribed => match change {
                    Some(change) => self.on_session_change(change),
                    None => {
                        debug!("session subscription closed");
                        subscribed = false;
                    }
                },
                command = commands.recv() => match command {
                    Some(command) => self.on_command(command),
                    None => break,
                },
            }
        }
    }

    fn on_session_change(&mut self, change: SessionChange) {
        debug!(
            event = %change.event,
            user_id = change.session.as_ref().map(|s| s.user_id().to_string()),
            "session change"
        );
        let step = self.snapshot.apply_session(change.session);
        self.commit(step);
    }

    fn on_command(&mut self, command: Command) {
        let step = match command {
            Command::InitialSession(session) => self.snapshot.apply_initial_session(session),
            Command::ReadFinished { token, outcome } => {
                self.snapshot.read_finished(&token, outcome, &self.policy)
            }
            Command::RetryElapsed(token) => {
                if self.timer.as_ref().is_some_and(|(pending, _)| *pending == token) {
                    self.timer = None;
                }
                self.snapshot.retry_elapsed(&token)
            }
            Command::Refresh => self.snapshot.refresh_requested(),
            Command::SignUpCompleted => self.snapshot.sign_up_completed(),
        };
        self.commit(step);
    }

    fn commit(&mut self, step: Step) {
        let Step { snapshot, effects } = step;

        if snapshot.gave_up() && !self.snapshot.gave_up() {
            warn!(
                user_id = snapshot.user_id().map(ToString::to_string),
                attempts = snapshot.attempts(),
                "profile reconciliation gave up"
            );
        }
        if snapshot.profile().is_some() && self.snapshot.profile().is_none() {
            info!(user_id = snapshot.user_id().map(ToString::to_string), "profile resolved");
        }

        self.snapshot = snapshot;
        let latest = &self.snapshot;
        self.publisher.send_if_modified(|current| {
            if current == latest {
                false
            } else {
                *current = latest.clone();
                true
            }
        });

        for effect in effects {
            self.run_effect(effect);
        }
    }

    fn run_effect(&mut self, effect: Effect) {
        match effect {
            Effect::Read(token) => {
                let profiles = Arc::clone(&self.profiles);
                let tx = self.commands.clone();
                tokio::spawn(async move {
                    let outcome = match profiles.read_profile(&token.user_id).await {
                        Ok(Some(profile)) => ReadOutcome::Found(profile),
                        Ok(None) => ReadOutcome::Missing,
                        Err(err) => {
                            warn!(user_id = %token.user_id, error = %err, "profile read failed");
                            ReadOutcome::Failed(err)
                        }
                    };
                    let _ = tx.send(Command::ReadFinished { token, outcome });
                });
            }
            Effect::Schedule { token, delay } => {
                if let Some((stale, handle)) = self.timer.take() {
                    warn!(user_id = %stale.user_id, "replacing an outstanding retry timer");
                    handle.abort();
                }
                debug!(user_id = %token.user_id, delay = ?delay, "profile retry scheduled");
                let tx = self.commands.clone();
                let fired = token.clone();
                let handle = tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(Command::RetryElapsed(fired));
                });
                self.timer = Some((token, handle));
            }
            Effect::Cancel(token) => {
                if let Some((pending, handle)) = self.timer.take() {
                    if pending == token {
                        debug!(user_id = %token.user_id, "profile retry cancelled");
                        handle.abort();
                    } else {
                        self.timer = Some((pending, handle));
                    }
                }
            }
        }
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        if let Some((_, handle)) = self.timer.take() {
            handle.abort();
        }
    }
}
