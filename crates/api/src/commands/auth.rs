//! Account commands: sign-in, sign-up, sign-out and identity inspection
//!
//! Each command logs its outcome with `log_command_execution` and returns the
//! domain error unchanged so callers can match on it.

use std::time::{Duration, Instant};

use rentkenya_core::{GateDecision, ReconcileState};
use rentkenya_domain::{AuthUser, Profile, Result, Role, UserId};
use serde::Serialize;
use tracing::info;
#[cfg(feature = "ts-gen")]
use ts_rs::TS;

use crate::context::AppContext;
use crate::utils::logging::log_command_execution;

/// Identity and profile state as seen by the application
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
pub struct WhoAmI {
    pub signed_in: bool,
    pub user_id: Option<UserId>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub profile: Option<Profile>,
    #[cfg_attr(feature = "ts-gen", ts(skip))]
    pub reconcile: ReconcileState,
}

/// Gate decision for one protected path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateCheck {
    pub path: String,
    pub decision: GateDecision,
}

/// How long account commands wait for the auth state to reflect their change
const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

fn finish<T>(command: &str, start: Instant, result: &Result<T>) {
    log_command_execution(command, start.elapsed(), result.as_ref().err());
}

/// Sign in with email and password.
///
/// Returns once the auth state shows the new session.
///
/// # Errors
/// `InvalidInput` for blank credentials, `Auth` when the backend rejects them.
pub async fn sign_in(ctx: &AppContext, email: &str, password: &str) -> Result<()> {
    let command_name = "auth::sign_in";
    let start = Instant::now();

    let result = ctx.auth.sign_in(email, password).await;
    if result.is_ok() {
        ctx.auth.wait_until(SETTLE_TIMEOUT, |snapshot| snapshot.session().is_some()).await;
    }
    finish(command_name, start, &result);
    result
}

/// Create an account and its profile row.
///
/// # Errors
/// Propagates the sign-up or profile insert failure. A failed insert signs
/// the new account back out before returning.
pub async fn sign_up(
    ctx: &AppContext,
    email: &str,
    password: &str,
    role: Role,
) -> Result<AuthUser> {
    let command_name = "auth::sign_up";
    let start = Instant::now();
    info!(command = command_name, %role, "Executing sign_up");

    let result = ctx.auth.sign_up(email, password, role).await;
    finish(command_name, start, &result);
    result
}

/// Sign out of the current session.
///
/// # Errors
/// Returns the backend failure, if any. Local state is cleared regardless.
pub async fn sign_out(ctx: &AppContext) -> Result<()> {
    let command_name = "auth::sign_out";
    let start = Instant::now();

    let result = ctx.auth.sign_out().await;
    ctx.auth.wait_until(SETTLE_TIMEOUT, |snapshot| snapshot.session().is_none()).await;
    finish(command_name, start, &result);
    result
}

/// Report the current identity once the initial session check completes.
///
/// When signed in, waits up to `timeout` for the profile to resolve; the
/// reported `reconcile` state says whether it was found or given up on.
///
/// # Errors
/// Never fails today; the `Result` keeps the command signature uniform.
pub async fn whoami(ctx: &AppContext, timeout: Duration) -> Result<WhoAmI> {
    let command_name = "auth::whoami";
    let start = Instant::now();

    let deadline = start + timeout;
    let mut snapshot =
        ctx.auth.wait_until_resolved(timeout).await.unwrap_or_else(|| ctx.auth.snapshot());
    if snapshot.user().is_some() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        snapshot = ctx
            .auth
            .wait_until(remaining, |s| {
                matches!(s.state(), ReconcileState::Found | ReconcileState::GaveUp)
                    || s.user().is_none()
            })
            .await
            .unwrap_or_else(|| ctx.auth.snapshot());
    }

    let result = Ok(WhoAmI {
        signed_in: snapshot.user().is_some(),
        user_id: snapshot.user_id().cloned(),
        email: snapshot.user().and_then(|user| user.email.clone()),
        role: snapshot.role(),
        profile: snapshot.profile().cloned(),
        reconcile: snapshot.state(),
    });
    finish(command_name, start, &result);
    result
}

/// Decide whether `path` may render for the current snapshot.
#[must_use]
pub fn gate(ctx: &AppContext, path: &str) -> GateCheck {
    let command_name = "auth::gate";
    let start = Instant::now();

    let decision = ctx.gate.decide(&ctx.auth.snapshot());
    log_command_execution(command_name, start.elapsed(), None);
    GateCheck { path: path.to_string(), decision }
}
