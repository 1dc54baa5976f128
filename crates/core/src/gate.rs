//! Session-aware view gate
//!
//! Decides whether a protected view renders, shows a loading placeholder or
//! redirects to sign-in. Profile resolution is not consulted; the profile may
//! arrive after the view has been admitted.

use rentkenya_domain::constants::SIGN_IN_PATH;
use rentkenya_domain::GateConfig;
use serde::Serialize;

use crate::auth::AuthSnapshot;

/// What a protected view should do for the current snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GateDecision {
    /// Session not resolved yet
    Loading,
    /// Signed in
    Render,
    /// Signed out; navigate to `to`
    Redirect { to: String },
}

impl GateDecision {
    #[must_use]
    pub const fn is_render(&self) -> bool {
        matches!(self, Self::Render)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewGate {
    sign_in_path: String,
}

impl ViewGate {
    pub fn new(sign_in_path: impl Into<String>) -> Self {
        Self { sign_in_path: sign_in_path.into() }
    }

    #[must_use]
    pub fn sign_in_path(&self) -> &str {
        &self.sign_in_path
    }

    /// Never redirects before the first session resolution.
    #[must_use]
    pub fn decide(&self, snapshot: &AuthSnapshot) -> GateDecision {
        if snapshot.loading() {
            GateDecision::Loading
        } else if snapshot.session().is_some() {
            GateDecision::Render
        } else {
            GateDecision::Redirect { to: self.sign_in_path.clone() }
        }
    }
}

impl Default for ViewGate {
    fn default() -> Self {
        Self::new(SIGN_IN_PATH)
    }
}

impl From<&GateConfig> for ViewGate {
    fn from(config: &GateConfig) -> Self {
        Self::new(config.sign_in_path.clone())
    }
}
