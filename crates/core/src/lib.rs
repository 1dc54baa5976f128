//! # RentKenya Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces for the hosted auth backend and profile table
//! - The profile reconciliation state machine and its event-loop driver
//! - The session-aware view gate
//!
//! ## Architecture Principles
//! - Only depends on `rentkenya-common` and `rentkenya-domain`
//! - No HTTP or platform code
//! - All external dependencies via traits

pub mod auth;
pub mod gate;

pub use auth::{
    AuthBackend, AuthService, AuthSnapshot, Effect, ProfileStore, ReadOutcome, ReconcilePolicy,
    ReconcileState, ReconcileToken, SessionSubscription, Step,
};
pub use gate::{GateDecision, ViewGate};
