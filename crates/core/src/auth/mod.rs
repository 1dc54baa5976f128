//! Session observation and profile reconciliation
//!
//! ```text
//! auth backend ──SessionChange──► AuthService event loop ──► watch<AuthSnapshot>
//!                                   │      ▲
//!                             Effect│      │read result / timer
//!                                   ▼      │
//!                               ProfileStore, tokio timers
//! ```
//!
//! - **[`state`]**: immutable snapshot and pure transitions
//! - **[`policy`]**: retry budget and delay arithmetic
//! - **[`ports`]**: traits implemented by infrastructure adapters
//! - **[`service`]**: the single task that applies transitions and runs effects

pub mod policy;
pub mod ports;
pub mod service;
pub mod state;

pub use policy::ReconcilePolicy;
pub use ports::{AuthBackend, ProfileStore, SessionSubscription};
pub use service::AuthService;
pub use state::{AuthSnapshot, Effect, ReadOutcome, ReconcileState, ReconcileToken, Step};
