//! Resilience primitives
//!
//! Only the delay arithmetic lives here; callers own their timers so that
//! cancellation stays with whoever scheduled the wait.

pub mod backoff;

pub use backoff::BackoffStrategy;
