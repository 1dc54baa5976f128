//! # RentKenya App
//!
//! Application layer - commands, context wiring and the CLI entry point.
//!
//! This crate contains:
//! - Account commands (sign-in, sign-up, sign-out, identity, view gate)
//! - Application context (dependency injection)
//!
//! ## Architecture
//! - Depends on `common`, `domain`, `core`, and `infra`
//! - Wires the hosted backend adapters into the core auth service

pub mod commands;
pub mod context;
pub mod utils;

// Re-export for convenience
pub use commands::*;
pub use context::*;
