//! # RentKenya Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - HTTP client with retry
//! - Hosted backend adapters (auth API, profiles table)
//! - Configuration loading and session persistence
//! - Error conversions into the domain error
//!
//! ## Architecture
//! - Implements traits defined in `rentkenya-core`
//! - Contains all "impure" code (network, filesystem, environment)

pub mod config;
pub mod errors;
pub mod http;
pub mod session_file;
pub mod supabase;

// Re-export commonly used items
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use session_file::SessionFile;
pub use supabase::{AccessTokenProvider, BackendEndpoint, GoTrueAuthClient, PostgrestProfileStore};
