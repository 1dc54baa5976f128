//! Commands - the operations the presentation layer invokes

mod auth;

pub use auth::*;
