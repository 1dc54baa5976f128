//! Domain types and models

pub mod auth;
pub mod profile;

pub use auth::{AuthUser, Session, SessionChange, SessionEvent, UserId};
pub use profile::{NewProfile, Profile, Role};
