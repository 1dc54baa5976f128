//! Shared test helpers for `rentkenya-core` integration tests.
//!
//! In-memory stand-ins for the auth backend and the profiles table, so the
//! event-loop tests can focus on ordering and retry behaviour.

#![allow(dead_code)]

pub mod auth;
pub mod profiles;

use chrono::{Duration as ChronoDuration, Utc};
use rentkenya_domain::{AuthUser, Profile, Role, Session, UserId};

/// Session for `user` that expires in an hour.
pub fn session_for(user: &str) -> Session {
    Session {
        access_token: format!("access-{user}"),
        refresh_token: Some(format!("refresh-{user}")),
        token_type: "bearer".into(),
        expires_at: Utc::now() + ChronoDuration::hours(1),
        user: AuthUser { id: UserId::new(user), email: Some(format!("{user}@example.com")) },
    }
}

/// Profile row for `user` with the given role.
pub fn profile_for(user: &str, role: Role) -> Profile {
    let now = Utc::now();
    Profile {
        id: UserId::new(user),
        role,
        first_name: None,
        last_name: None,
        phone: None,
        national_id: None,
        created_at: now,
        updated_at: now,
    }
}
