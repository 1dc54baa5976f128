//! Mock profile store
//!
//! Rows can be hidden for a number of reads to model replication lag, and
//! reads or inserts can be scripted to fail.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rentkenya_core::ProfileStore;
use rentkenya_domain::{NewProfile, Profile, RentalError, Result as DomainResult, UserId};

#[derive(Default)]
struct State {
    rows: HashMap<UserId, Profile>,
    hidden_reads: HashMap<UserId, u32>,
    failing_reads: u32,
    insert_error: Option<RentalError>,
    read_delay: Option<Duration>,
    reads: Vec<UserId>,
    inserts: Vec<NewProfile>,
}

#[derive(Default, Clone)]
pub struct MockProfileStore {
    state: Arc<Mutex<State>>,
}

impl MockProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_row(self, profile: Profile) -> Self {
        self.put_row(profile);
        self
    }

    /// Report the row for `user` as missing for the next `reads` reads.
    pub fn hidden_for(self, user: &str, reads: u32) -> Self {
        self.state.lock().unwrap().hidden_reads.insert(UserId::new(user), reads);
        self
    }

    /// Fail the next `reads` reads with a network error.
    pub fn failing_reads(self, reads: u32) -> Self {
        self.state.lock().unwrap().failing_reads = reads;
        self
    }

    pub fn fail_insert(self, error: RentalError) -> Self {
        self.state.lock().unwrap().insert_error = Some(error);
        self
    }

    pub fn with_read_delay(self, delay: Duration) -> Self {
        self.state.lock().unwrap().read_delay = Some(delay);
        self
    }

    pub fn put_row(&self, profile: Profile) {
        self.state.lock().unwrap().rows.insert(profile.id.clone(), profile);
    }

    pub fn reads(&self) -> usize {
        self.state.lock().unwrap().reads.len()
    }

    pub fn reads_for(&self, user: &str) -> usize {
        let id = UserId::new(user);
        self.state.lock().unwrap().reads.iter().filter(|read| **read == id).count()
    }

    pub fn inserts(&self) -> Vec<NewProfile> {
        self.state.lock().unwrap().inserts.clone()
    }
}

#[async_trait]
impl ProfileStore for MockProfileStore {
    async fn read_profile(&self, user_id: &UserId) -> DomainResult<Option<Profile>> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.reads.push(user_id.clone());
            state.read_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        if state.failing_reads > 0 {
            state.failing_reads -= 1;
            return Err(RentalError::Network("connection reset".into()));
        }
        if let Some(hidden) = state.hidden_reads.get_mut(user_id) {
            if *hidden > 0 {
                *hidden -= 1;
                return Ok(None);
            }
        }
        Ok(state.rows.get(user_id).cloned())
    }

    async fn insert_profile(&self, row: NewProfile) -> DomainResult<Profile> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.insert_error.clone() {
            return Err(error);
        }
        let profile = Profile {
            id: row.id.clone(),
            role: row.role,
            first_name: None,
            last_name: None,
            phone: None,
            national_id: None,
            created_at: row.created_at,
            updated_at: row.updated_at,
        };
        state.rows.insert(profile.id.clone(), profile.clone());
        state.inserts.push(row);
        Ok(profile)
    }
}
