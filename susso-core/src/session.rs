//! Per-process record of accounts already rated
//!
//! Lives as long as the host process. Never persisted, never shrinks.

use std::collections::HashSet;
use uuid::Uuid;

use crate::username_key;

/// Usernames rated during this session, compared case-insensitively
#[derive(Debug, Clone)]
pub struct SessionSet {
    id: Uuid,
    seen: HashSet<String>,
}

impl SessionSet {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            seen: HashSet::new(),
        }
    }

    /// Identifier used to tag log output for this session
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn contains(&self, username: &str) -> bool {
        self.seen.contains(&username_key(username))
    }

    /// Mark `username` as rated. Returns false if it already was.
    pub fn insert(&mut self, username: &str) -> bool {
        self.seen.insert(username_key(username))
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl Default for SessionSet {
    fn default() -> Self {
        Self::new()
    }
}
