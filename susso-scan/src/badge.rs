//! In-memory badge board
//!
//! Tracks one marker per username mention, the way a page would carry a
//! colored dot next to each `@handle`. Markers start out as unknown, and
//! go away with the mention they sit next to.

use std::collections::{BTreeMap, BTreeSet};

use susso_core::{username_key, Rating};
use tracing::trace;

use crate::{BadgeRenderer, Placement, UsernameElement};

/// Identity of a marker: where it sits and whose it is
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BadgeKey {
    pub post: usize,
    pub link: usize,
    pub username: String,
}

/// A marker and its current color
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    /// Username as it was displayed
    pub username: String,
    pub rating: Rating,
}

#[derive(Debug, Default)]
pub struct BadgeBoard {
    badges: BTreeMap<BadgeKey, Badge>,
}

impl BadgeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.badges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.badges.is_empty()
    }

    pub fn get(&self, key: &BadgeKey) -> Option<&Badge> {
        self.badges.get(key)
    }

    /// Markers for `username`, any case
    pub fn badges_for(&self, username: &str) -> Vec<&Badge> {
        let key = username_key(username);
        self.badges
            .iter()
            .filter(|(badge_key, _)| badge_key.username == key)
            .map(|(_, badge)| badge)
            .collect()
    }

    /// Current rating per username key
    pub fn ratings(&self) -> BTreeMap<String, Rating> {
        self.badges
            .iter()
            .map(|(key, badge)| (key.username.clone(), badge.rating))
            .collect()
    }
}

impl BadgeRenderer for BadgeBoard {
    type Element = UsernameElement;
    type Handle = BadgeKey;

    fn place(&mut self, element: &UsernameElement, username: &str) -> Option<Placement<BadgeKey>> {
        let username_norm = username_key(username);
        if username_norm.is_empty() {
            return None;
        }

        let key = BadgeKey {
            post: element.post,
            link: element.link,
            username: username_norm,
        };

        if self.badges.contains_key(&key) {
            return Some(Placement::Existing(key));
        }

        trace!("Placing badge for {} at post {} link {}", username, element.post, element.link);
        self.badges.insert(
            key.clone(),
            Badge {
                username: username.to_string(),
                rating: Rating::Unknown,
            },
        );
        Some(Placement::Inserted(key))
    }

    fn retain(&mut self, present: &[BadgeKey]) -> usize {
        let present: BTreeSet<&BadgeKey> = present.iter().collect();
        let before = self.badges.len();
        self.badges.retain(|key, _| present.contains(key));
        let removed = before - self.badges.len();
        if removed > 0 {
            trace!("Removed {} badges no longer on the page", removed);
        }
        removed
    }

    fn set_color(&mut self, username: &str, rating: Rating) {
        let target = username_key(username);
        for (key, badge) in self.badges.iter_mut() {
            if key.username == target {
                badge.rating = rating;
            }
        }
    }
}
