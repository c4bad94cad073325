//! Time-bounded profile cache
//!
//! Ratings are stored as JSON rows under `<prefix><username_key>`. Rows
//! older than the TTL read as absent and are removed on sight. A rejected
//! write evicts the oldest rows in the namespace and retries once; failures
//! are logged and never surface to the caller.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    username_key, PersistedStore, ProfileRecord, Rating, SussConfig, DEFAULT_CACHE_TTL_HOURS,
    DEFAULT_EVICTION_BATCH, DEFAULT_KEY_PREFIX,
};

/// A rated profile as held in the cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(flatten)]
    pub profile: ProfileRecord,
    pub rating: Rating,
}

impl CacheEntry {
    pub fn new(profile: ProfileRecord, rating: Rating) -> Self {
        Self { profile, rating }
    }

    fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.profile.scraped_at > ttl
    }
}

/// How a cache write ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Stored,
    /// Stored on the retry after dropping `evicted` old rows
    StoredAfterEviction { evicted: usize },
    /// Not persisted; the rating is still valid for the caller
    Dropped,
}

impl PutOutcome {
    pub fn is_stored(self) -> bool {
        !matches!(self, PutOutcome::Dropped)
    }
}

/// Just enough of a row to rank it for eviction
#[derive(Deserialize)]
struct RowStamp {
    #[serde(rename = "scrapedAt", default)]
    scraped_at: i64,
}

/// Profile cache over a persisted store it owns exclusively
#[derive(Debug)]
pub struct ProfileCache<S> {
    store: S,
    prefix: String,
    ttl: Duration,
    eviction_batch: usize,
}

impl<S: PersistedStore> ProfileCache<S> {
    /// Cache with the default prefix, TTL and eviction batch
    pub fn new(store: S) -> Self {
        Self {
            store,
            prefix: DEFAULT_KEY_PREFIX.to_string(),
            ttl: Duration::hours(DEFAULT_CACHE_TTL_HOURS),
            eviction_batch: DEFAULT_EVICTION_BATCH,
        }
    }

    pub fn with_config(store: S, config: &SussConfig) -> Self {
        Self {
            store,
            prefix: config.key_prefix.clone(),
            ttl: config.cache_ttl(),
            eviction_batch: config.eviction_batch,
        }
    }

    fn key_for(&self, username: &str) -> String {
        format!("{}{}", self.prefix, username_key(username))
    }

    /// Fresh entry for `username`, or `None` if absent, stale or unreadable
    pub fn get(&mut self, username: &str, now: DateTime<Utc>) -> Option<CacheEntry> {
        let key = self.key_for(username);
        let raw = self.store.get(&key)?;

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                // Left in place; the next successful put overwrites it
                debug!("Unreadable cache row {}: {}", key, e);
                return None;
            }
        };

        if entry.is_expired(now, self.ttl) {
            debug!("Cache row {} expired", key);
            self.store.remove(&key);
            return None;
        }

        Some(entry)
    }

    /// Persist a rated profile, evicting old rows once if the store is full
    pub fn put(&mut self, entry: &CacheEntry) -> PutOutcome {
        let key = self.key_for(&entry.profile.username);
        let value = match serde_json::to_string(entry) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to encode cache row {}: {}", key, e);
                return PutOutcome::Dropped;
            }
        };

        match self.store.set(&key, &value) {
            Ok(()) => return PutOutcome::Stored,
            Err(e) => warn!("Cache write failed for {}, clearing old entries: {}", key, e),
        }

        let evicted = self.evict_oldest(self.eviction_batch);

        match self.store.set(&key, &value) {
            Ok(()) => PutOutcome::StoredAfterEviction { evicted },
            Err(e) => {
                warn!("Cache write for {} failed again, giving up: {}", key, e);
                PutOutcome::Dropped
            }
        }
    }

    /// Remove the `count` rows with the smallest `scrapedAt`
    fn evict_oldest(&mut self, count: usize) -> usize {
        let mut ranked: Vec<(i64, String)> = self
            .namespace_keys()
            .into_iter()
            .map(|key| {
                let stamp = self
                    .store
                    .get(&key)
                    .and_then(|raw| serde_json::from_str::<RowStamp>(&raw).ok())
                    .map_or(0, |row| row.scraped_at);
                (stamp, key)
            })
            .collect();

        ranked.sort();

        let victims: Vec<String> = ranked.into_iter().take(count).map(|(_, key)| key).collect();
        for key in &victims {
            self.store.remove(key);
        }
        debug!("Evicted {} cache rows", victims.len());
        victims.len()
    }

    fn namespace_keys(&self) -> Vec<String> {
        self.store
            .keys()
            .into_iter()
            .filter(|key| key.starts_with(&self.prefix))
            .collect()
    }

    /// Every readable row in the namespace, stale rows included
    pub fn entries(&self) -> Vec<CacheEntry> {
        self.namespace_keys()
            .into_iter()
            .filter_map(|key| self.store.get(&key))
            .filter_map(|raw| serde_json::from_str(&raw).ok())
            .collect()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
