//! Profile records extracted from account summaries
//!
//! A record always carries a username. Every other field is allowed to be
//! unknown, and "unknown" is kept distinct from zero and from false.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A non-negative count that may not be determinable from the markup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Count {
    /// Parsed value
    Known(u64),
    /// Not present or not parseable
    #[default]
    Unknown,
}

impl Count {
    /// The value, if known
    pub fn known(self) -> Option<u64> {
        match self {
            Count::Known(n) => Some(n),
            Count::Unknown => None,
        }
    }

    pub fn is_unknown(self) -> bool {
        matches!(self, Count::Unknown)
    }
}

impl From<Option<u64>> for Count {
    fn from(value: Option<u64>) -> Self {
        value.map_or(Count::Unknown, Count::Known)
    }
}

/// Normalized form of a username used for every comparison and lookup
pub fn username_key(username: &str) -> String {
    username.trim().to_lowercase()
}

/// Structured facts about one account, captured at `scraped_at`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    /// Display form, case preserved
    pub username: String,
    /// First day of the join month
    pub join_date: Option<NaiveDate>,
    pub followers: Count,
    pub following: Count,
    pub tweet_count: Count,
    pub has_avatar: bool,
    pub has_bio: bool,
    pub is_verified: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub scraped_at: DateTime<Utc>,
}

impl ProfileRecord {
    /// Start a record for `username`. Returns `None` for a blank name.
    pub fn builder(username: &str) -> Option<ProfileRecordBuilder> {
        let username = username.trim();
        if username.is_empty() {
            return None;
        }
        Some(ProfileRecordBuilder {
            username: username.to_string(),
            join_date: None,
            followers: Count::Unknown,
            following: Count::Unknown,
            tweet_count: Count::Unknown,
            has_avatar: false,
            has_bio: false,
            is_verified: false,
        })
    }

    /// Lowercase key for this account
    pub fn key(&self) -> String {
        username_key(&self.username)
    }
}

/// Builder for [`ProfileRecord`]; unset fields stay unknown or false
#[derive(Debug, Clone)]
pub struct ProfileRecordBuilder {
    username: String,
    join_date: Option<NaiveDate>,
    followers: Count,
    following: Count,
    tweet_count: Count,
    has_avatar: bool,
    has_bio: bool,
    is_verified: bool,
}

impl ProfileRecordBuilder {
    pub fn join_date(mut self, date: Option<NaiveDate>) -> Self {
        self.join_date = date;
        self
    }

    pub fn followers(mut self, count: Count) -> Self {
        self.followers = count;
        self
    }

    pub fn following(mut self, count: Count) -> Self {
        self.following = count;
        self
    }

    pub fn tweet_count(mut self, count: Count) -> Self {
        self.tweet_count = count;
        self
    }

    pub fn avatar(mut self, present: bool) -> Self {
        self.has_avatar = present;
        self
    }

    pub fn bio(mut self, present: bool) -> Self {
        self.has_bio = present;
        self
    }

    pub fn verified(mut self, verified: bool) -> Self {
        self.is_verified = verified;
        self
    }

    /// Stamp the capture time and finish the record
    pub fn build(self, scraped_at: DateTime<Utc>) -> ProfileRecord {
        ProfileRecord {
            username: self.username,
            join_date: self.join_date,
            followers: self.followers,
            following: self.following,
            tweet_count: self.tweet_count,
            has_avatar: self.has_avatar,
            has_bio: self.has_bio,
            is_verified: self.is_verified,
            scraped_at,
        }
    }
}
