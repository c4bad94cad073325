//! Red-flag rating engine
//!
//! Counts independent red flags over a [`ProfileRecord`] and maps the total
//! onto a badge category. The engine is a pure function of the record and
//! the evaluation time.

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ProfileRecord;

/// Account younger than this many calendar months is flagged
const NEW_ACCOUNT_MONTHS: u32 = 3;

/// Followers-per-following below this ratio is flagged
const MIN_FOLLOW_RATIO: f64 = 0.1;

/// Following more accounts than this is flagged
const MAX_FOLLOWING: u64 = 5000;

/// Average posts per day above this rate is flagged
const MAX_POSTS_PER_DAY: f64 = 50.0;

/// Badge category for an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Green,
    Yellow,
    Red,
    /// Not enough data to rate
    #[default]
    Unknown,
}

impl Rating {
    /// Badge fill color
    pub fn color(self) -> &'static str {
        match self {
            Rating::Green => "#22c55e",
            Rating::Yellow => "#eab308",
            Rating::Red => "#ef4444",
            Rating::Unknown => "#9ca3af",
        }
    }

    /// Position on the green < yellow < red scale; `None` for unknown
    pub fn severity(self) -> Option<u8> {
        match self {
            Rating::Green => Some(0),
            Rating::Yellow => Some(1),
            Rating::Red => Some(2),
            Rating::Unknown => None,
        }
    }

    fn from_flag_count(count: usize) -> Self {
        match count {
            0 => Rating::Green,
            1..=2 => Rating::Yellow,
            _ => Rating::Red,
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Rating::Green => "green",
            Rating::Yellow => "yellow",
            Rating::Red => "red",
            Rating::Unknown => "unknown",
        };
        f.pad(name)
    }
}

/// One unit of evidence toward a worse rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedFlag {
    /// Joined less than three months ago
    NewAccount,
    /// Far more following than followers
    LowFollowRatio,
    /// Following an unusually large number of accounts
    MassFollowing,
    /// No posts at all
    NoPosts,
    /// Posting faster than a person plausibly could
    PostFlood,
    NoAvatar,
    NoBio,
}

/// Result of rating a profile, with the flags that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    pub rating: Rating,
    /// Flags raised, before the verification credit
    pub flags: Vec<RedFlag>,
    /// Whether verification removed one flag from the count
    pub verified_credit: bool,
}

impl Assessment {
    /// Flag count after the verification credit
    pub fn score(&self) -> usize {
        self.flags.len() - usize::from(self.verified_credit)
    }
}

/// Rate `profile` as of `now`
pub fn rate(profile: &ProfileRecord, now: DateTime<Utc>) -> Rating {
    assess(profile, now).rating
}

/// Rate `profile` as of `now` and report every flag raised
pub fn assess(profile: &ProfileRecord, now: DateTime<Utc>) -> Assessment {
    let (Some(followers), Some(following)) =
        (profile.followers.known(), profile.following.known())
    else {
        return Assessment {
            rating: Rating::Unknown,
            flags: Vec::new(),
            verified_credit: false,
        };
    };

    let mut flags = Vec::new();
    let joined_at = profile
        .join_date
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc());

    if let Some(joined_at) = joined_at {
        let cutoff = now
            .checked_sub_months(Months::new(NEW_ACCOUNT_MONTHS))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        if joined_at > cutoff {
            flags.push(RedFlag::NewAccount);
        }
    }

    if following > 0 && (followers as f64 / following as f64) < MIN_FOLLOW_RATIO {
        flags.push(RedFlag::LowFollowRatio);
    }

    if following > MAX_FOLLOWING {
        flags.push(RedFlag::MassFollowing);
    }

    match (profile.tweet_count.known(), joined_at) {
        (Some(0), _) => flags.push(RedFlag::NoPosts),
        (Some(posts), Some(joined_at)) => {
            let days = (now - joined_at).num_days().max(1);
            if posts as f64 / days as f64 > MAX_POSTS_PER_DAY {
                flags.push(RedFlag::PostFlood);
            }
        }
        _ => {}
    }

    if !profile.has_avatar {
        flags.push(RedFlag::NoAvatar);
    }

    if !profile.has_bio {
        flags.push(RedFlag::NoBio);
    }

    let verified_credit = profile.is_verified && !flags.is_empty();
    let score = flags.len() - usize::from(verified_credit);

    Assessment {
        rating: Rating::from_flag_count(score),
        flags,
        verified_credit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Count;
    use chrono::{NaiveDate, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn suspicious() -> ProfileRecord {
        ProfileRecord::builder("spammy")
            .unwrap()
            .followers(Count::Known(1_000))
            .following(Count::Known(10_000))
            .join_date(NaiveDate::from_ymd_opt(2024, 4, 1))
            .tweet_count(Count::Known(0))
            .build(now())
    }

    fn healthy() -> ProfileRecord {
        ProfileRecord::builder("regular")
            .unwrap()
            .followers(Count::Known(800))
            .following(Count::Known(400))
            .join_date(NaiveDate::from_ymd_opt(2015, 1, 1))
            .tweet_count(Count::Known(3_000))
            .avatar(true)
            .bio(true)
            .build(now())
    }

    #[test]
    fn test_unknown_followers_wins() {
        let mut profile = suspicious();
        profile.followers = Count::Unknown;
        assert_eq!(rate(&profile, now()), Rating::Unknown);

        let mut profile = healthy();
        profile.following = Count::Unknown;
        let assessment = assess(&profile, now());
        assert_eq!(assessment.rating, Rating::Unknown);
        assert!(assessment.flags.is_empty());
    }

    #[test]
    fn test_suspicious_profile_is_red() {
        let assessment = assess(&suspicious(), now());
        // 1,000 / 10,000 is exactly 0.1, which is not below the ratio floor
        assert_eq!(
            assessment.flags,
            vec![
                RedFlag::NewAccount,
                RedFlag::MassFollowing,
                RedFlag::NoPosts,
                RedFlag::NoAvatar,
                RedFlag::NoBio,
            ]
        );
        assert_eq!(assessment.score(), 5);
        assert_eq!(assessment.rating, Rating::Red);
    }

    #[test]
    fn test_low_ratio_flag() {
        let mut profile = healthy();
        profile.followers = Count::Known(10);
        profile.following = Count::Known(200);
        assert_eq!(assess(&profile, now()).flags, vec![RedFlag::LowFollowRatio]);
        assert_eq!(rate(&profile, now()), Rating::Yellow);
    }

    #[test]
    fn test_zero_following_skips_ratio() {
        let mut profile = healthy();
        profile.followers = Count::Known(0);
        profile.following = Count::Known(0);
        assert_eq!(rate(&profile, now()), Rating::Green);
    }

    #[test]
    fn test_verification_removes_one_flag() {
        let mut profile = suspicious();
        profile.is_verified = true;
        let assessment = assess(&profile, now());
        assert!(assessment.verified_credit);
        assert_eq!(assessment.score(), 4);
        assert_eq!(assessment.rating, Rating::Red);

        let mut profile = healthy();
        profile.has_bio = false;
        profile.is_verified = true;
        assert_eq!(rate(&profile, now()), Rating::Green);
    }

    #[test]
    fn test_verification_never_goes_negative() {
        let mut profile = healthy();
        profile.is_verified = true;
        let assessment = assess(&profile, now());
        assert!(!assessment.verified_credit);
        assert_eq!(assessment.score(), 0);
        assert_eq!(assessment.rating, Rating::Green);
    }

    #[test]
    fn test_healthy_profile_is_green() {
        let assessment = assess(&healthy(), now());
        assert!(assessment.flags.is_empty());
        assert_eq!(assessment.rating, Rating::Green);
    }

    #[test]
    fn test_new_account_boundary() {
        let mut profile = healthy();
        profile.join_date = NaiveDate::from_ymd_opt(2024, 3, 1);
        assert_eq!(rate(&profile, now()), Rating::Green);

        profile.join_date = NaiveDate::from_ymd_opt(2024, 4, 1);
        assert_eq!(assess(&profile, now()).flags, vec![RedFlag::NewAccount]);
    }

    #[test]
    fn test_post_flood() {
        let mut profile = healthy();
        profile.join_date = NaiveDate::from_ymd_opt(2024, 1, 1);
        // 166 days since join
        profile.tweet_count = Count::Known(5_000);
        assert_eq!(rate(&profile, now()), Rating::Green);

        profile.tweet_count = Count::Known(20_000);
        assert_eq!(assess(&profile, now()).flags, vec![RedFlag::PostFlood]);
    }

    #[test]
    fn test_post_rate_needs_join_date() {
        let mut profile = healthy();
        profile.join_date = None;
        profile.tweet_count = Count::Known(1_000_000);
        assert_eq!(rate(&profile, now()), Rating::Green);
    }

    #[test]
    fn test_unknown_posts_raise_nothing() {
        let mut profile = healthy();
        profile.tweet_count = Count::Unknown;
        assert_eq!(rate(&profile, now()), Rating::Green);
    }

    #[test]
    fn test_flag_count_mapping() {
        let mut profile = healthy();
        profile.has_avatar = false;
        profile.has_bio = false;
        assert_eq!(rate(&profile, now()), Rating::Yellow);

        profile.following = Count::Known(6_000);
        profile.followers = Count::Known(6_000);
        assert_eq!(rate(&profile, now()), Rating::Red);
    }

    #[test]
    fn test_rating_is_deterministic() {
        let profile = suspicious();
        let first = assess(&profile, now());
        for _ in 0..5 {
            assert_eq!(assess(&profile, now()), first);
        }
    }

    #[test]
    fn test_severity_order() {
        assert!(Rating::Green.severity() < Rating::Yellow.severity());
        assert!(Rating::Yellow.severity() < Rating::Red.severity());
        assert_eq!(Rating::Unknown.severity(), None);
        assert_eq!(Rating::Red.to_string(), "red");
    }
}
