//! Profile extraction from hover cards
//!
//! A hover card shows the profile link, follower and following counts,
//! the join month, an avatar, a bio and possibly a verification mark. It
//! never shows a post count, so that field is always left unknown here.

use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use susso_core::{parse_count, parse_join_date, Count, CountLabel, ProfileRecord};

use crate::locator::{compile, profile_link_username};
use crate::{visible_text, ProfileExtractor, ScanError};

/// Markup of one profile preview card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoverCard {
    pub html: String,
}

impl HoverCard {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }
}

/// Extractor for `[data-testid="HoverCard"]` previews
#[derive(Debug, Clone)]
pub struct HoverCardExtractor {
    profile_link: Selector,
    avatar: Selector,
    bio: Selector,
    verified_icon: Selector,
    verified_label: Selector,
}

impl HoverCardExtractor {
    pub fn new() -> Result<Self, ScanError> {
        Ok(Self {
            profile_link: compile(r#"a[role="link"][href^="/"]"#)?,
            avatar: compile(r#"img[src*="profile_images"]"#)?,
            bio: compile(r#"[data-testid="UserDescription"]"#)?,
            verified_icon: compile(r#"[data-testid="icon-verified"]"#)?,
            verified_label: compile(r#"svg[aria-label*="Verified"]"#)?,
        })
    }

    fn username_in(&self, root: ElementRef<'_>) -> Option<String> {
        profile_link_username(root, &self.profile_link)
    }

    fn has_bio(&self, root: ElementRef<'_>) -> bool {
        root.select(&self.bio)
            .next()
            .is_some_and(|bio| !bio.text().collect::<String>().trim().is_empty())
    }

    fn is_verified(&self, root: ElementRef<'_>) -> bool {
        root.select(&self.verified_icon).next().is_some()
            || root.select(&self.verified_label).next().is_some()
    }
}

impl ProfileExtractor for HoverCardExtractor {
    type Card = HoverCard;

    fn resolve_username(&self, card: &HoverCard) -> Option<String> {
        let fragment = Html::parse_fragment(&card.html);
        self.username_in(fragment.root_element())
    }

    fn extract(&self, card: &HoverCard, now: DateTime<Utc>) -> Option<ProfileRecord> {
        let fragment = Html::parse_fragment(&card.html);
        let root = fragment.root_element();

        let Some(username) = self.username_in(root) else {
            debug!("Hover card without a profile link");
            return None;
        };

        let text = visible_text(root);
        let builder = ProfileRecord::builder(&username)?
            .followers(parse_count(&text, CountLabel::Followers))
            .following(parse_count(&text, CountLabel::Following))
            .join_date(parse_join_date(&text))
            .tweet_count(Count::Unknown)
            .avatar(root.select(&self.avatar).next().is_some())
            .bio(self.has_bio(root))
            .verified(self.is_verified(root));

        Some(builder.build(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    const FULL_CARD: &str = r#"
        <div data-testid="HoverCard">
            <a role="link" href="/Alice_Dev"><img src="https://pbs.example/profile_images/1/a.jpg"></a>
            <a role="link" href="/Alice_Dev"><span>Alice</span></a>
            <svg aria-label="Verified account"></svg>
            <div data-testid="UserDescription"><span>Building things.</span></div>
            <span>Joined March 2020</span>
            <a role="link" href="/Alice_Dev/following"><span>1,234</span> <span>Following</span></a>
            <a role="link" href="/Alice_Dev/followers"><span>5.6K</span> <span>Followers</span></a>
        </div>
    "#;

    #[test]
    fn test_extract_full_card() {
        let extractor = HoverCardExtractor::new().unwrap();
        let profile = extractor.extract(&HoverCard::new(FULL_CARD), now()).unwrap();

        assert_eq!(profile.username, "Alice_Dev");
        assert_eq!(profile.following, Count::Known(1_234));
        assert_eq!(profile.followers, Count::Known(5_600));
        assert_eq!(profile.join_date, NaiveDate::from_ymd_opt(2020, 3, 1));
        assert_eq!(profile.tweet_count, Count::Unknown);
        assert!(profile.has_avatar);
        assert!(profile.has_bio);
        assert!(profile.is_verified);
        assert_eq!(profile.scraped_at, now());
    }

    #[test]
    fn test_sparse_card_defaults() {
        let extractor = HoverCardExtractor::new().unwrap();
        let card = HoverCard::new(
            r#"<div data-testid="HoverCard">
                <a role="link" href="/newbie"><img src="/default_profile.png"></a>
                <div data-testid="UserDescription">   </div>
            </div>"#,
        );
        let profile = extractor.extract(&card, now()).unwrap();

        assert_eq!(profile.username, "newbie");
        assert_eq!(profile.followers, Count::Unknown);
        assert_eq!(profile.following, Count::Unknown);
        assert!(profile.join_date.is_none());
        assert!(!profile.has_avatar);
        assert!(!profile.has_bio);
        assert!(!profile.is_verified);
    }

    #[test]
    fn test_verified_icon_variant() {
        let extractor = HoverCardExtractor::new().unwrap();
        let card = HoverCard::new(
            r#"<div><a role="link" href="/v"></a><svg data-testid="icon-verified"></svg></div>"#,
        );
        assert!(extractor.extract(&card, now()).unwrap().is_verified);
    }

    #[test]
    fn test_card_without_link_is_a_miss() {
        let extractor = HoverCardExtractor::new().unwrap();
        let card = HoverCard::new(r#"<div data-testid="HoverCard"><span>10 Followers</span></div>"#);
        assert!(extractor.extract(&card, now()).is_none());
        assert!(extractor.resolve_username(&card).is_none());

        let external = HoverCard::new(r#"<div><a role="link" href="https://elsewhere/x">x</a></div>"#);
        assert!(extractor.extract(&external, now()).is_none());
    }

    #[test]
    fn test_resolve_username_only_reads_link() {
        let extractor = HoverCardExtractor::new().unwrap();
        let card = HoverCard::new(r#"<div><a role="link" href="/carol?ref=card">Carol</a></div>"#);
        assert_eq!(extractor.resolve_username(&card).as_deref(), Some("carol"));
    }
}
