//! Collaborator interfaces used by the discovery driver

use chrono::{DateTime, Utc};
use susso_core::{ProfileRecord, Rating};
use thiserror::Error;

/// Errors building scan components
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Invalid selector `{selector}`: {reason}")]
    Selector { selector: &'static str, reason: String },

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Finds relevant elements in page markup.
///
/// Calls are side-effect free and return empty results rather than failing.
pub trait ElementLocator {
    /// A full page snapshot
    type Document;
    /// A subtree reported as newly added
    type Node;
    /// A username mention
    type Element;
    /// A detailed profile card, read as it currently is
    type Card;
    /// Enough to find a profile card again in a later snapshot
    type CardRef;

    /// Every username mention currently in the document
    fn username_elements(&self, document: &Self::Document) -> Vec<Self::Element>;

    /// Username a mention refers to, without any `@`
    fn element_username(&self, element: &Self::Element) -> Option<String>;

    /// Profile cards that are, or are contained in, `node`
    fn profile_cards(&self, node: &Self::Node) -> Vec<Self::CardRef>;

    /// The referenced card as it is rendered in `document` now, or `None`
    /// once it has gone
    fn resolve_card(&self, document: &Self::Document, card: &Self::CardRef) -> Option<Self::Card>;
}

/// Turns a profile card into a profile record
pub trait ProfileExtractor {
    type Card;

    /// Username the card belongs to, read from its profile link only
    fn resolve_username(&self, card: &Self::Card) -> Option<String>;

    /// Full record, or `None` when the card holds no resolvable profile
    fn extract(&self, card: &Self::Card, now: DateTime<Utc>) -> Option<ProfileRecord>;
}

/// Result of asking for a badge next to an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement<H> {
    /// A new marker was inserted
    Inserted(H),
    /// The element already had its marker
    Existing(H),
}

impl<H> Placement<H> {
    pub fn handle(&self) -> &H {
        match self {
            Placement::Inserted(h) | Placement::Existing(h) => h,
        }
    }

    pub fn into_handle(self) -> H {
        match self {
            Placement::Inserted(h) | Placement::Existing(h) => h,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Placement::Inserted(_))
    }
}

/// Displays rating markers next to username mentions
pub trait BadgeRenderer {
    type Element;
    type Handle;

    /// Insert a marker next to `element`, or return the one already there
    fn place(&mut self, element: &Self::Element, username: &str) -> Option<Placement<Self::Handle>>;

    /// Drop every marker not listed in `present`; returns how many went
    fn retain(&mut self, present: &[Self::Handle]) -> usize;

    /// Recolor every marker for `username`; no-op if there are none
    fn set_color(&mut self, username: &str, rating: Rating);
}
