//! Locates username mentions and profile cards in timeline markup

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use susso_core::username_key;
use tracing::trace;

use crate::{ElementLocator, HoverCard, ScanError};

/// Parse a static selector, reporting which one failed
pub(crate) fn compile(selector: &'static str) -> Result<Selector, ScanError> {
    Selector::parse(selector).map_err(|e| ScanError::Selector {
        selector,
        reason: format!("{:?}", e),
    })
}

/// Username from the first profile link under `root`
pub(crate) fn profile_link_username(root: ElementRef<'_>, link: &Selector) -> Option<String> {
    let href = root.select(link).next()?.value().attr("href")?;
    let name = href
        .strip_prefix('/')?
        .split(['/', '?', '#'])
        .next()
        .filter(|name| !name.is_empty())?;
    Some(name.to_string())
}

/// Markup reported as newly added to the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subtree {
    pub html: String,
}

impl Subtree {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }
}

/// An `@username` mention inside a post
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UsernameElement {
    /// Index of the post in the document
    pub post: usize,
    /// Index of the link inside the post
    pub link: usize,
    /// Mention text, e.g. `@alice`
    pub text: String,
}

/// A hover card seen in added markup.
///
/// Only one preview is open at a time, so the card is found again by the
/// account its profile link points at, or as the open card when it had no
/// link yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardRef {
    /// Username key from the card's profile link
    pub username: Option<String>,
}

/// Locator for timeline pages: posts are `article[data-testid="tweet"]`
/// and profile previews are `[data-testid="HoverCard"]`
#[derive(Debug, Clone)]
pub struct TimelineLocator {
    post: Selector,
    link: Selector,
    span: Selector,
    card: Selector,
    profile_href: Regex,
}

impl TimelineLocator {
    pub fn new() -> Result<Self, ScanError> {
        Ok(Self {
            post: compile(r#"article[data-testid="tweet"]"#)?,
            link: compile(r#"a[role="link"][href^="/"]"#)?,
            span: compile("span")?,
            card: compile(r#"[data-testid="HoverCard"]"#)?,
            profile_href: Regex::new(r"^/[^/]+$")?,
        })
    }

    /// Cards under `root` that are not nested in another card
    fn outer_cards<'a>(&'a self, root: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        root.select(&self.card).filter(move |card| {
            !card
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|parent| self.card.matches(&parent))
        })
    }

    fn card_username(&self, card: ElementRef<'_>) -> Option<String> {
        profile_link_username(card, &self.link).map(|name| username_key(&name))
    }
}

impl ElementLocator for TimelineLocator {
    type Document = Html;
    type Node = Subtree;
    type Element = UsernameElement;
    type Card = HoverCard;
    type CardRef = CardRef;

    fn username_elements(&self, document: &Html) -> Vec<UsernameElement> {
        let mut found = Vec::new();

        for (post_idx, post) in document.select(&self.post).enumerate() {
            for (link_idx, link) in post.select(&self.link).enumerate() {
                let href = link.value().attr("href").unwrap_or_default();
                if !self.profile_href.is_match(href) || href.contains("/status") {
                    continue;
                }

                let Some(span) = link.select(&self.span).next() else {
                    continue;
                };
                let text = span.text().collect::<String>().trim().to_string();
                if text.starts_with('@') {
                    found.push(UsernameElement {
                        post: post_idx,
                        link: link_idx,
                        text,
                    });
                }
            }
        }

        trace!("Located {} username mentions", found.len());
        found
    }

    fn element_username(&self, element: &UsernameElement) -> Option<String> {
        element
            .text
            .trim()
            .strip_prefix('@')
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }

    fn profile_cards(&self, node: &Subtree) -> Vec<CardRef> {
        let fragment = Html::parse_fragment(&node.html);
        let cards: Vec<CardRef> = self
            .outer_cards(fragment.root_element())
            .map(|card| CardRef {
                username: self.card_username(card),
            })
            .collect();
        cards
    }

    fn resolve_card(&self, document: &Html, card: &CardRef) -> Option<HoverCard> {
        let found = self
            .outer_cards(document.root_element())
            .find(|candidate| match &card.username {
                Some(wanted) => self.card_username(*candidate).as_ref() == Some(wanted),
                None => true,
            })
            .map(|found| HoverCard::new(found.html()));
        found
    }
}
