//! Discovery and dedup driver
//!
//! Two triggers feed the driver:
//! - a debounced pass over the whole document that places badges on
//!   username mentions and colors new ones from the cache
//! - a delayed check on each profile card found in added markup, which
//!   extracts, rates and caches the account once per session
//!
//! Within a pass every badge is placed before any cache lookup runs. A
//! delayed check looks the card up again in the document current at the
//! time it fires; a card that has closed by then is a miss.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::mem;
use tracing::{debug, info};

use susso_core::{
    assess, username_key, CacheEntry, PersistedStore, ProfileCache, Rating, SessionSet,
    SussConfig,
};
use susso_scan::{BadgeRenderer, ElementLocator, ProfileExtractor};

use crate::{Debouncer, DelayQueue};

/// What happened to one profile card check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardOutcome {
    /// Extracted, rated and pushed to the badges
    Rated {
        username: String,
        rating: Rating,
        /// Whether the cache accepted the row
        cached: bool,
    },
    /// Already rated this session; extraction skipped
    AlreadyRated { username: String },
    /// The card held no resolvable profile
    Miss,
}

/// Result of one username scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Mentions located in the document
    pub located: usize,
    /// Badges newly inserted
    pub placed: usize,
    /// Badges dropped because their mention left the page
    pub removed: usize,
    /// New badges colored from the cache
    pub refreshed: usize,
}

/// Work done by one call to [`Driver::tick`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub scan: Option<ScanSummary>,
    /// Profile cards queued for a delayed check by this tick's pass
    pub cards_queued: usize,
    pub cards: Vec<CardOutcome>,
}

/// Running totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverStats {
    pub passes: u64,
    pub badges_placed: u64,
    pub badges_removed: u64,
    pub cache_refreshes: u64,
    pub cards_rated: u64,
    pub cards_skipped: u64,
    pub card_misses: u64,
    pub cache_drops: u64,
}

/// Sequences locator, extractor, rating, cache and badges for one page
pub struct Driver<L, X, R, S>
where
    L: ElementLocator,
{
    locator: L,
    extractor: X,
    renderer: R,
    cache: ProfileCache<S>,
    session: SessionSet,
    debounce: Debouncer,
    added: Vec<L::Node>,
    card_checks: DelayQueue<L::CardRef>,
    card_grace: Duration,
    initial_scan: Duration,
    stats: DriverStats,
}

impl<L, X, R, S> Driver<L, X, R, S>
where
    L: ElementLocator,
    X: ProfileExtractor<Card = L::Card>,
    R: BadgeRenderer<Element = L::Element>,
    S: PersistedStore,
{
    pub fn new(locator: L, extractor: X, renderer: R, store: S, config: &SussConfig) -> Self {
        Self {
            locator,
            extractor,
            renderer,
            cache: ProfileCache::with_config(store, config),
            session: SessionSet::new(),
            debounce: Debouncer::new(config.debounce()),
            added: Vec::new(),
            card_checks: DelayQueue::new(),
            card_grace: config.card_grace(),
            initial_scan: config.initial_scan(),
            stats: DriverStats::default(),
        }
    }

    /// Record a batch of added markup; the pass runs once the burst settles
    pub fn on_mutations<I>(&mut self, now: DateTime<Utc>, added: I)
    where
        I: IntoIterator<Item = L::Node>,
    {
        self.added.extend(added);
        self.debounce.poke(now);
    }

    /// Ask for a first pass shortly after page load
    pub fn schedule_initial_scan(&mut self, now: DateTime<Utc>) {
        self.debounce.arm_at(now + self.initial_scan);
    }

    /// When [`Driver::tick`] next has work to do
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        match (self.debounce.deadline(), self.card_checks.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Run whatever is due at `now` against the current document
    pub fn tick(&mut self, now: DateTime<Utc>, document: &L::Document) -> TickReport {
        let mut report = TickReport::default();

        for card_ref in self.card_checks.drain_due(now) {
            let outcome = match self.locator.resolve_card(document, &card_ref) {
                Some(card) => self.handle_card(now, &card),
                None => {
                    debug!("Profile card closed before it was read");
                    self.stats.card_misses += 1;
                    CardOutcome::Miss
                }
            };
            report.cards.push(outcome);
        }

        if self.debounce.fire(now) {
            report.scan = Some(self.scan_usernames(now, document));
            report.cards_queued = self.queue_cards(now);
            self.stats.passes += 1;
        }

        report
    }

    fn queue_cards(&mut self, now: DateTime<Utc>) -> usize {
        let due = now + self.card_grace;
        let mut queued = 0;
        for node in mem::take(&mut self.added) {
            for card in self.locator.profile_cards(&node) {
                self.card_checks.schedule(due, card);
                queued += 1;
            }
        }
        if queued > 0 {
            debug!("Queued {} profile card checks", queued);
        }
        queued
    }

    /// Badge every username mention, drop badges whose mention is gone,
    /// then color new badges from the cache
    pub fn scan_usernames(&mut self, now: DateTime<Utc>, document: &L::Document) -> ScanSummary {
        let elements = self.locator.username_elements(document);
        let mut summary = ScanSummary {
            located: elements.len(),
            ..ScanSummary::default()
        };

        let mut fresh = Vec::new();
        let mut present = Vec::with_capacity(elements.len());
        for element in &elements {
            let Some(username) = self.locator.element_username(element) else {
                continue;
            };
            let Some(placement) = self.renderer.place(element, &username) else {
                continue;
            };
            if placement.is_new() {
                summary.placed += 1;
                fresh.push(username);
            }
            present.push(placement.into_handle());
        }
        summary.removed = self.renderer.retain(&present);

        let mut looked_up = HashSet::new();
        for username in fresh {
            if !looked_up.insert(username_key(&username)) {
                continue;
            }
            if let Some(entry) = self.cache.get(&username, now) {
                self.renderer.set_color(&username, entry.rating);
                summary.refreshed += 1;
            }
        }

        self.stats.badges_placed += summary.placed as u64;
        self.stats.badges_removed += summary.removed as u64;
        self.stats.cache_refreshes += summary.refreshed as u64;
        debug!(
            "Username scan: {} located, {} placed, {} removed, {} refreshed",
            summary.located, summary.placed, summary.removed, summary.refreshed
        );
        summary
    }

    /// Extract, rate and cache the account behind a profile card
    pub fn handle_card(&mut self, now: DateTime<Utc>, card: &L::Card) -> CardOutcome {
        let Some(username) = self.extractor.resolve_username(card) else {
            self.stats.card_misses += 1;
            return CardOutcome::Miss;
        };

        if self.session.contains(&username) {
            self.stats.cards_skipped += 1;
            return CardOutcome::AlreadyRated { username };
        }

        let Some(profile) = self.extractor.extract(card, now) else {
            debug!("Extraction failed for {}", username);
            self.stats.card_misses += 1;
            return CardOutcome::Miss;
        };

        self.session.insert(&profile.username);

        let assessment = assess(&profile, now);
        let entry = CacheEntry::new(profile, assessment.rating);
        let cached = self.cache.put(&entry).is_stored();
        if !cached {
            self.stats.cache_drops += 1;
        }

        self.renderer.set_color(&entry.profile.username, assessment.rating);
        self.stats.cards_rated += 1;

        info!(
            session = %self.session.id(),
            "{}: {} (flags: {:?}, verified credit: {})",
            entry.profile.username, assessment.rating, assessment.flags, assessment.verified_credit
        );

        CardOutcome::Rated {
            username: entry.profile.username,
            rating: assessment.rating,
            cached,
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn cache(&self) -> &ProfileCache<S> {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut ProfileCache<S> {
        &mut self.cache
    }

    pub fn session(&self) -> &SessionSet {
        &self.session
    }

    pub fn stats(&self) -> DriverStats {
        self.stats
    }

    /// Profile card checks still waiting for their grace period
    pub fn pending_cards(&self) -> usize {
        self.card_checks.len()
    }
}
