//! Single-threaded page host
//!
//! Owns the current page snapshot and a [`Driver`], and runs the event
//! loop: page events arrive over a channel, and between events the host
//! sleeps until the driver's next deadline. Nothing is spawned, so the
//! whole pipeline runs on the caller's task.
//!
//! Driver time is wall-clock time at start plus elapsed time on the tokio
//! clock, so timers follow `tokio::time` (including paused test clocks).

use chrono::{DateTime, TimeDelta, Utc};
use scraper::Html;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

use susso_core::{PersistedStore, Rating, SussConfig};
use susso_scan::{BadgeBoard, HoverCardExtractor, Subtree, TimelineLocator};

use crate::{Driver, DriverStats};

/// Driver wired to the HTML collaborators
pub type PageDriver<S> = Driver<TimelineLocator, HoverCardExtractor, BadgeBoard, S>;

/// Something that happened to the page
#[derive(Debug, Clone)]
pub enum PageEvent {
    /// The page now looks like `document`; `added` is the markup that appeared
    Render { document: String, added: Vec<Subtree> },
}

/// Summary handed back when the event stream ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostReport {
    /// Badge color per username key
    pub ratings: BTreeMap<String, Rating>,
    pub badges: usize,
    pub stats: DriverStats,
}

pub struct PageHost<S: PersistedStore> {
    driver: PageDriver<S>,
    document: Html,
    started: Instant,
    started_at: DateTime<Utc>,
}

impl<S: PersistedStore> PageHost<S> {
    pub fn new(store: S, config: &SussConfig) -> anyhow::Result<Self> {
        let driver = Driver::new(
            TimelineLocator::new()?,
            HoverCardExtractor::new()?,
            BadgeBoard::new(),
            store,
            config,
        );

        Ok(Self {
            driver,
            document: Html::new_document(),
            started: Instant::now(),
            started_at: Utc::now(),
        })
    }

    fn now(&self) -> DateTime<Utc> {
        let elapsed = TimeDelta::from_std(self.started.elapsed()).unwrap_or(TimeDelta::MAX);
        self.started_at
            .checked_add_signed(elapsed)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn driver(&self) -> &PageDriver<S> {
        &self.driver
    }

    fn apply(&mut self, event: PageEvent) {
        match event {
            PageEvent::Render { document, added } => {
                debug!("Render: {} bytes, {} added subtrees", document.len(), added.len());
                self.document = Html::parse_document(&document);
                let now = self.now();
                self.driver.on_mutations(now, added);
            }
        }
    }

    /// Process events until the sender goes away and all timers have fired
    pub async fn run(&mut self, mut events: mpsc::Receiver<PageEvent>) -> HostReport {
        info!(session = %self.driver.session().id(), "Page host started");
        let now = self.now();
        self.driver.schedule_initial_scan(now);

        let mut open = true;
        loop {
            let deadline = self.driver.next_deadline();
            if !open && deadline.is_none() {
                break;
            }

            let wait = deadline.map(|at| (at - self.now()).to_std().unwrap_or(Duration::ZERO));

            tokio::select! {
                event = events.recv(), if open => match event {
                    Some(event) => self.apply(event),
                    None => {
                        debug!("Event stream closed, draining timers");
                        open = false;
                    }
                },
                _ = sleep_for(wait) => {
                    let now = self.now();
                    self.driver.tick(now, &self.document);
                }
            }
        }

        let report = self.report();
        info!(
            "Page host finished: {} badges, {} accounts rated",
            report.badges, report.stats.cards_rated
        );
        report
    }

    pub fn report(&self) -> HostReport {
        HostReport {
            ratings: self.driver.renderer().ratings(),
            badges: self.driver.renderer().len(),
            stats: self.driver.stats(),
        }
    }
}

async fn sleep_for(wait: Option<Duration>) {
    match wait {
        Some(wait) => tokio::time::sleep(wait).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use susso_core::MemoryStore;

    const MENTIONS: &str = r#"
        <article data-testid="tweet">
            <a role="link" href="/spam_bot"><span>@spam_bot</span></a>
        </article>
        <article data-testid="tweet">
            <a role="link" href="/old_friend"><span>@old_friend</span></a>
        </article>
    "#;

    const CARD: &str = r#"
        <div data-testid="HoverCard">
            <a role="link" href="/spam_bot"><img src="/default.png"></a>
            <span>9 Followers</span><span>7,200 Following</span>
        </div>
    "#;

    const LOADING_CARD: &str = r#"
        <div data-testid="HoverCard">
            <a role="link" href="/spam_bot"><img src="/default.png"></a>
        </div>
    "#;

    fn page(body: &[&str]) -> String {
        format!("<html><body>{}</body></html>", body.concat())
    }

    fn render(body: &[&str], added: &[&str]) -> PageEvent {
        PageEvent::Render {
            document: page(body),
            added: added.iter().map(|html| Subtree::new(*html)).collect(),
        }
    }

    fn fast_config() -> SussConfig {
        SussConfig::from_toml_str("debounce_ms = 5\ncard_grace_ms = 5\ninitial_scan_ms = 0").unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_rates_cards_and_badges() {
        let mut host = PageHost::new(MemoryStore::new(), &fast_config()).unwrap();
        let (tx, rx) = mpsc::channel(8);

        tx.send(render(&[MENTIONS, CARD], &[CARD])).await.unwrap();
        drop(tx);

        let report = host.run(rx).await;

        assert_eq!(report.badges, 2);
        assert_eq!(report.ratings.get("spam_bot"), Some(&Rating::Red));
        assert_eq!(report.ratings.get("old_friend"), Some(&Rating::Unknown));
        assert_eq!(report.stats.cards_rated, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_card_is_not_reextracted() {
        let mut host = PageHost::new(MemoryStore::new(), &fast_config()).unwrap();
        let (tx, rx) = mpsc::channel(8);

        let sender = async move {
            for _ in 0..2 {
                tx.send(render(&[MENTIONS, CARD], &[CARD])).await.unwrap();
                tokio::time::sleep(Duration::from_millis(40)).await;
            }
        };

        let (report, ()) = tokio::join!(host.run(rx), sender);

        assert_eq!(report.stats.cards_rated, 1);
        assert_eq!(report.stats.cards_skipped, 1);
        assert_eq!(report.badges, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_card_rated_as_rendered_after_grace() {
        let mut host = PageHost::new(MemoryStore::new(), &fast_config()).unwrap();
        let (tx, rx) = mpsc::channel(8);

        let sender = async move {
            tx.send(render(&[MENTIONS, LOADING_CARD], &[LOADING_CARD])).await.unwrap();
            // Counts render after the pass has queued the card, before it is read
            tokio::time::sleep(Duration::from_millis(7)).await;
            tx.send(render(&[MENTIONS, CARD], &[])).await.unwrap();
        };

        let (report, ()) = tokio::join!(host.run(rx), sender);

        assert_eq!(report.stats.cards_rated, 1);
        assert_eq!(report.ratings.get("spam_bot"), Some(&Rating::Red));
    }

    #[tokio::test(start_paused = true)]
    async fn test_card_closed_before_grace_is_not_rated() {
        let mut host = PageHost::new(MemoryStore::new(), &fast_config()).unwrap();
        let (tx, rx) = mpsc::channel(8);

        let sender = async move {
            tx.send(render(&[MENTIONS, CARD], &[CARD])).await.unwrap();
            tokio::time::sleep(Duration::from_millis(7)).await;
            tx.send(render(&[MENTIONS], &[])).await.unwrap();
        };

        let (report, ()) = tokio::join!(host.run(rx), sender);

        assert_eq!(report.stats.cards_rated, 0);
        assert_eq!(report.stats.card_misses, 1);
        assert_eq!(report.ratings.get("spam_bot"), Some(&Rating::Unknown));
        assert!(host.driver().cache().entries().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_badges_follow_latest_snapshot() {
        let mut host = PageHost::new(MemoryStore::new(), &fast_config()).unwrap();
        let (tx, rx) = mpsc::channel(8);

        let first = r#"<article data-testid="tweet"><a role="link" href="/x"><span>@x</span></a></article>"#;
        let fresh = r#"<article data-testid="tweet"><a role="link" href="/y"><span>@y</span></a></article>"#;

        let sender = async move {
            tx.send(render(&[first], &[first])).await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            tx.send(render(&[fresh, first], &[fresh])).await.unwrap();
        };

        let (report, ()) = tokio::join!(host.run(rx), sender);

        assert_eq!(report.badges, 2);
        assert_eq!(report.ratings.keys().collect::<Vec<_>>(), vec!["x", "y"]);
        assert_eq!(report.stats.badges_placed, 3);
        assert_eq!(report.stats.badges_removed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_stream_finishes() {
        let mut host = PageHost::new(MemoryStore::new(), &fast_config()).unwrap();
        let (tx, rx) = mpsc::channel::<PageEvent>(1);
        drop(tx);

        let report = host.run(rx).await;
        assert_eq!(report.badges, 0);
        assert_eq!(report.stats.passes, 1);
    }
}
