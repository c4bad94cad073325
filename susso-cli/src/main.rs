//! SussOMeter CLI
//!
//! Host harness for the rating pipeline: replays saved page snapshots,
//! rates single profile cards and inspects the persisted cache.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use scraper::Html;
use tokio::sync::mpsc;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use susso_core::{assess, CacheEntry, JsonFileStore, ProfileCache, SussConfig};
use susso_runtime::{PageEvent, PageHost};
use susso_scan::{ElementLocator, HoverCard, HoverCardExtractor, ProfileExtractor, Subtree, TimelineLocator};

#[derive(Parser)]
#[command(name = "susso")]
#[command(author, version, about = "SussOMeter: heuristic trust badges for feed accounts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (TOML)
    #[arg(short, long, env = "SUSSO_CONFIG")]
    config: Option<PathBuf>,

    /// Cache file
    #[arg(long, env = "SUSSO_CACHE", default_value = ".susso-cache.json")]
    cache: PathBuf,

    /// Verbosity level (0-3)
    #[arg(short, long, default_value = "1")]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay page snapshots through the badge pipeline
    Replay {
        /// HTML snapshots, in render order
        #[arg(required = true)]
        snapshots: Vec<PathBuf>,

        /// Pause between snapshots in milliseconds
        #[arg(long, default_value = "200")]
        interval_ms: u64,
    },

    /// Rate a single profile card
    Rate {
        /// HTML containing a hover card
        card: PathBuf,

        /// Store the result in the cache
        #[arg(long)]
        save: bool,
    },

    /// Inspect the cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List every cached account
    List,
    /// Show one cached account
    Get { username: String },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    let config = match &cli.config {
        Some(path) => SussConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => SussConfig::default(),
    };

    match cli.command {
        Commands::Replay {
            snapshots,
            interval_ms,
        } => replay(&config, &cli.cache, &snapshots, interval_ms).await,
        Commands::Rate { card, save } => rate_card(&config, &cli.cache, &card, save),
        Commands::Cache { action } => inspect_cache(&config, &cli.cache, action),
    }
}

fn open_store(config: &SussConfig, path: &Path) -> Result<JsonFileStore> {
    let store = JsonFileStore::open(path)
        .with_context(|| format!("opening cache {}", path.display()))?
        .with_quota(config.store_quota_bytes);
    Ok(store)
}

async fn replay(config: &SussConfig, cache: &Path, snapshots: &[PathBuf], interval_ms: u64) -> Result<()> {
    let mut documents = Vec::with_capacity(snapshots.len());
    for path in snapshots {
        let html = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        documents.push(html);
    }

    let mut host = PageHost::new(open_store(config, cache)?, config)?;
    let (tx, rx) = mpsc::channel(documents.len().max(1));

    let feeder = async move {
        for document in documents {
            // Snapshots carry no diff, so the whole page counts as added markup
            let added = vec![Subtree::new(document.clone())];
            if tx.send(PageEvent::Render { document, added }).await.is_err() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(interval_ms)).await;
        }
    };

    let (report, ()) = tokio::join!(host.run(rx), feeder);

    println!("{:<24} {:<8} {}", "ACCOUNT", "RATING", "COLOR");
    for (username, rating) in &report.ratings {
        println!("{:<24} {:<8} {}", username, rating, rating.color());
    }
    println!(
        "\n{} badges, {} accounts rated, {} repeat cards skipped, {} misses",
        report.badges, report.stats.cards_rated, report.stats.cards_skipped, report.stats.card_misses
    );

    Ok(())
}

fn rate_card(config: &SussConfig, cache: &Path, path: &Path, save: bool) -> Result<()> {
    let html = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;

    let locator = TimelineLocator::new()?;
    let document = Html::parse_document(&html);
    let card = locator
        .profile_cards(&Subtree::new(html.clone()))
        .first()
        .and_then(|card_ref| locator.resolve_card(&document, card_ref))
        .unwrap_or_else(|| {
            debug!("No hover card marker, treating the whole file as the card");
            HoverCard::new(html)
        });

    let now = Utc::now();
    let extractor = HoverCardExtractor::new()?;
    let profile = extractor
        .extract(&card, now)
        .with_context(|| format!("no profile found in {}", path.display()))?;
    let assessment = assess(&profile, now);

    println!("{}", pretty_json(&profile)?);
    println!("rating:  {} ({})", assessment.rating, assessment.rating.color());
    println!("flags:   {:?}", assessment.flags);
    if assessment.verified_credit {
        println!("verified account: one flag forgiven");
    }

    if save {
        let mut cache = ProfileCache::with_config(open_store(config, cache)?, config);
        let outcome = cache.put(&CacheEntry::new(profile, assessment.rating));
        println!("cache:   {:?}", outcome);
    }

    Ok(())
}

fn inspect_cache(config: &SussConfig, path: &Path, action: CacheAction) -> Result<()> {
    let mut cache = ProfileCache::with_config(open_store(config, path)?, config);
    let now = Utc::now();

    match action {
        CacheAction::List => {
            let mut entries = cache.entries();
            entries.sort_by(|a, b| b.profile.scraped_at.cmp(&a.profile.scraped_at));
            for entry in entries {
                let age = now - entry.profile.scraped_at;
                let state = if age > cache.ttl() { "expired" } else { "fresh" };
                println!(
                    "{:<24} {:<8} {:<8} {}",
                    entry.profile.username,
                    entry.rating,
                    state,
                    entry.profile.scraped_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        CacheAction::Get { username } => match cache.get(&username, now) {
            Some(entry) => println!("{}", pretty_json(&entry)?),
            None => println!("{} is not cached", username),
        },
    }

    Ok(())
}

fn pretty_json<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
