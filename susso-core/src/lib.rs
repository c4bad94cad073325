//! SussOMeter Core - Profile model and rating pipeline
//!
//! This crate provides the decision logic behind the feed badges:
//! - Profile records with explicit "unknown" fields
//! - Field parsing for counts and join dates
//! - Red-flag rating engine
//! - Time-bounded profile cache over a pluggable persisted store
//! - Session dedup set and configuration

pub mod profile;
pub mod parse;
pub mod rating;
pub mod store;
pub mod cache;
pub mod session;
pub mod config;

pub use profile::*;
pub use parse::*;
pub use rating::*;
pub use store::*;
pub use cache::*;
pub use session::*;
pub use config::*;

/// Cache entry lifetime in hours
pub const DEFAULT_CACHE_TTL_HOURS: i64 = 24;

/// Number of oldest entries dropped when a cache write is rejected
pub const DEFAULT_EVICTION_BATCH: usize = 10;

/// Namespace prefix for cache keys in the persisted store
pub const DEFAULT_KEY_PREFIX: &str = "susso:";

/// Burst window for coalescing markup-change notifications
pub const DEFAULT_DEBOUNCE_MS: i64 = 100;

/// Grace period before a profile card is read
pub const DEFAULT_CARD_GRACE_MS: i64 = 100;

/// Delay before the first username scan of a page
pub const DEFAULT_INITIAL_SCAN_MS: i64 = 500;
