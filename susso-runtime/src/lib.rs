//! SussOMeter Runtime
//!
//! Drives the rating pipeline from page change notifications:
//! - Coalesces bursts of markup changes into one discovery pass
//! - Places badges and refreshes them from the cache
//! - Reads profile cards after a short grace period, once per session
//! - Hosts the whole thing on a single-threaded event loop

pub mod schedule;
pub mod driver;
pub mod host;

pub use schedule::*;
pub use driver::*;
pub use host::*;
