//! SussOMeter Scan
//!
//! The page-facing collaborators of the rating pipeline:
//! - **Locator**: finds username mentions and profile cards in feed markup
//! - **Extractor**: turns a profile card into a [`susso_core::ProfileRecord`]
//! - **Badge**: keeps one marker per username mention and colors it
//!
//! The traits in [`traits`] are what the runtime driver depends on; the
//! HTML implementations here are built on `scraper`.

pub mod traits;
pub mod text;
pub mod locator;
pub mod extractor;
pub mod badge;

pub use traits::*;
pub use text::*;
pub use locator::*;
pub use extractor::*;
pub use badge::*;
