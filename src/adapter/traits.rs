//! Site adapter trait and classification types
//!
//! A site adapter isolates everything retailer-specific: how an identifier becomes a URL and how a
//! fetched product page becomes a title, a price and a stock state. The fetcher and batch runner
//! only ever talk to this trait.

use crate::runner::FetchFailure;
use crate::source::ItemRecord;
use crate::state::{FetchOutcome, StockState};
use scraper::Html;
use url::Url;

/// What a fetched product page says about the item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// A product page; fields whose selectors matched nothing are `None`
    Product {
        title: Option<String>,
        price: Option<String>,
        stock: StockState,
    },

    /// The page positively states the item does not exist or is unavailable
    NotFound,
}

impl From<Classification> for FetchOutcome {
    fn from(classification: Classification) -> Self {
        match classification {
            Classification::Product {
                title,
                price,
                stock,
            } => FetchOutcome::Success {
                title,
                price,
                stock,
            },
            Classification::NotFound => FetchOutcome::NotFound,
        }
    }
}

/// Trait for per-retailer adapters
///
/// Implementations must be deterministic: `build_target` is a pure function of the item and
/// `classify` a pure function of the document.
pub trait SiteAdapter: Send + Sync {
    /// Retailer name used in log lines and output
    fn name(&self) -> &str;

    /// Derives the URL to fetch for an item
    ///
    /// Returns `None` when no target can be derived; the item is then recorded as a missing
    /// target and never fetched.
    fn build_target(&self, item: &ItemRecord) -> Option<Url>;

    /// Classifies a fetched product page
    ///
    /// Not-found markers are checked before any field is extracted. Extraction never fails: a
    /// selector that matches nothing yields `None` for that field.
    fn classify(&self, document: &Html) -> Classification;

    /// Decides whether a failed attempt should be retried
    ///
    /// Returning `false` ends the retry loop immediately for that identifier.
    fn should_retry(&self, _failure: &FetchFailure) -> bool {
        true
    }
}
