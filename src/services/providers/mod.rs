//! Bibliographic catalog provider abstraction
//!
//! Pluggable architecture for external catalog search sources (Google Books,
//! Open Library). Each provider normalizes its wire format into
//! [`CatalogEntry`] and dedups its own result set before returning.
//!
//! Providers surface faults as errors; the degrade-to-empty policy lives in
//! the [`CatalogClient`](super::catalog::CatalogClient) so that callers can
//! still distinguish "provider down" from "no results" at this seam.

use crate::{error::AppResult, models::CatalogEntry};
use std::time::Duration;

#[cfg(test)]
use mockall::automock;

pub mod google_books;
pub mod open_library;

/// Default per-request timeout for catalog queries
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(12_000);
/// Default result-count limit per query
pub const DEFAULT_MAX_RESULTS: u32 = 10;

/// Result ordering hint (honored by Google Books only)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderBy {
    Relevance,
    Newest,
}

impl OrderBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderBy::Relevance => "relevance",
            OrderBy::Newest => "newest",
        }
    }
}

/// Options for one catalog search
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub max_results: u32,
    /// Google Books only; ignored by Open Library
    pub order_by: Option<OrderBy>,
    /// Google Books only; ignored by Open Library
    pub lang_restrict: Option<String>,
    pub timeout: Duration,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            max_results: DEFAULT_MAX_RESULTS,
            order_by: None,
            lang_restrict: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Trait for bibliographic search providers
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Search the provider's catalog with a free-text or scoped query
    ///
    /// Returns normalized, deduplicated entries in the provider's response
    /// order. Non-2xx responses, malformed bodies and timeouts are errors.
    async fn search(&self, query: &str, options: &SearchOptions) -> AppResult<Vec<CatalogEntry>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
