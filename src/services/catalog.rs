//! Catalog client: the pipeline's only gateway to external catalogs.
//!
//! Providers report faults as errors; this layer converts every fault into
//! an empty result set with a warning, so that a provider being down is
//! indistinguishable from a provider having no matches. Partial failure of
//! one provider never aborts the sibling query.

use crate::{
    config::Config,
    models::CatalogEntry,
    services::providers::{
        google_books::GoogleBooksProvider, open_library::OpenLibraryProvider, CatalogProvider,
        SearchOptions, DEFAULT_TIMEOUT,
    },
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Remove duplicate entries by dedup key, first occurrence wins.
/// Provider response order is preserved.
pub fn dedup_entries(entries: Vec<CatalogEntry>) -> Vec<CatalogEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| seen.insert(entry.dedup_key()))
        .collect()
}

/// Client over both bibliographic providers
#[derive(Clone)]
pub struct CatalogClient {
    google: Arc<dyn CatalogProvider>,
    open_library: Arc<dyn CatalogProvider>,
    search_timeout: Duration,
}

impl CatalogClient {
    pub fn new(google: Arc<dyn CatalogProvider>, open_library: Arc<dyn CatalogProvider>) -> Self {
        Self {
            google,
            open_library,
            search_timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_search_timeout(mut self, timeout: Duration) -> Self {
        self.search_timeout = timeout;
        self
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(GoogleBooksProvider::new(
                config.google_books_api_key.clone(),
                config.google_books_api_url.clone(),
            )),
            Arc::new(OpenLibraryProvider::new(
                config.open_library_api_url.clone(),
            )),
        )
        .with_search_timeout(Duration::from_millis(config.search_timeout_ms))
    }

    /// Base options for a catalog query, carrying the configured timeout.
    /// Pipeline stages start from these and override per-query fields.
    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            timeout: self.search_timeout,
            ..SearchOptions::default()
        }
    }

    /// Query Google Books, degrading any fault to an empty result set
    pub async fn search_google(&self, query: &str, options: &SearchOptions) -> Vec<CatalogEntry> {
        degrade(self.google.as_ref(), query, options).await
    }

    /// Query Open Library, degrading any fault to an empty result set
    pub async fn search_open_library(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Vec<CatalogEntry> {
        degrade(self.open_library.as_ref(), query, options).await
    }

    /// Query both providers concurrently and concatenate the results,
    /// Google first. No cross-provider dedup is applied here; callers
    /// dedup at pool-assembly time.
    pub async fn search_both(
        &self,
        query: &str,
        google_options: &SearchOptions,
        open_library_options: &SearchOptions,
    ) -> Vec<CatalogEntry> {
        let (mut google_results, open_library_results) = tokio::join!(
            self.search_google(query, google_options),
            self.search_open_library(query, open_library_options),
        );
        google_results.extend(open_library_results);
        google_results
    }
}

async fn degrade(
    provider: &dyn CatalogProvider,
    query: &str,
    options: &SearchOptions,
) -> Vec<CatalogEntry> {
    match provider.search(query, options).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(
                provider = provider.name(),
                query = %query,
                error = %e,
                "Catalog query failed, continuing with empty results"
            );
            Vec::new()
        }
    }
}
