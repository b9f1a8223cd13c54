//! Open Library search API provider
//!
//! One GET to /search.json per query. Open Library has no query operators
//! or language restriction, so the free-text query is passed through and
//! the ordering option is ignored.

use crate::{
    error::{AppError, AppResult},
    models::{CatalogEntry, OpenLibrarySearchResponse},
    services::catalog::dedup_entries,
    services::providers::{CatalogProvider, SearchOptions},
};
use reqwest::Client as HttpClient;

#[derive(Clone)]
pub struct OpenLibraryProvider {
    http_client: HttpClient,
    api_url: String,
}

impl OpenLibraryProvider {
    pub fn new(api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_url,
        }
    }
}

#[async_trait::async_trait]
impl CatalogProvider for OpenLibraryProvider {
    async fn search(&self, query: &str, options: &SearchOptions) -> AppResult<Vec<CatalogEntry>> {
        let url = format!("{}/search.json", self.api_url);

        let response = self
            .http_client
            .get(&url)
            .timeout(options.timeout)
            .query(&[("q", query), ("limit", &options.max_results.to_string())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::ExternalApi(format!(
                "Open Library returned status {}",
                response.status()
            )));
        }

        let body: OpenLibrarySearchResponse = response.json().await?;
        let entries: Vec<CatalogEntry> = body.docs.into_iter().map(CatalogEntry::from).collect();
        let entries = dedup_entries(entries);

        tracing::debug!(
            query = %query,
            results = entries.len(),
            provider = "open_library",
            "Catalog search completed"
        );

        Ok(entries)
    }

    fn name(&self) -> &'static str {
        "open_library"
    }
}
