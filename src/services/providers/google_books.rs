//! Google Books volumes API provider
//!
//! One GET to /volumes per search. Supports query operators such as
//! `intitle:"..."`, `inauthor:"..."` and `isbn:...`, plus ordering and
//! language restriction parameters. An API key is optional; keyless
//! requests are served but rate-limited more aggressively.

use crate::{
    error::{AppError, AppResult},
    models::{CatalogEntry, GoogleSearchResponse},
    services::catalog::dedup_entries,
    services::providers::{CatalogProvider, SearchOptions},
};
use reqwest::Client as HttpClient;

#[derive(Clone)]
pub struct GoogleBooksProvider {
    http_client: HttpClient,
    api_key: Option<String>,
    api_url: String,
}

impl GoogleBooksProvider {
    pub fn new(api_key: Option<String>, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
        }
    }
}

#[async_trait::async_trait]
impl CatalogProvider for GoogleBooksProvider {
    async fn search(&self, query: &str, options: &SearchOptions) -> AppResult<Vec<CatalogEntry>> {
        let url = format!("{}/volumes", self.api_url);

        let mut request = self
            .http_client
            .get(&url)
            .timeout(options.timeout)
            .query(&[
                ("q", query),
                ("maxResults", &options.max_results.to_string()),
            ]);
        if let Some(order) = options.order_by {
            request = request.query(&[("orderBy", order.as_str())]);
        }
        if let Some(lang) = &options.lang_restrict {
            request = request.query(&[("langRestrict", lang.as_str())]);
        }
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key.as_str())]);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(AppError::ExternalApi(format!(
                "Google Books returned status {}",
                response.status()
            )));
        }

        let body: GoogleSearchResponse = response.json().await?;
        let entries: Vec<CatalogEntry> = body.items.into_iter().map(CatalogEntry::from).collect();
        let entries = dedup_entries(entries);

        tracing::debug!(
            query = %query,
            results = entries.len(),
            provider = "google_books",
            "Catalog search completed"
        );

        Ok(entries)
    }

    fn name(&self) -> &'static str {
        "google_books"
    }
}
