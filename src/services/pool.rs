//! Candidate pool assembly: expand resolved seeds into the deduplicated
//! universe of catalog entries offered to the LLM.

use crate::{
    models::{CatalogEntry, ResolvedSeed},
    services::catalog::{dedup_entries, CatalogClient},
    services::providers::{OrderBy, SearchOptions},
};
use std::collections::HashSet;

/// Query substituted when no seed yields a usable query term, so the pool
/// is never spuriously empty
const FALLBACK_QUERY: &str = "programming";
/// Only the first seeds contribute query terms
const MAX_POOL_SEEDS: usize = 6;
/// Short queries are usually bare title heads; bias those toward recency
const NEWEST_QUERY_LEN: usize = 5;

/// Limits for one pool-building run
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_queries: usize,
    pub max_pool_size: usize,
    pub per_query_results: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            max_queries: 8,
            max_pool_size: 80,
            per_query_results: 8,
        }
    }
}

/// Title truncated at the first delimiter among `：:-` and whitespace, or
/// the first 12 characters when the first segment is empty or no delimiter
/// exists
pub fn title_head(title: &str) -> String {
    let head: String = title
        .chars()
        .take_while(|c| !matches!(c, '：' | ':' | '-') && !c.is_whitespace())
        .collect();
    if head.is_empty() {
        title.chars().take(12).collect()
    } else {
        head.chars().take(12).collect()
    }
}

/// Derive the deduplicated, ordered query-term set from the seeds:
/// exact-title, title-head, and author-scoped queries
pub fn derive_queries(seeds: &[ResolvedSeed]) -> Vec<String> {
    let mut queries = Vec::new();
    let mut seen = HashSet::new();
    let mut push = |query: String| {
        if !query.is_empty() && seen.insert(query.clone()) {
            queries.push(query);
        }
    };

    for seed in seeds.iter().take(MAX_POOL_SEEDS) {
        if let Some(title) = seed.title().filter(|t| !t.trim().is_empty()) {
            push(format!("intitle:\"{}\"", title));
            push(title_head(title));
        }
        if let Some(author) = seed.primary_author().filter(|a| !a.trim().is_empty()) {
            push(format!("inauthor:\"{}\"", author));
        }
    }

    if queries.is_empty() {
        queries.push(FALLBACK_QUERY.to_string());
    }
    queries
}

/// Build the candidate pool: run every derived query against both providers
/// concurrently, merge, dedup first-seen, and truncate.
pub async fn build_pool(
    catalog: &CatalogClient,
    seeds: &[ResolvedSeed],
    language: Option<&str>,
    config: &PoolConfig,
) -> Vec<CatalogEntry> {
    let queries = derive_queries(seeds);

    let mut tasks = Vec::new();
    for query in queries.into_iter().take(config.max_queries) {
        let catalog = catalog.clone();
        let lang = language.map(str::to_string);
        let per_query_results = config.per_query_results;
        tasks.push(tokio::spawn(async move {
            let order_by = if query.chars().count() < NEWEST_QUERY_LEN {
                OrderBy::Newest
            } else {
                OrderBy::Relevance
            };
            let google_options = SearchOptions {
                max_results: per_query_results,
                order_by: Some(order_by),
                lang_restrict: lang,
                ..catalog.search_options()
            };
            let open_library_options = SearchOptions {
                max_results: per_query_results,
                ..catalog.search_options()
            };
            catalog
                .search_both(&query, &google_options, &open_library_options)
                .await
        }));
    }

    let mut pool = Vec::new();
    for task in tasks {
        match task.await {
            Ok(batch) => pool.extend(batch),
            Err(e) => tracing::warn!(error = %e, "Pool query task failed"),
        }
    }

    let mut pool = dedup_entries(pool);
    pool.truncate(config.max_pool_size);

    tracing::debug!(pool_size = pool.len(), "Candidate pool assembled");
    pool
}
