//! Seed resolution: pick the best catalog match for a noisy seed.
//!
//! Query variants depend on what the seed carries. ISBN seeds get an
//! `isbn:`-scoped query on Google and the bare ISBN on Open Library; title
//! seeds get an exact title query (plus a title+author variant when an
//! author is known) on Google and a raw-title query on Open Library.
//! Variants run concurrently and the maximum-scoring result wins, arrival
//! order breaking ties.

use crate::{
    models::{CatalogEntry, ResolvedSeed, Seed},
    services::catalog::CatalogClient,
    services::matching::score_against_seed,
    services::providers::SearchOptions,
};

/// Seeds beyond this count are ignored per request
pub const MAX_SEEDS: usize = 10;

/// Resolve one seed to its best catalog match, if any.
///
/// Returns `None` both for seeds with no usable signal (no queries are
/// issued) and for seeds where every variant came back empty. Neither case
/// is an error.
pub async fn resolve_seed(
    catalog: &CatalogClient,
    seed: &Seed,
    language: Option<&str>,
) -> Option<CatalogEntry> {
    let results = fetch_variants(catalog, seed, language).await;

    let mut best: Option<(&CatalogEntry, f64)> = None;
    for entry in &results {
        let score = score_against_seed(entry, seed);
        // Strictly greater keeps the earliest result on ties
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((entry, score));
        }
    }

    best.map(|(entry, score)| {
        tracing::debug!(
            seed_title = seed.title.as_deref().unwrap_or(""),
            matched = %entry.title,
            score,
            candidates = results.len(),
            "Seed resolved"
        );
        entry.clone()
    })
}

/// Resolve up to [`MAX_SEEDS`] seeds, preserving input order.
pub async fn resolve_seeds(
    catalog: &CatalogClient,
    seeds: &[Seed],
    language: Option<&str>,
) -> Vec<ResolvedSeed> {
    let mut resolved = Vec::with_capacity(seeds.len().min(MAX_SEEDS));
    for seed in seeds.iter().take(MAX_SEEDS) {
        let entry = resolve_seed(catalog, seed, language).await;
        resolved.push(ResolvedSeed {
            seed: seed.clone(),
            entry,
        });
    }
    resolved
}

async fn fetch_variants(
    catalog: &CatalogClient,
    seed: &Seed,
    language: Option<&str>,
) -> Vec<CatalogEntry> {
    let google_options = SearchOptions {
        lang_restrict: language.map(str::to_string),
        ..catalog.search_options()
    };
    let open_library_options = catalog.search_options();

    if let Some(isbn) = seed.isbn.as_deref().filter(|s| !s.trim().is_empty()) {
        // ISBN variants; title queries are skipped even when a title is
        // also present. Open Library has no `isbn:` operator, so it gets
        // the bare ISBN as free text.
        let google_query = format!("isbn:{}", isbn);
        let (mut results, open_library_results) = tokio::join!(
            catalog.search_google(&google_query, &google_options),
            catalog.search_open_library(isbn, &open_library_options),
        );
        results.extend(open_library_results);
        return results;
    }

    let Some(title) = seed.title.as_deref().filter(|s| !s.trim().is_empty()) else {
        return Vec::new();
    };

    let title_query = format!("intitle:\"{}\"", title);
    let author_query = seed
        .primary_author()
        .map(|author| format!("intitle:\"{}\" inauthor:\"{}\"", title, author));

    let (mut results, author_results, open_library_results) = tokio::join!(
        catalog.search_google(&title_query, &google_options),
        async {
            match &author_query {
                Some(query) => catalog.search_google(query, &google_options).await,
                None => Vec::new(),
            }
        },
        catalog.search_open_library(title, &open_library_options),
    );
    results.extend(author_results);
    results.extend(open_library_results);
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CatalogSource, EntryMetadata};
    use crate::services::providers::MockCatalogProvider;
    use std::sync::Arc;
    use std::time::Duration;

    fn entry(title: &str, author: Option<&str>, isbn13: Option<&str>) -> CatalogEntry {
        CatalogEntry {
            title: title.to_string(),
            authors: author.map(|a| vec![a.to_string()]).unwrap_or_default(),
            isbn13: isbn13.map(str::to_string),
            language: None,
            published_year: None,
            description: None,
            cover_url: None,
            source: CatalogSource::Google,
            source_id: None,
            metadata: EntryMetadata::default(),
        }
    }

    fn empty_client() -> CatalogClient {
        let mut google = MockCatalogProvider::new();
        google.expect_search().returning(|_, _| Ok(vec![]));
        let mut open_library = MockCatalogProvider::new();
        open_library.expect_search().returning(|_, _| Ok(vec![]));
        CatalogClient::new(Arc::new(google), Arc::new(open_library))
    }

    #[tokio::test]
    async fn test_seed_without_signal_issues_no_queries() {
        let mut google = MockCatalogProvider::new();
        google.expect_search().never();
        let mut open_library = MockCatalogProvider::new();
        open_library.expect_search().never();
        let catalog = CatalogClient::new(Arc::new(google), Arc::new(open_library));

        let result = resolve_seed(&catalog, &Seed::default(), None).await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_seed_with_no_results_resolves_to_none() {
        let catalog = empty_client();
        let result = resolve_seed(&catalog, &Seed::from_title("Dune"), None).await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_isbn_seed_skips_title_queries() {
        let mut google = MockCatalogProvider::new();
        google
            .expect_search()
            .withf(|query, _| query == "isbn:9780132350884")
            .times(1)
            .returning(|_, _| {
                Ok(vec![entry(
                    "Clean Code",
                    Some("Robert C. Martin"),
                    Some("9780132350884"),
                )])
            });
        let mut open_library = MockCatalogProvider::new();
        open_library
            .expect_search()
            .withf(|query, _| query == "9780132350884")
            .times(1)
            .returning(|_, _| Ok(vec![]));
        let catalog = CatalogClient::new(Arc::new(google), Arc::new(open_library));

        let seed = Seed {
            title: Some("Clean Code".to_string()),
            isbn: Some("9780132350884".to_string()),
            ..Default::default()
        };
        let result = resolve_seed(&catalog, &seed, None).await;
        assert_eq!(result.unwrap().title, "Clean Code");
    }

    #[tokio::test]
    async fn test_client_timeout_reaches_providers() {
        let timeout = Duration::from_millis(2_000);
        let mut google = MockCatalogProvider::new();
        google
            .expect_search()
            .withf(move |_, options| options.timeout == timeout)
            .returning(|_, _| Ok(vec![]));
        let mut open_library = MockCatalogProvider::new();
        open_library
            .expect_search()
            .withf(move |_, options| options.timeout == timeout)
            .returning(|_, _| Ok(vec![]));
        let catalog = CatalogClient::new(Arc::new(google), Arc::new(open_library))
            .with_search_timeout(timeout);

        let result = resolve_seed(&catalog, &Seed::from_title("Dune"), None).await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_title_seed_queries_both_providers() {
        let mut google = MockCatalogProvider::new();
        google
            .expect_search()
            .withf(|query, _| query == "intitle:\"Dune\"")
            .times(1)
            .returning(|_, _| Ok(vec![]));
        google
            .expect_search()
            .withf(|query, _| query == "intitle:\"Dune\" inauthor:\"Frank Herbert\"")
            .times(1)
            .returning(|_, _| Ok(vec![entry("Dune", Some("Frank Herbert"), None)]));
        let mut open_library = MockCatalogProvider::new();
        open_library
            .expect_search()
            .withf(|query, _| query == "Dune")
            .times(1)
            .returning(|_, _| Ok(vec![]));
        let catalog = CatalogClient::new(Arc::new(google), Arc::new(open_library));

        let seed = Seed {
            title: Some("Dune".to_string()),
            authors: vec!["Frank Herbert".to_string()],
            ..Default::default()
        };
        let result = resolve_seed(&catalog, &seed, None).await;
        assert_eq!(result.unwrap().title, "Dune");
    }

    #[tokio::test]
    async fn test_best_scoring_entry_wins() {
        let mut google = MockCatalogProvider::new();
        google.expect_search().returning(|_, _| {
            Ok(vec![
                entry("Clean Architecture", Some("Robert C. Martin"), None),
                entry("Clean Code", Some("Robert C. Martin"), None),
            ])
        });
        let mut open_library = MockCatalogProvider::new();
        open_library.expect_search().returning(|_, _| Ok(vec![]));
        let catalog = CatalogClient::new(Arc::new(google), Arc::new(open_library));

        let seed = Seed {
            title: Some("Clean Code".to_string()),
            authors: vec!["Robert C. Martin".to_string()],
            ..Default::default()
        };
        let result = resolve_seed(&catalog, &seed, None).await.unwrap();
        assert_eq!(result.title, "Clean Code");
    }

    #[tokio::test]
    async fn test_tie_breaks_to_first_arrival() {
        let mut google = MockCatalogProvider::new();
        google.expect_search().returning(|_, _| {
            Ok(vec![
                entry("Dune", None, Some("1111111111111")),
                entry("Dune", None, Some("2222222222222")),
            ])
        });
        let mut open_library = MockCatalogProvider::new();
        open_library.expect_search().returning(|_, _| Ok(vec![]));
        let catalog = CatalogClient::new(Arc::new(google), Arc::new(open_library));

        let result = resolve_seed(&catalog, &Seed::from_title("Dune"), None)
            .await
            .unwrap();
        assert_eq!(result.isbn13, Some("1111111111111".to_string()));
    }

    #[tokio::test]
    async fn test_resolve_seeds_caps_input_and_keeps_order() {
        let catalog = empty_client();
        let seeds: Vec<Seed> = (0..12).map(|i| Seed::from_title(format!("Book {}", i))).collect();
        let resolved = resolve_seeds(&catalog, &seeds, None).await;
        assert_eq!(resolved.len(), MAX_SEEDS);
        assert_eq!(resolved[0].seed.title.as_deref(), Some("Book 0"));
        assert!(resolved.iter().all(|r| r.entry.is_none()));
    }
}
