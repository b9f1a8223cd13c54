use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    db::StoredBook,
    error::{AppError, AppResult},
    services::{catalog::dedup_entries, providers::SearchOptions},
};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    #[serde(default)]
    isbn: String,
}

#[derive(Debug, Serialize)]
pub struct LookupResponse {
    pub matches: Vec<StoredBook>,
    pub saved: u64,
}

/// Barcode-scan path: look up an ISBN against Google Books with an Open
/// Library fallback, persist the matches, and add them to the library.
pub async fn lookup(
    State(state): State<AppState>,
    Query(params): Query<LookupQuery>,
) -> AppResult<Json<LookupResponse>> {
    let isbn = params.isbn.trim();
    if isbn.is_empty() {
        return Err(AppError::InvalidInput("isbn is required".to_string()));
    }

    let options = SearchOptions {
        max_results: 5,
        ..state.catalog.search_options()
    };
    let query = format!("isbn:{}", isbn);

    let mut matches = state.catalog.search_google(&query, &options).await;
    if matches.is_empty() {
        matches = state.catalog.search_open_library(isbn, &options).await;
    }
    let matches = dedup_entries(matches);

    // Zero matches is still a well-formed response
    if matches.is_empty() {
        return Ok(Json(LookupResponse {
            matches: vec![],
            saved: 0,
        }));
    }

    let stored = state.store.upsert_entries(&matches).await?;
    let ids: Vec<i64> = stored.iter().map(|book| book.id).collect();
    let saved = state.store.add_to_library(&ids).await?;

    tracing::info!(isbn = %isbn, matches = stored.len(), saved, "ISBN lookup completed");

    Ok(Json(LookupResponse {
        matches: stored,
        saved,
    }))
}
