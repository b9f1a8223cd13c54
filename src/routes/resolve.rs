use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::{CatalogEntry, Seed},
    services::resolver,
};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    #[serde(default)]
    pub seeds: Vec<Seed>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub resolved: Vec<CatalogEntry>,
}

/// Resolve noisy seeds to their best catalog matches.
/// Seeds that fail to resolve are omitted from the response.
pub async fn resolve(
    State(state): State<AppState>,
    Json(request): Json<ResolveRequest>,
) -> AppResult<Json<ResolveResponse>> {
    if request.seeds.is_empty() {
        return Err(AppError::InvalidInput("seeds required".to_string()));
    }

    let resolved = resolver::resolve_seeds(
        &state.catalog,
        &request.seeds,
        request.language.as_deref(),
    )
    .await;

    Ok(Json(ResolveResponse {
        resolved: resolved.into_iter().filter_map(|r| r.entry).collect(),
    }))
}
