use axum::{extract::State, Json};
use serde::Deserialize;

use crate::{
    error::AppResult,
    models::Seed,
    services::recommendations::{generate_recommendations, RecommendationOutcome},
};

use super::AppState;

fn default_count() -> usize {
    5
}

fn default_language() -> String {
    "en".to_string()
}

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    /// Bare titles, the simplest client input
    #[serde(default)]
    pub titles: Vec<String>,
    /// Structured seeds from a scan or extraction step
    #[serde(default)]
    pub seeds: Vec<Seed>,
    #[serde(default = "default_count")]
    pub n: usize,
    #[serde(default = "default_language")]
    pub language: String,
}

/// Run the full recommendation pipeline. Bare titles and structured seeds
/// may be mixed; titles are appended as title-only seeds.
pub async fn recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendRequest>,
) -> AppResult<Json<RecommendationOutcome>> {
    let mut seeds = request.seeds;
    seeds.extend(request.titles.into_iter().map(Seed::from_title));

    let outcome = generate_recommendations(
        &state.catalog,
        state.model.as_ref(),
        seeds,
        request.n,
        &request.language,
    )
    .await?;

    Ok(Json(outcome))
}
