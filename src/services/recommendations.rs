//! The end-to-end recommendation pipeline: resolve seeds, build the
//! candidate pool, ask the model, post-process.
//!
//! Only input validation is fatal, and it fails before any external call.
//! Provider and LLM faults degrade to smaller (possibly empty) result sets.

use crate::{
    error::{AppError, AppResult},
    models::{CatalogEntry, Recommendation, ResolvedSeed, Seed},
    services::{
        catalog::CatalogClient,
        llm::{format_candidate_list, format_seed_list, LlmRequest, RecommendationModel},
        pool::{build_pool, PoolConfig},
        post_process::post_process,
        resolver::resolve_seeds,
    },
};
use uuid::Uuid;

/// Result of one pipeline run
#[derive(Debug, serde::Serialize)]
pub struct RecommendationOutcome {
    /// Seeds that resolved to an authoritative catalog entry
    pub resolved: Vec<CatalogEntry>,
    pub recommendations: Vec<Recommendation>,
}

/// Run the full pipeline for the given seeds.
///
/// Rejects before any external call when no seed carries a usable title or
/// ISBN, or when `target_count` is zero. Empty pools and empty model output
/// are valid outcomes, not errors.
pub async fn generate_recommendations(
    catalog: &CatalogClient,
    model: &dyn RecommendationModel,
    seeds: Vec<Seed>,
    target_count: usize,
    language: &str,
) -> AppResult<RecommendationOutcome> {
    if seeds.is_empty() {
        return Err(AppError::InvalidInput(
            "At least one seed is required".to_string(),
        ));
    }
    if !seeds.iter().any(Seed::is_resolvable) {
        return Err(AppError::InvalidInput(
            "No seed carries a usable title or ISBN".to_string(),
        ));
    }
    if target_count == 0 {
        return Err(AppError::InvalidInput(
            "Target count must be at least 1".to_string(),
        ));
    }

    let run_id = Uuid::new_v4();
    tracing::info!(
        %run_id,
        seeds = seeds.len(),
        target_count,
        language,
        "Recommendation pipeline started"
    );

    let resolved: Vec<ResolvedSeed> = resolve_seeds(catalog, &seeds, Some(language)).await;
    let resolved_count = resolved.iter().filter(|r| r.entry.is_some()).count();

    let pool = build_pool(catalog, &resolved, Some(language), &PoolConfig::default()).await;

    let request = LlmRequest {
        seed_text: format_seed_list(&resolved),
        candidate_text: format_candidate_list(&pool),
        count: target_count,
        language: language.to_string(),
    };
    let raw = model.propose(&request).await?;

    let recommendations = post_process(raw, &pool, &resolved, target_count);

    tracing::info!(
        %run_id,
        resolved = resolved_count,
        pool_size = pool.len(),
        recommendations = recommendations.len(),
        "Recommendation pipeline completed"
    );

    Ok(RecommendationOutcome {
        resolved: resolved.into_iter().filter_map(|r| r.entry).collect(),
        recommendations,
    })
}
