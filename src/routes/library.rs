use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    db::books::{LibraryBook, RecommendedBook},
    error::{AppError, AppResult},
};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub book_id: i64,
    /// Only meaningful for the recommended list
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FavoriteRequest {
    pub book_id: i64,
    pub favorite: bool,
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub book_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct BulkDeleteResponse {
    pub removed: u64,
}

#[derive(Debug, Serialize)]
pub struct MembershipResponse {
    pub member: bool,
}

pub async fn list_library(State(state): State<AppState>) -> AppResult<Json<Vec<LibraryBook>>> {
    Ok(Json(state.store.list_library().await?))
}

pub async fn toggle_library(
    State(state): State<AppState>,
    Json(request): Json<ToggleRequest>,
) -> AppResult<Json<MembershipResponse>> {
    ensure_book_exists(&state, request.book_id).await?;
    let member = state.store.toggle_library(request.book_id).await?;
    Ok(Json(MembershipResponse { member }))
}

pub async fn set_favorite(
    State(state): State<AppState>,
    Json(request): Json<FavoriteRequest>,
) -> AppResult<Json<MembershipResponse>> {
    let updated = state
        .store
        .set_favorite(request.book_id, request.favorite)
        .await?;
    if !updated {
        return Err(AppError::NotFound(format!(
            "book {} is not in the library",
            request.book_id
        )));
    }
    Ok(Json(MembershipResponse { member: true }))
}

pub async fn bulk_delete_library(
    State(state): State<AppState>,
    Json(request): Json<BulkDeleteRequest>,
) -> AppResult<Json<BulkDeleteResponse>> {
    if request.book_ids.is_empty() {
        return Err(AppError::InvalidInput("book_ids required".to_string()));
    }
    let removed = state.store.remove_from_library(&request.book_ids).await?;
    Ok(Json(BulkDeleteResponse { removed }))
}

pub async fn list_recommended(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<RecommendedBook>>> {
    Ok(Json(state.store.list_recommended().await?))
}

pub async fn toggle_recommended(
    State(state): State<AppState>,
    Json(request): Json<ToggleRequest>,
) -> AppResult<Json<MembershipResponse>> {
    ensure_book_exists(&state, request.book_id).await?;
    let member = state
        .store
        .toggle_recommended(request.book_id, request.reason.as_deref())
        .await?;
    Ok(Json(MembershipResponse { member }))
}

pub async fn remove_recommended(
    State(state): State<AppState>,
    Path(book_id): Path<i64>,
) -> AppResult<Json<MembershipResponse>> {
    let removed = state.store.remove_recommended(book_id).await?;
    if !removed {
        return Err(AppError::NotFound(format!(
            "book {} is not on the recommended list",
            book_id
        )));
    }
    Ok(Json(MembershipResponse { member: false }))
}

async fn ensure_book_exists(state: &AppState, book_id: i64) -> AppResult<()> {
    if !state.store.book_exists(book_id).await? {
        return Err(AppError::NotFound(format!("book {} not found", book_id)));
    }
    Ok(())
}
