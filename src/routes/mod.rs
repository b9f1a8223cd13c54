use axum::{
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod library;
pub mod lookup;
pub mod recommend;
pub mod resolve;
pub mod state;

pub use state::AppState;

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/lookup", get(lookup::lookup))
        .route("/resolve", post(resolve::resolve))
        .route("/recommend", post(recommend::recommend))
        .route("/library", get(library::list_library))
        .route("/library/toggle", post(library::toggle_library))
        .route("/library/favorite", post(library::set_favorite))
        .route("/library/bulk-delete", post(library::bulk_delete_library))
        .route("/recommended", get(library::list_recommended))
        .route("/recommended/toggle", post(library::toggle_recommended))
        .route("/recommended/:id", delete(library::remove_recommended))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
