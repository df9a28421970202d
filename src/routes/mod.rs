use std::sync::Arc;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::services::Recommender;

pub mod recommendations;

/// Creates the application router with all routes
pub fn create_router(recommender: Arc<Recommender>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes(recommender))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// API routes under /api/v1
fn api_routes(recommender: Arc<Recommender>) -> Router {
    Router::new()
        .route("/recommendations", post(recommendations::discover))
        .route("/blend", post(recommendations::blend))
        .route("/similar", get(recommendations::similar))
        .route(
            "/providers/:name/available",
            get(recommendations::provider_available),
        )
        .with_state(recommender)
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
