use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppResult,
    models::{DiscoverFilters, EnrichedResult, MediaType, OrchestrationOutcome},
    services::{recommender::DEFAULT_LIMIT, Recommender},
};

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

#[derive(Debug, Deserialize)]
pub struct DiscoverRequest {
    pub prompt: String,
    #[serde(default)]
    pub filters: DiscoverFilters,
    #[serde(default)]
    pub exclude_ids: Vec<i64>,
}

/// Handler for free-text discovery
pub async fn discover(
    State(recommender): State<Arc<Recommender>>,
    Json(request): Json<DiscoverRequest>,
) -> AppResult<Json<OrchestrationOutcome>> {
    let outcome = recommender
        .get_recommendations(&request.prompt, request.filters, &request.exclude_ids)
        .await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct BlendRequest {
    pub titles: Vec<String>,
    pub media_type: MediaType,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub exclude_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct BlendResponse {
    pub results: Vec<EnrichedResult>,
}

/// Handler for multi-seed blend recommendations
pub async fn blend(
    State(recommender): State<Arc<Recommender>>,
    Json(request): Json<BlendRequest>,
) -> AppResult<Json<BlendResponse>> {
    let results = recommender
        .get_blend_enriched(
            &request.titles,
            request.media_type,
            request.limit,
            &request.exclude_ids,
        )
        .await?;
    Ok(Json(BlendResponse { results }))
}

#[derive(Debug, Deserialize)]
pub struct SimilarQuery {
    pub id: i64,
    pub media_type: MediaType,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

/// Handler for single-title similarity
pub async fn similar(
    State(recommender): State<Arc<Recommender>>,
    Query(params): Query<SimilarQuery>,
) -> AppResult<Json<OrchestrationOutcome>> {
    let outcome = recommender
        .get_similar_enriched(params.id, params.media_type, params.limit)
        .await?;
    Ok(Json(outcome))
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub provider: String,
    pub available: bool,
}

/// Availability probe so the UI can hide affordances for providers that
/// cannot currently answer
pub async fn provider_available(
    State(recommender): State<Arc<Recommender>>,
    Path(name): Path<String>,
) -> Json<AvailabilityResponse> {
    let available = recommender.is_provider_available(&name).await;
    Json(AvailabilityResponse {
        provider: name,
        available,
    })
}
