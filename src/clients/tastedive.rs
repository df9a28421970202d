/// TasteDive similarity client
///
/// Single-endpoint API: one GET with a `prefix:title` query list returns
/// thematically similar content, plus an `info` echo of how the provider
/// interpreted each queried seed. Result kinds outside movie/show are
/// dropped at this boundary.
use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::Deserialize;

use crate::{
    clients::{SimilarEntry, SimilarityClient, SimilarityResponse},
    error::{AppError, AppResult},
    models::MediaType,
};

const REQUEST_TIMEOUT_SECS: u64 = 15;

/// TasteDive's type vocabulary for TV content is "show", not "tv"
pub fn tastedive_kind(media_type: MediaType) -> &'static str {
    match media_type {
        MediaType::Movie => "movie",
        MediaType::Tv => "show",
    }
}

pub struct TasteDiveClient {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

impl TasteDiveClient {
    pub fn new(api_key: String, api_url: String) -> AppResult<Self> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key,
            api_url,
        })
    }
}

#[async_trait::async_trait]
impl SimilarityClient for TasteDiveClient {
    async fn query(
        &self,
        query: &str,
        result_type: MediaType,
        limit: usize,
    ) -> AppResult<SimilarityResponse> {
        let response = self
            .http_client
            .get(&self.api_url)
            .query(&[
                ("q", query),
                ("type", tastedive_kind(result_type)),
                ("limit", &limit.to_string()),
                ("info", "1"),
                ("k", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AppError::RateLimited(
                "TasteDive rate limit exceeded".to_string(),
            ));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Transport(format!(
                "TasteDive API returned status {}: {}",
                status, body
            )));
        }

        let parsed: TasteDiveResponse = response.json().await.map_err(|e| {
            AppError::Transport(format!("Failed to parse TasteDive response: {}", e))
        })?;

        let normalized = SimilarityResponse {
            info: parsed
                .similar
                .info
                .into_iter()
                .filter_map(TasteDiveResult::into_similar_entry)
                .collect(),
            results: parsed
                .similar
                .results
                .into_iter()
                .filter_map(TasteDiveResult::into_similar_entry)
                .collect(),
        };

        tracing::debug!(
            query = %query,
            result_type = tastedive_kind(result_type),
            results = normalized.results.len(),
            "Similarity query completed"
        );

        Ok(normalized)
    }
}

// ============================================================================
// TasteDive API response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct TasteDiveResponse {
    #[serde(default)]
    similar: TasteDiveSimilar,
}

#[derive(Debug, Deserialize, Default)]
struct TasteDiveSimilar {
    #[serde(default)]
    info: Vec<TasteDiveResult>,
    #[serde(default)]
    results: Vec<TasteDiveResult>,
}

#[derive(Debug, Deserialize)]
struct TasteDiveResult {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, rename = "wTeaser")]
    teaser: Option<String>,
    #[serde(default, rename = "yUrl")]
    video_url: Option<String>,
    #[serde(default, rename = "wUrl")]
    wiki_url: Option<String>,
}

impl TasteDiveResult {
    fn into_similar_entry(self) -> Option<SimilarEntry> {
        let media_type = match self.kind.as_str() {
            "movie" => MediaType::Movie,
            "show" => MediaType::Tv,
            _ => return None,
        };

        Some(SimilarEntry {
            name: self.name,
            media_type,
            description: self.teaser,
            video_ref: self.video_url,
            wiki_ref: self.wiki_url,
        })
    }
}
