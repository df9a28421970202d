/// TMDB catalog client
///
/// Covers the four catalog capabilities the recommendation core needs:
/// title search, detail lookup, filtered discovery, and streaming-provider
/// lookup. Watch-provider data is read for the US region only.
use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::Deserialize;

use crate::{
    clients::{CatalogClient, CatalogTitle, DiscoverParams},
    error::{AppError, AppResult},
    models::MediaType,
};

const REQUEST_TIMEOUT_SECS: u64 = 15;
const WATCH_REGION: &str = "US";

pub struct TmdbClient {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

impl TmdbClient {
    /// Creates a new TMDB client
    ///
    /// Returns an error if the API key is empty or the HTTP client cannot be
    /// built. Every request carries the client-level timeout, so a stalled
    /// upstream surfaces as a transport error instead of a hang.
    pub fn new(api_key: String, api_url: String) -> AppResult<Self> {
        if api_key.trim().is_empty() {
            return Err(AppError::Internal(
                "TMDB API key cannot be empty".to_string(),
            ));
        }

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

    async fn get_with_params<T>(&self, path: &str, params: &[(&str, String)]) -> AppResult<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url = format!("{}{}", self.api_url, path);

        let response = self
            .http_client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AppError::Internal(
                "TMDB API key is invalid or missing".to_string(),
            ));
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!(
                "TMDB resource not found: {}",
                path
            )));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AppError::RateLimited("TMDB rate limit exceeded".to_string()));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Transport(format!(
                "TMDB API {} returned status {}: {}",
                path, status, body
            )));
        }

        response.json::<T>().await.map_err(|e| {
            AppError::Transport(format!("Failed to parse TMDB response from {}: {}", path, e))
        })
    }
}

#[async_trait::async_trait]
impl CatalogClient for TmdbClient {
    async fn search(&self, query: &str, media_type: MediaType) -> AppResult<Vec<CatalogTitle>> {
        if query.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        tracing::debug!(query = %query, media_type = media_type.as_str(), "Searching TMDB");

        let path = format!("/search/{}", media_type.as_str());
        let params = [("query", query.to_string())];

        let response: SearchResponse = self.get_with_params(&path, &params).await?;
        Ok(response
            .results
            .into_iter()
            .map(|entry| entry.into_catalog_title(media_type))
            .collect())
    }

    async fn fetch_details(&self, id: i64, media_type: MediaType) -> AppResult<CatalogTitle> {
        tracing::debug!(id, media_type = media_type.as_str(), "Fetching TMDB details");

        let path = format!("/{}/{}", media_type.as_str(), id);
        let entry: TmdbEntry = self.get_with_params(&path, &[]).await?;
        Ok(entry.into_catalog_title(media_type))
    }

    async fn discover(&self, params: &DiscoverParams) -> AppResult<Vec<CatalogTitle>> {
        let path = format!("/discover/{}", params.media_type.as_str());

        let mut query = vec![("sort_by", "popularity.desc".to_string())];

        if !params.genre_ids.is_empty() {
            let genres = params
                .genre_ids
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(",");
            query.push(("with_genres", genres));
        }

        // Movies and shows filter on different date fields
        let (gte_field, lte_field) = match params.media_type {
            MediaType::Movie => ("primary_release_date.gte", "primary_release_date.lte"),
            MediaType::Tv => ("first_air_date.gte", "first_air_date.lte"),
        };
        if let Some(from) = params.year_from {
            query.push((gte_field, format!("{}-01-01", from)));
        }
        if let Some(to) = params.year_to {
            query.push((lte_field, format!("{}-12-31", to)));
        }

        tracing::debug!(
            media_type = params.media_type.as_str(),
            genres = ?params.genre_ids,
            "Running TMDB discover"
        );

        let response: SearchResponse = self.get_with_params(&path, &query).await?;
        Ok(response
            .results
            .into_iter()
            .map(|entry| entry.into_catalog_title(params.media_type))
            .collect())
    }

    async fn fetch_providers(&self, id: i64, media_type: MediaType) -> AppResult<Vec<i64>> {
        let path = format!("/{}/{}/watch/providers", media_type.as_str(), id);
        let response: WatchProvidersResponse = self.get_with_params(&path, &[]).await?;

        let Some(region) = response.results.get(WATCH_REGION) else {
            return Ok(Vec::new());
        };

        let mut provider_ids = Vec::new();
        for option in region
            .flatrate
            .iter()
            .chain(region.free.iter())
            .chain(region.ads.iter())
            .flatten()
        {
            if !provider_ids.contains(&option.provider_id) {
                provider_ids.push(option.provider_id);
            }
        }

        Ok(provider_ids)
    }
}

// ============================================================================
// TMDB API response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<TmdbEntry>,
}

/// A single movie or TV entry. TMDB uses `title`/`release_date` for movies
/// and `name`/`first_air_date` for shows; both shapes map here.
#[derive(Debug, Deserialize)]
struct TmdbEntry {
    id: i64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    overview: Option<String>,
    #[serde(default)]
    poster_path: Option<String>,
    #[serde(default)]
    backdrop_path: Option<String>,
    #[serde(default)]
    vote_average: f64,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    first_air_date: Option<String>,
}

impl TmdbEntry {
    fn into_catalog_title(self, media_type: MediaType) -> CatalogTitle {
        let year = self
            .release_date
            .as_deref()
            .or(self.first_air_date.as_deref())
            .and_then(parse_year);

        CatalogTitle {
            id: self.id,
            title: self.title.or(self.name).unwrap_or_default(),
            media_type,
            overview: self.overview,
            poster_path: self.poster_path,
            backdrop_path: self.backdrop_path,
            vote_average: self.vote_average,
            year,
        }
    }
}

fn parse_year(date: &str) -> Option<i32> {
    date.get(..4).and_then(|y| y.parse().ok())
}

#[derive(Debug, Deserialize)]
struct WatchProvidersResponse {
    #[serde(default)]
    results: HashMap<String, RegionProviders>,
}

#[derive(Debug, Deserialize)]
struct RegionProviders {
    #[serde(default)]
    flatrate: Option<Vec<ProviderOption>>,
    #[serde(default)]
    free: Option<Vec<ProviderOption>>,
    #[serde(default)]
    ads: Option<Vec<ProviderOption>>,
}

#[derive(Debug, Deserialize)]
struct ProviderOption {
    provider_id: i64,
}
