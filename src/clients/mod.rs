/// Transport clients for the three upstream services
///
/// Each upstream is reached through a narrow capability trait so the
/// adapters and orchestrator never touch provider-specific wire shapes, and
/// tests can substitute scripted implementations.
use crate::{error::AppResult, models::MediaType};

pub mod gemini;
pub mod tastedive;
pub mod tmdb;

pub use gemini::GeminiClient;
pub use tastedive::TasteDiveClient;
pub use tmdb::TmdbClient;

/// A movie or TV entry as known to the catalog upstream
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CatalogTitle {
    pub id: i64,
    pub title: String,
    pub media_type: MediaType,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub vote_average: f64,
    pub year: Option<i32>,
}

/// Filtered catalog discovery parameters
#[derive(Debug, Clone)]
pub struct DiscoverParams {
    pub media_type: MediaType,
    pub genre_ids: Vec<i64>,
    pub year_from: Option<i32>,
    pub year_to: Option<i32>,
}

/// Catalog metadata client (TMDB-shaped)
#[async_trait::async_trait]
pub trait CatalogClient: Send + Sync {
    /// Search for titles by name, best match first
    async fn search(&self, query: &str, media_type: MediaType) -> AppResult<Vec<CatalogTitle>>;

    /// Fetch a single title by catalog ID
    async fn fetch_details(&self, id: i64, media_type: MediaType) -> AppResult<CatalogTitle>;

    /// Deterministic filtered discovery, most popular first
    async fn discover(&self, params: &DiscoverParams) -> AppResult<Vec<CatalogTitle>>;

    /// Streaming-provider IDs carrying the title in the home region
    async fn fetch_providers(&self, id: i64, media_type: MediaType) -> AppResult<Vec<i64>>;
}

/// One entry from the similarity upstream, normalized no further than field names
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarEntry {
    pub name: String,
    pub media_type: MediaType,
    pub description: Option<String>,
    pub video_ref: Option<String>,
    pub wiki_ref: Option<String>,
}

/// A similarity response: the provider's echo of how it interpreted each
/// queried seed (`info`), plus the similar content it found (`results`).
/// The echo is what title validation runs against — a wrong echo means the
/// provider silently substituted different content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimilarityResponse {
    pub info: Vec<SimilarEntry>,
    pub results: Vec<SimilarEntry>,
}

/// Similarity-graph client (TasteDive-shaped)
#[async_trait::async_trait]
pub trait SimilarityClient: Send + Sync {
    /// Run one similarity query; `query` is a pre-built `prefix:title` list
    /// describing the seeds, `result_type` filters what kind of content
    /// comes back
    async fn query(
        &self,
        query: &str,
        result_type: MediaType,
        limit: usize,
    ) -> AppResult<SimilarityResponse>;
}

/// Generative text client (Gemini-shaped)
///
/// Returns raw text; the adapter owns strict parsing and must reject
/// malformed output rather than guess.
#[async_trait::async_trait]
pub trait GenerativeClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> AppResult<String>;
}
