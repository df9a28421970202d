use serde::{Deserialize, Serialize};

/// Type of content across all upstream providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
}

impl MediaType {
    /// The other media type, used for diversity sub-queries
    pub fn complement(self) -> Self {
        match self {
            MediaType::Movie => MediaType::Tv,
            MediaType::Tv => MediaType::Movie,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
        }
    }
}

/// A normalized recommendation candidate produced by any provider adapter,
/// before catalog enrichment. No code downstream of the adapter layer sees
/// provider-specific response shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderMatch {
    pub name: String,
    pub media_type: MediaType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub external_video_ref: Option<String>,
    #[serde(default)]
    pub wiki_ref: Option<String>,
}

/// A `ProviderMatch` joined with catalog metadata, returned to callers.
/// Never partially enriched: a failed streaming-provider lookup yields an
/// empty `provider_ids`, not a missing result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedResult {
    pub id: i64,
    pub title: String,
    pub media_type: MediaType,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub vote_average: f64,
    pub overview: Option<String>,
    pub year: Option<i32>,
    pub reason: String,
    pub provider_ids: Vec<i64>,
}

/// The orchestration use cases, each with its own provider chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UseCase {
    /// Single-title "more like this"
    Similar,
    /// 2-5 seed titles combined into one taste profile
    Blend,
    /// Free-text prompt
    Discover,
}

/// Optional narrowing applied to catalog-filter discovery
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscoverFilters {
    #[serde(default)]
    pub genre_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub year_from: Option<i32>,
    #[serde(default)]
    pub year_to: Option<i32>,
}

/// The normalized request handed to every adapter in a chain. Adapters read
/// the fields they understand and ignore the rest.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub prompt: Option<String>,
    pub seed_titles: Vec<String>,
    pub media_type: MediaType,
    pub limit: usize,
    pub filters: DiscoverFilters,
}

impl ProviderRequest {
    pub fn for_seeds(seed_titles: Vec<String>, media_type: MediaType, limit: usize) -> Self {
        Self {
            prompt: None,
            seed_titles,
            media_type,
            limit,
            filters: DiscoverFilters::default(),
        }
    }

    pub fn for_prompt(prompt: String, filters: DiscoverFilters, limit: usize) -> Self {
        Self {
            prompt: Some(prompt),
            seed_titles: Vec::new(),
            media_type: MediaType::Movie,
            limit,
            filters,
        }
    }
}

/// The contract returned to callers: enriched results plus provenance.
/// `is_fallback` is true whenever the winning provider was not the primary
/// link of its chain.
#[derive(Debug, Serialize)]
pub struct OrchestrationOutcome {
    pub results: Vec<EnrichedResult>,
    pub provider: String,
    pub is_fallback: bool,
}
