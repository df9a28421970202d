use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Catalog (TMDB) API key
    pub tmdb_api_key: String,

    /// Catalog API base URL
    #[serde(default = "default_tmdb_api_url")]
    pub tmdb_api_url: String,

    /// Similarity (TasteDive) API key; the similarity provider is skipped when unset
    #[serde(default)]
    pub tastedive_api_key: Option<String>,

    /// Similarity API base URL
    #[serde(default = "default_tastedive_api_url")]
    pub tastedive_api_url: String,

    /// Generative (Gemini) API key; the generative provider is skipped when unset
    #[serde(default)]
    pub gemini_api_key: Option<String>,

    /// Generative API base URL
    #[serde(default = "default_gemini_api_url")]
    pub gemini_api_url: String,

    /// Generative model name
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    /// Similarity provider call budget per hour window
    #[serde(default = "default_similarity_hourly_cap")]
    pub similarity_hourly_cap: u64,

    /// Cool-down window after the generative provider returns HTTP 429
    #[serde(default = "default_generative_cooldown_secs")]
    pub generative_cooldown_secs: u64,
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_tmdb_api_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_tastedive_api_url() -> String {
    "https://tastedive.com/api/similar".to_string()
}

fn default_gemini_api_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_similarity_hourly_cap() -> u64 {
    300
}

fn default_generative_cooldown_secs() -> u64 {
    300
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}
