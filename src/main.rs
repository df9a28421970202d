use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use marquee_api::{
    clients::{CatalogClient, GeminiClient, TasteDiveClient, TmdbClient},
    config::Config,
    db::{Cache, KeyValueStore, RateLimiter, RedisStore},
    routes,
    services::{
        providers::{
            CatalogFilterProvider, GenerativeProvider, RecommendationProvider, SimilarityProvider,
        },
        Enricher, Orchestrator, Recommender,
    },
};

const SIMILARITY_WINDOW_SECONDS: u64 = 3600;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let store: Arc<dyn KeyValueStore> = Arc::new(RedisStore::new(&config.redis_url)?);
    let (cache, cache_writer) = Cache::new(Arc::clone(&store));

    let tmdb: Arc<dyn CatalogClient> = Arc::new(TmdbClient::new(
        config.tmdb_api_key.clone(),
        config.tmdb_api_url.clone(),
    )?);

    let similarity: Arc<dyn RecommendationProvider> = Arc::new(SimilarityProvider::new(
        Arc::new(TasteDiveClient::new(
            config.tastedive_api_key.clone().unwrap_or_default(),
            config.tastedive_api_url.clone(),
        )?),
        cache,
        RateLimiter::new(
            Arc::clone(&store),
            "similarity",
            config.similarity_hourly_cap,
            SIMILARITY_WINDOW_SECONDS,
        ),
        config.tastedive_api_key.is_some(),
    ));

    let generative: Arc<dyn RecommendationProvider> = Arc::new(GenerativeProvider::new(
        Arc::new(GeminiClient::new(
            config.gemini_api_key.clone().unwrap_or_default(),
            config.gemini_api_url.clone(),
            config.gemini_model.clone(),
        )?),
        Arc::clone(&store),
        config.generative_cooldown_secs,
        config.gemini_api_key.is_some(),
    ));

    let catalog_filter: Arc<dyn RecommendationProvider> =
        Arc::new(CatalogFilterProvider::new(Arc::clone(&tmdb)));

    let recommender = Arc::new(Recommender::new(
        Orchestrator::new(similarity, generative, catalog_filter),
        Enricher::new(Arc::clone(&tmdb)),
        tmdb,
    ));

    let app = routes::create_router(recommender);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Flush pending cache writes before exiting
    cache_writer.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
