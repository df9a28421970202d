/// Core-facing recommendation service
///
/// The contract consumed by the route layer: validates input, resolves
/// seeds so they can be excluded from their own recommendations, walks the
/// right provider chain, and enriches the winner's matches.
use std::collections::HashSet;
use std::sync::Arc;

use crate::{
    clients::CatalogClient,
    error::{AppError, AppResult},
    models::{
        DiscoverFilters, EnrichedResult, MediaType, OrchestrationOutcome, ProviderRequest, UseCase,
    },
    services::{enrich::Enricher, matching, orchestrator::Orchestrator},
};

pub const DEFAULT_LIMIT: usize = 10;
const MIN_BLEND_SEEDS: usize = 2;
const MAX_BLEND_SEEDS: usize = 5;

pub struct Recommender {
    orchestrator: Orchestrator,
    enricher: Enricher,
    catalog: Arc<dyn CatalogClient>,
}

impl Recommender {
    pub fn new(orchestrator: Orchestrator, enricher: Enricher, catalog: Arc<dyn CatalogClient>) -> Self {
        Self {
            orchestrator,
            enricher,
            catalog,
        }
    }

    /// Free-text discovery: generative first, then similarity via title
    /// mentions, then the catalog filter terminal
    pub async fn get_recommendations(
        &self,
        prompt: &str,
        filters: DiscoverFilters,
        exclude_ids: &[i64],
    ) -> AppResult<OrchestrationOutcome> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(AppError::InvalidInput(
                "discover prompt must not be empty".to_string(),
            ));
        }

        let request = ProviderRequest::for_prompt(prompt.to_string(), filters, DEFAULT_LIMIT);
        let outcome = self.orchestrator.run(UseCase::Discover, &request).await?;

        tracing::info!(
            provider = outcome.provider,
            is_fallback = outcome.is_fallback,
            "Discover request resolved"
        );

        let results = self
            .enricher
            .enrich(outcome.matches, exclude_ids, &[], DEFAULT_LIMIT)
            .await;

        Ok(OrchestrationOutcome {
            results,
            provider: outcome.provider.to_string(),
            is_fallback: outcome.is_fallback,
        })
    }

    /// Blends 2-5 seed titles into one recommendation list. The seeds'
    /// resolved catalog IDs join the exclusion set so no seed can recommend
    /// itself.
    pub async fn get_blend_enriched(
        &self,
        titles: &[String],
        media_type: MediaType,
        limit: usize,
        exclude_ids: &[i64],
    ) -> AppResult<Vec<EnrichedResult>> {
        validate_blend_seeds(titles)?;
        let limit = limit.max(1);

        let mut exclude = exclude_ids.to_vec();
        for title in titles {
            match self.catalog.search(title, media_type).await {
                Ok(hits) => {
                    if let Some(hit) = hits.first() {
                        exclude.push(hit.id);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        title = %title,
                        error = %e,
                        "Seed resolution failed; seed will not be excluded by ID"
                    );
                }
            }
        }

        let request = ProviderRequest::for_seeds(titles.to_vec(), media_type, limit);
        let outcome = self.orchestrator.run(UseCase::Blend, &request).await?;

        tracing::info!(
            provider = outcome.provider,
            is_fallback = outcome.is_fallback,
            seeds = titles.len(),
            "Blend request resolved"
        );

        Ok(self
            .enricher
            .enrich(outcome.matches, &exclude, titles, limit)
            .await)
    }

    /// Single-seed "more like this", addressed by catalog ID. The catalog
    /// filter terminal makes this use case unable to exhaust its chain.
    pub async fn get_similar_enriched(
        &self,
        id: i64,
        media_type: MediaType,
        limit: usize,
    ) -> AppResult<OrchestrationOutcome> {
        let limit = limit.max(1);
        let seed = self.catalog.fetch_details(id, media_type).await?;

        let request = ProviderRequest::for_seeds(vec![seed.title.clone()], media_type, limit);
        let outcome = self.orchestrator.run(UseCase::Similar, &request).await?;

        tracing::info!(
            provider = outcome.provider,
            is_fallback = outcome.is_fallback,
            seed = %seed.title,
            "Similar request resolved"
        );

        let results = self
            .enricher
            .enrich(outcome.matches, &[id], &[seed.title], limit)
            .await;

        Ok(OrchestrationOutcome {
            results,
            provider: outcome.provider.to_string(),
            is_fallback: outcome.is_fallback,
        })
    }

    /// Exposed so the UI can preemptively hide affordances for providers
    /// that cannot currently answer
    pub async fn is_provider_available(&self, name: &str) -> bool {
        self.orchestrator.is_provider_available(name).await
    }
}

fn validate_blend_seeds(titles: &[String]) -> AppResult<()> {
    if titles.len() < MIN_BLEND_SEEDS || titles.len() > MAX_BLEND_SEEDS {
        return Err(AppError::InvalidInput(format!(
            "blend requires {} to {} seed titles, got {}",
            MIN_BLEND_SEEDS,
            MAX_BLEND_SEEDS,
            titles.len()
        )));
    }

    let mut distinct = HashSet::new();
    for title in titles {
        let normalized = matching::sanitize_title(title).to_lowercase();
        if normalized.is_empty() {
            return Err(AppError::InvalidInput(
                "blend seed titles must not be empty".to_string(),
            ));
        }
        if !distinct.insert(normalized) {
            return Err(AppError::InvalidInput(format!(
                "blend seed titles must be distinct, '{}' repeats",
                title
            )));
        }
    }

    Ok(())
}
