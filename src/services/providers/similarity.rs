/// Similarity-graph provider adapter
///
/// Wraps the similarity client with the query-build / validate / retry
/// flow, read-through caching, and the shared fixed-window rate limit.
/// Every sub-query and every validation retry costs one unit of the
/// window budget; cache hits cost nothing.
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    cached,
    clients::{tastedive::tastedive_kind, SimilarEntry, SimilarityClient},
    db::{Cache, CacheKey, CachePayload, RateLimiter},
    error::{AppError, AppResult},
    models::{MediaType, ProviderMatch, ProviderRequest},
    services::{matching, providers::RecommendationProvider},
};

const SIMILAR_CACHE_TTL: u64 = 21_600; // 6 hours

/// The requested media type receives seven of every ten result slots; the
/// complementary type fills the rest for diversity
const PRIMARY_SHARE_PERCENT: usize = 70;

pub struct SimilarityProvider {
    client: Arc<dyn SimilarityClient>,
    cache: Cache,
    limiter: RateLimiter,
    configured: bool,
}

impl SimilarityProvider {
    pub fn new(
        client: Arc<dyn SimilarityClient>,
        cache: Cache,
        limiter: RateLimiter,
        configured: bool,
    ) -> Self {
        Self {
            client,
            cache,
            limiter,
            configured,
        }
    }

    async fn query_validated(
        &self,
        seeds: &[String],
        seed_type: MediaType,
        result_type: MediaType,
        count: usize,
    ) -> AppResult<Vec<ProviderMatch>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let key = cache_key(seeds, result_type);
        let envelope: CachedMatches = cached!(self.cache, key, SIMILAR_CACHE_TTL, CachedMatches, async {
            self.fetch_validated(seeds, seed_type, result_type, count)
                .await
        })?;

        let mut matches = envelope.matches;
        matches.truncate(count);
        Ok(matches)
    }

    async fn fetch_validated(
        &self,
        seeds: &[String],
        seed_type: MediaType,
        result_type: MediaType,
        count: usize,
    ) -> AppResult<CachedMatches> {
        self.limiter.acquire().await?;

        let query = matching::build_query(seeds, tastedive_kind(seed_type));
        let response = self.client.query(&query, result_type, count).await?;

        // Zero results is "provider has nothing", not an error and not a
        // retry trigger; the orchestrator advances the chain
        if response.results.is_empty() {
            return Ok(CachedMatches::empty());
        }

        // Only single-seed queries have one expected identity to hold the
        // echo against; multi-seed blends are judged by their merged output
        let results = if let [seed] = seeds {
            self.validate_or_retry(seed, seed_type, result_type, count, response)
                .await?
        } else {
            response.results
        };

        Ok(CachedMatches::new(
            results.into_iter().map(to_provider_match).collect(),
        ))
    }

    /// Checks the provider's query echo against the requested seed and, on
    /// mismatch, retries once with the franchise base title.
    ///
    /// The retry fires only when the first attempt returned results that
    /// failed validation, never on an outright empty response. That
    /// asymmetry mirrors the observed upstream behavior.
    async fn validate_or_retry(
        &self,
        seed: &str,
        seed_type: MediaType,
        result_type: MediaType,
        count: usize,
        response: crate::clients::SimilarityResponse,
    ) -> AppResult<Vec<SimilarEntry>> {
        // A response with no query echo cannot be trusted either
        if let Some(echo) = response.info.first() {
            if matching::validate_first_match(seed, &echo.name, echo.media_type, seed_type) {
                return Ok(response.results);
            }
            tracing::debug!(
                seed = %seed,
                echoed = %echo.name,
                "Similarity echo failed validation; retrying with base title"
            );
        } else {
            tracing::debug!(seed = %seed, "Similarity response carried no query echo");
        }

        let Some(base) = matching::base_title(seed) else {
            return Err(AppError::ValidationFailed(format!(
                "similarity response was not about '{}'",
                seed
            )));
        };

        self.limiter.acquire().await?;

        let retry_query = matching::build_query(&[base.clone()], tastedive_kind(seed_type));
        let retry = self.client.query(&retry_query, result_type, count).await?;

        if retry.results.is_empty() {
            return Ok(Vec::new());
        }

        match retry.info.first() {
            Some(echo)
                if matching::validate_first_match(&base, &echo.name, echo.media_type, seed_type) =>
            {
                Ok(retry.results)
            }
            _ => Err(AppError::ValidationFailed(format!(
                "similarity responses for '{}' and base title '{}' both failed validation",
                seed, base
            ))),
        }
    }
}

#[async_trait::async_trait]
impl RecommendationProvider for SimilarityProvider {
    fn name(&self) -> &'static str {
        "similarity"
    }

    async fn is_available(&self) -> bool {
        if !self.configured {
            return false;
        }
        match self.limiter.is_available().await {
            Ok(available) => available,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Rate-limit state unreadable; treating similarity provider as unavailable"
                );
                false
            }
        }
    }

    async fn fetch(&self, request: &ProviderRequest) -> AppResult<Vec<ProviderMatch>> {
        if request.limit == 0 {
            return Ok(Vec::new());
        }

        // Blend and similar requests carry explicit seeds
        if !request.seed_titles.is_empty() {
            return self
                .dual_type_fetch(&request.seed_titles, request.media_type, request.limit)
                .await;
        }

        // Discover: fall back to title mentions extracted from the prompt.
        // Extraction is synchronous and cheap, and may legitimately find
        // nothing. The mentions are queried sequentially, not in parallel,
        // to conserve the shared rate-limit budget.
        let mentions = match &request.prompt {
            Some(prompt) => matching::extract_title_mentions(prompt),
            None => Vec::new(),
        };

        let mut matches = Vec::new();
        for mention in mentions {
            if matches.len() >= request.limit {
                break;
            }
            let remaining = request.limit - matches.len();
            match self
                .dual_type_fetch(std::slice::from_ref(&mention), request.media_type, remaining)
                .await
            {
                Ok(found) => matches.extend(found),
                Err(e @ AppError::RateLimited(_)) => {
                    // Out of budget; further mentions would only burn the window
                    if matches.is_empty() {
                        return Err(e);
                    }
                    tracing::warn!(error = %e, "Rate limit hit mid-extraction, returning partial results");
                    break;
                }
                Err(e) if e.is_recoverable() => {
                    tracing::warn!(mention = %mention, error = %e, "Extracted-title query failed, trying next mention");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(matches)
    }
}

impl SimilarityProvider {
    /// One logical request becomes two concurrent sub-queries — the
    /// requested type and its complement, split roughly 70/30 — merged
    /// primary-first.
    async fn dual_type_fetch(
        &self,
        seeds: &[String],
        media_type: MediaType,
        limit: usize,
    ) -> AppResult<Vec<ProviderMatch>> {
        let (primary_count, complementary_count) = split_counts(limit);

        let primary = self.query_validated(seeds, media_type, media_type, primary_count);
        let complementary = self.query_validated(
            seeds,
            media_type,
            media_type.complement(),
            complementary_count,
        );
        let (primary, complementary) = tokio::join!(primary, complementary);

        let mut matches = primary?;
        match complementary {
            Ok(extra) => matches.extend(extra),
            // Diversity broadening is best effort; losing the complementary
            // sub-query must not discard valid primary results
            Err(e) if e.is_recoverable() => {
                tracing::warn!(error = %e, "Complementary similarity sub-query failed");
            }
            Err(e) => return Err(e),
        }

        Ok(matches)
    }
}

fn split_counts(limit: usize) -> (usize, usize) {
    let primary = (limit * PRIMARY_SHARE_PERCENT).div_ceil(100).min(limit);
    (primary, limit - primary)
}

fn cache_key(seeds: &[String], result_type: MediaType) -> CacheKey {
    let mut sanitized: Vec<String> = seeds.iter().map(|s| matching::sanitize_title(s)).collect();
    if sanitized.len() == 1 {
        CacheKey::Similar {
            media_type: result_type,
            title: sanitized.remove(0),
        }
    } else {
        CacheKey::Blend {
            media_type: result_type,
            titles: sanitized,
        }
    }
}

fn to_provider_match(entry: SimilarEntry) -> ProviderMatch {
    ProviderMatch {
        name: entry.name,
        media_type: entry.media_type,
        description: entry.description,
        external_video_ref: entry.video_ref,
        wiki_ref: entry.wiki_ref,
    }
}

/// Cached envelope for validated, non-empty similarity responses
#[derive(Debug, Serialize, Deserialize)]
struct CachedMatches {
    matches: Vec<ProviderMatch>,
    cached_at: DateTime<Utc>,
}

impl CachedMatches {
    fn new(matches: Vec<ProviderMatch>) -> Self {
        Self {
            matches,
            cached_at: Utc::now(),
        }
    }

    fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl CachePayload for CachedMatches {
    fn is_empty_payload(&self) -> bool {
        self.matches.is_empty()
    }
}
