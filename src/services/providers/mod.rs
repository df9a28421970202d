/// Recommendation provider abstraction
///
/// This module provides a pluggable architecture for the upstream
/// recommendation sources (similarity graph, generative AI, catalog
/// filtering). Each adapter normalizes its provider's response into
/// [`ProviderMatch`] values and encapsulates provider-specific rate
/// limiting and caching, so the orchestrator can treat every link in a
/// fallback chain identically.
use crate::{
    error::AppResult,
    models::{ProviderMatch, ProviderRequest},
};

pub mod catalog;
pub mod generative;
pub mod similarity;

pub use catalog::CatalogFilterProvider;
pub use generative::GenerativeProvider;
pub use similarity::SimilarityProvider;

/// Trait for recommendation providers
#[async_trait::async_trait]
pub trait RecommendationProvider: Send + Sync {
    /// Provider name used for provenance, availability probes, and logging
    fn name(&self) -> &'static str;

    /// Whether the provider can be tried right now
    ///
    /// Checks required credentials and current rate-limit/cool-down state.
    /// Must not consume any rate budget or call the upstream.
    async fn is_available(&self) -> bool;

    /// Fetch normalized recommendation candidates
    ///
    /// An empty vec means the provider legitimately found nothing and the
    /// chain should advance. Transport failures, rate-limit exceedance, and
    /// validation failures are returned as typed errors.
    async fn fetch(&self, request: &ProviderRequest) -> AppResult<Vec<ProviderMatch>>;
}
