/// Fallback chain controller
///
/// Each use case gets an ordered chain of provider adapters, built once at
/// startup so the chains are statically inspectable. A request walks its
/// chain strictly sequentially — providers are never raced — and stops at
/// the first adapter producing at least one valid match. Recoverable
/// failures (rate limit, transport, validation, malformed output) advance
/// the chain; anything else propagates immediately.
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::{
    error::{AppError, AppResult},
    models::{ProviderMatch, ProviderRequest, UseCase},
    services::providers::RecommendationProvider,
};

/// The raw result of a chain walk, before enrichment
#[derive(Debug)]
pub struct ChainOutcome {
    pub matches: Vec<ProviderMatch>,
    pub provider: &'static str,
    pub is_fallback: bool,
}

pub struct Orchestrator {
    chains: HashMap<UseCase, Vec<Arc<dyn RecommendationProvider>>>,
    /// Providers already warned about this process lifetime, so a missing
    /// credential logs once instead of on every request
    warned_providers: Mutex<HashSet<&'static str>>,
}

impl Orchestrator {
    /// Builds the standard chain registry:
    /// - similar:  [similarity, catalog]
    /// - blend:    [similarity, generative] — no catalog terminal, since a
    ///   plain filter query has no meaningful way to combine multiple seeds
    /// - discover: [generative, similarity, catalog]
    pub fn new(
        similarity: Arc<dyn RecommendationProvider>,
        generative: Arc<dyn RecommendationProvider>,
        catalog: Arc<dyn RecommendationProvider>,
    ) -> Self {
        let mut chains: HashMap<UseCase, Vec<Arc<dyn RecommendationProvider>>> = HashMap::new();
        chains.insert(
            UseCase::Similar,
            vec![Arc::clone(&similarity), Arc::clone(&catalog)],
        );
        chains.insert(
            UseCase::Blend,
            vec![Arc::clone(&similarity), Arc::clone(&generative)],
        );
        chains.insert(UseCase::Discover, vec![generative, similarity, catalog]);

        Self::with_chains(chains)
    }

    /// Builds an orchestrator over an explicit chain registry
    pub fn with_chains(chains: HashMap<UseCase, Vec<Arc<dyn RecommendationProvider>>>) -> Self {
        Self {
            chains,
            warned_providers: Mutex::new(HashSet::new()),
        }
    }

    /// Walks the chain for `use_case`, returning the first non-empty valid
    /// result along with provenance
    pub async fn run(
        &self,
        use_case: UseCase,
        request: &ProviderRequest,
    ) -> AppResult<ChainOutcome> {
        let chain = self.chains.get(&use_case).ok_or_else(|| {
            AppError::Internal(format!("no provider chain registered for {:?}", use_case))
        })?;

        for (position, provider) in chain.iter().enumerate() {
            if !provider.is_available().await {
                self.warn_unavailable(provider.name());
                continue;
            }

            match provider.fetch(request).await {
                Ok(matches) if matches.is_empty() => {
                    tracing::debug!(
                        provider = provider.name(),
                        "Provider returned no matches, advancing chain"
                    );
                }
                Ok(matches) => {
                    let is_fallback = position > 0;
                    tracing::info!(
                        provider = provider.name(),
                        count = matches.len(),
                        is_fallback,
                        "Chain resolved"
                    );
                    return Ok(ChainOutcome {
                        matches,
                        provider: provider.name(),
                        is_fallback,
                    });
                }
                Err(e) if e.is_recoverable() => {
                    tracing::warn!(
                        provider = provider.name(),
                        error = %e,
                        "Provider failed, advancing chain"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::ExhaustedChain(format!(
            "no provider produced results for {:?}",
            use_case
        )))
    }

    /// Availability probe for callers that want to hide affordances for
    /// providers that cannot currently answer
    pub async fn is_provider_available(&self, name: &str) -> bool {
        for chain in self.chains.values() {
            for provider in chain {
                if provider.name() == name {
                    return provider.is_available().await;
                }
            }
        }
        false
    }

    fn warn_unavailable(&self, name: &'static str) {
        let Ok(mut warned) = self.warned_providers.lock() else {
            return;
        };
        if warned.insert(name) {
            tracing::warn!(
                provider = name,
                "Provider unavailable (missing credentials, rate limited, or cooling down)"
            );
        } else {
            tracing::debug!(provider = name, "Provider unavailable, advancing chain");
        }
    }
}
