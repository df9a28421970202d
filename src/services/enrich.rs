/// Result enrichment and deduplication
///
/// Takes the winning adapter's normalized matches and joins them with
/// catalog metadata. Per-item failures degrade, never fail the batch: a
/// match that cannot be resolved is dropped, and a resolved result whose
/// streaming-provider lookup fails ships with an empty provider list.
use std::collections::HashSet;
use std::sync::Arc;

use crate::{
    clients::CatalogClient,
    models::{EnrichedResult, ProviderMatch},
};

/// Provider descriptions are clipped to keep reasons card-sized
pub const REASON_MAX_CHARS: usize = 150;

pub struct Enricher {
    catalog: Arc<dyn CatalogClient>,
}

impl Enricher {
    pub fn new(catalog: Arc<dyn CatalogClient>) -> Self {
        Self { catalog }
    }

    /// Resolves, deduplicates, filters, and enriches matches.
    ///
    /// Resolution and streaming-provider lookups run one task per item;
    /// results are joined in input order so the output order is
    /// deterministic. `exclude_ids` carries seed/source IDs (a seed must
    /// never recommend itself) plus anything the caller already has.
    pub async fn enrich(
        &self,
        matches: Vec<ProviderMatch>,
        exclude_ids: &[i64],
        seed_titles: &[String],
        limit: usize,
    ) -> Vec<EnrichedResult> {
        let mut resolve_tasks = Vec::with_capacity(matches.len());
        for candidate in matches {
            let catalog = Arc::clone(&self.catalog);
            resolve_tasks.push(tokio::spawn(async move {
                match catalog.search(&candidate.name, candidate.media_type).await {
                    Ok(hits) => hits.into_iter().next().map(|hit| (hit, candidate)),
                    Err(e) => {
                        tracing::warn!(
                            title = %candidate.name,
                            error = %e,
                            "Catalog resolution failed, dropping candidate"
                        );
                        None
                    }
                }
            }));
        }

        let excluded: HashSet<i64> = exclude_ids.iter().copied().collect();
        let mut seen: HashSet<i64> = HashSet::new();
        let mut kept = Vec::new();

        for task in resolve_tasks {
            let Ok(Some((hit, source))) = task.await else {
                continue;
            };
            if excluded.contains(&hit.id) {
                tracing::debug!(id = hit.id, title = %hit.title, "Excluding seed from results");
                continue;
            }
            // Keep first occurrence; primary-type results arrive first and
            // therefore win ties
            if !seen.insert(hit.id) {
                continue;
            }
            kept.push((hit, source));
            if kept.len() == limit {
                break;
            }
        }

        let mut provider_tasks = Vec::with_capacity(kept.len());
        for (hit, _) in &kept {
            let catalog = Arc::clone(&self.catalog);
            let id = hit.id;
            let media_type = hit.media_type;
            provider_tasks.push(tokio::spawn(async move {
                catalog.fetch_providers(id, media_type).await.unwrap_or_else(|e| {
                    tracing::warn!(id, error = %e, "Streaming-provider lookup failed");
                    Vec::new()
                })
            }));
        }

        let mut results = Vec::with_capacity(kept.len());
        for ((hit, source), task) in kept.into_iter().zip(provider_tasks) {
            let provider_ids = task.await.unwrap_or_default();
            results.push(EnrichedResult {
                id: hit.id,
                title: hit.title,
                media_type: hit.media_type,
                poster_path: hit.poster_path,
                backdrop_path: hit.backdrop_path,
                vote_average: hit.vote_average,
                overview: hit.overview,
                year: hit.year,
                reason: build_reason(source.description.as_deref(), seed_titles),
                provider_ids,
            });
        }

        results
    }
}

/// Prefers the provider's own description, clipped; falls back to a
/// templated sentence naming the seeds
pub(crate) fn build_reason(description: Option<&str>, seed_titles: &[String]) -> String {
    if let Some(description) = description {
        let trimmed = description.trim();
        if !trimmed.is_empty() {
            return truncate_chars(trimmed, REASON_MAX_CHARS);
        }
    }

    if seed_titles.is_empty() {
        "Picked to match your request.".to_string()
    } else {
        format!("Recommended because you liked {}.", join_titles(seed_titles))
    }
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let clipped: String = s.chars().take(max_chars).collect();
    format!("{}…", clipped.trim_end())
}

fn join_titles(titles: &[String]) -> String {
    match titles {
        [] => String::new(),
        [only] => only.clone(),
        [head @ .., last] => format!(
            "{} and {}",
            head.iter().map(String::as_str).collect::<Vec<_>>().join(", "),
            last
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{CatalogTitle, DiscoverParams};
    use crate::error::{AppError, AppResult};
    use crate::models::MediaType;
    use std::collections::HashMap;

    /// Catalog stub resolving titles by exact name
    struct ScriptedCatalog {
        by_name: HashMap<String, CatalogTitle>,
        providers: HashMap<i64, Vec<i64>>,
        failing_provider_ids: HashSet<i64>,
    }

    impl ScriptedCatalog {
        fn new() -> Self {
            Self {
                by_name: HashMap::new(),
                providers: HashMap::new(),
                failing_provider_ids: HashSet::new(),
            }
        }

        fn with_title(mut self, name: &str, id: i64, media_type: MediaType) -> Self {
            self.by_name.insert(
                name.to_string(),
                CatalogTitle {
                    id,
                    title: name.to_string(),
                    media_type,
                    overview: Some(format!("{} overview", name)),
                    poster_path: Some(format!("/{}.jpg", id)),
                    backdrop_path: None,
                    vote_average: 8.0,
                    year: Some(2015),
                },
            );
            self
        }

        fn with_providers(mut self, id: i64, provider_ids: Vec<i64>) -> Self {
            self.providers.insert(id, provider_ids);
            self
        }

        fn with_failing_provider_lookup(mut self, id: i64) -> Self {
            self.failing_provider_ids.insert(id);
            self
        }
    }

    #[async_trait::async_trait]
    impl CatalogClient for ScriptedCatalog {
        async fn search(&self, query: &str, _media_type: MediaType) -> AppResult<Vec<CatalogTitle>> {
            Ok(self.by_name.get(query).cloned().into_iter().collect())
        }

        async fn fetch_details(&self, _id: i64, _media_type: MediaType) -> AppResult<CatalogTitle> {
            Err(AppError::Internal("not used in this test".to_string()))
        }

        async fn discover(&self, _params: &DiscoverParams) -> AppResult<Vec<CatalogTitle>> {
            Ok(Vec::new())
        }

        async fn fetch_providers(&self, id: i64, _media_type: MediaType) -> AppResult<Vec<i64>> {
            if self.failing_provider_ids.contains(&id) {
                return Err(AppError::Transport("provider lookup failed".to_string()));
            }
            Ok(self.providers.get(&id).cloned().unwrap_or_default())
        }
    }

    fn candidate(name: &str, media_type: MediaType) -> ProviderMatch {
        ProviderMatch {
            name: name.to_string(),
            media_type,
            description: None,
            external_video_ref: None,
            wiki_ref: None,
        }
    }

    #[tokio::test]
    async fn test_enrich_resolves_in_input_order() {
        let catalog = ScriptedCatalog::new()
            .with_title("Ozark", 1, MediaType::Tv)
            .with_title("Dexter", 2, MediaType::Tv)
            .with_providers(1, vec![8])
            .with_providers(2, vec![8, 9]);
        let enricher = Enricher::new(Arc::new(catalog));

        let results = enricher
            .enrich(
                vec![candidate("Ozark", MediaType::Tv), candidate("Dexter", MediaType::Tv)],
                &[],
                &[],
                10,
            )
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Ozark");
        assert_eq!(results[0].provider_ids, vec![8]);
        assert_eq!(results[1].title, "Dexter");
        assert_eq!(results[1].provider_ids, vec![8, 9]);
    }

    #[tokio::test]
    async fn test_enrich_deduplicates_by_resolved_id() {
        // Two differently-spelled candidates resolving to the same entry
        let catalog = ScriptedCatalog::new()
            .with_title("The Office", 10, MediaType::Tv)
            .with_title("The Office (US)", 10, MediaType::Tv);
        let enricher = Enricher::new(Arc::new(catalog));

        let results = enricher
            .enrich(
                vec![
                    candidate("The Office", MediaType::Tv),
                    candidate("The Office (US)", MediaType::Tv),
                ],
                &[],
                &[],
                10,
            )
            .await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 10);
    }

    #[tokio::test]
    async fn test_enrich_excludes_seed_ids() {
        let catalog = ScriptedCatalog::new()
            .with_title("Breaking Bad", 1396, MediaType::Tv)
            .with_title("Ozark", 69740, MediaType::Tv);
        let enricher = Enricher::new(Arc::new(catalog));

        let results = enricher
            .enrich(
                vec![
                    candidate("Breaking Bad", MediaType::Tv),
                    candidate("Ozark", MediaType::Tv),
                ],
                &[1396],
                &[],
                10,
            )
            .await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 69740);
    }

    #[tokio::test]
    async fn test_enrich_drops_unresolvable_candidates() {
        let catalog = ScriptedCatalog::new().with_title("Ozark", 1, MediaType::Tv);
        let enricher = Enricher::new(Arc::new(catalog));

        let results = enricher
            .enrich(
                vec![
                    candidate("Completely Unknown Show", MediaType::Tv),
                    candidate("Ozark", MediaType::Tv),
                ],
                &[],
                &[],
                10,
            )
            .await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Ozark");
    }

    #[tokio::test]
    async fn test_provider_lookup_failure_yields_empty_ids_not_batch_failure() {
        let catalog = ScriptedCatalog::new()
            .with_title("Ozark", 1, MediaType::Tv)
            .with_title("Dexter", 2, MediaType::Tv)
            .with_providers(2, vec![9])
            .with_failing_provider_lookup(1);
        let enricher = Enricher::new(Arc::new(catalog));

        let results = enricher
            .enrich(
                vec![candidate("Ozark", MediaType::Tv), candidate("Dexter", MediaType::Tv)],
                &[],
                &[],
                10,
            )
            .await;

        assert_eq!(results.len(), 2);
        assert!(results[0].provider_ids.is_empty());
        assert_eq!(results[1].provider_ids, vec![9]);
    }

    #[tokio::test]
    async fn test_enrich_respects_limit() {
        let catalog = ScriptedCatalog::new()
            .with_title("A", 1, MediaType::Movie)
            .with_title("B", 2, MediaType::Movie)
            .with_title("C", 3, MediaType::Movie);
        let enricher = Enricher::new(Arc::new(catalog));

        let results = enricher
            .enrich(
                vec![
                    candidate("A", MediaType::Movie),
                    candidate("B", MediaType::Movie),
                    candidate("C", MediaType::Movie),
                ],
                &[],
                &[],
                2,
            )
            .await;

        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_reason_prefers_provider_description() {
        let catalog = ScriptedCatalog::new().with_title("Ozark", 1, MediaType::Tv);
        let enricher = Enricher::new(Arc::new(catalog));

        let mut with_description = candidate("Ozark", MediaType::Tv);
        with_description.description = Some("A financial advisor launders money.".to_string());

        let results = enricher
            .enrich(vec![with_description], &[], &[
                "Breaking Bad".to_string(),
            ], 10)
            .await;

        assert_eq!(results[0].reason, "A financial advisor launders money.");
    }

    #[test]
    fn test_reason_truncates_long_descriptions() {
        let long = "x".repeat(400);
        let reason = build_reason(Some(&long), &[]);
        assert!(reason.chars().count() <= REASON_MAX_CHARS + 1);
        assert!(reason.ends_with('…'));
    }

    #[test]
    fn test_reason_template_fallback_names_seeds() {
        let seeds = vec!["Breaking Bad".to_string(), "Death Note".to_string()];
        assert_eq!(
            build_reason(None, &seeds),
            "Recommended because you liked Breaking Bad and Death Note."
        );
        assert_eq!(
            build_reason(Some("   "), &seeds),
            "Recommended because you liked Breaking Bad and Death Note."
        );
    }

    #[test]
    fn test_reason_template_without_seeds() {
        assert_eq!(build_reason(None, &[]), "Picked to match your request.");
    }

    #[test]
    fn test_join_titles_oxford_free() {
        let three = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        assert_eq!(join_titles(&three), "A, B and C");
        assert_eq!(join_titles(&three[..1].to_vec()), "A");
    }
}
