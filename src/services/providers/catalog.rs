/// Catalog-filter provider adapter
///
/// The guaranteed terminal link in every chain that carries it: derives a
/// deterministic filtered catalog query from mood/keyword terms in the
/// prompt and whatever explicit filters the caller supplied. Not rate
/// limited at this layer — the catalog transport has its own quota.
use std::sync::Arc;

use crate::{
    clients::{CatalogClient, CatalogTitle, DiscoverParams},
    error::AppResult,
    models::{ProviderMatch, ProviderRequest},
    services::providers::RecommendationProvider,
};

/// Mood/keyword terms mapped to catalog genre IDs. First match order is
/// irrelevant; all matching rows contribute.
const MOOD_GENRES: &[(&str, &[i64])] = &[
    ("funny", &[35]),
    ("comedy", &[35]),
    ("laugh", &[35]),
    ("scary", &[27]),
    ("horror", &[27]),
    ("creepy", &[27, 53]),
    ("action", &[28]),
    ("explosive", &[28]),
    ("romantic", &[10749]),
    ("romance", &[10749]),
    ("love", &[10749]),
    ("thriller", &[53]),
    ("tense", &[53]),
    ("suspense", &[53, 9648]),
    ("mystery", &[9648]),
    ("whodunit", &[9648, 80]),
    ("crime", &[80]),
    ("heist", &[80, 53]),
    ("sci-fi", &[878]),
    ("science fiction", &[878]),
    ("space", &[878]),
    ("fantasy", &[14]),
    ("magic", &[14]),
    ("animated", &[16]),
    ("animation", &[16]),
    ("anime", &[16]),
    ("drama", &[18]),
    ("emotional", &[18]),
    ("documentary", &[99]),
    ("true story", &[99, 36]),
    ("history", &[36]),
    ("historical", &[36]),
    ("war", &[10752]),
    ("western", &[37]),
    ("family", &[10751]),
    ("kids", &[10751, 16]),
    ("adventure", &[12]),
    ("epic", &[12, 14]),
    ("music", &[10402]),
    ("musical", &[10402]),
];

pub struct CatalogFilterProvider {
    catalog: Arc<dyn CatalogClient>,
}

impl CatalogFilterProvider {
    pub fn new(catalog: Arc<dyn CatalogClient>) -> Self {
        Self { catalog }
    }
}

#[async_trait::async_trait]
impl RecommendationProvider for CatalogFilterProvider {
    fn name(&self) -> &'static str {
        "catalog"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn fetch(&self, request: &ProviderRequest) -> AppResult<Vec<ProviderMatch>> {
        let mut genre_ids = request.filters.genre_ids.clone().unwrap_or_default();
        if let Some(prompt) = &request.prompt {
            for id in genres_for_prompt(prompt) {
                if !genre_ids.contains(&id) {
                    genre_ids.push(id);
                }
            }
        }

        let params = DiscoverParams {
            media_type: request.media_type,
            genre_ids,
            year_from: request.filters.year_from,
            year_to: request.filters.year_to,
        };

        let titles = self.catalog.discover(&params).await?;

        tracing::info!(
            count = titles.len(),
            provider = "catalog",
            "Catalog discovery completed"
        );

        Ok(titles
            .into_iter()
            .take(request.limit)
            .map(to_provider_match)
            .collect())
    }
}

fn genres_for_prompt(prompt: &str) -> Vec<i64> {
    let lowered = prompt.to_lowercase();
    let mut genre_ids = Vec::new();
    for (keyword, ids) in MOOD_GENRES {
        if lowered.contains(keyword) {
            for id in *ids {
                if !genre_ids.contains(id) {
                    genre_ids.push(*id);
                }
            }
        }
    }
    genre_ids
}

fn to_provider_match(title: CatalogTitle) -> ProviderMatch {
    ProviderMatch {
        name: title.title,
        media_type: title.media_type,
        description: title.overview,
        external_video_ref: None,
        wiki_ref: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{DiscoverFilters, MediaType};
    use std::sync::Mutex;

    struct ScriptedCatalog {
        titles: Vec<CatalogTitle>,
        last_params: Mutex<Option<DiscoverParams>>,
    }

    impl ScriptedCatalog {
        fn new(titles: Vec<CatalogTitle>) -> Self {
            Self {
                titles,
                last_params: Mutex::new(None),
            }
        }
    }

    #[async_trait::async_trait]
    impl CatalogClient for ScriptedCatalog {
        async fn search(
            &self,
            _query: &str,
            _media_type: MediaType,
        ) -> AppResult<Vec<CatalogTitle>> {
            Err(AppError::Internal("not used in this test".to_string()))
        }

        async fn fetch_details(&self, _id: i64, _media_type: MediaType) -> AppResult<CatalogTitle> {
            Err(AppError::Internal("not used in this test".to_string()))
        }

        async fn discover(&self, params: &DiscoverParams) -> AppResult<Vec<CatalogTitle>> {
            *self.last_params.lock().unwrap() = Some(params.clone());
            Ok(self.titles.clone())
        }

        async fn fetch_providers(&self, _id: i64, _media_type: MediaType) -> AppResult<Vec<i64>> {
            Ok(Vec::new())
        }
    }

    fn catalog_title(id: i64, title: &str) -> CatalogTitle {
        CatalogTitle {
            id,
            title: title.to_string(),
            media_type: MediaType::Movie,
            overview: Some(format!("{} overview", title)),
            poster_path: None,
            backdrop_path: None,
            vote_average: 7.0,
            year: Some(2020),
        }
    }

    #[test]
    fn test_genres_for_prompt_maps_moods() {
        let ids = genres_for_prompt("Something funny and romantic please");
        assert_eq!(ids, vec![35, 10749]);
    }

    #[test]
    fn test_genres_for_prompt_deduplicates() {
        // "funny" and "comedy" both map to 35
        let ids = genres_for_prompt("a funny comedy");
        assert_eq!(ids, vec![35]);
    }

    #[test]
    fn test_genres_for_prompt_unknown_terms() {
        assert!(genres_for_prompt("absolutely anything").is_empty());
    }

    #[tokio::test]
    async fn test_fetch_passes_derived_genres_and_limits() {
        let catalog = Arc::new(ScriptedCatalog::new(vec![
            catalog_title(1, "Scream"),
            catalog_title(2, "The Shining"),
            catalog_title(3, "Hereditary"),
        ]));
        let provider = CatalogFilterProvider::new(catalog.clone());

        let request = ProviderRequest::for_prompt(
            "something scary".to_string(),
            DiscoverFilters::default(),
            2,
        );
        let matches = provider.fetch(&request).await.unwrap();

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].name, "Scream");

        let params = catalog.last_params.lock().unwrap().clone().unwrap();
        assert_eq!(params.genre_ids, vec![27]);
        assert_eq!(params.media_type, MediaType::Movie);
    }

    #[tokio::test]
    async fn test_explicit_filters_merge_with_prompt_genres() {
        let catalog = Arc::new(ScriptedCatalog::new(vec![catalog_title(1, "Up")]));
        let provider = CatalogFilterProvider::new(catalog.clone());

        let request = ProviderRequest {
            prompt: Some("animated".to_string()),
            seed_titles: Vec::new(),
            media_type: MediaType::Movie,
            limit: 10,
            filters: DiscoverFilters {
                genre_ids: Some(vec![10751]),
                year_from: Some(2000),
                year_to: None,
            },
        };
        provider.fetch(&request).await.unwrap();

        let params = catalog.last_params.lock().unwrap().clone().unwrap();
        assert_eq!(params.genre_ids, vec![10751, 16]);
        assert_eq!(params.year_from, Some(2000));
    }

    #[tokio::test]
    async fn test_always_available() {
        let provider = CatalogFilterProvider::new(Arc::new(ScriptedCatalog::new(Vec::new())));
        assert!(provider.is_available().await);
    }
}
