/// Generative AI provider adapter
///
/// Builds a structured prompt demanding a strict machine-parseable shape,
/// and rejects anything that does not parse — a guessed-at response is
/// worse than falling through to the next provider. After an upstream 429
/// the adapter marks a cool-down flag that the *next* availability check
/// consults; the current call just fails with `RateLimited` and lets the
/// chain advance.
use std::sync::Arc;

use serde::Deserialize;

use crate::{
    clients::GenerativeClient,
    db::KeyValueStore,
    error::{AppError, AppResult},
    models::{MediaType, ProviderMatch, ProviderRequest},
    services::providers::RecommendationProvider,
};

const COOLDOWN_KEY: &str = "cooldown:generative";

pub struct GenerativeProvider {
    client: Arc<dyn GenerativeClient>,
    store: Arc<dyn KeyValueStore>,
    cooldown_seconds: u64,
    configured: bool,
}

impl GenerativeProvider {
    pub fn new(
        client: Arc<dyn GenerativeClient>,
        store: Arc<dyn KeyValueStore>,
        cooldown_seconds: u64,
        configured: bool,
    ) -> Self {
        Self {
            client,
            store,
            cooldown_seconds,
            configured,
        }
    }

    async fn mark_cooldown(&self) {
        if let Err(e) = self
            .store
            .set_ex(COOLDOWN_KEY, "1", self.cooldown_seconds)
            .await
        {
            tracing::warn!(error = %e, "Failed to record generative cool-down");
        } else {
            tracing::info!(
                seconds = self.cooldown_seconds,
                "Generative provider entering cool-down"
            );
        }
    }
}

#[async_trait::async_trait]
impl RecommendationProvider for GenerativeProvider {
    fn name(&self) -> &'static str {
        "generative"
    }

    async fn is_available(&self) -> bool {
        if !self.configured {
            return false;
        }
        // The cool-down flag is best effort: an unreadable store must not
        // take the provider out of rotation
        match self.store.get(COOLDOWN_KEY).await {
            Ok(flag) => flag.is_none(),
            Err(e) => {
                tracing::warn!(error = %e, "Cool-down state unreadable; assuming available");
                true
            }
        }
    }

    async fn fetch(&self, request: &ProviderRequest) -> AppResult<Vec<ProviderMatch>> {
        let prompt = build_prompt(request);

        let raw = match self.client.complete(&prompt).await {
            Ok(raw) => raw,
            Err(e @ AppError::RateLimited(_)) => {
                self.mark_cooldown().await;
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        let mut matches = parse_recommendations(&raw)?;
        matches.truncate(request.limit);

        tracing::info!(
            count = matches.len(),
            provider = "generative",
            "Generative recommendations parsed"
        );

        Ok(matches)
    }
}

/// The prompt pins the output contract: a bare JSON array with exactly the
/// fields the parser expects, no prose.
fn build_prompt(request: &ProviderRequest) -> String {
    let ask = if request.seed_titles.is_empty() {
        let prompt = request.prompt.as_deref().unwrap_or_default();
        format!(
            "Recommend exactly {} movies or TV shows satisfying this request: {}.",
            request.limit, prompt
        )
    } else {
        format!(
            "Recommend exactly {} {}s that blend the tastes of someone who loved all of: {}. \
             Do not include any of those titles themselves.",
            request.limit,
            media_word(request.media_type),
            request.seed_titles.join(", ")
        )
    };

    format!(
        "{} Respond with a JSON array only, no prose and no code fences. Each element must be \
         {{\"title\": string, \"year\": number, \"media_type\": \"movie\" or \"tv\", \
         \"reason\": one sentence}}.",
        ask
    )
}

fn media_word(media_type: MediaType) -> &'static str {
    match media_type {
        MediaType::Movie => "movie",
        MediaType::Tv => "TV show",
    }
}

#[derive(Debug, Deserialize)]
struct GeneratedTitle {
    title: String,
    #[serde(default)]
    #[allow(dead_code)] // Kept in the contract for disambiguation by the model
    year: Option<i32>,
    media_type: MediaType,
    reason: String,
}

/// Strict parse of the generative output. A parse failure is an error,
/// never an empty list: an empty list must mean the provider legitimately
/// found nothing.
fn parse_recommendations(raw: &str) -> AppResult<Vec<ProviderMatch>> {
    let body = strip_code_fences(raw);

    let titles: Vec<GeneratedTitle> = serde_json::from_str(body).map_err(|e| {
        AppError::MalformedProviderOutput(format!("generative output did not parse: {}", e))
    })?;

    Ok(titles
        .into_iter()
        .map(|generated| ProviderMatch {
            name: generated.title,
            media_type: generated.media_type,
            description: Some(generated.reason),
            external_video_ref: None,
            wiki_ref: None,
        })
        .collect())
}

/// Models wrap JSON in markdown fences no matter how firmly told not to
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    let inner = inner.trim_end();
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    inner.trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::DiscoverFilters;

    enum Script {
        Text(&'static str),
        RateLimited,
        Transport,
    }

    struct ScriptedGenerative {
        script: Script,
    }

    #[async_trait::async_trait]
    impl GenerativeClient for ScriptedGenerative {
        async fn complete(&self, _prompt: &str) -> AppResult<String> {
            match &self.script {
                Script::Text(text) => Ok(text.to_string()),
                Script::RateLimited => {
                    Err(AppError::RateLimited("upstream returned 429".to_string()))
                }
                Script::Transport => Err(AppError::Transport("connection reset".to_string())),
            }
        }
    }

    fn provider(script: Script) -> GenerativeProvider {
        GenerativeProvider::new(
            Arc::new(ScriptedGenerative { script }),
            Arc::new(MemoryStore::new()),
            300,
            true,
        )
    }

    fn blend_request() -> ProviderRequest {
        ProviderRequest::for_seeds(
            vec!["Breaking Bad".to_string(), "Death Note".to_string()],
            MediaType::Tv,
            10,
        )
    }

    const VALID_OUTPUT: &str = r#"[
        {"title": "Dexter", "year": 2006, "media_type": "tv", "reason": "A meticulous antihero hiding in plain sight."},
        {"title": "Ozark", "year": 2017, "media_type": "tv", "reason": "Ordinary people dragged into criminal logistics."}
    ]"#;

    #[test]
    fn test_parse_valid_output() {
        let matches = parse_recommendations(VALID_OUTPUT).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].name, "Dexter");
        assert_eq!(matches[0].media_type, MediaType::Tv);
        assert!(matches[0].description.as_deref().unwrap().contains("antihero"));
    }

    #[test]
    fn test_parse_strips_code_fences() {
        let fenced = format!("```json\n{}\n```", VALID_OUTPUT);
        let matches = parse_recommendations(&fenced).unwrap();
        assert_eq!(matches.len(), 2);

        let bare_fence = format!("```\n{}\n```", VALID_OUTPUT);
        assert_eq!(parse_recommendations(&bare_fence).unwrap().len(), 2);
    }

    #[test]
    fn test_parse_empty_array_is_legitimate_nothing() {
        let matches = parse_recommendations("[]").unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn test_parse_failure_is_an_error_not_empty() {
        let err = parse_recommendations("Here are some great shows you might enjoy!").unwrap_err();
        assert!(matches!(err, AppError::MalformedProviderOutput(_)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_parse_rejects_missing_fields() {
        let err = parse_recommendations(r#"[{"title": "Dexter"}]"#).unwrap_err();
        assert!(matches!(err, AppError::MalformedProviderOutput(_)));
    }

    #[test]
    fn test_blend_prompt_names_seeds_and_count() {
        let prompt = build_prompt(&blend_request());
        assert!(prompt.contains("exactly 10"));
        assert!(prompt.contains("Breaking Bad"));
        assert!(prompt.contains("Death Note"));
        assert!(prompt.contains("JSON array"));
    }

    #[test]
    fn test_discover_prompt_carries_free_text() {
        let request = ProviderRequest::for_prompt(
            "mind-bending sci-fi".to_string(),
            DiscoverFilters::default(),
            5,
        );
        let prompt = build_prompt(&request);
        assert!(prompt.contains("mind-bending sci-fi"));
        assert!(prompt.contains("exactly 5"));
    }

    #[tokio::test]
    async fn test_fetch_parses_and_truncates() {
        let provider = provider(Script::Text(VALID_OUTPUT));
        let mut request = blend_request();
        request.limit = 1;

        let matches = provider.fetch(&request).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].name, "Dexter");
    }

    #[tokio::test]
    async fn test_rate_limit_marks_cooldown_for_next_check() {
        let provider = provider(Script::RateLimited);
        assert!(provider.is_available().await);

        let err = provider.fetch(&blend_request()).await.unwrap_err();
        assert!(matches!(err, AppError::RateLimited(_)));

        // The failing call itself is done; the *next* check sees the flag
        assert!(!provider.is_available().await);
    }

    #[tokio::test]
    async fn test_transport_error_does_not_mark_cooldown() {
        let provider = provider(Script::Transport);
        let err = provider.fetch(&blend_request()).await.unwrap_err();
        assert!(matches!(err, AppError::Transport(_)));
        assert!(provider.is_available().await);
    }

    #[tokio::test]
    async fn test_unconfigured_provider_is_unavailable() {
        let provider = GenerativeProvider::new(
            Arc::new(ScriptedGenerative {
                script: Script::Text("[]"),
            }),
            Arc::new(MemoryStore::new()),
            300,
            false,
        );
        assert!(!provider.is_available().await);
    }
}
