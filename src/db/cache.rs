use std::fmt::Display;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::db::store::KeyValueStore;
use crate::error::AppResult;
use crate::models::MediaType;

/// Cache keys are deterministic functions of request type + normalized input,
/// so identical requests hit the same entry regardless of caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Similarity lookup for a single sanitized title
    Similar { media_type: MediaType, title: String },
    /// Multi-seed blend; titles are sorted so seed order does not fragment the cache
    Blend { media_type: MediaType, titles: Vec<String> },
    /// Free-text discovery prompt
    Discover { prompt: String },
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Similar { media_type, title } => {
                write!(f, "similar:{}:{}", media_type.as_str(), title.to_lowercase())
            }
            CacheKey::Blend { media_type, titles } => {
                let mut sorted: Vec<String> =
                    titles.iter().map(|t| t.to_lowercase()).collect();
                sorted.sort();
                write!(f, "blend:{}:{}", media_type.as_str(), sorted.join("+"))
            }
            CacheKey::Discover { prompt } => write!(f, "discover:{}", prompt.to_lowercase()),
        }
    }
}

/// Implemented by values stored through [`Cache::put_json`]. Empty payloads
/// are never written: an empty upstream response must stay a cache miss so
/// the next request retries the provider.
pub trait CachePayload: serde::Serialize {
    fn is_empty_payload(&self) -> bool;
}

impl<T: serde::Serialize> CachePayload for Vec<T> {
    fn is_empty_payload(&self) -> bool {
        self.is_empty()
    }
}

/// Message for asynchronous cache writes
struct CacheWriteMessage {
    key: String,
    value: String,
    ttl: u64,
}

/// Cache handler for storing and retrieving data from the shared store
#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn KeyValueStore>,
    write_tx: mpsc::UnboundedSender<CacheWriteMessage>,
}

/// Handle for gracefully shutting down the cache writer
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl CacheWriterHandle {
    /// Initiates a graceful shutdown of the cache writer
    ///
    /// Sends a shutdown signal to the writer task, which drains all pending
    /// writes before exiting.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Cache writer shutdown signal sent");
    }
}

impl Cache {
    /// Creates a new Cache instance with an async write background task
    ///
    /// Cache writes go through a background task so they never block a
    /// response. Must be called from within a tokio runtime.
    pub fn new(store: Arc<dyn KeyValueStore>) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let writer_store = Arc::clone(&store);
        tokio::spawn(async move {
            Self::cache_writer_task(writer_store, write_rx, shutdown_rx).await;
        });

        let cache = Self { store, write_tx };
        let handle = CacheWriterHandle { shutdown_tx };

        (cache, handle)
    }

    /// Background task that processes cache write messages
    async fn cache_writer_task(
        store: Arc<dyn KeyValueStore>,
        mut write_rx: mpsc::UnboundedReceiver<CacheWriteMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::debug!("Cache writer task started");

        loop {
            tokio::select! {
                Some(msg) = write_rx.recv() => {
                    if let Err(e) = store.set_ex(&msg.key, &msg.value, msg.ttl).await {
                        tracing::error!(error = %e, key = %msg.key, "Failed to write to cache");
                    }
                }
                _ = shutdown_rx.recv() => {
                    // Drain whatever is already queued, then stop
                    let mut flushed = 0;
                    while let Ok(msg) = write_rx.try_recv() {
                        if let Err(e) = store.set_ex(&msg.key, &msg.value, msg.ttl).await {
                            tracing::error!(error = %e, "Failed to flush cache write during shutdown");
                        }
                        flushed += 1;
                    }
                    tracing::info!(flushed, "Cache writer task stopped");
                    break;
                }
            }
        }
    }

    /// Retrieves a cached value by key
    ///
    /// A value that no longer deserializes (stale schema) is treated as a
    /// miss rather than an error, so a deploy never wedges reads.
    pub async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        let cached = self.store.get(&key.to_string()).await?;

        match cached {
            Some(json) => match serde_json::from_str(&json) {
                Ok(value) => Ok(Some(value)),
                Err(e) => {
                    tracing::warn!(error = %e, key = %key, "Discarding undeserializable cache entry");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Stores a value in the cache asynchronously without blocking
    ///
    /// Empty payloads are dropped: only validated non-empty responses are
    /// worth replaying, and caching "nothing" would pin a transient upstream
    /// hiccup for the whole TTL.
    pub fn put_json<T: CachePayload>(&self, key: &CacheKey, value: &T, ttl: u64) {
        if value.is_empty_payload() {
            tracing::debug!(key = %key, "Skipping cache write for empty payload");
            return;
        }

        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        let msg = CacheWriteMessage {
            key: key.to_string(),
            value: json,
            ttl,
        };

        if let Err(e) = self.write_tx.send(msg) {
            tracing::error!(error = %e, "Failed to send cache write message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::MemoryStore;
    use std::time::Duration;

    fn test_cache() -> (Cache, CacheWriterHandle) {
        Cache::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_cache_key_display_similar() {
        let key = CacheKey::Similar {
            media_type: MediaType::Movie,
            title: "Inception".to_string(),
        };
        assert_eq!(key.to_string(), "similar:movie:inception");
    }

    #[test]
    fn test_cache_key_display_blend_sorts_titles() {
        let forward = CacheKey::Blend {
            media_type: MediaType::Tv,
            titles: vec!["Death Note".to_string(), "Breaking Bad".to_string()],
        };
        let reverse = CacheKey::Blend {
            media_type: MediaType::Tv,
            titles: vec!["Breaking Bad".to_string(), "Death Note".to_string()],
        };
        assert_eq!(forward.to_string(), "blend:tv:breaking bad+death note");
        assert_eq!(forward.to_string(), reverse.to_string());
    }

    #[test]
    fn test_cache_key_display_discover() {
        let key = CacheKey::Discover {
            prompt: "Feel-good Movies".to_string(),
        };
        assert_eq!(key.to_string(), "discover:feel-good movies");
    }

    #[tokio::test]
    async fn test_cache_round_trip() {
        let (cache, _handle) = test_cache();
        let key = CacheKey::Similar {
            media_type: MediaType::Movie,
            title: "Heat".to_string(),
        };
        let value = vec!["Collateral".to_string(), "Ronin".to_string()];

        cache.put_json(&key, &value, 60);
        tokio::time::sleep(Duration::from_millis(100)).await;

        let retrieved: Option<Vec<String>> = cache.get_json(&key).await.unwrap();
        assert_eq!(retrieved, Some(value));
    }

    #[tokio::test]
    async fn test_cache_miss() {
        let (cache, _handle) = test_cache();
        let key = CacheKey::Discover {
            prompt: "never seen before".to_string(),
        };
        let retrieved: Option<Vec<String>> = cache.get_json(&key).await.unwrap();
        assert_eq!(retrieved, None);
    }

    #[tokio::test]
    async fn test_empty_payload_is_not_cached() {
        let (cache, _handle) = test_cache();
        let key = CacheKey::Similar {
            media_type: MediaType::Tv,
            title: "The Wire".to_string(),
        };
        let empty: Vec<String> = Vec::new();

        cache.put_json(&key, &empty, 60);
        tokio::time::sleep(Duration::from_millis(100)).await;

        let retrieved: Option<Vec<String>> = cache.get_json(&key).await.unwrap();
        assert_eq!(retrieved, None);
    }

    #[tokio::test]
    async fn test_writer_flushes_on_shutdown() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let (cache, handle) = Cache::new(Arc::clone(&store));
        let key = CacheKey::Similar {
            media_type: MediaType::Movie,
            title: "Alien".to_string(),
        };

        cache.put_json(&key, &vec!["Aliens".to_string()], 60);
        handle.shutdown().await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        let raw = store.get(&key.to_string()).await.unwrap();
        assert!(raw.is_some());
    }
}
