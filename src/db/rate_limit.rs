use std::sync::Arc;

use crate::db::store::KeyValueStore;
use crate::error::{AppError, AppResult};

/// Fixed-window rate limiter shared across all concurrent request handlers.
///
/// `acquire` is increment-then-check: the counter moves first, so two
/// concurrent requests can never both pass on a stale under-limit read.
/// Denied attempts still count, which only makes the limiter stricter.
pub struct RateLimiter {
    store: Arc<dyn KeyValueStore>,
    name: &'static str,
    cap: u64,
    window_seconds: u64,
}

impl RateLimiter {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        name: &'static str,
        cap: u64,
        window_seconds: u64,
    ) -> Self {
        Self {
            store,
            name,
            cap,
            window_seconds,
        }
    }

    fn key(&self) -> String {
        format!("ratelimit:{}", self.name)
    }

    /// Claims one unit of the window budget, erroring when the budget is spent
    pub async fn acquire(&self) -> AppResult<()> {
        let count = self
            .store
            .incr_ex(&self.key(), self.window_seconds)
            .await?;

        if count > self.cap {
            tracing::warn!(
                provider = self.name,
                count,
                cap = self.cap,
                "Rate limit window exhausted"
            );
            return Err(AppError::RateLimited(format!(
                "{} exceeded {} calls in the current window",
                self.name, self.cap
            )));
        }

        Ok(())
    }

    /// Non-mutating availability read used by adapter `is_available` checks
    pub async fn is_available(&self) -> AppResult<bool> {
        let count = self
            .store
            .get(&self.key())
            .await?
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        Ok(count < self.cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::MemoryStore;
    use std::time::Duration;

    fn limiter(cap: u64, window_seconds: u64) -> RateLimiter {
        RateLimiter::new(Arc::new(MemoryStore::new()), "test", cap, window_seconds)
    }

    #[tokio::test]
    async fn test_acquire_up_to_cap() {
        let limiter = limiter(3, 60);
        for _ in 0..3 {
            limiter.acquire().await.unwrap();
        }
        let err = limiter.acquire().await.unwrap_err();
        assert!(matches!(err, AppError::RateLimited(_)));
    }

    #[tokio::test]
    async fn test_unavailable_after_cap_reached() {
        let limiter = limiter(2, 60);
        assert!(limiter.is_available().await.unwrap());
        limiter.acquire().await.unwrap();
        assert!(limiter.is_available().await.unwrap());
        limiter.acquire().await.unwrap();
        assert!(!limiter.is_available().await.unwrap());
    }

    #[tokio::test]
    async fn test_availability_resets_after_window() {
        let limiter = limiter(1, 1);
        limiter.acquire().await.unwrap();
        assert!(!limiter.is_available().await.unwrap());

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(limiter.is_available().await.unwrap());
        limiter.acquire().await.unwrap();
    }

    #[tokio::test]
    async fn test_availability_check_does_not_consume_budget() {
        let limiter = limiter(1, 60);
        for _ in 0..5 {
            assert!(limiter.is_available().await.unwrap());
        }
        limiter.acquire().await.unwrap();
    }
}
