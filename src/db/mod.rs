pub mod cache;
pub mod macros;
pub mod rate_limit;
pub mod store;

pub use cache::{Cache, CacheKey, CachePayload, CacheWriterHandle};
pub use rate_limit::RateLimiter;
pub use store::{KeyValueStore, MemoryStore, RedisStore};
