/// A macro to simplify read-through caching.
///
/// Checks the cache first and returns the hit if present. Otherwise runs the
/// provided block, stores the computed value in the background, and returns
/// it. Empty values are never written (see [`crate::db::CachePayload`]).
///
/// # Arguments
/// * `$cache`: the cache instance (must have `get_json` and `put_json`).
/// * `$key`: the [`crate::db::CacheKey`] for the value.
/// * `$ttl`: time-to-live for the cached value in seconds.
/// * `$block`: the async block computing the value on a miss.
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        if let Some(cached) = $cache.get_json(&$key).await? {
            Ok(cached)
        } else {
            let value = $block.await?;
            $cache.put_json(&$key, &value, $ttl);
            Ok(value)
        }
    }};
    ($cache:expr, $key:expr, $ttl:expr, $ty:ty, $block:expr) => {{
        let result: $crate::error::AppResult<$ty> =
            if let Some(cached) = $cache.get_json::<$ty>(&$key).await? {
                Ok(cached)
            } else {
                let value: $ty = $block.await?;
                $cache.put_json(&$key, &value, $ttl);
                Ok(value)
            };
        result
    }};
}
