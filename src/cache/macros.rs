/// Read-through caching for provider calls.
///
/// Looks `$key` up in `$cache`. On a hit the cached value is returned. On a
/// miss `$fetch` is awaited, a successful value is stored for `$ttl` and then
/// returned. Errors propagate with `?` and are never cached.
///
/// # Arguments
/// * `$cache`: a [`Cache`](crate::cache::Cache).
/// * `$key`: anything `Display`, normally a [`CacheKey`](crate::cache::CacheKey).
/// * `$ttl`: a `Duration`.
/// * `$fetch`: a future resolving to `AppResult<T>`.
///
/// # Example
/// ```rust,ignore
/// pub async fn genres(&self, cancel: &CancellationToken) -> AppResult<Vec<Genre>> {
///     let key = CacheKey::Genres;
///     cached!(self.cache, key, key.ttl(&self.ttls), self.fetch_genres(cancel))
/// }
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $fetch:expr) => {{
        let key = $key.to_string();
        if let Some(cached) = $cache.get(&key) {
            Ok(cached)
        } else {
            let value = $fetch.await?;
            $cache.set(&key, &value, $ttl);
            Ok(value)
        }
    }};
}
