//! Structured cache events
//!
//! Hits, misses and swallowed write failures are emitted as tracing events
//! under the `diskmemo::cache` target so subscribers can filter them without
//! matching on message text.

/// Emit a cache hit event.
///
/// # Example
/// ```rust,ignore
/// emit_cache_hit!("fetch_profile", "module.api", "3b3f94fa...");
/// ```
#[macro_export]
macro_rules! emit_cache_hit {
    ($name:expr, $namespace:expr, $key:expr) => {
        ::tracing::info!(
            target: "diskmemo::cache",
            event_type = "cache.hit",
            computation = %$name,
            namespace = %$namespace,
            cache_key = %$key,
            "loaded from cache"
        )
    };
}

/// Emit a cache miss event, after the fresh result has been persisted.
#[macro_export]
macro_rules! emit_cache_miss {
    ($name:expr, $namespace:expr, $key:expr) => {
        ::tracing::info!(
            target: "diskmemo::cache",
            event_type = "cache.miss",
            computation = %$name,
            namespace = %$namespace,
            cache_key = %$key,
            "saved to cache"
        )
    };
}

/// Emit a write failure event. The computed value is still returned to the caller.
#[macro_export]
macro_rules! emit_cache_write_failed {
    ($name:expr, $path:expr, $error:expr) => {
        ::tracing::warn!(
            target: "diskmemo::cache",
            event_type = "cache.write_failed",
            computation = %$name,
            path = %$path.display(),
            error = %$error,
            "failed to write to cache"
        )
    };
}
