//! Diagnostic hooks for cache operations.
//!
//! Implement [`CacheEvents`] to observe what the cache client does with each
//! key: store hits, misses, callers joining a fetch already in flight, fetch
//! failures, and background write failures.
//!
//! ```ignore
//! use flight_cache::observability::CacheEvents;
//!
//! struct HitCounter(std::sync::atomic::AtomicUsize);
//!
//! impl<V> CacheEvents<V> for HitCounter {
//!     fn on_cache_hit(&self, _key: &str, _raw: &str) {
//!         self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
//!     }
//! }
//!
//! // let client = CacheClient::builder(backend, registry)
//! //     .with_events(HitCounter(Default::default()))
//! //     .build();
//! ```
//!
//! Default method bodies log via the `log` crate, so [`LogEvents`] is simply
//! the trait with nothing overridden. The client uses [`NoOpEvents`] unless told
//! otherwise.
//!
//! Hooks run inline on the calling task and must not panic; panics are not
//! caught.

use crate::client::SharedFetch;
use crate::error::Error;
use std::time::Duration;

/// Trait for cache event hooks.
pub trait CacheEvents<V>: Send + Sync {
    /// The store returned a value for `key`.
    fn on_cache_hit(&self, key: &str, raw: &str) {
        debug!("Cache HIT: {} ({} bytes)", key, raw.len());
    }

    /// The store had no value for `key`.
    fn on_cache_miss(&self, key: &str) {
        debug!("Cache MISS: {}", key);
    }

    /// A caller joined the fetch already in flight for `key`.
    fn on_existing_promise_hit(&self, key: &str, _flight: &SharedFetch<V>) {
        debug!("Cache JOIN in-flight fetch: {}", key);
    }

    /// The fetcher for `key` completed successfully.
    fn on_fetched(&self, key: &str, duration: Duration) {
        debug!("Cache FETCH: {} took {:?}", key, duration);
    }

    /// The fetcher for `key` failed; every joined caller receives `error`.
    fn on_fetch_error(&self, key: &str, error: &Error) {
        warn!("Cache FETCH ERROR for {}: {}", key, error);
    }

    /// Writing the fetched value for `key` back to the store failed.
    fn on_write_error(&self, key: &str, error: &Error) {
        warn!("Cache WRITE ERROR for {}: {}", key, error);
    }
}

/// Default events implementation (no-op).
#[derive(Clone, Debug, Default)]
pub struct NoOpEvents;

impl<V> CacheEvents<V> for NoOpEvents {
    fn on_cache_hit(&self, _key: &str, _raw: &str) {}
    fn on_cache_miss(&self, _key: &str) {}
    fn on_existing_promise_hit(&self, _key: &str, _flight: &SharedFetch<V>) {}
    fn on_fetched(&self, _key: &str, _duration: Duration) {}
    fn on_fetch_error(&self, _key: &str, _error: &Error) {}
    fn on_write_error(&self, _key: &str, _error: &Error) {}
}

/// Events implementation that logs every hook.
#[derive(Clone, Debug, Default)]
pub struct LogEvents;

impl<V> CacheEvents<V> for LogEvents {}
