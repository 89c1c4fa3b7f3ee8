//! Registry of fetchers, the producers behind each cache key.
//!
//! A fetcher is an async function from call parameters to a value. The key it
//! is registered under is also the key its result is cached under.

use crate::error::Result;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Boxed fetcher as stored in the registry.
pub type Fetcher<P, V> = Arc<dyn Fn(P) -> BoxFuture<'static, Result<V>> + Send + Sync>;

/// Mapping from cache key to the fetcher that produces its value.
///
/// Built once, then handed to the cache client, which treats it as read-only.
///
/// # Example
///
/// ```
/// use flight_cache::FetcherRegistry;
///
/// let registry = FetcherRegistry::new()
///     .register("greeting", |name: String| async move { Ok(format!("hello {}", name)) })
///     .register("farewell", |name: String| async move { Ok(format!("bye {}", name)) });
///
/// assert_eq!(registry.len(), 2);
/// assert!(registry.contains("greeting"));
/// ```
pub struct FetcherRegistry<P, V> {
    fetchers: HashMap<String, Fetcher<P, V>>,
}

impl<P, V> FetcherRegistry<P, V>
where
    P: Send + 'static,
    V: Send + 'static,
{
    pub fn new() -> Self {
        FetcherRegistry {
            fetchers: HashMap::new(),
        }
    }

    /// Register the fetcher for `key`, replacing any earlier one.
    pub fn register<F, Fut>(mut self, key: impl Into<String>, fetcher: F) -> Self
    where
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let fetcher: Fetcher<P, V> = Arc::new(move |params| fetcher(params).boxed());
        self.fetchers.insert(key.into(), fetcher);
        self
    }

    /// Get the fetcher registered for `key`.
    pub fn get(&self, key: &str) -> Option<Fetcher<P, V>> {
        self.fetchers.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fetchers.contains_key(key)
    }

    /// Registered keys, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fetchers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fetchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fetchers.is_empty()
    }
}

impl<P, V> Default for FetcherRegistry<P, V>
where
    P: Send + 'static,
    V: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<P, V> fmt::Debug for FetcherRegistry<P, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetcherRegistry")
            .field("keys", &self.fetchers.keys().collect::<Vec<_>>())
            .finish()
    }
}
