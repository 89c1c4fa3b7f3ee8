//! High-level cache service for web applications.
//!
//! Provides a convenient wrapper around [`CacheClient`] with Arc for easy sharing.

use crate::backend::CacheBackend;
use crate::client::{CacheClient, FetchRequest};
use crate::error::Result;
use crate::registry::FetcherRegistry;
use crate::value::CacheValue;
use std::sync::Arc;

/// High-level cache service for web applications.
///
/// Wraps `CacheClient` in `Arc` for easy sharing across tasks. Every clone
/// shares one in-flight table, so fetches coalesce across all of them.
///
/// # Example
///
/// ```ignore
/// use flight_cache::{CacheService, FetchRequest, FetcherRegistry, backend::InMemoryBackend};
///
/// let registry = FetcherRegistry::new()
///     .register("user:1", |id: u64| async move { load_user(id).await });
/// let cache = CacheService::new(InMemoryBackend::new(), registry);
/// cache.initialize().await?;
///
/// // In your web service struct
/// pub struct UserService {
///     cache: CacheService<InMemoryBackend, u64, serde_json::Value>,
/// }
///
/// impl UserService {
///     pub async fn get(&self, id: u64) -> Result<serde_json::Value> {
///         self.cache.fetch(FetchRequest::new("user:1", id)).await
///     }
/// }
/// ```
pub struct CacheService<B, P, V> {
    client: Arc<CacheClient<B, P, V>>,
}

impl<B, P, V> Clone for CacheService<B, P, V> {
    fn clone(&self) -> Self {
        CacheService {
            client: Arc::clone(&self.client),
        }
    }
}

impl<B, P, V> CacheService<B, P, V>
where
    B: CacheBackend,
    P: Send + 'static,
    V: CacheValue,
{
    /// Create a new cache service with default client settings.
    pub fn new(backend: B, registry: FetcherRegistry<P, V>) -> Self {
        Self::from_client(CacheClient::new(backend, registry))
    }

    /// Wrap a client configured through [`CacheClient::builder`].
    pub fn from_client(client: CacheClient<B, P, V>) -> Self {
        CacheService {
            client: Arc::new(client),
        }
    }

    /// See [`CacheClient::initialize`].
    ///
    /// # Errors
    /// Returns `Err` if the backend cannot connect.
    pub async fn initialize(&self) -> Result<()> {
        self.client.initialize().await
    }

    /// See [`CacheClient::fetch`].
    ///
    /// # Errors
    /// Same error cases as `CacheClient::fetch()`.
    pub async fn fetch(&self, request: FetchRequest<P>) -> Result<V> {
        self.client.fetch(request).await
    }

    /// See [`CacheClient::cleanup`].
    ///
    /// # Errors
    /// Returns the first backend delete error.
    pub async fn cleanup(&self, additional_keys: &[&str]) -> Result<()> {
        self.client.cleanup(additional_keys).await
    }

    /// See [`CacheClient::teardown`].
    ///
    /// # Errors
    /// Returns `Err` if the backend fails to disconnect.
    pub async fn teardown(&self) -> Result<()> {
        self.client.teardown().await
    }

    /// Get a reference to the underlying client.
    ///
    /// Use this if you need direct access to client methods.
    pub fn client(&self) -> &CacheClient<B, P, V> {
        &self.client
    }
}
