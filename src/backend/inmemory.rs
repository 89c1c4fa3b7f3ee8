//! In-memory cache backend (default, thread-safe, async).
//!
//! Uses DashMap for lock-free concurrent access with per-key sharding.
//! Automatically handles TTL expiration on access.

use super::{CacheBackend, SetCondition, SetOptions};
use crate::error::{Error, Result};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// In-memory cache entry with optional expiration.
struct CacheEntry {
    data: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() > exp)
    }
}

/// Thread-safe async in-memory key-value store.
///
/// Behaves like a small Redis: operations fail with [`Error::NotConnected`]
/// until [`CacheBackend::connect`] is called and again after
/// [`CacheBackend::disconnect`]. Stored data survives a disconnect, the same way
/// a server keeps its keys when a client goes away.
///
/// Clones share the same store and connection flag.
///
/// # Example
///
/// ```no_run
/// use flight_cache::backend::{CacheBackend, InMemoryBackend, SetOptions};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let backend = InMemoryBackend::new();
///     backend.connect().await?;
///
///     backend.set("key1", "value".to_string(), &SetOptions::default()).await?;
///     assert!(backend.get("key1").await?.is_some());
///
///     let options = SetOptions::default().with_ttl(Duration::from_secs(300));
///     backend.set("key2", "expires".to_string(), &options).await?;
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct InMemoryBackend {
    store: Arc<DashMap<String, CacheEntry>>,
    connected: Arc<AtomicBool>,
}

impl InMemoryBackend {
    /// Create a new, not yet connected, in-memory backend.
    pub fn new() -> Self {
        InMemoryBackend {
            store: Arc::new(DashMap::new()),
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a backend that is already connected.
    pub fn connected() -> Self {
        let backend = Self::new();
        backend.connected.store(true, Ordering::SeqCst);
        backend
    }

    /// Whether the session is currently open.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Get the current number of entries, expired ones included.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(Error::NotConnected(
                "in-memory backend is not connected".to_string(),
            ))
        }
    }

    fn live_entry_exists(&self, key: &str) -> bool {
        self.store.get(key).is_some_and(|entry| !entry.is_expired())
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheBackend for InMemoryBackend {
    async fn connect(&self) -> Result<()> {
        self.connected.store(true, Ordering::SeqCst);
        debug!("✓ InMemory CONNECT");
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.ensure_connected()?;
        self.connected.store(false, Ordering::SeqCst);
        debug!("✓ InMemory DISCONNECT");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.ensure_connected()?;

        if let Some(entry) = self.store.get(key) {
            if !entry.is_expired() {
                debug!("✓ InMemory GET {} -> HIT", key);
                return Ok(Some(entry.data.clone()));
            }
        }

        // Only an entry that is still expired; a concurrent set may have replaced it
        self.store.remove_if(key, |_, entry| entry.is_expired());
        debug!("✓ InMemory GET {} -> MISS", key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, options: &SetOptions) -> Result<()> {
        self.ensure_connected()?;

        let exists = self.live_entry_exists(key);
        match options.condition {
            Some(SetCondition::IfAbsent) if exists => {
                debug!("✓ InMemory SET {} skipped (NX, key exists)", key);
                return Ok(());
            }
            Some(SetCondition::IfPresent) if !exists => {
                debug!("✓ InMemory SET {} skipped (XX, key absent)", key);
                return Ok(());
            }
            _ => {}
        }

        let expires_at = if options.keep_ttl && exists {
            self.store.get(key).and_then(|entry| entry.expires_at)
        } else {
            options
                .expiration
                .map(|expiration| Instant::now() + expiration.remaining())
        };

        self.store.insert(
            key.to_string(),
            CacheEntry {
                data: value,
                expires_at,
            },
        );

        match options.expiration {
            Some(expiration) => debug!("✓ InMemory SET {} (expiration: {:?})", key, expiration),
            None => debug!("✓ InMemory SET {}", key),
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.ensure_connected()?;
        self.store.remove(key);
        debug!("✓ InMemory DELETE {}", key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.ensure_connected()?;
        Ok(self.live_entry_exists(key))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.is_connected())
    }
}
