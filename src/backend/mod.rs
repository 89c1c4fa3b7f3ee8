//! Key-value store backends.
//!
//! The cache client talks to its store only through [`CacheBackend`]. A backend
//! owns one logical session: [`CacheBackend::connect`] opens it, and
//! [`CacheBackend::disconnect`] closes it.

use crate::error::Result;
use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[cfg(feature = "inmemory")]
pub mod inmemory;
#[cfg(feature = "redis")]
pub mod redis;

#[cfg(feature = "inmemory")]
pub use inmemory::InMemoryBackend;
#[cfg(feature = "redis")]
pub use redis::{RedisBackend, RedisConfig};

/// Expiration applied to a value when it is written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Expiration {
    /// Expire after this many seconds (`EX`).
    Seconds(u64),
    /// Expire after this many milliseconds (`PX`).
    Millis(u64),
    /// Expire at this unix time in seconds (`EXAT`).
    AtUnixSeconds(u64),
    /// Expire at this unix time in milliseconds (`PXAT`).
    AtUnixMillis(u64),
}

impl Expiration {
    /// Time left from now until this expiration. Past timestamps yield zero.
    pub fn remaining(&self) -> Duration {
        match *self {
            Expiration::Seconds(s) => Duration::from_secs(s),
            Expiration::Millis(ms) => Duration::from_millis(ms),
            Expiration::AtUnixSeconds(s) => until_unix(Duration::from_secs(s)),
            Expiration::AtUnixMillis(ms) => until_unix(Duration::from_millis(ms)),
        }
    }
}

fn until_unix(at: Duration) -> Duration {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO);
    at.saturating_sub(now)
}

/// Write condition for a `set`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetCondition {
    /// Only write when the key does not exist (`NX`).
    IfAbsent,
    /// Only write when the key already exists (`XX`).
    IfPresent,
}

/// Options forwarded verbatim to [`CacheBackend::set`].
///
/// The cache client never interprets these; each backend maps them onto its
/// own write semantics.
///
/// # Example
///
/// ```
/// use flight_cache::backend::SetOptions;
/// use std::time::Duration;
///
/// let options = SetOptions::default()
///     .with_ttl(Duration::from_secs(300))
///     .only_if_absent();
/// assert!(options.expiration.is_some());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Expiration for the written value. `None` = backend default or infinite.
    pub expiration: Option<Expiration>,

    /// Conditional write.
    pub condition: Option<SetCondition>,

    /// Retain the existing time-to-live of the key (`KEEPTTL`).
    pub keep_ttl: bool,
}

impl SetOptions {
    /// Expire after `ttl`, millisecond precision.
    ///
    /// Anything under one millisecond, zero included, is rounded up to
    /// `Millis(1)`; stores reject a zero expire time.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        self.expiration = Some(if millis % 1000 == 0 {
            Expiration::Seconds(millis / 1000)
        } else {
            Expiration::Millis(millis)
        });
        self
    }

    pub fn with_expiration(mut self, expiration: Expiration) -> Self {
        self.expiration = Some(expiration);
        self
    }

    pub fn only_if_absent(mut self) -> Self {
        self.condition = Some(SetCondition::IfAbsent);
        self
    }

    pub fn only_if_present(mut self) -> Self {
        self.condition = Some(SetCondition::IfPresent);
        self
    }

    pub fn keep_ttl(mut self) -> Self {
        self.keep_ttl = true;
        self
    }
}

/// Trait for key-value store backends.
///
/// **IMPORTANT:** All methods use `&self` instead of `&mut self` to allow concurrent access.
/// Backend implementations should use interior mutability or external storage.
///
/// **ASYNC:** All methods return `Send` futures so cache writes can run on
/// spawned tasks. Implementations may simply write `async fn`.
pub trait CacheBackend: Send + Sync + Clone + 'static {
    /// Open the backend session.
    ///
    /// # Errors
    /// Returns `Err` if the connection cannot be established.
    fn connect(&self) -> impl Future<Output = Result<()>> + Send;

    /// Close the backend session.
    ///
    /// # Errors
    /// Returns `Err` if closing fails.
    fn disconnect(&self) -> impl Future<Output = Result<()>> + Send;

    /// Retrieve the raw value for `key`.
    ///
    /// # Returns
    /// - `Ok(Some(raw))` - Value found in store
    /// - `Ok(None)` - Key absent
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs (connection lost, etc.)
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Store `value` under `key` with the given options.
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs
    fn set(
        &self,
        key: &str,
        value: String,
        options: &SetOptions,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Remove `key`.
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs
    fn delete(&self, key: &str) -> impl Future<Output = Result<()>> + Send;

    /// Check if key exists in the store (optional optimization).
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs
    fn exists(&self, key: &str) -> impl Future<Output = Result<bool>> + Send {
        async move { Ok(self.get(key).await?.is_some()) }
    }

    /// Health check - verify backend is accessible.
    ///
    /// # Errors
    /// Returns `Err` if backend is not accessible
    fn health_check(&self) -> impl Future<Output = Result<bool>> + Send {
        async { Ok(true) }
    }
}

#[cfg(all(test, feature = "inmemory"))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_backend_exists_default() {
        let backend = InMemoryBackend::connected();
        backend
            .set("key", "value".to_string(), &SetOptions::default())
            .await
            .expect("Failed to set key");
        assert!(backend.exists("key").await.expect("Failed to check exists"));
        assert!(!backend
            .exists("nonexistent")
            .await
            .expect("Failed to check exists"));
    }

    #[test]
    fn test_set_options_with_ttl_whole_seconds() {
        let options = SetOptions::default().with_ttl(Duration::from_secs(60));
        assert_eq!(options.expiration, Some(Expiration::Seconds(60)));
    }

    #[test]
    fn test_set_options_with_ttl_sub_second() {
        let options = SetOptions::default().with_ttl(Duration::from_millis(1500));
        assert_eq!(options.expiration, Some(Expiration::Millis(1500)));
    }

    #[test]
    fn test_set_options_with_ttl_below_one_milli() {
        let zero = SetOptions::default().with_ttl(Duration::ZERO);
        assert_eq!(zero.expiration, Some(Expiration::Millis(1)));

        let micros = SetOptions::default().with_ttl(Duration::from_micros(400));
        assert_eq!(micros.expiration, Some(Expiration::Millis(1)));
    }

    #[test]
    fn test_set_options_conditions() {
        assert_eq!(
            SetOptions::default().only_if_absent().condition,
            Some(SetCondition::IfAbsent)
        );
        assert_eq!(
            SetOptions::default().only_if_present().condition,
            Some(SetCondition::IfPresent)
        );
        assert!(SetOptions::default().keep_ttl().keep_ttl);
    }

    #[test]
    fn test_expiration_in_the_past_is_zero() {
        assert_eq!(Expiration::AtUnixSeconds(1).remaining(), Duration::ZERO);
        assert_eq!(
            Expiration::Millis(250).remaining(),
            Duration::from_millis(250)
        );
    }
}
