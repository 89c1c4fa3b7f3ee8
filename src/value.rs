//! Values held by the cache and their raw store representation.
//!
//! The store only holds strings. A [`CacheValue`] knows how to turn itself into
//! that raw string when a fetched value is written, and how to come back from it
//! when a key is read. Per-key [`ValueProcessors`] override the way back for
//! cache hits, e.g. to parse a number out of a string that was written earlier.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// A value that can be stored as a raw string.
///
/// # Example
///
/// ```
/// use flight_cache::CacheValue;
///
/// let raw = "hello".to_string().to_raw().unwrap();
/// assert_eq!(String::from_raw(&raw).unwrap(), "hello");
/// ```
pub trait CacheValue: Clone + Send + Sync + 'static {
    /// Raw representation written to the store.
    ///
    /// # Errors
    /// Returns `Err` if the value cannot be represented as a string
    fn to_raw(&self) -> Result<String>;

    /// Value read back from the store when no processor is registered for the key.
    ///
    /// # Errors
    /// Returns `Err` if the raw string is not a valid representation
    fn from_raw(raw: &str) -> Result<Self>;
}

impl CacheValue for String {
    fn to_raw(&self) -> Result<String> {
        Ok(self.clone())
    }

    fn from_raw(raw: &str) -> Result<Self> {
        Ok(raw.to_string())
    }
}

/// Dynamic values behave like a plain string store: strings are written
/// verbatim, everything else as JSON text, and reads always come back as
/// [`serde_json::Value::String`]. Register a value processor to get typed
/// values back on hits.
impl CacheValue for serde_json::Value {
    fn to_raw(&self) -> Result<String> {
        match self {
            serde_json::Value::String(s) => Ok(s.clone()),
            other => Ok(other.to_string()),
        }
    }

    fn from_raw(raw: &str) -> Result<Self> {
        Ok(serde_json::Value::String(raw.to_string()))
    }
}

/// Typed value stored as JSON.
///
/// # Example
///
/// ```
/// use flight_cache::{CacheValue, Json};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
/// struct User { id: u64, name: String }
///
/// let user = Json(User { id: 1, name: "Alice".into() });
/// let raw = user.to_raw().unwrap();
/// assert_eq!(Json::<User>::from_raw(&raw).unwrap(), user);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> CacheValue for Json<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn to_raw(&self) -> Result<String> {
        serde_json::to_string(&self.0).map_err(|e| Error::SerializationError(e.to_string()))
    }

    fn from_raw(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map(Json)
            .map_err(|e| Error::DeserializationError(e.to_string()))
    }
}

/// Transform applied to a raw cached string on a cache hit.
pub type ValueProcessor<V> = Arc<dyn Fn(&str) -> Result<V> + Send + Sync>;

/// Per-key value processors.
///
/// Applied only when a key is served from the store. Values returned straight
/// from a fetcher are never processed.
pub struct ValueProcessors<V> {
    processors: HashMap<String, ValueProcessor<V>>,
}

impl<V: CacheValue> ValueProcessors<V> {
    pub fn new() -> Self {
        ValueProcessors {
            processors: HashMap::new(),
        }
    }

    /// Register the processor for `key`, replacing any earlier one.
    pub fn with<F>(mut self, key: impl Into<String>, processor: F) -> Self
    where
        F: Fn(&str) -> Result<V> + Send + Sync + 'static,
    {
        self.processors.insert(key.into(), Arc::new(processor));
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.processors.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Turn a raw cached string into a value for `key`.
    ///
    /// Falls back to [`CacheValue::from_raw`] when no processor is registered.
    ///
    /// # Errors
    /// Returns whatever the processor or `from_raw` returns.
    pub fn process(&self, key: &str, raw: &str) -> Result<V> {
        match self.processors.get(key) {
            Some(processor) => processor(raw),
            None => V::from_raw(raw),
        }
    }
}

impl<V: CacheValue> Default for ValueProcessors<V> {
    fn default() -> Self {
        Self::new()
    }
}
