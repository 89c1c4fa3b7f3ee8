//! Cache client - cache-aside reads with single-flight fetches.

use crate::backend::{CacheBackend, SetOptions};
use crate::error::{Error, Result};
use crate::observability::{CacheEvents, NoOpEvents};
use crate::registry::{Fetcher, FetcherRegistry};
use crate::strategy::WriteMode;
use crate::value::{CacheValue, ValueProcessors};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{try_join_all, BoxFuture, Shared};
use futures::FutureExt;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Handle on a fetch in flight. Every clone resolves to the same settlement.
pub type SharedFetch<V> = Shared<BoxFuture<'static, Result<V>>>;

/// One outstanding fetch-and-store cycle.
struct InFlight<V> {
    generation: u64,
    flight: SharedFetch<V>,
}

type FlightTable<V> = Arc<DashMap<String, InFlight<V>>>;

/// Lifecycle state of a [`CacheClient`].
///
/// ```text
/// Constructed --initialize()--> Ready --teardown()--> Closed
/// ```
///
/// `fetch` and `cleanup` are only well-defined in `Ready`. The client does not
/// enforce this; misuse surfaces whatever error the backend raises.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientState {
    Constructed,
    Ready,
    Closed,
}

impl ClientState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => ClientState::Ready,
            2 => ClientState::Closed,
            _ => ClientState::Constructed,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ClientState::Constructed => 0,
            ClientState::Ready => 1,
            ClientState::Closed => 2,
        }
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientState::Constructed => write!(f, "Constructed"),
            ClientState::Ready => write!(f, "Ready"),
            ClientState::Closed => write!(f, "Closed"),
        }
    }
}

/// A single `fetch` call.
///
/// # Example
///
/// ```
/// use flight_cache::{FetchRequest, backend::SetOptions};
/// use std::time::Duration;
///
/// let request = FetchRequest::new("hello", 123_u64)
///     .with_set_options(SetOptions::default().with_ttl(Duration::from_secs(60)));
/// assert_eq!(request.key, "hello");
/// ```
#[derive(Clone, Debug)]
pub struct FetchRequest<P> {
    /// Registry key, also used verbatim as the store key.
    pub key: String,

    /// Forwarded unchanged to the fetcher on a miss.
    pub params: P,

    /// Forwarded unchanged to the store write on a successful fetch.
    ///
    /// `None` falls back to the client's default set options.
    pub set_options: Option<SetOptions>,
}

impl<P> FetchRequest<P> {
    pub fn new(key: impl Into<String>, params: P) -> Self {
        FetchRequest {
            key: key.into(),
            params,
            set_options: None,
        }
    }

    pub fn with_set_options(mut self, options: SetOptions) -> Self {
        self.set_options = Some(options);
        self
    }
}

/// Builder for [`CacheClient`].
pub struct CacheClientBuilder<B, P, V> {
    backend: B,
    registry: FetcherRegistry<P, V>,
    processors: ValueProcessors<V>,
    events: Arc<dyn CacheEvents<V>>,
    default_set_options: SetOptions,
    write_mode: WriteMode,
}

impl<B, P, V> CacheClientBuilder<B, P, V>
where
    B: CacheBackend,
    P: Send + 'static,
    V: CacheValue,
{
    /// Per-key transforms applied to raw values on cache hits.
    pub fn with_value_processors(mut self, processors: ValueProcessors<V>) -> Self {
        self.processors = processors;
        self
    }

    /// Set custom event hooks.
    pub fn with_events<E>(mut self, events: E) -> Self
    where
        E: CacheEvents<V> + 'static,
    {
        self.events = Arc::new(events);
        self
    }

    /// Set options used for writes when a request carries none.
    pub fn with_default_set_options(mut self, options: SetOptions) -> Self {
        self.default_set_options = options;
        self
    }

    /// Choose whether callers wait for the write-back.
    pub fn with_write_mode(mut self, mode: WriteMode) -> Self {
        self.write_mode = mode;
        self
    }

    pub fn build(self) -> CacheClient<B, P, V> {
        CacheClient {
            backend: self.backend,
            registry: Arc::new(self.registry),
            processors: self.processors,
            events: self.events,
            default_set_options: self.default_set_options,
            write_mode: self.write_mode,
            in_flight: Arc::new(DashMap::new()),
            next_generation: AtomicU64::new(0),
            state: AtomicU8::new(ClientState::Constructed.as_u8()),
        }
    }
}

/// Cache-aside client with single-flight fetches.
///
/// Reads go to the store first. On a miss, the fetcher registered for the key
/// runs, and every concurrent caller for that key awaits that one run. A
/// successful result is written back to the store under the same key.
///
/// # Example
///
/// ```no_run
/// use flight_cache::{CacheClient, FetchRequest, FetcherRegistry, backend::InMemoryBackend};
///
/// # async fn example() -> flight_cache::Result<()> {
/// let registry = FetcherRegistry::new()
///     .register("hello", |n: u64| async move { Ok(n.to_string()) });
///
/// let client = CacheClient::new(InMemoryBackend::new(), registry);
/// client.initialize().await?;
///
/// let value = client.fetch(FetchRequest::new("hello", 123)).await?;
/// assert_eq!(value, "123");
///
/// client.teardown().await?;
/// # Ok(())
/// # }
/// ```
pub struct CacheClient<B, P, V> {
    backend: B,
    registry: Arc<FetcherRegistry<P, V>>,
    processors: ValueProcessors<V>,
    events: Arc<dyn CacheEvents<V>>,
    default_set_options: SetOptions,
    write_mode: WriteMode,
    in_flight: FlightTable<V>,
    next_generation: AtomicU64,
    state: AtomicU8,
}

impl<B, P, V> CacheClient<B, P, V>
where
    B: CacheBackend,
    P: Send + 'static,
    V: CacheValue,
{
    /// Start building a client over `backend` with the given fetchers.
    pub fn builder(backend: B, registry: FetcherRegistry<P, V>) -> CacheClientBuilder<B, P, V> {
        CacheClientBuilder {
            backend,
            registry,
            processors: ValueProcessors::new(),
            events: Arc::new(NoOpEvents),
            default_set_options: SetOptions::default(),
            write_mode: WriteMode::default(),
        }
    }

    /// Create a client with default settings.
    pub fn new(backend: B, registry: FetcherRegistry<P, V>) -> Self {
        Self::builder(backend, registry).build()
    }

    /// Open the backend connection.
    ///
    /// Must complete before the first `fetch`.
    ///
    /// # Errors
    /// Returns whatever the backend's `connect` returns.
    pub async fn initialize(&self) -> Result<()> {
        if self.state() == ClientState::Ready {
            warn!("initialize() called on a cache client that is already ready");
        }

        self.backend.connect().await?;
        self.set_state(ClientState::Ready);

        info!(
            "✓ Cache client initialized ({} fetchers, write mode: {})",
            self.registry.len(),
            self.write_mode
        );
        Ok(())
    }

    /// Return the value for `request.key`.
    ///
    /// 1. Ask the store. A hit is passed through the key's value processor, if
    ///    any, and returned without touching the in-flight table.
    /// 2. On a miss, join the fetch already in flight for the key, or start one.
    ///    Starting one inserts it into the in-flight table atomically, so at most
    ///    one fetcher run per key is outstanding at any time.
    /// 3. When the run succeeds, the value is written back according to the
    ///    client's [`WriteMode`].
    ///
    /// Cache identity is the key alone. While a value for the key is cached or
    /// in flight, calls with different `params` get that same value.
    ///
    /// # Errors
    ///
    /// - Backend `get` errors, returned as-is and never treated as a miss
    /// - The fetcher's own error, shared by every caller who joined the run
    /// - `Error::UnknownKey` if the store misses and no fetcher is registered
    /// - `Error::FetcherPanicked` if the fetcher panicked
    /// - Backend `set` errors, only in [`WriteMode::Awaited`]
    /// - Value processor errors on a hit
    pub async fn fetch(&self, request: FetchRequest<P>) -> Result<V> {
        let FetchRequest {
            key,
            params,
            set_options,
        } = request;
        self.warn_unless_ready("fetch");
        debug!("» Cache fetch for key: {}", key);

        if let Some(raw) = self.backend.get(&key).await? {
            let value = self.processors.process(&key, &raw);
            self.events.on_cache_hit(&key, &raw);
            return value;
        }
        self.events.on_cache_miss(&key);

        let set_options = set_options.unwrap_or_else(|| self.default_set_options.clone());
        let flight = self.join_or_launch(key, params, set_options)?;
        flight.await
    }

    /// Join the flight for `key`, or launch one.
    ///
    /// The table entry is the single-flight gate: lookup and insertion happen
    /// under the same shard lock, and nothing here awaits.
    fn join_or_launch(
        &self,
        key: String,
        params: P,
        set_options: SetOptions,
    ) -> Result<SharedFetch<V>> {
        let flight = match self.in_flight.entry(key) {
            Entry::Occupied(occupied) => {
                let key = occupied.key().clone();
                let flight = occupied.get().flight.clone();
                drop(occupied);

                debug!("Joining in-flight fetch for {}", key);
                self.events.on_existing_promise_hit(&key, &flight);
                return Ok(flight);
            }
            Entry::Vacant(vacant) => {
                let key = vacant.key().clone();
                let fetcher = self
                    .registry
                    .get(&key)
                    .ok_or_else(|| Error::UnknownKey(key.clone()))?;

                let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                let flight = self.launch(key, generation, fetcher, params, set_options);
                vacant.insert(InFlight {
                    generation,
                    flight: flight.clone(),
                });
                flight
            }
        };

        // Runs the flight to completion even if every caller drops its future.
        let _driver = tokio::spawn(flight.clone());
        Ok(flight)
    }

    /// Wrap a fetcher run into its fetch-and-store cycle.
    fn launch(
        &self,
        key: String,
        generation: u64,
        fetcher: Fetcher<P, V>,
        params: P,
        set_options: SetOptions,
    ) -> SharedFetch<V> {
        let table = Arc::clone(&self.in_flight);
        let backend = self.backend.clone();
        let events = Arc::clone(&self.events);
        let write_mode = self.write_mode;

        async move {
            debug!("Fetching {} (flight {})", key, generation);
            let started = Instant::now();

            // Fetcher code runs here, outside the table's shard lock.
            let fetched = AssertUnwindSafe(async move { fetcher(params).await })
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(Error::FetcherPanicked(key.clone())));

            let value = match fetched {
                Ok(value) => value,
                Err(e) => {
                    release(&table, &key, generation);
                    events.on_fetch_error(&key, &e);
                    return Err(e);
                }
            };
            events.on_fetched(&key, started.elapsed());

            match write_mode {
                WriteMode::Background => {
                    release(&table, &key, generation);
                    match value.to_raw() {
                        Ok(raw) => {
                            let _write = tokio::spawn(async move {
                                match backend.set(&key, raw, &set_options).await {
                                    Ok(()) => debug!("✓ Cached fetched value for {}", key),
                                    Err(e) => {
                                        warn!("Background write failed for {}: {}", key, e);
                                        events.on_write_error(&key, &e);
                                    }
                                }
                            });
                        }
                        Err(e) => {
                            warn!("Fetched value for {} cannot be cached: {}", key, e);
                            events.on_write_error(&key, &e);
                        }
                    }
                }
                WriteMode::Awaited => {
                    let written = match value.to_raw() {
                        Ok(raw) => backend.set(&key, raw, &set_options).await,
                        Err(e) => Err(e),
                    };
                    release(&table, &key, generation);

                    if let Err(e) = written {
                        events.on_write_error(&key, &e);
                        return Err(e);
                    }
                    debug!("✓ Cached fetched value for {}", key);
                }
            }

            Ok(value)
        }
        .boxed()
        .shared()
    }

    /// Delete every registered key plus `additional_keys` from the store, and
    /// forget all in-flight fetches. The connection stays open.
    ///
    /// Deletes are issued concurrently. Fetches already running keep running and
    /// still settle for the callers that joined them.
    ///
    /// # Errors
    /// Returns the first backend `delete` error.
    pub async fn cleanup(&self, additional_keys: &[&str]) -> Result<()> {
        self.warn_unless_ready("cleanup");
        self.in_flight.clear();

        let keys: Vec<&str> = self
            .registry
            .keys()
            .chain(additional_keys.iter().copied())
            .collect();

        try_join_all(keys.iter().map(|key| self.backend.delete(key))).await?;

        info!("✓ Cache cleanup deleted {} keys", keys.len());
        Ok(())
    }

    /// Forget all in-flight fetches and close the backend connection.
    ///
    /// # Errors
    /// Returns whatever the backend's `disconnect` returns.
    pub async fn teardown(&self) -> Result<()> {
        self.in_flight.clear();
        self.backend.disconnect().await?;
        self.set_state(ClientState::Closed);
        info!("✓ Cache client torn down");
        Ok(())
    }

    /// Ask the backend whether it is reachable.
    ///
    /// # Errors
    /// Returns `Err` if the backend health check fails
    pub async fn health_check(&self) -> Result<bool> {
        self.backend.health_check().await
    }

    pub fn state(&self) -> ClientState {
        ClientState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Number of fetches currently in flight.
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.in_flight.contains_key(key)
    }

    pub fn write_mode(&self) -> WriteMode {
        self.write_mode
    }

    /// Get backend reference (for advanced use).
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn registry(&self) -> &FetcherRegistry<P, V> {
        &self.registry
    }

    fn set_state(&self, state: ClientState) {
        self.state.store(state.as_u8(), Ordering::SeqCst);
    }

    fn warn_unless_ready(&self, operation: &str) {
        let state = self.state();
        if state != ClientState::Ready {
            warn!("{}() called on a cache client in state {}", operation, state);
        }
    }
}

/// Drop the table entry for `key` if it still belongs to this flight.
fn release<V>(table: &DashMap<String, InFlight<V>>, key: &str, generation: u64) {
    table.remove_if(key, |_, entry| entry.generation == generation);
}
