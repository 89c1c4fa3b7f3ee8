//! Integration tests for flight-cache
//!
//! These tests verify end-to-end cache behavior across all components.

use flight_cache::backend::{CacheBackend, InMemoryBackend, SetOptions};
use flight_cache::{
    CacheClient, CacheService, Error, FetchRequest, FetcherRegistry, ValueProcessors, WriteMode,
};
use futures::future::join_all;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const FETCH_DELAY: Duration = Duration::from_millis(50);

/// Give a background write time to land.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(25)).await;
}

/// Registry `{ hello: n => n after a delay }`, recording every invocation.
fn hello_registry(seen: Arc<Mutex<Vec<u64>>>) -> FetcherRegistry<u64, Value> {
    FetcherRegistry::new().register("hello", move |n: u64| {
        let seen = Arc::clone(&seen);
        async move {
            seen.lock().expect("seen lock").push(n);
            tokio::time::sleep(FETCH_DELAY).await;
            Ok(Value::from(n))
        }
    })
}

async fn ready_client<P, V>(
    registry: FetcherRegistry<P, V>,
) -> (InMemoryBackend, CacheClient<InMemoryBackend, P, V>)
where
    P: Send + 'static,
    V: flight_cache::CacheValue,
{
    let backend = InMemoryBackend::new();
    let client = CacheClient::new(backend.clone(), registry);
    client.initialize().await.expect("Failed to initialize");
    (backend, client)
}

/// Test 1: Concurrent misses coalesce
///
/// Three concurrent `fetch("hello", 123)` calls before the delay elapses:
/// - exactly one fetcher invocation, with `123`
/// - all three resolve to `123`
#[tokio::test]
async fn test_concurrent_misses_invoke_fetcher_once() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let (_backend, client) = ready_client(hello_registry(seen.clone())).await;

    let results = join_all((0..3).map(|_| client.fetch(FetchRequest::new("hello", 123)))).await;

    assert_eq!(*seen.lock().expect("seen lock"), vec![123]);
    for result in results {
        assert_eq!(result.expect("Failed to fetch"), json!(123));
    }
    println!("✓ Three callers shared one fetch");
}

/// Test 2: Write-after-fetch
///
/// Once the first round settles and the write lands, a fourth call is served
/// from the store without a new fetcher invocation.
#[tokio::test]
async fn test_settled_value_is_served_from_store() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let (backend, client) = ready_client(hello_registry(seen.clone())).await;

    join_all((0..3).map(|_| client.fetch(FetchRequest::new("hello", 123)))).await;
    settle().await;

    assert_eq!(
        backend.get("hello").await.expect("Failed to get"),
        Some("123".to_string())
    );

    let started = Instant::now();
    let fourth = client
        .fetch(FetchRequest::new("hello", 123))
        .await
        .expect("Failed to fetch");

    assert_eq!(fourth, json!("123"));
    assert!(started.elapsed() < FETCH_DELAY);
    assert_eq!(seen.lock().expect("seen lock").len(), 1);
}

/// Test 3: Failure isolation
///
/// A rejecting fetcher is not cached: the next call invokes it again.
#[tokio::test]
async fn test_failed_fetch_is_retried_by_next_call() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let registry = FetcherRegistry::<(), Value>::new().register("bad", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Err(Error::FetchError("boom".to_string())) }
    });
    let (backend, client) = ready_client(registry).await;

    let first = client.fetch(FetchRequest::new("bad", ())).await;
    assert_eq!(first, Err(Error::FetchError("boom".to_string())));
    assert!(!client.is_in_flight("bad"));

    let second = client.fetch(FetchRequest::new("bad", ())).await;
    assert_eq!(second, Err(Error::FetchError("boom".to_string())));

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(backend.get("bad").await.expect("Failed to get").is_none());
}

/// Test 4: Cleanup deletes registry keys plus extras
#[tokio::test]
async fn test_cleanup_with_additional_keys() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let registry =
        hello_registry(seen).register("world", |n: u64| async move { Ok(Value::from(n + 1)) });
    let (backend, client) = ready_client(registry).await;

    for key in ["hello", "world", "extraKey"] {
        backend
            .set(key, "cached".to_string(), &SetOptions::default())
            .await
            .expect("Failed to set");
    }

    client.cleanup(&["extraKey"]).await.expect("Failed to clean up");

    for key in ["hello", "world", "extraKey"] {
        assert!(
            backend.get(key).await.expect("Failed to get").is_none(),
            "{} should be deleted",
            key
        );
    }
    assert_eq!(client.in_flight_len(), 0);
    assert!(backend.is_empty());
}

/// Test 5: Value processor on hits
///
/// After a fetch caches the string "123", the next fetch returns the number.
#[tokio::test]
async fn test_value_processor_turns_hit_into_number() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let processors = ValueProcessors::new().with("hello", |raw: &str| {
        raw.parse::<f64>()
            .map(|n| json!(n))
            .map_err(|e| Error::ProcessorError(e.to_string()))
    });
    let client = CacheClient::builder(InMemoryBackend::new(), hello_registry(seen.clone()))
        .with_value_processors(processors)
        .build();
    client.initialize().await.expect("Failed to initialize");

    client
        .fetch(FetchRequest::new("hello", 123))
        .await
        .expect("Failed to fetch");
    settle().await;

    let cached = client
        .fetch(FetchRequest::new("hello", 123))
        .await
        .expect("Failed to fetch");

    assert!(cached.is_number(), "expected a number, got {}", cached);
    assert_eq!(cached.as_f64(), Some(123.0));
    assert_eq!(seen.lock().expect("seen lock").len(), 1);
}

/// Test 6: Distinct keys never share a flight or wait on each other
#[tokio::test]
async fn test_distinct_keys_are_independent() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let registry =
        hello_registry(seen.clone()).register("fast", |n: u64| async move { Ok(Value::from(n)) });
    let (_backend, client) = ready_client(registry).await;

    let (slow, fast) = tokio::join!(client.fetch(FetchRequest::new("hello", 1)), async {
        let started = Instant::now();
        let value = client.fetch(FetchRequest::new("fast", 2)).await;
        (value, started.elapsed())
    });

    assert_eq!(slow.expect("Failed to fetch"), json!(1));
    let (fast_value, fast_elapsed) = fast;
    assert_eq!(fast_value.expect("Failed to fetch"), json!(2));
    assert!(fast_elapsed < FETCH_DELAY, "fast key waited on slow key");
}

/// Test 7: Cleanup on an empty store is a no-op
#[tokio::test]
async fn test_cleanup_on_empty_store_succeeds() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let (_backend, client) = ready_client(hello_registry(seen)).await;

    client.cleanup(&[]).await.expect("Failed to clean up");
    client.cleanup(&["never-set"]).await.expect("Failed to clean up");
    assert_eq!(client.in_flight_len(), 0);
}

/// Test 8: Cache identity is the key alone
///
/// A second parameter set is answered by the flight started for the first.
#[tokio::test]
async fn test_params_do_not_split_cache_identity() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let (_backend, client) = ready_client(hello_registry(seen.clone())).await;

    let (first, second) = tokio::join!(
        client.fetch(FetchRequest::new("hello", 1)),
        client.fetch(FetchRequest::new("hello", 2)),
    );

    assert_eq!(first.expect("Failed to fetch"), json!(1));
    assert_eq!(second.expect("Failed to fetch"), json!(1));
    assert_eq!(*seen.lock().expect("seen lock"), vec![1]);
}

/// Test 9: Expiration from set options
#[tokio::test]
async fn test_ttl_from_set_options_expires_value() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let client = CacheClient::builder(InMemoryBackend::new(), hello_registry(seen.clone()))
        .with_write_mode(WriteMode::Awaited)
        .build();
    client.initialize().await.expect("Failed to initialize");

    let short = SetOptions::default().with_ttl(Duration::from_millis(40));
    client
        .fetch(FetchRequest::new("hello", 5).with_set_options(short.clone()))
        .await
        .expect("Failed to fetch");
    client
        .fetch(FetchRequest::new("hello", 5).with_set_options(short.clone()))
        .await
        .expect("Failed to fetch");
    assert_eq!(seen.lock().expect("seen lock").len(), 1);

    tokio::time::sleep(Duration::from_millis(80)).await;
    client
        .fetch(FetchRequest::new("hello", 5).with_set_options(short))
        .await
        .expect("Failed to fetch");
    assert_eq!(seen.lock().expect("seen lock").len(), 2);
}

/// Test 10: Service lifecycle across tasks
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_service_full_lifecycle() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let service = CacheService::new(InMemoryBackend::new(), hello_registry(seen.clone()));
    service.initialize().await.expect("Failed to initialize");

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.fetch(FetchRequest::new("hello", 42)).await })
        })
        .collect();

    for handle in handles {
        let value = handle.await.expect("Task panicked").expect("Failed to fetch");
        assert!(value == json!(42) || value == json!("42"));
    }
    assert_eq!(seen.lock().expect("seen lock").len(), 1);

    service.cleanup(&[]).await.expect("Failed to clean up");
    service.teardown().await.expect("Failed to tear down");

    let after = service.fetch(FetchRequest::new("hello", 42)).await;
    assert!(matches!(after, Err(Error::NotConnected(_))));
}
