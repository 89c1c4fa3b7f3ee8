//! Basic usage example of the cache client.
//!
//! Three concurrent misses share one slow fetch, a later call is served from the
//! store, and a value processor turns the cached string back into a number.

use flight_cache::{
    backend::InMemoryBackend, error::Result, CacheClient, Error, FetchRequest, FetcherRegistry,
    ValueProcessors,
};
use futures::future::join_all;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Debug)
        .try_init()
        .ok();

    println!("\n=== flight-cache - Basic Example ===\n");

    // 1. Register fetchers
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let registry = FetcherRegistry::new().register("hello", move |n: u64| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            println!("  [SOURCE] Computing hello({})", n);
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(Value::from(n))
        }
    });

    let processors = ValueProcessors::new().with("hello", |raw: &str| {
        raw.parse::<u64>()
            .map(Value::from)
            .map_err(|e| Error::ProcessorError(e.to_string()))
    });

    // 2. Build and initialize the client
    println!("1. Initializing in-memory cache backend...");
    let client = CacheClient::builder(InMemoryBackend::new(), registry)
        .with_value_processors(processors)
        .build();
    client.initialize().await?;
    println!("   ✓ Cache client ready\n");

    // 3. Concurrent misses - one fetch
    println!("2. Three concurrent requests for hello(123):");
    let results = join_all((0..3).map(|_| client.fetch(FetchRequest::new("hello", 123)))).await;
    for result in results {
        println!("   ✓ Got {}", result?);
    }
    println!("   ✓ Fetcher ran {} time(s)\n", calls.load(Ordering::SeqCst));

    // Let the background write land
    tokio::time::sleep(Duration::from_millis(50)).await;

    // 4. Cache hit
    println!("3. Fourth request for hello(123):");
    let value = client.fetch(FetchRequest::new("hello", 123)).await?;
    println!(
        "   ✓ Got {} from cache (number: {}), fetcher ran {} time(s)\n",
        value,
        value.is_number(),
        calls.load(Ordering::SeqCst)
    );

    // 5. Shut down
    println!("4. Cleaning up:");
    client.cleanup(&[]).await?;
    client.teardown().await?;
    println!("   ✓ Cache cleared and connection closed\n");

    Ok(())
}
