//! # flight-cache
//!
//! A cache-aside client for Rust with single-flight fetches.
//!
//! ## Features
//!
//! - **Cache-aside reads:** Values come from the store first, and from a registered fetcher on a miss
//! - **Single-flight:** Concurrent misses for one key share a single fetcher run
//! - **Backend Agnostic:** Support for in-memory, Redis, and custom backends
//! - **Typed values:** Plain strings, `serde_json::Value`, or any serde type via [`Json`]
//! - **Hooks:** Per-key value processors for hits, and event hooks for diagnostics
//!
//! ## Quick Start
//!
//! ### For Web Applications (Recommended)
//!
//! Use [`CacheService`] for easy sharing across tasks:
//!
//! ```ignore
//! use flight_cache::{CacheService, FetchRequest, FetcherRegistry, backend::InMemoryBackend};
//! use serde_json::Value;
//!
//! // 1. Register one fetcher per key
//! let registry = FetcherRegistry::new()
//!     .register("hello", |n: u64| async move {
//!         Ok(Value::from(n))
//!     });
//!
//! // 2. Create the service and open the store connection
//! let cache = CacheService::new(InMemoryBackend::new(), registry);
//! cache.initialize().await?;
//!
//! // 3. Use it - CacheService is Clone for task sharing
//! let cache_clone = cache.clone();  // Cheap - just Arc increment
//! let value = cache_clone.fetch(FetchRequest::new("hello", 123)).await?;
//!
//! // 4. Shut down
//! cache.cleanup(&[]).await?;
//! cache.teardown().await?;
//! ```
//!
//! ### For Custom Patterns (Advanced)
//!
//! Use [`CacheClient::builder`] for explicit control:
//!
//! ```ignore
//! use flight_cache::{CacheClient, ValueProcessors, strategy::WriteMode};
//!
//! let client = CacheClient::builder(backend, registry)
//!     .with_value_processors(ValueProcessors::new().with("hello", parse_number))
//!     .with_write_mode(WriteMode::Awaited)
//!     .build();
//! ```
//!
//! Fetches spawn onto the current tokio runtime, so the client must be used
//! from within one.

#[macro_use]
extern crate log;

pub mod backend;
pub mod client;
pub mod error;
pub mod observability;
pub mod registry;
pub mod service;
pub mod strategy;
pub mod value;

// Re-exports for convenience
pub use backend::{CacheBackend, SetOptions};
pub use client::{CacheClient, CacheClientBuilder, ClientState, FetchRequest, SharedFetch};
pub use error::{Error, Result};
pub use observability::CacheEvents;
pub use registry::FetcherRegistry;
pub use service::CacheService;
pub use strategy::WriteMode;
pub use value::{CacheValue, Json, ValueProcessors};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
