//! Write-back strategies for fetched values.
//!
//! After a fetcher succeeds, its value is written to the store under the same
//! key. [`WriteMode`] decides whether callers wait for that write.
//!
//! | Mode | Callers resolve | Write failure | In-flight entry released |
//! |------|-----------------|---------------|--------------------------|
//! | **Background** | Right after the fetch | Logged, reported to `on_write_error` | Before the write starts |
//! | **Awaited** | After the write lands | Returned to every joined caller | After the write lands |
//!
//! # Trade-offs
//!
//! - **Background** (default): lowest latency. A caller may see the value before
//!   it is durable, and a call arriving in that window fetches again.
//! - **Awaited**: read-your-writes for the next caller, at the cost of one store
//!   round trip on every miss.

/// Strategy enum controlling when the write-back happens.
///
/// # Examples
///
/// ```
/// use flight_cache::strategy::WriteMode;
///
/// assert_eq!(WriteMode::default(), WriteMode::Background);
/// assert_eq!(WriteMode::Awaited.to_string(), "Awaited");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// **Background**: release the in-flight entry, spawn the store write, and
    /// resolve callers without waiting for it.
    #[default]
    Background,

    /// **Awaited**: write to the store, release the in-flight entry, then resolve.
    Awaited,
}

impl std::fmt::Display for WriteMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteMode::Background => write!(f, "Background"),
            WriteMode::Awaited => write!(f, "Awaited"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_mode_display() {
        assert_eq!(WriteMode::Background.to_string(), "Background");
        assert_eq!(WriteMode::Awaited.to_string(), "Awaited");
    }

    #[test]
    fn test_write_mode_default() {
        assert_eq!(WriteMode::default(), WriteMode::Background);
    }
}
