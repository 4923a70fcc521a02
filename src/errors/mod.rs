//! Error types for the fetch layer.
//!
//! Fetch errors never cross the fetcher boundary: the aggregator folds any
//! [`FetchError`] into a fallback snapshot carrying the error text (see
//! `crate::aggregator`). The enum exists so clients and fetchers can use `?`
//! internally and so fallback snapshots record a precise cause.

use thiserror::Error;

/// Errors produced while acquiring one domain's data.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure from the HTTP client.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status.
    #[error("upstream returned status {0}")]
    Status(u16),

    /// Upstream payload did not match the expected shape.
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// The fetch exceeded its bounded time budget.
    #[error("fetch timed out")]
    TimedOut,
}

/// Type alias for fetch results.
pub type FetchResult<T> = Result<T, FetchError>;
