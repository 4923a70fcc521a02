//! Polled space-data feed with validation and fallback.
//!
//! Six data domains (station orbit, crew roster, space weather, satellite
//! census, Martian sol, next launch) are fetched concurrently each cycle
//! and merged into one immutable [`ConsolidatedSnapshot`]. A failed or
//! timed-out fetch never breaks a cycle; the affected domain gets a tagged
//! fallback value instead. Each snapshot is range-checked for plausibility,
//! and cycles that validate invalid are retried with linear backoff before
//! the feed settles best-effort.
//!
//! [`RefreshController::spawn`] starts the loop; consumers watch the
//! returned [`FeedHandle`] for state updates and may trigger a manual
//! refetch or a shutdown through it.

pub mod aggregator;
pub mod clients;
pub mod config;
pub mod controller;
pub mod domain;
pub mod errors;
pub mod fetchers;
pub mod utils;
pub mod validator;

pub use aggregator::Aggregator;
pub use config::AppConfig;
pub use controller::{FeedHandle, FeedState, NextStep, Phase, RefreshController, RetryPolicy};
pub use domain::{
    ConsolidatedSnapshot, DataQuality, Domain, DomainData, DomainSnapshot, SnapshotSource,
};
pub use errors::{FetchError, FetchResult};
pub use fetchers::{default_fetchers, DomainFetcher};
pub use validator::{validate, ValidationReport};
