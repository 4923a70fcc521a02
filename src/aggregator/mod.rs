//! Concurrent fan-out over the domain fetchers.
//!
//! Each refresh cycle spawns every fetcher onto a [`JoinSet`], bounds each
//! one with the configured timeout, and settles every domain independently:
//! a failed or timed-out fetch becomes that domain's fallback snapshot while
//! the others proceed untouched. `collect` therefore always returns a full
//! [`ConsolidatedSnapshot`] covering every registered domain.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinSet;
use tracing::warn;

use crate::domain::{
    ConsolidatedSnapshot, DataQuality, Domain, DomainSnapshot, SnapshotSource,
};
use crate::errors::FetchError;
use crate::fetchers::DomainFetcher;

/// Fans the registered fetchers out concurrently and merges their results.
pub struct Aggregator {
    fetchers: Vec<Arc<dyn DomainFetcher>>,
    fetch_timeout: Duration,
}

impl Aggregator {
    pub fn new(fetchers: Vec<Arc<dyn DomainFetcher>>, fetch_timeout: Duration) -> Self {
        Self {
            fetchers,
            fetch_timeout,
        }
    }

    /// Run one full collection pass.
    ///
    /// `prev` is the previously published snapshot; it seeds per-domain
    /// history (e.g. the orbit ground track) and the update counter. The
    /// returned snapshot's quality is provisionally `High`; the caller
    /// restamps it after validation.
    pub async fn collect(&self, prev: Option<&ConsolidatedSnapshot>) -> ConsolidatedSnapshot {
        let mut join_set = JoinSet::new();
        for (idx, fetcher) in self.fetchers.iter().enumerate() {
            let fetcher = Arc::clone(fetcher);
            let prev_snap = prev.and_then(|p| p.get(fetcher.domain()).cloned());
            let timeout = self.fetch_timeout;
            join_set.spawn(async move { (idx, settle_one(fetcher, prev_snap, timeout).await) });
        }

        // Results land out of order; index slots restore registration order.
        let mut slots: Vec<Option<DomainSnapshot>> =
            (0..self.fetchers.len()).map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((idx, snapshot)) => slots[idx] = Some(snapshot),
                Err(e) => warn!("Domain fetch task failed to join: {:?}", e),
            }
        }

        let mut domains = BTreeMap::new();
        for (idx, slot) in slots.into_iter().enumerate() {
            let snapshot = slot.unwrap_or_else(|| {
                DomainSnapshot::fallback(self.fetchers[idx].fallback(), "fetch task aborted")
            });
            domains.insert(snapshot.domain, snapshot);
        }

        ConsolidatedSnapshot {
            update_id: prev.map_or(1, |p| p.update_id + 1),
            last_updated: Utc::now(),
            quality: DataQuality::High,
            source: provenance_summary(&domains),
            domains,
        }
    }
}

/// Settle a single domain: fetch within the timeout, or substitute fallback.
async fn settle_one(
    fetcher: Arc<dyn DomainFetcher>,
    prev: Option<DomainSnapshot>,
    fetch_timeout: Duration,
) -> DomainSnapshot {
    let label = fetcher.domain().label();
    match tokio::time::timeout(fetch_timeout, fetcher.fetch(prev)).await {
        Ok(Ok(data)) => DomainSnapshot::ok(data, fetcher.origin()),
        Ok(Err(e)) => {
            warn!("{} fetch failed, substituting fallback: {}", label, e);
            DomainSnapshot::fallback(fetcher.fallback(), e.to_string())
        }
        Err(_) => {
            let e = FetchError::TimedOut;
            warn!("{} fetch exceeded {:?}, substituting fallback", label, fetch_timeout);
            DomainSnapshot::fallback(fetcher.fallback(), e.to_string())
        }
    }
}

/// Summarise snapshot provenance, e.g. `"3 live, 2 calculated, 1 fallback"`.
pub fn provenance_summary(domains: &BTreeMap<Domain, DomainSnapshot>) -> String {
    let mut live = 0;
    let mut calculated = 0;
    let mut fallback = 0;
    for snapshot in domains.values() {
        match snapshot.source {
            SnapshotSource::Live => live += 1,
            SnapshotSource::Calculated => calculated += 1,
            SnapshotSource::Fallback => fallback += 1,
        }
    }
    format!("{live} live, {calculated} calculated, {fallback} fallback")
}
