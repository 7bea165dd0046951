//! Sync coordinator: decides what each series still needs and fetches it.
//!
//! For one series the window is `(high-water mark + one timeframe, now]`,
//! or `now - lookback` for a series never fetched before. Batch runs walk
//! the tracked matrix strictly sequentially, collect a per-key result
//! instead of throwing, and pace themselves between series so no upstream
//! sees a burst.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use indexmap::IndexMap;
use thiserror::Error;
use tracing::{error, info};

use market_source::{
    adapters::SourceAdapter,
    models::{SeriesKey, SourceId},
    paginate::fetch_range,
};

use crate::store::{SeriesStore, StoreError};

/// Failure syncing one series; never aborts the rest of a batch.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The series names a source with no registered adapter.
    #[error("no adapter registered for source {0}")]
    UnknownSource(SourceId),
    /// The storage layer rejected the read or write.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What one series sync did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesOutcome {
    /// The stored series already reaches the live edge; no adapter call.
    UpToDate,
    /// The adapter has no usable credentials and was skipped.
    SourceUnavailable,
    /// Fetched and committed this many new rows (zero is normal near the
    /// live edge).
    Inserted(u64),
}

/// Aggregated result of one batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Per-series outcome, in batch order.
    pub results: Vec<(SeriesKey, Result<SeriesOutcome, SyncError>)>,
    /// New rows per source across the batch.
    pub inserted_by_source: IndexMap<SourceId, u64>,
}

impl BatchReport {
    /// New rows across every source.
    pub fn total_inserted(&self) -> u64 {
        self.inserted_by_source.values().sum()
    }

    /// Series whose sync failed.
    pub fn failures(&self) -> impl Iterator<Item = (&SeriesKey, &SyncError)> {
        self.results
            .iter()
            .filter_map(|(key, res)| res.as_ref().err().map(|e| (key, e)))
    }
}

/// Drives incremental sync for tracked series against a fixed adapter
/// registry and one shared store. Owned by the caller; there is no global
/// instance.
pub struct SyncCoordinator {
    store: Arc<SeriesStore>,
    adapters: IndexMap<SourceId, Box<dyn SourceAdapter>>,
    call_delay: Duration,
    series_delay: Duration,
}

impl SyncCoordinator {
    /// Builds a coordinator over an adapter registry.
    pub fn new(
        store: Arc<SeriesStore>,
        adapters: IndexMap<SourceId, Box<dyn SourceAdapter>>,
        call_delay: Duration,
        series_delay: Duration,
    ) -> Self {
        Self { store, adapters, call_delay, series_delay }
    }

    /// The store this coordinator commits to.
    pub fn store(&self) -> &Arc<SeriesStore> {
        &self.store
    }

    /// Syncs one series up to the current wall clock.
    pub async fn sync_series(&self, key: &SeriesKey, lookback_ms: i64) -> Result<SeriesOutcome, SyncError> {
        self.sync_series_at(key, lookback_ms, Utc::now().timestamp_millis()).await
    }

    /// Syncs one series against an explicit clock instant. The fetch window
    /// is bounded by `[start, now_ms]` wall-clock time, never by call count.
    pub async fn sync_series_at(
        &self,
        key: &SeriesKey,
        lookback_ms: i64,
        now_ms: i64,
    ) -> Result<SeriesOutcome, SyncError> {
        let step_ms = key.timeframe.duration_ms();
        let start_ms = match self.store.latest_timestamp(key)? {
            // Never re-fetch the stored high-water row.
            Some(latest) => latest + step_ms,
            None => now_ms - lookback_ms,
        };
        if start_ms >= now_ms {
            info!(series = %key, "already current");
            return Ok(SeriesOutcome::UpToDate);
        }

        let adapter = self
            .adapters
            .get(&key.source)
            .ok_or(SyncError::UnknownSource(key.source))?;
        if !adapter.is_ready() {
            info!(series = %key, "source not configured, skipping");
            return Ok(SeriesOutcome::SourceUnavailable);
        }

        let candles = fetch_range(
            adapter.as_ref(),
            &key.symbol,
            key.timeframe,
            start_ms,
            now_ms,
            self.call_delay,
        )
        .await;
        let inserted = self.store.upsert(key, &candles)?;
        info!(series = %key, fetched = candles.len(), inserted, "series synced");
        Ok(SeriesOutcome::Inserted(inserted))
    }

    /// Runs the whole plan sequentially against the current wall clock.
    pub async fn sync_batch(&self, plan: &[(SeriesKey, i64)]) -> BatchReport {
        self.sync_batch_at(plan, Utc::now().timestamp_millis()).await
    }

    /// Runs the whole plan sequentially against an explicit clock instant.
    /// A failing series is recorded and the batch moves on.
    pub async fn sync_batch_at(&self, plan: &[(SeriesKey, i64)], now_ms: i64) -> BatchReport {
        let mut report = BatchReport::default();
        for (i, (key, lookback_ms)) in plan.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.series_delay).await;
            }
            let result = self.sync_series_at(key, *lookback_ms, now_ms).await;
            match &result {
                Ok(SeriesOutcome::Inserted(n)) => {
                    *report.inserted_by_source.entry(key.source).or_insert(0) += n;
                }
                Ok(_) => {}
                Err(err) => error!(series = %key, %err, "series sync failed"),
            }
            report.results.push((key.clone(), result));
        }
        report
    }
}
