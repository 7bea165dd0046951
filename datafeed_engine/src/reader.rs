//! Read path for downstream consumers (the backtesting layer).
//!
//! Thin read-through wrapper over the store. When a requested series is
//! empty, the reader triggers exactly one on-demand sync for that key and
//! retries the read once — the only place ingestion happens outside the
//! scheduler's cadence.

use std::sync::Arc;

use tracing::info;

use market_source::models::{Candle, SeriesKey};

use crate::store::{QueryRange, SeriesStore, StoreError};
use crate::sync::SyncCoordinator;

/// Read-through access to stored candle series.
pub struct CandleReader {
    store: Arc<SeriesStore>,
    coordinator: Arc<SyncCoordinator>,
    /// Backfill depth used when an on-demand sync is triggered.
    on_demand_lookback_ms: i64,
}

impl CandleReader {
    /// Builds a reader over the shared store and coordinator.
    pub fn new(store: Arc<SeriesStore>, coordinator: Arc<SyncCoordinator>, on_demand_lookback_ms: i64) -> Self {
        Self { store, coordinator, on_demand_lookback_ms }
    }

    /// Returns the series ascending by timestamp. An empty result triggers
    /// one on-demand sync before the single retry; a failing on-demand sync
    /// degrades to the (empty) stored answer rather than erroring the read.
    pub async fn candles(&self, key: &SeriesKey, range: QueryRange) -> Result<Vec<Candle>, StoreError> {
        let rows = self.store.query(key, range)?;
        if !rows.is_empty() {
            return Ok(rows);
        }

        info!(series = %key, "series empty, running on-demand sync");
        if let Err(err) = self.coordinator.sync_series(key, self.on_demand_lookback_ms).await {
            info!(series = %key, %err, "on-demand sync failed");
            return Ok(rows);
        }
        self.store.query(key, range)
    }
}
