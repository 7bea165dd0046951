//! Incremental sync: backfill, skip-when-current, monotonic windows, and
//! per-series failure isolation.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{candle, setup_store, GridAdapter, SharedAdapter};

use datafeed_engine::store::QueryRange;
use datafeed_engine::sync::{SeriesOutcome, SyncCoordinator, SyncError};
use indexmap::IndexMap;
use market_source::{
    adapters::SourceAdapter,
    models::{SeriesKey, SourceId, Timeframe},
};

const HOUR: i64 = 3_600_000;
const DAY: i64 = 24 * HOUR;
// Deliberately off the hourly grid so window math is exercised.
const NOW: i64 = 1_700_000_000_000;

fn coordinator(
    store: Arc<datafeed_engine::store::SeriesStore>,
    adapters: Vec<Arc<GridAdapter>>,
) -> SyncCoordinator {
    let registry: IndexMap<_, _> = adapters
        .into_iter()
        .map(|a| (a.id(), Box::new(SharedAdapter(a)) as Box<dyn SourceAdapter>))
        .collect();
    SyncCoordinator::new(store, registry, Duration::ZERO, Duration::ZERO)
}

#[tokio::test]
async fn first_sync_backfills_the_lookback_window() {
    let (_db, store) = setup_store();
    let okx = Arc::new(GridAdapter::new(SourceId::Okx));
    let coord = coordinator(store.clone(), vec![okx.clone()]);
    let key = SeriesKey::new("BTC/USDT", SourceId::Okx, Timeframe::H1);

    let outcome = coord.sync_series_at(&key, 7 * DAY, NOW).await.unwrap();

    // Seven days of hourly buckets between (NOW - 7d, NOW].
    assert_eq!(outcome, SeriesOutcome::Inserted(168));
    assert_eq!(okx.calls(), 1);
    assert_eq!(store.query(&key, QueryRange::default()).unwrap().len(), 168);
}

#[tokio::test]
async fn immediate_rerun_is_up_to_date_without_a_call() {
    let (_db, store) = setup_store();
    let okx = Arc::new(GridAdapter::new(SourceId::Okx));
    let coord = coordinator(store.clone(), vec![okx.clone()]);
    let key = SeriesKey::new("BTC/USDT", SourceId::Okx, Timeframe::H1);

    coord.sync_series_at(&key, 7 * DAY, NOW).await.unwrap();
    let calls_after_first = okx.calls();

    let outcome = coord.sync_series_at(&key, 7 * DAY, NOW).await.unwrap();

    assert_eq!(outcome, SeriesOutcome::UpToDate);
    assert_eq!(okx.calls(), calls_after_first);
}

#[tokio::test]
async fn incremental_window_starts_one_step_past_the_stored_edge() {
    let (_db, store) = setup_store();
    let okx = Arc::new(GridAdapter::new(SourceId::Okx));
    let coord = coordinator(store.clone(), vec![okx.clone()]);
    let key = SeriesKey::new("BTC/USDT", SourceId::Okx, Timeframe::H1);

    // Pretend an earlier run left the series ending five hours ago.
    let latest = (NOW / HOUR - 5) * HOUR;
    store.upsert(&key, &[candle(latest - HOUR), candle(latest)]).unwrap();

    let outcome = coord.sync_series_at(&key, 365 * DAY, NOW).await.unwrap();

    // The window opens past the stored row, never over it.
    assert_eq!(okx.starts(), vec![latest + HOUR]);
    assert_eq!(outcome, SeriesOutcome::Inserted(5));
    let rows = store.query(&key, QueryRange::default()).unwrap();
    assert_eq!(rows.len(), 7);
    for pair in rows.windows(2) {
        assert_eq!(pair[1].timestamp - pair[0].timestamp, HOUR);
    }
}

#[tokio::test]
async fn unready_source_is_skipped_without_a_call() {
    let (_db, store) = setup_store();
    let tushare = Arc::new(GridAdapter::unready(SourceId::Tushare));
    let coord = coordinator(store.clone(), vec![tushare.clone()]);
    let key = SeriesKey::new("000001.SZ", SourceId::Tushare, Timeframe::D1);

    let outcome = coord.sync_series_at(&key, 365 * DAY, NOW).await.unwrap();

    assert_eq!(outcome, SeriesOutcome::SourceUnavailable);
    assert_eq!(tushare.calls(), 0);
    assert!(store.query(&key, QueryRange::default()).unwrap().is_empty());
}

#[tokio::test]
async fn one_bad_series_never_sinks_the_batch() {
    let (_db, store) = setup_store();
    let okx = Arc::new(GridAdapter::new(SourceId::Okx));
    let coord = coordinator(store.clone(), vec![okx.clone()]);

    let plan = vec![
        (SeriesKey::new("BTC/USDT", SourceId::Okx, Timeframe::H1), 7 * DAY),
        // No adapter registered for this one.
        (SeriesKey::new("AAPL", SourceId::Yahoo, Timeframe::D1), 30 * DAY),
        (SeriesKey::new("ETH/USDT", SourceId::Okx, Timeframe::D1), 7 * DAY),
    ];

    let report = coord.sync_batch_at(&plan, NOW).await;

    assert_eq!(report.results.len(), 3);
    assert!(matches!(report.results[0].1, Ok(SeriesOutcome::Inserted(168))));
    assert!(matches!(report.results[1].1, Err(SyncError::UnknownSource(SourceId::Yahoo))));
    assert!(matches!(report.results[2].1, Ok(SeriesOutcome::Inserted(7))));

    assert_eq!(report.failures().count(), 1);
    assert_eq!(report.total_inserted(), 175);
    assert_eq!(report.inserted_by_source.get(&SourceId::Okx), Some(&175));
}
