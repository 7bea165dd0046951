//! Pagination driver behavior against scripted upstreams.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use proptest::prelude::*;

use market_source::{
    adapters::{FetchError, SourceAdapter},
    models::{Candle, SourceId, Timeframe},
    paginate::fetch_range,
};

const TF: Timeframe = Timeframe::H1;
const STEP: i64 = TF.duration_ms();
const T0: i64 = 1_700_000_000_000;

fn grid(n: usize) -> Vec<Candle> {
    (0..n)
        .map(|i| Candle {
            timestamp: T0 + i as i64 * STEP,
            open: 100.0,
            high: 101.0,
            low: 99.0,
            close: 100.5,
            volume: 1.0 + i as f64,
        })
        .collect()
}

/// Upstream serving at most `page` rows per call forward from the cursor.
/// Deliberately ignores the end bound, like exchanges that window only on
/// `since`, and can be scripted to fail on a given call number.
struct WindowedUpstream {
    rows: Vec<Candle>,
    page: Option<usize>,
    fail_on_call: Option<usize>,
    calls: AtomicUsize,
}

impl WindowedUpstream {
    fn new(rows: Vec<Candle>, page: Option<usize>) -> Self {
        Self { rows, page, fail_on_call: None, calls: AtomicUsize::new(0) }
    }

    fn failing_on(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceAdapter for WindowedUpstream {
    fn id(&self) -> SourceId {
        SourceId::Okx
    }

    fn page_size(&self) -> Option<usize> {
        self.page
    }

    async fn fetch(
        &self,
        _symbol: &str,
        _timeframe: Timeframe,
        start_ms: i64,
        _end_ms: i64,
    ) -> Result<Vec<Candle>, FetchError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_call == Some(call) {
            return Err(FetchError::Upstream("scripted failure".into()));
        }
        let batch: Vec<Candle> = self
            .rows
            .iter()
            .filter(|c| c.timestamp >= start_ms)
            .take(self.page.unwrap_or(usize::MAX))
            .copied()
            .collect();
        Ok(batch)
    }
}

fn assert_contiguous(candles: &[Candle]) {
    for pair in candles.windows(2) {
        assert_eq!(pair[1].timestamp - pair[0].timestamp, STEP, "gap or duplicate in output");
    }
}

#[tokio::test]
async fn five_full_pages_are_gap_free() {
    let upstream = WindowedUpstream::new(grid(500), Some(100));
    let end = T0 + 499 * STEP;
    let out = fetch_range(&upstream, "BTC/USDT", TF, T0, end, Duration::ZERO).await;

    assert_eq!(out.len(), 500);
    assert_eq!(out[0].timestamp, T0);
    assert_contiguous(&out);
}

#[tokio::test]
async fn rows_past_the_end_bound_are_dropped() {
    let upstream = WindowedUpstream::new(grid(500), Some(100));
    let end = T0 + 249 * STEP;
    let out = fetch_range(&upstream, "BTC/USDT", TF, T0, end, Duration::ZERO).await;

    assert_eq!(out.len(), 250);
    assert!(out.iter().all(|c| c.timestamp <= end));
    assert_contiguous(&out);
}

#[tokio::test]
async fn failure_on_third_page_keeps_the_first_two() {
    let upstream = WindowedUpstream::new(grid(500), Some(100)).failing_on(3);
    let end = T0 + 499 * STEP;
    let out = fetch_range(&upstream, "BTC/USDT", TF, T0, end, Duration::ZERO).await;

    assert_eq!(out.len(), 200);
    assert_eq!(upstream.calls(), 3);
    assert_contiguous(&out);
}

#[tokio::test]
async fn empty_upstream_stops_after_one_call() {
    let upstream = WindowedUpstream::new(Vec::new(), Some(100));
    let out = fetch_range(&upstream, "BTC/USDT", TF, T0, T0 + 500 * STEP, Duration::ZERO).await;

    assert!(out.is_empty());
    assert_eq!(upstream.calls(), 1);
}

#[tokio::test]
async fn short_raw_batch_means_live_edge() {
    // 150 rows exist but the window asks for far more; the second (short)
    // batch must end the loop instead of hammering the upstream.
    let upstream = WindowedUpstream::new(grid(150), Some(100));
    let out = fetch_range(&upstream, "BTC/USDT", TF, T0, T0 + 10_000 * STEP, Duration::ZERO).await;

    assert_eq!(out.len(), 150);
    assert_eq!(upstream.calls(), 2);
    assert_contiguous(&out);
}

#[tokio::test]
async fn page_boundary_one_step_before_end_still_fetches_the_last_row() {
    // 201 rows against K = 100: the third page holds exactly the end
    // bucket, so the loop must take one more call instead of stopping
    // with the cursor sitting on the end bound.
    let upstream = WindowedUpstream::new(grid(201), Some(100));
    let end = T0 + 200 * STEP;
    let out = fetch_range(&upstream, "BTC/USDT", TF, T0, end, Duration::ZERO).await;

    assert_eq!(out.len(), 201);
    assert_eq!(out.last().map(|c| c.timestamp), Some(end));
    assert_eq!(upstream.calls(), 3);
    assert_contiguous(&out);
}

#[tokio::test]
async fn snapshot_source_takes_one_call() {
    let upstream = WindowedUpstream::new(grid(300), None);
    let end = T0 + 299 * STEP;
    let out = fetch_range(&upstream, "AAPL", TF, T0, end, Duration::ZERO).await;

    assert_eq!(out.len(), 300);
    assert_eq!(upstream.calls(), 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Any page size against any window yields exactly the grid rows inside
    /// the window, without gaps or duplicates at page boundaries.
    #[test]
    fn completeness_over_page_sizes(page in 1usize..=50, total in 0usize..=400) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let out = rt.block_on(async {
            let upstream = WindowedUpstream::new(grid(total), Some(page));
            let end = T0 + total.saturating_sub(1) as i64 * STEP;
            fetch_range(&upstream, "BTC/USDT", TF, T0, end, Duration::ZERO).await
        });

        prop_assert_eq!(out.len(), total);
        for (i, c) in out.iter().enumerate() {
            prop_assert_eq!(c.timestamp, T0 + i as i64 * STEP);
        }
    }
}
