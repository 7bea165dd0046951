#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use datafeed_engine::store::SeriesStore;
use market_source::{
    adapters::{FetchError, SourceAdapter},
    models::{Candle, SourceId, Timeframe},
};

pub struct TestDb {
    _dir: TempDir, // keep alive for the life of the test
    pub path: String,
}

pub fn setup_store() -> (TestDb, Arc<SeriesStore>) {
    let dir = TempDir::new().expect("tempdir");
    let mut p = PathBuf::from(dir.path());
    p.push("test.db");
    let path = p.to_string_lossy().to_string();

    let store = SeriesStore::open(&path).expect("open store");
    (TestDb { _dir: dir, path }, Arc::new(store))
}

pub fn candle(ts: i64) -> Candle {
    Candle { timestamp: ts, open: 10.0, high: 11.0, low: 9.0, close: 10.5, volume: 100.0 }
}

/// Upstream that serves one candle per timeframe bucket across the whole
/// requested window, like an exchange with complete history. Records every
/// requested window start so tests can assert the incremental bounds.
pub struct GridAdapter {
    pub source: SourceId,
    pub ready: bool,
    pub calls: AtomicUsize,
    pub requested_starts: Mutex<Vec<i64>>,
}

impl GridAdapter {
    pub fn new(source: SourceId) -> Self {
        Self { source, ready: true, calls: AtomicUsize::new(0), requested_starts: Mutex::new(Vec::new()) }
    }

    pub fn unready(source: SourceId) -> Self {
        Self { ready: false, ..Self::new(source) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn starts(&self) -> Vec<i64> {
        self.requested_starts.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceAdapter for GridAdapter {
    fn id(&self) -> SourceId {
        self.source
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    async fn fetch(
        &self,
        _symbol: &str,
        timeframe: Timeframe,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<Candle>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested_starts.lock().unwrap().push(start_ms);

        let step = timeframe.duration_ms();
        let mut ts = start_ms.div_euclid(step) * step;
        if ts < start_ms {
            ts += step;
        }
        let mut out = Vec::new();
        while ts <= end_ms {
            out.push(candle(ts));
            ts += step;
        }
        Ok(out)
    }
}

/// Boxable handle so a test can keep inspecting an adapter after handing
/// it to a coordinator.
pub struct SharedAdapter(pub Arc<GridAdapter>);

#[async_trait]
impl SourceAdapter for SharedAdapter {
    fn id(&self) -> SourceId {
        self.0.id()
    }

    fn is_ready(&self) -> bool {
        self.0.is_ready()
    }

    async fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<Candle>, FetchError> {
        self.0.fetch(symbol, timeframe, start_ms, end_ms).await
    }
}
