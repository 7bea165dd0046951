//! Source adapters: one per upstream vendor.
//!
//! [`SourceAdapter`] is the single seam between the sync machinery and the
//! outside world. Implementations come in two shapes: rate-limited exchange
//! APIs that return at most `page_size()` rows per call windowed forward
//! from `start_ms` (OKX, Binance), and snapshot providers that return the
//! whole bounded range in one call (Yahoo, Tushare). The pagination driver
//! in [`crate::paginate`] only cares about that distinction.
//!
//! An adapter constructed without usable credentials is *inert*: it reports
//! `is_ready() == false` and fetches resolve to an empty batch. Callers skip
//! inert sources instead of failing a whole batch run.

pub mod binance;
pub mod okx;
pub mod tushare;
pub mod yahoo;

use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use indexmap::IndexMap;
use thiserror::Error;
use tracing::warn;

use crate::{
    config::SourcesConfig,
    models::{Candle, SourceId, Timeframe},
};

/// Transient failure while talking to an upstream.
///
/// These end the current pagination loop early; rows accumulated before the
/// failure are still committed by the caller.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level failure (DNS, TLS, timeout, ...).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The upstream answered with an application-level error.
    #[error("upstream rejected request: {0}")]
    Upstream(String),
    /// The response body did not have the documented shape.
    #[error("unexpected payload: {0}")]
    Payload(String),
}

/// One upstream market-data source.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Which source this adapter serves; matches `SeriesKey::source`.
    fn id(&self) -> SourceId;

    /// False when construction found no usable credentials. Inert adapters
    /// fetch nothing and never error.
    fn is_ready(&self) -> bool {
        true
    }

    /// Upper bound on rows a single `fetch` call can return, or `None` for
    /// snapshot sources that serve the whole range at once.
    fn page_size(&self) -> Option<usize> {
        None
    }

    /// Fetches one bounded batch of candles covering `[start_ms, end_ms]`
    /// inclusive, ascending by timestamp, best effort. Rate-limited sources
    /// return at most `page_size()` rows windowed forward from `start_ms`.
    async fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<Candle>, FetchError>;
}

/// Builds the full adapter registry from per-source config. The caller owns
/// the map; there is no process-wide registry.
pub fn build_registry(cfg: &SourcesConfig) -> IndexMap<SourceId, Box<dyn SourceAdapter>> {
    let mut registry: IndexMap<SourceId, Box<dyn SourceAdapter>> = IndexMap::new();
    registry.insert(SourceId::Okx, Box::new(okx::OkxAdapter::new(&cfg.okx)));
    registry.insert(SourceId::Binance, Box::new(binance::BinanceAdapter::new(&cfg.binance)));
    registry.insert(SourceId::Yahoo, Box::new(yahoo::YahooAdapter::new(&cfg.yahoo)));
    registry.insert(SourceId::Tushare, Box::new(tushare::TushareAdapter::new(&cfg.tushare)));
    registry
}

/// Direct rate limiter at `per_second` requests, shared by all calls of one
/// adapter instance.
pub(crate) fn request_limiter(per_second: NonZeroU32) -> DefaultDirectRateLimiter {
    RateLimiter::direct(Quota::per_second(per_second))
}

/// Builds the HTTP client for one source, honoring its optional proxy.
/// Returns `None` (with a warning) when the client cannot be constructed,
/// which degrades the adapter to inert rather than failing startup.
pub(crate) fn http_client(source: SourceId, proxy: Option<&str>) -> Option<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(addr) = proxy {
        match reqwest::Proxy::all(format!("http://{addr}")) {
            Ok(p) => builder = builder.proxy(p),
            Err(err) => {
                warn!(%source, %addr, %err, "invalid proxy address, source disabled");
                return None;
            }
        }
    }
    match builder.timeout(Duration::from_secs(30)).build() {
        Ok(client) => Some(client),
        Err(err) => {
            warn!(%source, %err, "failed to build HTTP client, source disabled");
            None
        }
    }
}

/// Parses one numeric field that may arrive as a JSON string or number.
/// Returns `None` for anything non-numeric so the caller can drop the row.
pub(crate) fn json_f64(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
