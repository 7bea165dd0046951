//! Yahoo Finance adapter.
//!
//! Batch snapshot source: one call serves the whole bounded range, so the
//! pagination driver never loops. Yahoo needs no credentials, but caps
//! intraday history at roughly the most recent 60 days; requests reaching
//! further back are clamped upward instead of failing.

use async_trait::async_trait;
use nonzero_ext::nonzero;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    adapters::{FetchError, SourceAdapter, http_client, request_limiter},
    config::SnapshotKeys,
    models::{Candle, SourceId, Timeframe},
};

const BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Intraday history depth Yahoo serves, in milliseconds.
const INTRADAY_CAP_MS: i64 = 60 * 24 * 60 * 60 * 1000;

#[derive(Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Deserialize)]
struct Chart {
    #[serde(default)]
    result: Vec<ChartResult>,
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

/// Per-field arrays aligned with `timestamp`; individual slots may be null.
#[derive(Deserialize, Default)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

struct Inner {
    client: reqwest::Client,
    limiter: governor::DefaultDirectRateLimiter,
}

/// See module docs.
pub struct YahooAdapter {
    inner: Option<Inner>,
}

impl YahooAdapter {
    /// Always ready unless the HTTP client itself cannot be built.
    pub fn new(keys: &SnapshotKeys) -> Self {
        let inner = http_client(SourceId::Yahoo, keys.proxy.as_deref()).map(|client| Inner {
            client,
            limiter: request_limiter(nonzero!(2u32)),
        });
        Self { inner }
    }

    fn interval(timeframe: Timeframe) -> Option<&'static str> {
        match timeframe {
            Timeframe::M1 => Some("1m"),
            Timeframe::M5 => Some("5m"),
            Timeframe::M15 => Some("15m"),
            Timeframe::M30 => Some("30m"),
            Timeframe::H1 => Some("1h"),
            Timeframe::D1 => Some("1d"),
            // Yahoo has no 2h/4h buckets.
            Timeframe::H2 | Timeframe::H4 => None,
        }
    }
}

#[async_trait]
impl SourceAdapter for YahooAdapter {
    fn id(&self) -> SourceId {
        SourceId::Yahoo
    }

    fn is_ready(&self) -> bool {
        self.inner.is_some()
    }

    async fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<Candle>, FetchError> {
        let Some(inner) = &self.inner else {
            return Ok(Vec::new());
        };
        let Some(interval) = Self::interval(timeframe) else {
            warn!(source = "yahoo", %symbol, %timeframe, "unsupported interval, returning no data");
            return Ok(Vec::new());
        };

        let mut start_ms = start_ms;
        if timeframe.is_intraday() {
            let cap = end_ms - INTRADAY_CAP_MS;
            if start_ms < cap {
                warn!(source = "yahoo", %symbol, "intraday window clamped to the most recent 60 days");
                start_ms = cap;
            }
        }

        inner.limiter.until_ready().await;
        let url = format!("{BASE_URL}/{symbol}");
        let envelope = inner
            .client
            .get(&url)
            .query(&[
                ("period1", (start_ms / 1000).to_string()),
                ("period2", (end_ms / 1000).to_string()),
                ("interval", interval.to_string()),
                ("includePrePost", "false".to_string()),
            ])
            .send()
            .await?
            .json::<ChartEnvelope>()
            .await?;

        if let Some(err) = envelope.chart.error {
            return Err(FetchError::Upstream(format!("yahoo: {err}")));
        }
        let Some(result) = envelope.chart.result.into_iter().next() else {
            return Ok(Vec::new());
        };
        let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

        let mut candles = Vec::with_capacity(result.timestamp.len());
        for (i, ts_sec) in result.timestamp.iter().enumerate() {
            let parsed = (|| {
                Candle::checked(
                    ts_sec * 1000,
                    (*quote.open.get(i)?)?,
                    (*quote.high.get(i)?)?,
                    (*quote.low.get(i)?)?,
                    (*quote.close.get(i)?)?,
                    (*quote.volume.get(i)?)?,
                )
            })();
            match parsed {
                Some(candle) => candles.push(candle),
                None => debug!(source = "yahoo", %symbol, "dropping incomplete chart row"),
            }
        }
        candles.sort_by_key(|c| c.timestamp);
        Ok(candles)
    }
}
