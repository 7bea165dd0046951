//! Binance spot exchange adapter.
//!
//! Rate-limited REST source: at most 1000 klines per call, windowed forward
//! from `startTime`. Kline endpoints are public; configured credentials only
//! gate activation.

use async_trait::async_trait;
use nonzero_ext::nonzero;
use tracing::{debug, warn};

use crate::{
    adapters::{FetchError, SourceAdapter, http_client, json_f64, request_limiter},
    config::{ExchangeKeys, usable},
    models::{Candle, SourceId, Timeframe},
};

const LIVE_URL: &str = "https://api.binance.com/api/v3/klines";
const TESTNET_URL: &str = "https://testnet.binance.vision/api/v3/klines";

/// Rows per call the Binance kline endpoint serves.
pub const PAGE_SIZE: usize = 1000;

struct Inner {
    client: reqwest::Client,
    limiter: governor::DefaultDirectRateLimiter,
    url: &'static str,
}

/// See module docs.
pub struct BinanceAdapter {
    inner: Option<Inner>,
}

impl BinanceAdapter {
    /// Builds the adapter; inert unless api_key and api_secret are present.
    pub fn new(keys: &ExchangeKeys) -> Self {
        let configured = usable(&keys.api_key).is_some() && usable(&keys.api_secret).is_some();
        if !configured {
            warn!(source = %SourceId::Binance, "credentials missing, source disabled");
            return Self { inner: None };
        }
        let inner = http_client(SourceId::Binance, keys.proxy.as_deref()).map(|client| Inner {
            client,
            limiter: request_limiter(nonzero!(10u32)),
            url: if keys.sandbox { TESTNET_URL } else { LIVE_URL },
        });
        Self { inner }
    }

    /// `BTC/USDT` -> `BTCUSDT`.
    fn pair(symbol: &str) -> String {
        symbol.replace('/', "")
    }
}

#[async_trait]
impl SourceAdapter for BinanceAdapter {
    fn id(&self) -> SourceId {
        SourceId::Binance
    }

    fn is_ready(&self) -> bool {
        self.inner.is_some()
    }

    fn page_size(&self) -> Option<usize> {
        Some(PAGE_SIZE)
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
        inner.limiter.until_ready().await;

        let response = inner
            .client
            .get(inner.url)
            .query(&[
                ("symbol", Self::pair(symbol)),
                ("interval", timeframe.as_str().to_string()),
                ("startTime", start_ms.to_string()),
                ("endTime", end_ms.to_string()),
                ("limit", PAGE_SIZE.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Upstream(format!("binance: {body}")));
        }

        // Klines arrive ascending as mixed arrays:
        // [openTime, open, high, low, close, volume, closeTime, ...].
        let rows: Vec<Vec<serde_json::Value>> = response.json().await?;
        let mut candles = Vec::with_capacity(rows.len());
        for row in &rows {
            let parsed = (|| {
                let ts = row.first()?.as_i64()?;
                Candle::checked(
                    ts,
                    json_f64(row.get(1)?)?,
                    json_f64(row.get(2)?)?,
                    json_f64(row.get(3)?)?,
                    json_f64(row.get(4)?)?,
                    json_f64(row.get(5)?)?,
                )
            })();
            match parsed {
                Some(candle) => candles.push(candle),
                None => debug!(source = "binance", %symbol, "dropping malformed kline row"),
            }
        }
        candles.sort_by_key(|c| c.timestamp);
        Ok(candles)
    }
}
