//! OKX spot exchange adapter.
//!
//! Rate-limited REST source: at most 100 candles per call, windowed forward
//! from the requested start. Candle endpoints are public; configured
//! credentials only gate activation, so deployments without an OKX section
//! skip the source entirely.

use async_trait::async_trait;
use nonzero_ext::nonzero;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    adapters::{FetchError, SourceAdapter, http_client, json_f64, request_limiter},
    config::{ExchangeKeys, usable},
    models::{Candle, SourceId, Timeframe},
};

const LIVE_URL: &str = "https://www.okx.com/api/v5/market/history-candles";
const DEMO_URL: &str = "https://www.okx.com/api/v5/market/history-candles?simulated=1";

/// Rows per call the OKX candle endpoint serves.
pub const PAGE_SIZE: usize = 100;

#[derive(Deserialize)]
struct OkxResponse {
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Vec<Vec<serde_json::Value>>,
}

struct Inner {
    client: reqwest::Client,
    limiter: governor::DefaultDirectRateLimiter,
    url: &'static str,
}

/// See module docs.
pub struct OkxAdapter {
    inner: Option<Inner>,
}

impl OkxAdapter {
    /// Builds the adapter; inert unless api_key, api_secret, and passphrase
    /// are all present.
    pub fn new(keys: &ExchangeKeys) -> Self {
        let configured = usable(&keys.api_key).is_some()
            && usable(&keys.api_secret).is_some()
            && usable(&keys.passphrase).is_some();
        if !configured {
            warn!(source = %SourceId::Okx, "credentials missing, source disabled");
            return Self { inner: None };
        }
        let inner = http_client(SourceId::Okx, keys.proxy.as_deref()).map(|client| Inner {
            client,
            limiter: request_limiter(nonzero!(10u32)),
            url: if keys.sandbox { DEMO_URL } else { LIVE_URL },
        });
        Self { inner }
    }

    /// `BTC/USDT` -> `BTC-USDT`.
    fn inst_id(symbol: &str) -> String {
        symbol.replace('/', "-")
    }

    fn bar(timeframe: Timeframe) -> &'static str {
        match timeframe {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1H",
            Timeframe::H2 => "2H",
            Timeframe::H4 => "4H",
            Timeframe::D1 => "1D",
        }
    }
}

#[async_trait]
impl SourceAdapter for OkxAdapter {
    fn id(&self) -> SourceId {
        SourceId::Okx
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
        _end_ms: i64,
    ) -> Result<Vec<Candle>, FetchError> {
        let Some(inner) = &self.inner else {
            return Ok(Vec::new());
        };
        inner.limiter.until_ready().await;

        // `before` is exclusive: rows strictly newer than start - 1.
        let response = inner
            .client
            .get(inner.url)
            .query(&[
                ("instId", Self::inst_id(symbol)),
                ("bar", Self::bar(timeframe).to_string()),
                ("before", (start_ms - 1).to_string()),
                ("limit", PAGE_SIZE.to_string()),
            ])
            .send()
            .await?
            .json::<OkxResponse>()
            .await?;

        if response.code != "0" {
            return Err(FetchError::Upstream(format!(
                "okx code {}: {}",
                response.code, response.msg
            )));
        }

        // Rows arrive newest-first as string arrays:
        // [ts, open, high, low, close, volume, ...].
        let mut candles = Vec::with_capacity(response.data.len());
        for row in &response.data {
            let parsed = (|| {
                let ts = json_f64(row.first()?)? as i64;
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
                None => debug!(source = "okx", %symbol, "dropping malformed candle row"),
            }
        }
        candles.sort_by_key(|c| c.timestamp);
        Ok(candles)
    }
}
