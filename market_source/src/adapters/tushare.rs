//! Tushare adapter for China A-share daily bars.
//!
//! Batch snapshot source that only publishes day granularity. Requests for
//! finer timeframes are served as daily data with a warning, never an
//! error. Inert without an API token.

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime};
use nonzero_ext::nonzero;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::{
    adapters::{FetchError, SourceAdapter, http_client, json_f64, request_limiter},
    config::{TokenKeys, usable},
    models::{Candle, SourceId, Timeframe},
};

const API_URL: &str = "https://api.tushare.pro";

#[derive(Deserialize)]
struct TushareResponse {
    code: i64,
    #[serde(default)]
    msg: Option<String>,
    data: Option<TushareData>,
}

#[derive(Deserialize)]
struct TushareData {
    #[serde(default)]
    items: Vec<Vec<serde_json::Value>>,
}

struct Inner {
    client: reqwest::Client,
    limiter: governor::DefaultDirectRateLimiter,
    token: SecretString,
}

/// See module docs.
pub struct TushareAdapter {
    inner: Option<Inner>,
}

impl TushareAdapter {
    /// Builds the adapter; inert without a token.
    pub fn new(keys: &TokenKeys) -> Self {
        let Some(token) = usable(&keys.token) else {
            warn!(source = %SourceId::Tushare, "token missing, source disabled");
            return Self { inner: None };
        };
        let inner = http_client(SourceId::Tushare, keys.proxy.as_deref()).map(|client| Inner {
            client,
            limiter: request_limiter(nonzero!(1u32)),
            token: token.clone(),
        });
        Self { inner }
    }

    /// Epoch ms -> `YYYYMMDD` (UTC).
    fn trade_date(ms: i64) -> String {
        DateTime::from_timestamp_millis(ms)
            .map(|dt| dt.format("%Y%m%d").to_string())
            .unwrap_or_default()
    }

    /// `YYYYMMDD` -> epoch ms at UTC midnight.
    fn date_ms(s: &str) -> Option<i64> {
        let date = chrono::NaiveDate::parse_from_str(s, "%Y%m%d").ok()?;
        Some(date.and_time(NaiveTime::MIN).and_utc().timestamp_millis())
    }
}

#[async_trait]
impl SourceAdapter for TushareAdapter {
    fn id(&self) -> SourceId {
        SourceId::Tushare
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
        if timeframe != Timeframe::D1 {
            warn!(source = "tushare", %symbol, %timeframe, "only daily bars available, serving 1d data");
        }

        inner.limiter.until_ready().await;
        let body = json!({
            "api_name": "daily",
            "token": inner.token.expose_secret(),
            "params": {
                "ts_code": symbol,
                "start_date": Self::trade_date(start_ms),
                "end_date": Self::trade_date(end_ms),
            },
            "fields": "trade_date,open,high,low,close,vol",
        });
        let response = inner
            .client
            .post(API_URL)
            .json(&body)
            .send()
            .await?
            .json::<TushareResponse>()
            .await?;

        if response.code != 0 {
            return Err(FetchError::Upstream(format!(
                "tushare code {}: {}",
                response.code,
                response.msg.unwrap_or_default()
            )));
        }
        let Some(data) = response.data else {
            return Ok(Vec::new());
        };

        // Items arrive newest-first in the requested field order:
        // [trade_date, open, high, low, close, vol].
        let mut candles = Vec::with_capacity(data.items.len());
        for row in &data.items {
            let parsed = (|| {
                let ts = Self::date_ms(row.first()?.as_str()?)?;
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
                None => debug!(source = "tushare", %symbol, "dropping malformed daily row"),
            }
        }
        candles.sort_by_key(|c| c.timestamp);
        Ok(candles)
    }
}
