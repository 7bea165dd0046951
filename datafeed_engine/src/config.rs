//! Engine configuration: one TOML file covering the tracked-series matrix,
//! scheduler cadence, and per-source credentials.
//!
//! Every field has a default, so a missing file yields a working engine
//! whose credential-gated sources simply stay inert.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use market_source::{
    config::SourcesConfig,
    models::{SeriesKey, SourceId, Timeframe},
};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Failure to read or parse the engine config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid TOML or has unknown keys.
    #[error("malformed config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// SQLite database path.
    pub db_path: String,
    /// Scheduler cadence in minutes.
    pub update_interval_minutes: u64,
    /// Bound on how long a stop request waits for an in-flight batch.
    pub stop_timeout_secs: u64,
    /// Fixed delay between successive upstream calls of one pagination loop.
    pub call_delay_ms: u64,
    /// Fixed delay between series within one batch run.
    pub series_delay_ms: u64,
    /// Which series to keep fresh.
    pub tracked: TrackedMatrix,
    /// Per-source credentials.
    pub sources: SourcesConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_path: "market_data.db".to_string(),
            update_interval_minutes: 60,
            stop_timeout_secs: 30,
            call_delay_ms: 100,
            series_delay_ms: 500,
            tracked: TrackedMatrix::default(),
            sources: SourcesConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Loads the config file, or returns defaults (with a warning) when the
    /// path does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            warn!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}

/// The cross-product of series the scheduler keeps fresh, grouped the way
/// the upstreams group them: crypto pairs on exchanges, US equities on
/// Yahoo, China A-shares on Tushare (daily only).
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackedMatrix {
    /// Crypto pairs, exchange notation (`BTC/USDT`).
    pub crypto_symbols: Vec<String>,
    /// Exchanges to fetch every crypto pair from.
    pub crypto_sources: Vec<SourceId>,
    /// US equity tickers, fetched from Yahoo.
    pub equity_symbols: Vec<String>,
    /// China A-share codes (`000001.SZ`), fetched from Tushare.
    pub cn_symbols: Vec<String>,
    /// Timeframes tracked for crypto and equities.
    pub timeframes: Vec<Timeframe>,
    /// Initial backfill depth for crypto series, days.
    pub crypto_lookback_days: u32,
    /// Initial backfill depth for equity series, days.
    pub equity_lookback_days: u32,
    /// Initial backfill depth for A-share series, days.
    pub cn_lookback_days: u32,
}

impl Default for TrackedMatrix {
    fn default() -> Self {
        Self {
            crypto_symbols: vec!["BTC/USDT".into(), "ETH/USDT".into()],
            crypto_sources: vec![SourceId::Okx, SourceId::Binance],
            equity_symbols: vec!["AAPL".into(), "TSLA".into(), "GOOGL".into()],
            cn_symbols: vec!["000001.SZ".into(), "600000.SH".into()],
            timeframes: vec![
                Timeframe::M1,
                Timeframe::M5,
                Timeframe::M15,
                Timeframe::M30,
                Timeframe::H1,
                Timeframe::H2,
                Timeframe::D1,
            ],
            crypto_lookback_days: 7,
            equity_lookback_days: 30,
            cn_lookback_days: 365,
        }
    }
}

impl TrackedMatrix {
    /// Expands the matrix into `(key, lookback_ms)` tuples, in batch order.
    /// `days_override` replaces every group's lookback when given.
    pub fn plan(&self, days_override: Option<u32>) -> Vec<(SeriesKey, i64)> {
        let lookback = |days: u32| i64::from(days_override.unwrap_or(days)) * DAY_MS;
        let mut plan = Vec::new();

        for source in &self.crypto_sources {
            for symbol in &self.crypto_symbols {
                for tf in &self.timeframes {
                    plan.push((
                        SeriesKey::new(symbol.clone(), *source, *tf),
                        lookback(self.crypto_lookback_days),
                    ));
                }
            }
        }
        for symbol in &self.equity_symbols {
            for tf in &self.timeframes {
                plan.push((
                    SeriesKey::new(symbol.clone(), SourceId::Yahoo, *tf),
                    lookback(self.equity_lookback_days),
                ));
            }
        }
        // Tushare publishes daily bars only; tracking finer buckets there
        // would store mislabeled data.
        for symbol in &self.cn_symbols {
            plan.push((
                SeriesKey::new(symbol.clone(), SourceId::Tushare, Timeframe::D1),
                lookback(self.cn_lookback_days),
            ));
        }
        plan
    }
}
