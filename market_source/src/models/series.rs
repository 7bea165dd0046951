//! Series identity: which symbol, from which upstream, at which interval.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::timeframe::Timeframe;

/// The closed set of upstream sources. Adapter selection keys off this
/// field of the series key, never off runtime probing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    /// OKX spot exchange (rate-limited REST, 100 rows/call).
    Okx,
    /// Binance spot exchange (rate-limited REST, 1000 rows/call).
    Binance,
    /// Yahoo Finance (batch snapshot, capped intraday history).
    Yahoo,
    /// Tushare (daily bars only).
    Tushare,
}

impl SourceId {
    /// Canonical lowercase code, also the stored representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            SourceId::Okx => "okx",
            SourceId::Binance => "binance",
            SourceId::Yahoo => "yahoo",
            SourceId::Tushare => "tushare",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source code outside the supported set.
#[derive(Debug, Error)]
#[error("unknown source: {0}")]
pub struct UnknownSource(pub String);

impl FromStr for SourceId {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "okx" => Ok(SourceId::Okx),
            "binance" => Ok(SourceId::Binance),
            "yahoo" => Ok(SourceId::Yahoo),
            "tushare" => Ok(SourceId::Tushare),
            other => Err(UnknownSource(other.to_string())),
        }
    }
}

/// Identifies one tracked time series: `(symbol, source, timeframe)`.
///
/// Symbols are case-sensitive opaque strings in whatever notation the
/// upstream uses canonically (`BTC/USDT`, `AAPL`, `000001.SZ`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesKey {
    /// Instrument identifier, opaque to the engine.
    pub symbol: String,
    /// Which upstream this series is fetched from.
    pub source: SourceId,
    /// Bar interval.
    pub timeframe: Timeframe,
}

impl SeriesKey {
    pub fn new(symbol: impl Into<String>, source: SourceId, timeframe: Timeframe) -> Self {
        Self { symbol: symbol.into(), source, timeframe }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.source, self.symbol, self.timeframe)
    }
}
