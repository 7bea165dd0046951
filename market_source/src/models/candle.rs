//! Canonical in-memory representation of one OHLCV observation.

/// A single OHLCV candle for a fixed time bucket.
///
/// `timestamp` is epoch milliseconds, UTC. Within one stored series
/// timestamps are unique and read back in strictly ascending order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    /// Bucket open time, epoch milliseconds UTC.
    pub timestamp: i64,
    /// Opening price.
    pub open: f64,
    /// Highest price in the bucket.
    pub high: f64,
    /// Lowest price in the bucket.
    pub low: f64,
    /// Closing price.
    pub close: f64,
    /// Traded volume, base units.
    pub volume: f64,
}

impl Candle {
    /// Builds a candle, rejecting rows a well-behaved upstream never emits:
    /// non-finite or negative prices, or negative volume. Callers drop the
    /// row on `None` and keep going.
    pub fn checked(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Option<Self> {
        let prices = [open, high, low, close];
        if prices.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return None;
        }
        if !volume.is_finite() || volume < 0.0 {
            return None;
        }
        Some(Self { timestamp, open, high, low, close, volume })
    }
}
