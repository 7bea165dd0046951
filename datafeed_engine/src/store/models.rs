//! Diesel models mapping to the `market_data` table.

use diesel::prelude::*;

use crate::schema::market_data;

/// A stored candle row. The natural key is
/// `(symbol, source, timeframe, timestamp)`; rows are immutable once
/// inserted.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = market_data, check_for_backend(diesel::sqlite::Sqlite))]
pub struct CandleRow {
    /// Database primary key (SQLite rowid).
    pub id: i32,
    /// Instrument identifier.
    pub symbol: String,
    /// Source code (e.g. "okx").
    pub source: String,
    /// Timeframe label (e.g. "1h").
    pub timeframe: String,
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
    /// Traded volume.
    pub volume: f64,
    /// Row creation timestamp, RFC3339 UTC, filled by the database.
    pub created_at: String,
}

/// Insertable form of [`CandleRow`]; `id` and `created_at` are filled by the
/// database.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = market_data)]
pub struct NewCandleRow<'a> {
    /// Instrument identifier.
    pub symbol: &'a str,
    /// Source code.
    pub source: &'a str,
    /// Timeframe label.
    pub timeframe: &'a str,
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
    /// Traded volume.
    pub volume: f64,
}
