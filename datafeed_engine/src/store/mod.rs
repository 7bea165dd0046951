//! Durable, deduplicated candle storage.
//!
//! One SQLite table holds every tracked series, keyed by
//! `(symbol, source, timeframe, timestamp)` with a UNIQUE constraint.
//! Inserts go through `INSERT OR IGNORE`, which makes every mutating
//! operation safe to repeat — the property the whole retry story leans on.

pub mod models;

use std::sync::{Mutex, MutexGuard};

use diesel::dsl::{count_star, max};
use diesel::prelude::*;
use indexmap::IndexMap;
use tracing::info;

use market_source::models::{Candle, SeriesKey, SourceId, Timeframe};

use crate::db::{connection, migrate};
use crate::schema::market_data;
use crate::store::models::{CandleRow, NewCandleRow};
use thiserror::Error;

/// SQLite caps bound variables per statement; 9 columns per row keeps this
/// chunk size well under the default limit.
const INSERT_CHUNK: usize = 100;

/// Failure in the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Opening the database file failed.
    #[error(transparent)]
    Connection(#[from] diesel::ConnectionError),
    /// Schema migration failed.
    #[error(transparent)]
    Migrate(#[from] migrate::MigrateError),
    /// A query or write failed.
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

/// Optional bounds for a store read.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryRange {
    /// Inclusive lower timestamp bound, epoch ms.
    pub start: Option<i64>,
    /// Inclusive upper timestamp bound, epoch ms.
    pub end: Option<i64>,
    /// Maximum number of rows to return.
    pub limit: Option<i64>,
}

impl QueryRange {
    /// `[start, end]`, unbounded row count.
    pub fn between(start: i64, end: i64) -> Self {
        Self { start: Some(start), end: Some(end), limit: None }
    }
}

/// Optional filters for a purge; all-`None` deletes everything.
#[derive(Debug, Clone, Default)]
pub struct PurgeFilter {
    /// Restrict to one symbol.
    pub symbol: Option<String>,
    /// Restrict to one source.
    pub source: Option<SourceId>,
    /// Restrict to one timeframe.
    pub timeframe: Option<Timeframe>,
}

/// Row-count breakdown for operational visibility.
#[derive(Debug, Clone)]
pub struct StoreStats {
    /// Rows across every series.
    pub total_rows: i64,
    /// Rows per source, largest first.
    pub rows_per_source: IndexMap<String, i64>,
    /// Rows per timeframe, largest first.
    pub rows_per_timeframe: IndexMap<String, i64>,
    /// Up to ten symbols by row count, largest first.
    pub top_symbols: Vec<(String, i64)>,
}

/// Handle to the single shared candle table.
///
/// Reads and writes are serialized per call through an internal mutex; no
/// transaction ever spans more than one series.
pub struct SeriesStore {
    conn: Mutex<SqliteConnection>,
}

impl SeriesStore {
    /// Opens (creating if needed) the store at `database_url`, running any
    /// pending migrations first.
    pub fn open(database_url: &str) -> Result<Self, StoreError> {
        migrate::run_sqlite(database_url)?;
        let conn = connection::connect_sqlite(database_url)?;
        info!(db = database_url, "series store ready");
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn conn(&self) -> MutexGuard<'_, SqliteConnection> {
        // A poisoned lock only means another call panicked mid-statement;
        // the connection itself is still usable.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Inserts candles for one series, ignoring rows whose natural key
    /// already exists. Returns the number of genuinely new rows.
    pub fn upsert(&self, key: &SeriesKey, candles: &[Candle]) -> Result<u64, StoreError> {
        if candles.is_empty() {
            return Ok(0);
        }
        let rows: Vec<NewCandleRow<'_>> = candles
            .iter()
            .map(|c| NewCandleRow {
                symbol: &key.symbol,
                source: key.source.as_str(),
                timeframe: key.timeframe.as_str(),
                timestamp: c.timestamp,
                open: c.open,
                high: c.high,
                low: c.low,
                close: c.close,
                volume: c.volume,
            })
            .collect();

        let conn = &mut *self.conn();
        let mut inserted = 0u64;
        for chunk in rows.chunks(INSERT_CHUNK) {
            inserted += diesel::insert_or_ignore_into(market_data::table)
                .values(chunk)
                .execute(conn)? as u64;
        }
        Ok(inserted)
    }

    /// Reads one series ascending by timestamp, optionally bounded.
    pub fn query(&self, key: &SeriesKey, range: QueryRange) -> Result<Vec<Candle>, StoreError> {
        let mut q = market_data::table
            .filter(market_data::symbol.eq(&key.symbol))
            .filter(market_data::source.eq(key.source.as_str()))
            .filter(market_data::timeframe.eq(key.timeframe.as_str()))
            .order(market_data::timestamp.asc())
            .into_boxed();
        if let Some(start) = range.start {
            q = q.filter(market_data::timestamp.ge(start));
        }
        if let Some(end) = range.end {
            q = q.filter(market_data::timestamp.le(end));
        }
        if let Some(limit) = range.limit {
            q = q.limit(limit);
        }

        let conn = &mut *self.conn();
        let rows: Vec<CandleRow> = q.select(CandleRow::as_select()).load(conn)?;
        Ok(rows
            .into_iter()
            .map(|r| Candle {
                timestamp: r.timestamp,
                open: r.open,
                high: r.high,
                low: r.low,
                close: r.close,
                volume: r.volume,
            })
            .collect())
    }

    /// The high-water mark for one series: `max(timestamp)`, or `None` when
    /// the series has never been fetched.
    pub fn latest_timestamp(&self, key: &SeriesKey) -> Result<Option<i64>, StoreError> {
        let conn = &mut *self.conn();
        let latest = market_data::table
            .filter(market_data::symbol.eq(&key.symbol))
            .filter(market_data::source.eq(key.source.as_str()))
            .filter(market_data::timeframe.eq(key.timeframe.as_str()))
            .select(max(market_data::timestamp))
            .first::<Option<i64>>(conn)?;
        Ok(latest)
    }

    /// Deletes rows matching the filter, returning the delete count.
    pub fn purge(&self, filter: &PurgeFilter) -> Result<u64, StoreError> {
        let mut d = diesel::delete(market_data::table).into_boxed();
        if let Some(symbol) = &filter.symbol {
            d = d.filter(market_data::symbol.eq(symbol));
        }
        if let Some(source) = filter.source {
            d = d.filter(market_data::source.eq(source.as_str()));
        }
        if let Some(timeframe) = filter.timeframe {
            d = d.filter(market_data::timeframe.eq(timeframe.as_str()));
        }

        let conn = &mut *self.conn();
        Ok(d.execute(conn)? as u64)
    }

    /// Row-count breakdown across the whole table.
    pub fn stats(&self) -> Result<StoreStats, StoreError> {
        let conn = &mut *self.conn();

        let total_rows: i64 = market_data::table.select(count_star()).first(conn)?;

        let mut by_source: Vec<(String, i64)> = market_data::table
            .group_by(market_data::source)
            .select((market_data::source, count_star()))
            .load(conn)?;
        by_source.sort_by(|a, b| b.1.cmp(&a.1));

        let mut by_timeframe: Vec<(String, i64)> = market_data::table
            .group_by(market_data::timeframe)
            .select((market_data::timeframe, count_star()))
            .load(conn)?;
        by_timeframe.sort_by(|a, b| b.1.cmp(&a.1));

        let mut top_symbols: Vec<(String, i64)> = market_data::table
            .group_by(market_data::symbol)
            .select((market_data::symbol, count_star()))
            .load(conn)?;
        top_symbols.sort_by(|a, b| b.1.cmp(&a.1));
        top_symbols.truncate(10);

        Ok(StoreStats {
            total_rows,
            rows_per_source: by_source.into_iter().collect(),
            rows_per_timeframe: by_timeframe.into_iter().collect(),
            top_symbols,
        })
    }
}
