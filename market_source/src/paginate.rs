//! Pagination driver: assembles a full time range from bounded batches.
//!
//! Rate-limited upstreams serve at most K rows per call, windowed forward
//! from a cursor. The driver advances the cursor by the *timeframe
//! duration* past the last returned row — never by row count — so silently
//! capped batches cannot open gaps, and re-fetching the last row is
//! impossible. Snapshot sources (`page_size() == None`) take one call.
//!
//! Transient fetch errors end the loop early; whatever was accumulated is
//! returned so the caller can still commit it.

use std::time::Duration;

use tracing::{debug, warn};

use crate::{
    adapters::SourceAdapter,
    models::{Candle, Timeframe},
};

/// Fetches `[start_ms, end_ms]` inclusive from one adapter, deduplicated by
/// timestamp and sorted ascending. Best effort: an upstream failure
/// truncates the result instead of erroring.
pub async fn fetch_range(
    adapter: &dyn SourceAdapter,
    symbol: &str,
    timeframe: Timeframe,
    start_ms: i64,
    end_ms: i64,
    call_delay: Duration,
) -> Vec<Candle> {
    let mut collected: Vec<Candle> = Vec::new();
    let step_ms = timeframe.duration_ms();
    let mut cursor = start_ms;
    let mut first_call = true;

    loop {
        if !first_call {
            // Fixed pacing between successive calls of one loop.
            tokio::time::sleep(call_delay).await;
        }
        first_call = false;

        let batch = match adapter.fetch(symbol, timeframe, cursor, end_ms).await {
            Ok(batch) => batch,
            Err(err) => {
                warn!(source = %adapter.id(), %symbol, %timeframe, %err,
                    "fetch failed mid-range, keeping {} rows", collected.len());
                break;
            }
        };
        if batch.is_empty() {
            debug!(source = %adapter.id(), %symbol, "no more data at cursor {cursor}");
            break;
        }
        let raw_len = batch.len();

        // Upstreams may over-fetch past the requested end.
        let mut kept: Vec<Candle> = batch.into_iter().filter(|c| c.timestamp <= end_ms).collect();
        if kept.is_empty() {
            break;
        }
        let last_ts = kept.last().map(|c| c.timestamp).unwrap_or(cursor);
        collected.append(&mut kept);

        let Some(page_size) = adapter.page_size() else {
            // Snapshot source: the whole range came back in one call.
            break;
        };
        // A short raw batch means the upstream has nothing newer yet.
        if raw_len < page_size {
            break;
        }

        let next = last_ts + step_ms;
        if next <= cursor {
            // Upstream returned rows at or before the cursor; bail rather
            // than loop forever on a misbehaving source.
            warn!(source = %adapter.id(), %symbol, "cursor failed to advance past {cursor}");
            break;
        }
        cursor = next;
        // A cursor equal to end still has the end bucket itself to fetch.
        if cursor > end_ms {
            break;
        }
    }

    collected.sort_by_key(|c| c.timestamp);
    collected.dedup_by_key(|c| c.timestamp);
    collected
}
