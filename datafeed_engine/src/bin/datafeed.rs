//! Operator CLI for the datafeed engine.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use datafeed_engine::{
    config::EngineConfig,
    scheduler::Scheduler,
    store::{PurgeFilter, SeriesStore},
    sync::{SeriesOutcome, SyncCoordinator},
};
use market_source::{
    adapters::build_registry,
    models::{SeriesKey, SourceId, Timeframe},
};

#[derive(Parser)]
#[command(version, about = "Market datafeed engine")]
struct Cli {
    /// Path to the engine config file (TOML)
    #[arg(short, long, default_value = "datafeed.toml")]
    config: PathBuf,

    /// SQLite database path (overrides config and DATAFEED_DB)
    #[arg(long)]
    db: Option<String>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print store statistics
    Stats,

    /// Sync one series (all of --symbol/--source/--timeframe) or the whole
    /// tracked matrix (none of them)
    Fetch {
        /// Instrument, e.g. "BTC/USDT" or "AAPL"
        #[arg(long)]
        symbol: Option<String>,

        /// Source code: okx, binance, yahoo, tushare
        #[arg(long)]
        source: Option<String>,

        /// Timeframe label, e.g. "1h"
        #[arg(long)]
        timeframe: Option<String>,

        /// Backfill depth in days for series never fetched before
        #[arg(long)]
        days: Option<u32>,
    },

    /// Delete stored rows matching the optional filters
    Clear {
        /// Restrict to one symbol
        #[arg(long)]
        symbol: Option<String>,

        /// Restrict to one source
        #[arg(long)]
        source: Option<String>,

        /// Restrict to one timeframe
        #[arg(long)]
        timeframe: Option<String>,
    },

    /// Run the scheduler in the foreground until interrupted
    Start {
        /// Override the configured update interval
        #[arg(long)]
        interval_minutes: Option<u64>,
    },
}

fn build_coordinator(cfg: &EngineConfig, store: Arc<SeriesStore>) -> SyncCoordinator {
    SyncCoordinator::new(
        store,
        build_registry(&cfg.sources),
        Duration::from_millis(cfg.call_delay_ms),
        Duration::from_millis(cfg.series_delay_ms),
    )
}

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cfg = EngineConfig::load(&cli.config)?;
    let db_path = cli
        .db
        .or_else(|| std::env::var("DATAFEED_DB").ok())
        .unwrap_or_else(|| cfg.db_path.clone());
    let store = Arc::new(SeriesStore::open(&db_path).context("opening series store")?);

    match cli.cmd {
        Cmd::Stats => {
            let stats = store.stats()?;
            println!("total rows: {}", stats.total_rows);
            println!("by source:");
            for (source, n) in &stats.rows_per_source {
                println!("  {source:<10} {n}");
            }
            println!("by timeframe:");
            for (tf, n) in &stats.rows_per_timeframe {
                println!("  {tf:<10} {n}");
            }
            println!("top symbols:");
            for (symbol, n) in &stats.top_symbols {
                println!("  {symbol:<12} {n}");
            }
        }

        Cmd::Fetch { symbol, source, timeframe, days } => {
            let coordinator = build_coordinator(&cfg, store);
            match (symbol, source, timeframe) {
                (Some(symbol), Some(source), Some(timeframe)) => {
                    let source: SourceId = source.parse()?;
                    let timeframe: Timeframe = timeframe.parse()?;
                    let key = SeriesKey::new(symbol, source, timeframe);
                    let lookback_days = days.unwrap_or(match source {
                        SourceId::Yahoo => cfg.tracked.equity_lookback_days,
                        SourceId::Tushare => cfg.tracked.cn_lookback_days,
                        _ => cfg.tracked.crypto_lookback_days,
                    });
                    match coordinator.sync_series(&key, i64::from(lookback_days) * DAY_MS).await? {
                        SeriesOutcome::Inserted(n) => println!("{key}: inserted {n} rows"),
                        SeriesOutcome::UpToDate => println!("{key}: already current"),
                        SeriesOutcome::SourceUnavailable => println!("{key}: source not configured"),
                    }
                }
                (None, None, None) => {
                    let plan = cfg.tracked.plan(days);
                    let report = coordinator.sync_batch(&plan).await;
                    for (source, n) in &report.inserted_by_source {
                        println!("{source}: inserted {n} rows");
                    }
                    let failed = report.failures().count();
                    println!(
                        "synced {} series, {} new rows, {failed} failed",
                        report.results.len(),
                        report.total_inserted()
                    );
                }
                _ => bail!("fetch takes either all of --symbol/--source/--timeframe or none of them"),
            }
        }

        Cmd::Clear { symbol, source, timeframe } => {
            let filter = PurgeFilter {
                symbol,
                source: source.map(|s| s.parse()).transpose()?,
                timeframe: timeframe.map(|s| s.parse()).transpose()?,
            };
            let deleted = store.purge(&filter)?;
            println!("deleted {deleted} rows");
        }

        Cmd::Start { interval_minutes } => {
            let coordinator = Arc::new(build_coordinator(&cfg, store));
            let period = Duration::from_secs(60 * interval_minutes.unwrap_or(cfg.update_interval_minutes));
            let mut scheduler = Scheduler::new(coordinator, cfg.tracked.plan(None), period);
            scheduler.start()?;
            info!("running until interrupted (Ctrl-C)");
            tokio::signal::ctrl_c().await.context("waiting for interrupt")?;
            scheduler.stop(Duration::from_secs(cfg.stop_timeout_secs)).await;
        }
    }

    Ok(())
}
