//! Upstream market-data sources and the machinery to read them.
//!
//! This crate owns the vendor-facing half of the datafeed: the canonical
//! OHLCV [`models`], the [`adapters::SourceAdapter`] trait with one concrete
//! implementation per upstream, per-source credential [`config`], and the
//! [`paginate`] driver that assembles a full time range out of bounded
//! batches from rate-limited APIs.

pub mod adapters;
pub mod config;
pub mod models;
pub mod paginate;
