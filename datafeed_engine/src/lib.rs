//! Persistent candle store, incremental sync, and scheduling.
//!
//! This crate owns everything downstream of the source adapters: the
//! deduplicated SQLite [`store`], the [`sync`] coordinator that keeps each
//! tracked series up to the live edge, the periodic [`scheduler`], and the
//! read-through [`reader`] used by backtesting consumers. The `datafeed`
//! binary wires these together behind an operator CLI.

#![deny(missing_docs)]

pub mod config;
pub mod db;
pub mod reader;
pub mod scheduler;
pub mod schema;
pub mod store;
pub mod sync;
