//! SQLite connection and migration helpers.
//!
//! [`connection::connect_sqlite`] opens a tuned connection (WAL,
//! foreign_keys=ON, 5000ms busy_timeout); [`migrate::run_sqlite`] applies
//! the embedded Diesel migrations that create the `market_data` table.

pub mod connection;
pub mod migrate;
