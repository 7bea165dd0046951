//! Embedded schema migrations.

use diesel::{Connection, SqliteConnection, connection::SimpleConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use thiserror::Error;

/// Embedded Diesel migrations bundled with this crate.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Failure while bringing the database schema up to date.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// Could not open the database file.
    #[error(transparent)]
    Connection(#[from] diesel::ConnectionError),
    /// A migration statement failed.
    #[error("migration failed: {0}")]
    Migration(String),
}

/// Runs pending migrations on the SQLite database at the given path,
/// switching it to WAL journaling first.
pub fn run_sqlite(database_url: &str) -> Result<(), MigrateError> {
    let mut conn = SqliteConnection::establish(database_url)?;
    conn.batch_execute("PRAGMA journal_mode=WAL;")
        .map_err(|e| MigrateError::Migration(e.to_string()))?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| MigrateError::Migration(e.to_string()))?;
    Ok(())
}
