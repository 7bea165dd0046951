//! SQLite connection helpers.

use diesel::{Connection, RunQueryDsl, SqliteConnection, sql_query};

/// Opens a SQLite connection and applies connection-wide PRAGMAs.
pub fn connect_sqlite(database_url: &str) -> Result<SqliteConnection, diesel::ConnectionError> {
    let mut conn = SqliteConnection::establish(database_url)?;

    // Better read concurrency + nicer dev ergonomics.
    sql_query("PRAGMA journal_mode=WAL;")
        .execute(&mut conn)
        .map_err(|e| diesel::ConnectionError::CouldntSetupConfiguration(e))?;
    sql_query("PRAGMA foreign_keys=ON;")
        .execute(&mut conn)
        .map_err(|e| diesel::ConnectionError::CouldntSetupConfiguration(e))?;
    sql_query("PRAGMA busy_timeout=5000;")
        .execute(&mut conn)
        .map_err(|e| diesel::ConnectionError::CouldntSetupConfiguration(e))?;
    Ok(conn)
}
