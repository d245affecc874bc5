pub mod error;
pub mod genre;
pub mod movie;

use std::str::FromStr as _;
use std::time::Duration;

pub use error::Error;
pub use sqlx::Error as SqlxError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::error::Result;

pub type ChosenDB = sqlx::Sqlite;
pub type ChosenRow = sqlx::sqlite::SqliteRow;
pub type Pool = sqlx::Pool<ChosenDB>;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// How long a connection waits for a lock held by another one.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn new_pool(database_url: &str) -> Result<Pool, Error> {
    new_pool_with_size(database_url, DEFAULT_MAX_CONNECTIONS).await
}

/// Opens a pool over `database_url`, creating the database file if needed.
///
/// Foreign keys are switched on for every connection, junction rows rely on
/// `ON DELETE CASCADE` when a movie is removed.
pub async fn new_pool_with_size(database_url: &str, max_connections: u32) -> Result<Pool, Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT);
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Applies the embedded schema migrations.
pub async fn migrate(pool: &Pool) -> Result<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}
