//! Database initialization
//!
//! Opens (creating when missing) the SQLite database and makes sure the
//! playlist schema exists. Safe to run on every startup.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Busy timeout applied to every pooled connection
const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // WAL lets GetPlaylist readers run while a list mutation is in flight
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Open a private in-memory database with the playlist schema
///
/// Limited to a single connection: every `sqlite::memory:` connection is a
/// separate database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables used by the service (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_playlist_table(pool).await?;
    Ok(())
}

/// Create the playlist table
///
/// `prev = 0` marks the head and `next = 0` the tail. AUTOINCREMENT keeps
/// ids of deleted tracks from being handed out again.
async fn create_playlist_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS playlist (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            description TEXT NOT NULL,
            duration INTEGER NOT NULL DEFAULT 0 CHECK (duration >= 0),
            prev INTEGER NOT NULL DEFAULT 0,
            next INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_playlist_prev ON playlist(prev)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_playlist_next ON playlist(next)")
        .execute(pool)
        .await?;

    Ok(())
}
