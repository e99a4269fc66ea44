// src/db/connection.rs
//
// Database connection management
//
// PRINCIPLES:
// - Explicit connection pooling
// - No hidden connection creation
// - Clear error propagation
// - Thread-safe access

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;

use crate::config::AppConfig;
use crate::error::{StoreError, StoreResult};

/// Type alias for connection pool
pub type ConnectionPool = Pool<SqliteConnectionManager>;

/// Type alias for a pooled connection
pub type PooledConn = PooledConnection<SqliteConnectionManager>;

/// Create a connection pool for the configured database file
///
/// - SQLite in WAL mode for concurrent readers
/// - Busy timeout from the config to avoid immediate lock errors
/// - Parent directory created if missing
pub fn create_connection_pool(config: &AppConfig) -> StoreResult<ConnectionPool> {
    if let Some(parent) = config.database_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let busy_timeout = config.busy_timeout_ms;
    let manager = SqliteConnectionManager::file(&config.database_path).with_init(move |conn| {
        conn.execute_batch(&format!(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = {};",
            busy_timeout
        ))
    });

    Pool::builder()
        .max_size(config.max_connections)
        .build(manager)
        .map_err(|e| StoreError::Pool(format!("Failed to create connection pool: {}", e)))
}

/// Get a connection from the pool
pub fn get_connection(pool: &ConnectionPool) -> StoreResult<PooledConn> {
    pool.get()
        .map_err(|e| StoreError::Pool(format!("Failed to get database connection: {}", e)))
}

/// Create a standalone in-memory connection (for testing)
#[cfg(test)]
pub fn create_test_connection() -> StoreResult<rusqlite::Connection> {
    Ok(rusqlite::Connection::open_in_memory()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_pool_creation() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::at(dir.path().join("nested").join("pets.db"));

        let pool = create_connection_pool(&config).unwrap();
        let conn = get_connection(&pool).unwrap();

        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
        assert!(config.database_path.exists());
    }

    #[test]
    fn test_test_connection() {
        let conn = create_test_connection().unwrap();

        let result: i32 = conn
            .query_row("SELECT 1 + 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(result, 2);
    }
}
