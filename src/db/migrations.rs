// src/db/migrations.rs
//
// Database schema initialization and migrations
//
// PRINCIPLES:
// - Explicit schema versions
// - No automatic migrations
// - Clear error messages
// - Idempotent operations

use rusqlite::Connection;

use crate::error::{StoreError, StoreResult};

/// Current schema version
/// Increment this when adding migrations
const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
///
/// This function:
/// 1. Checks current schema version
/// 2. Applies necessary migrations
/// 3. Updates version tracking
///
/// Safe to call multiple times (idempotent).
pub fn initialize_database(conn: &Connection) -> StoreResult<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        apply_initial_schema(conn)?;
        set_schema_version(conn, CURRENT_SCHEMA_VERSION)?;
    } else if current_version < CURRENT_SCHEMA_VERSION {
        return Err(StoreError::Schema(format!(
            "Schema version {} is outdated. Expected {}. Manual migration required.",
            current_version, CURRENT_SCHEMA_VERSION
        )));
    } else if current_version > CURRENT_SCHEMA_VERSION {
        return Err(StoreError::Schema(format!(
            "Schema version {} is newer than supported {}. Update the application.",
            current_version, CURRENT_SCHEMA_VERSION
        )));
    }

    Ok(())
}

/// Get current schema version
/// Returns 0 if schema_version table doesn't exist (fresh database)
fn get_schema_version(conn: &Connection) -> StoreResult<i32> {
    let table_exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;

    Ok(version.unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: i32) -> StoreResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
        [version],
    )?;

    Ok(())
}

/// Apply initial schema (version 1) from the embedded schema.sql
fn apply_initial_schema(conn: &Connection) -> StoreResult<()> {
    let schema = include_str!("../../schema.sql");

    conn.execute_batch(schema)
        .map_err(|e| StoreError::Schema(format!("Failed to apply initial schema: {}", e)))?;

    Ok(())
}

/// Verify database integrity
///
/// Runs SQLite's integrity check.
pub fn verify_database_integrity(conn: &Connection) -> StoreResult<()> {
    let result: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;

    if result != "ok" {
        return Err(StoreError::Schema(format!(
            "Database integrity check failed: {}",
            result
        )));
    }

    Ok(())
}

/// Get database statistics
///
/// Returns size information and document counts per collection
pub fn get_database_stats(conn: &Connection) -> StoreResult<DatabaseStats> {
    let page_count: i64 = conn.query_row("PRAGMA page_count", [], |row| row.get(0))?;
    let page_size: i64 = conn.query_row("PRAGMA page_size", [], |row| row.get(0))?;

    let mut stmt = conn.prepare(
        "SELECT collection, COUNT(*) FROM documents GROUP BY collection ORDER BY collection",
    )?;
    let collections = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DatabaseStats {
        size_bytes: page_count * page_size,
        page_count,
        page_size,
        collections,
    })
}

/// Database statistics
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseStats {
    pub size_bytes: i64,
    pub page_count: i64,
    pub page_size: i64,
    /// `(collection, document count)`, sorted by collection
    pub collections: Vec<(String, i64)>,
}
