// src/config.rs
//
// Store configuration
//
// Defaults live in the user's data directory; environment variables and the
// CLI may override them.

use std::env;
use std::path::PathBuf;

use crate::error::{StoreError, StoreResult};

pub const DATABASE_PATH_VAR: &str = "PETHUB_DATABASE_PATH";
pub const MAX_CONNECTIONS_VAR: &str = "PETHUB_MAX_CONNECTIONS";

const DEFAULT_MAX_CONNECTIONS: u32 = 15;
const DEFAULT_BUSY_TIMEOUT_MS: u32 = 5000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub max_connections: u32,
    pub busy_timeout_ms: u32,
}

impl AppConfig {
    pub fn at(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }

    /// `{DATA_DIR}/pethub/pethub.db`
    pub fn default_database_path() -> StoreResult<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| StoreError::Config("Could not determine app data directory".to_string()))?;
        Ok(data_dir.join("pethub").join("pethub.db"))
    }

    /// Defaults overridden by `PETHUB_DATABASE_PATH` and `PETHUB_MAX_CONNECTIONS`
    pub fn from_env() -> StoreResult<Self> {
        let database_path = match env::var_os(DATABASE_PATH_VAR) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => Self::default_database_path()?,
        };

        let mut config = Self::at(database_path);

        if let Ok(raw) = env::var(MAX_CONNECTIONS_VAR) {
            config.max_connections = parse_max_connections(&raw)?;
        }

        Ok(config)
    }
}

fn parse_max_connections(raw: &str) -> StoreResult<u32> {
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(StoreError::Config(format!(
            "{} must be a positive integer, got {:?}",
            MAX_CONNECTIONS_VAR, raw
        ))),
    }
}
