// src/error/types.rs
use serde::Serialize;
use thiserror::Error;

/// A single field that failed schema casting or validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

fn summarize(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("{}: {}", v.field, v.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failures raised by the document store itself.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation failed for `{collection}`: {}", summarize(.violations))]
    Validation {
        collection: String,
        violations: Vec<FieldViolation>,
    },

    #[error("Duplicate key {id} in `{collection}`")]
    DuplicateKey { collection: String, id: String },

    #[error("No record matched key {key} in `{collection}`")]
    NoMatch { collection: String, key: String },

    #[error("{entity} in `{collection}` has no key; it was never stored")]
    MissingKey { collection: String, entity: String },

    #[error("Collection name is null or empty: {0:?}")]
    InvalidCollection(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store task failed: {0}")]
    Task(String),
}

impl From<r2d2::Error> for StoreError {
    fn from(err: r2d2::Error) -> Self {
        StoreError::Pool(err.to_string())
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        StoreError::Task(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Any failure reported by the store, with the store's own error attached.
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: StoreError,
    },

    #[error("Deleting invoked without any filter; check the request or call with force")]
    UnsafeDelete,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A record the caller asked for by key does not exist
    #[error("{0} not found")]
    NotFound(String),
}

impl AppError {
    pub fn storage(message: impl Into<String>, source: StoreError) -> Self {
        AppError::Storage {
            message: message.into(),
            source,
        }
    }

    /// The underlying store error, if this is a storage failure.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            AppError::Storage { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Storage {
            message: err.to_string(),
            source: err,
        }
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_lists_every_field() {
        let err = StoreError::Validation {
            collection: "pets".to_string(),
            violations: vec![
                FieldViolation::new("name", "Please provide a name for this pet."),
                FieldViolation::new("species", "Species specified cannot be more than 40 characters"),
            ],
        };

        let message = err.to_string();
        assert!(message.starts_with("Validation failed for `pets`"));
        assert!(message.contains("name: Please provide a name"));
        assert!(message.contains("species: Species specified"));
    }

    #[test]
    fn test_storage_error_keeps_source() {
        let err: AppError = StoreError::InvalidCollection(String::new()).into();

        assert!(matches!(
            err.store_error(),
            Some(StoreError::InvalidCollection(_))
        ));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_serializes_as_message() {
        let json = serde_json::to_string(&AppError::UnsafeDelete).unwrap();
        assert!(json.contains("without any filter"));
    }
}
