// src/application/error_handling.rs
//
// Error Handling for Commands
//
// ARCHITECTURE:
// - Maps internal errors → caller-friendly responses with an HTTP-like status
// - Provides consistent error format for every command
// - Never exposes store internals beyond validation messages
// - Logs errors for debugging

use serde::{Deserialize, Serialize};

use crate::error::{AppError, StoreError};

/// Standard error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error_type: ErrorType,
    pub message: String,
    pub details: Option<String>,
    pub status: u16,
}

/// Error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// Resource not found (404)
    NotFound,

    /// Invalid input, schema violation or unsafe request (400)
    Validation,

    /// Document store failure (500)
    Storage,
}

impl ErrorResponse {
    /// Create error response from AppError
    pub fn from_app_error(error: AppError) -> Self {
        match error {
            AppError::NotFound(resource) => Self::not_found(&resource),

            AppError::InvalidInput(message) => Self::validation(message),

            AppError::UnsafeDelete => Self::validation(AppError::UnsafeDelete.to_string()),

            AppError::Storage {
                source: StoreError::Validation { violations, .. },
                ..
            } => Self {
                details: Some(
                    violations
                        .iter()
                        .map(|v| format!("{}: {}", v.field, v.message))
                        .collect::<Vec<_>>()
                        .join("\n"),
                ),
                ..Self::validation("Validation failed".to_string())
            },

            AppError::Storage { message, source } => {
                // Log full error for debugging
                log::error!("Storage error: {} ({:?})", message, source);

                Self {
                    success: false,
                    error_type: ErrorType::Storage,
                    message: "Storage operation failed".to_string(),
                    details: Some("Check logs for details".to_string()),
                    status: 500,
                }
            }
        }
    }

    /// Create validation error
    pub fn validation(message: String) -> Self {
        Self {
            success: false,
            error_type: ErrorType::Validation,
            message,
            details: None,
            status: 400,
        }
    }

    /// Create not found error
    pub fn not_found(resource: &str) -> Self {
        Self {
            success: false,
            error_type: ErrorType::NotFound,
            message: format!("{} not found", resource),
            details: None,
            status: 404,
        }
    }
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        Self::from_app_error(error)
    }
}

/// Helper trait to convert Results to ErrorResponse
pub trait ToErrorResponse<T> {
    fn to_error_response(self) -> Result<T, ErrorResponse>;
}

impl<T> ToErrorResponse<T> for Result<T, AppError> {
    fn to_error_response(self) -> Result<T, ErrorResponse> {
        self.map_err(ErrorResponse::from_app_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FieldViolation;

    #[test]
    fn test_not_found_error() {
        let error = ErrorResponse::from_app_error(AppError::NotFound("Pet".to_string()));
        assert_eq!(error.error_type, ErrorType::NotFound);
        assert_eq!(error.message, "Pet not found");
        assert_eq!(error.status, 404);
    }

    #[test]
    fn test_validation_error() {
        let error = ErrorResponse::validation("Invalid input".to_string());
        assert_eq!(error.error_type, ErrorType::Validation);
        assert_eq!(error.message, "Invalid input");
        assert_eq!(error.status, 400);
    }

    #[test]
    fn test_schema_violations_are_client_errors() {
        let error = ErrorResponse::from_app_error(
            StoreError::Validation {
                collection: "pets".to_string(),
                violations: vec![FieldViolation::new("name", "Please provide a name for this pet.")],
            }
            .into(),
        );

        assert_eq!(error.status, 400);
        assert_eq!(error.details.as_deref(), Some("name: Please provide a name for this pet."));
    }

    #[test]
    fn test_unsafe_delete_is_client_error() {
        let error = ErrorResponse::from_app_error(AppError::UnsafeDelete);
        assert_eq!(error.error_type, ErrorType::Validation);
        assert_eq!(error.status, 400);
    }

    #[test]
    fn test_other_storage_errors_are_server_errors() {
        let error = ErrorResponse::from_app_error(StoreError::Pool("exhausted".to_string()).into());
        assert_eq!(error.error_type, ErrorType::Storage);
        assert_eq!(error.status, 500);
        assert!(!error.message.contains("exhausted"));
    }

    #[test]
    fn test_serialization() {
        let error = ErrorResponse::not_found("Pet");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("not_found"));
        assert!(json.contains("Pet not found"));
    }
}
