// src/application/mod.rs
//
// Application Layer
//
// ARCHITECTURE:
// - This layer sits ABOVE the repositories
// - It provides the boundary between callers and the domain
// - It translates between request bodies, DTOs and domain entities

pub mod commands;
pub mod dto;
pub mod error_handling;
pub mod state;

pub use commands::*;
pub use dto::*;
pub use error_handling::{ErrorResponse, ErrorType, ToErrorResponse};
pub use state::AppState;
