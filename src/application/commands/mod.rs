// src/application/commands/mod.rs
//
// Command Handlers
//
// ARCHITECTURE:
// - Commands are thin adapters between callers (CLI, tests) and repositories
// - Commands accept ids and JSON bodies, return DTOs
// - Commands handle error conversion into ErrorResponse
// - Commands NEVER contain business logic

pub mod pet_commands;

pub use pet_commands::*;
