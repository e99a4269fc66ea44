// src/repositories/mod.rs
//
// Repository layer
//
// CRITICAL RULES:
// - Repositories are DUMB data mappers
// - NO business logic
// - Validation is declared on the collection schema, not here
// - NO cross-repository calls

pub mod pet_repository;
pub mod repository;
pub mod store_repository;

pub use pet_repository::{pet_schema, PetRepository, PETS_COLLECTION};
pub use repository::{
    Direction, Page, PageCursor, Pagination, Repository, SearchOptions, DEFAULT_PAGE_SIZE,
};
pub use store_repository::{IdMode, StoreRepository};
