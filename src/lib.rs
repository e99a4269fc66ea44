// src/lib.rs
// PetHub - pet records over a document store
//
// Architecture:
// - Domain-centric: entities track their own dirty state and lifecycle
// - Repositories: generic CRUD + pagination over any DocumentStore
// - Explicit: the store handle is built once and passed in, no globals
// - Validation: declared once per collection, enforced by the store on write
// - Application Layer: command boundary returning JSON envelopes

// ============================================================================
// FOUNDATION
// ============================================================================

pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod repositories;

// ============================================================================
// APPLICATION LAYER
// ============================================================================

pub mod application;

// ============================================================================
// PUBLIC API - Domain Entities
// ============================================================================

pub use domain::{
    DirtyTrackable, Entity, EntityState, FieldDescriptor, FieldKind, ImageInput, LifecycleAction,
    Pet, PetPatch, Serializable,
};

// ============================================================================
// PUBLIC API - Error Types
// ============================================================================

pub use error::{AppError, AppResult, StoreError, StoreResult};

// ============================================================================
// PUBLIC API - Configuration & Store
// ============================================================================

pub use config::AppConfig;

pub use db::{
    create_connection_pool, initialize_database, CollectionSchema, ConnectionPool, DocumentStore,
    MemoryDocumentStore, ObjectId, SqliteDocumentStore,
};

// ============================================================================
// PUBLIC API - Repositories
// ============================================================================

pub use repositories::{
    Direction, IdMode, Page, PageCursor, Pagination, PetRepository, Repository, SearchOptions,
    StoreRepository,
};

// ============================================================================
// PUBLIC API - Application Layer
// ============================================================================

pub use application::AppState;

pub use application::commands;
pub use application::dto;
