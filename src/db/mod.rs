// src/db/mod.rs
//
// Database module
//
// Provides:
// - The document store contract and its backends (SQLite, in-memory)
// - Collection schemas (casting, validation, bookkeeping fields)
// - Connection pooling
// - Schema migrations

pub mod connection;
pub mod document_store;
pub mod memory_store;
pub mod migrations;
pub mod object_id;
pub mod query;
pub mod schema;
pub mod sqlite_store;

pub use connection::{create_connection_pool, get_connection, ConnectionPool, PooledConn};

pub use document_store::{
    Document, DocumentStore, Filter, FindQuery, SortOrder, UpdateOutcome, UpdateSpec,
};

pub use memory_store::MemoryDocumentStore;

pub use migrations::{
    get_database_stats, initialize_database, verify_database_integrity, DatabaseStats,
};

pub use object_id::ObjectId;

pub use schema::{document_id, CollectionSchema, FieldRule, SchemaType};

pub use sqlite_store::SqliteDocumentStore;
