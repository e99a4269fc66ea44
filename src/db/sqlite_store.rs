// src/db/sqlite_store.rs
//
// SQLite-backed document store
//
// PRINCIPLES:
// - One table for every collection, documents kept as JSON text
// - Blocking SQLite work runs on the blocking pool, never on the runtime
// - Multi-statement writes run inside a transaction

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use serde_json::Value;

use super::connection::{create_connection_pool, get_connection, ConnectionPool};
use super::document_store::{Document, DocumentStore, Filter, FindQuery, UpdateOutcome, UpdateSpec};
use super::migrations::{
    get_database_stats, initialize_database, verify_database_integrity, DatabaseStats,
};
use super::object_id::ObjectId;
use super::query::{matches, select};
use super::schema::{document_id, CollectionSchema};
use crate::config::AppConfig;
use crate::domain::entity::NATIVE_ID_KEY;
use crate::error::{StoreError, StoreResult};

pub struct SqliteDocumentStore {
    pool: Arc<ConnectionPool>,
}

impl SqliteDocumentStore {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    /// Build the pool for `config` and bring the schema up to date
    pub fn open(config: &AppConfig) -> StoreResult<Self> {
        let pool = create_connection_pool(config)?;
        {
            let conn = get_connection(&pool)?;
            initialize_database(&conn)?;
            verify_database_integrity(&conn)?;
        }
        log::info!("Document store ready at {}", config.database_path.display());
        Ok(Self::new(Arc::new(pool)))
    }

    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    /// File size and document count per collection
    pub async fn stats(&self) -> StoreResult<DatabaseStats> {
        self.run(|conn| get_database_stats(conn)).await
    }

    async fn run<T, F>(&self, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
    {
        let pool = Arc::clone(&self.pool);
        tokio::task::spawn_blocking(move || {
            let mut conn = get_connection(&pool)?;
            op(&mut *conn)
        })
        .await?
    }
}

fn parse_body(body: &str) -> StoreResult<Document> {
    Ok(serde_json::from_str::<Document>(body)?)
}

/// `Some(id)` when the filter is exactly `{ "_id": "<id>" }`
fn id_only(filter: &Filter) -> Option<&str> {
    if filter.len() != 1 {
        return None;
    }
    filter.get(NATIVE_ID_KEY).and_then(Value::as_str)
}

fn load_by_id(conn: &Connection, collection: &str, id: &str) -> StoreResult<Option<Document>> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection, id],
            |row| row.get(0),
        )
        .optional()?;

    body.as_deref().map(parse_body).transpose()
}

/// Matching documents in insertion order
fn load_matching(conn: &Connection, collection: &str, filter: &Filter) -> StoreResult<Vec<Document>> {
    if let Some(id) = id_only(filter) {
        return Ok(load_by_id(conn, collection, id)?.into_iter().collect());
    }

    let mut stmt = conn.prepare("SELECT body FROM documents WHERE collection = ?1 ORDER BY seq")?;
    let bodies = stmt
        .query_map(params![collection], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut documents = Vec::new();
    for body in bodies {
        let document = parse_body(&body)?;
        if matches(&document, filter) {
            documents.push(document);
        }
    }
    Ok(documents)
}

fn stored_id(collection: &str, document: &Document) -> StoreResult<String> {
    document_id(document)
        .map(str::to_string)
        .ok_or_else(|| StoreError::Schema(format!("Stored document in `{}` has no {}", collection, NATIVE_ID_KEY)))
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn insert(&self, schema: &CollectionSchema, document: Document) -> StoreResult<Document> {
        let (id, document) = schema.prepare_insert(document)?;
        let body = serde_json::to_string(&document)?;
        let collection = schema.name().to_string();

        self.run(move |conn| {
            match conn.execute(
                "INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3)",
                params![collection, id, body],
            ) {
                Ok(_) => Ok(document),
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == ErrorCode::ConstraintViolation
                        && err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
                {
                    Err(StoreError::DuplicateKey { collection, id })
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    async fn find(
        &self,
        schema: &CollectionSchema,
        filter: &Filter,
        query: &FindQuery,
    ) -> StoreResult<Vec<Document>> {
        let collection = schema.name().to_string();
        let filter = filter.clone();
        let query = query.clone();

        self.run(move |conn| {
            let documents = load_matching(conn, &collection, &filter)?;
            Ok(select(&documents, &Filter::new(), &query))
        })
        .await
    }

    async fn find_by_id(&self, schema: &CollectionSchema, id: &ObjectId) -> StoreResult<Option<Document>> {
        let collection = schema.name().to_string();
        let id = id.to_string();

        self.run(move |conn| load_by_id(conn, &collection, &id)).await
    }

    async fn count(&self, schema: &CollectionSchema, filter: &Filter) -> StoreResult<u64> {
        let collection = schema.name().to_string();
        let filter = filter.clone();

        self.run(move |conn| {
            if filter.is_empty() {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM documents WHERE collection = ?1",
                    params![collection],
                    |row| row.get(0),
                )?;
                return Ok(count as u64);
            }
            Ok(load_matching(conn, &collection, &filter)?.len() as u64)
        })
        .await
    }

    async fn update_one(
        &self,
        schema: &CollectionSchema,
        filter: &Filter,
        update: &UpdateSpec,
    ) -> StoreResult<UpdateOutcome> {
        let schema = schema.clone();
        let filter = filter.clone();
        let update = update.clone();

        self.run(move |conn| {
            let tx = conn.transaction()?;

            let Some(current) = load_matching(&tx, schema.name(), &filter)?.into_iter().next() else {
                return Ok(UpdateOutcome::default());
            };

            let next = schema.prepare_update(&current, &update)?;
            if next == current {
                return Ok(UpdateOutcome { matched: 1, modified: 0 });
            }

            tx.execute(
                "UPDATE documents SET body = ?1 WHERE collection = ?2 AND id = ?3",
                params![
                    serde_json::to_string(&next)?,
                    schema.name(),
                    stored_id(schema.name(), &current)?
                ],
            )?;
            tx.commit()?;

            Ok(UpdateOutcome { matched: 1, modified: 1 })
        })
        .await
    }

    async fn delete_many(&self, schema: &CollectionSchema, filter: &Filter) -> StoreResult<u64> {
        let collection = schema.name().to_string();
        let filter = filter.clone();

        self.run(move |conn| {
            let tx = conn.transaction()?;

            let deleted = if filter.is_empty() {
                tx.execute("DELETE FROM documents WHERE collection = ?1", params![collection])? as u64
            } else {
                let mut deleted = 0;
                for document in load_matching(&tx, &collection, &filter)? {
                    deleted += tx.execute(
                        "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                        params![collection, stored_id(&collection, &document)?],
                    )? as u64;
                }
                deleted
            };

            tx.commit()?;
            Ok(deleted)
        })
        .await
    }
}
