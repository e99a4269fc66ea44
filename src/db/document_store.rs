// src/db/document_store.rs
//
// Document store contract
//
// The store is an external collaborator: a handle is built once at startup
// and passed to every repository. Every call names the collection through
// its schema, which the store uses to cast and validate writes.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::object_id::ObjectId;
use super::schema::CollectionSchema;
use crate::error::StoreResult;

/// A stored record as the store sees it
pub type Document = Map<String, Value>;

/// Field-equality filter; an empty filter matches everything
pub type Filter = Map<String, Value>;

/// Native sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindQuery {
    pub sort: Vec<(String, SortOrder)>,
    pub skip: usize,
    pub limit: Option<usize>,
}

impl FindQuery {
    /// At most one document
    pub fn first() -> Self {
        Self {
            limit: Some(1),
            ..Default::default()
        }
    }

    pub fn sorted(mut self, sort: Vec<(String, SortOrder)>) -> Self {
        self.sort = sort;
        self
    }

    pub fn page(mut self, skip: usize, limit: usize) -> Self {
        self.skip = skip;
        self.limit = Some(limit);
        self
    }
}

/// `$set` + `$inc` applied to a single document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSpec {
    pub set: Document,
    pub inc: BTreeMap<String, i64>,
}

impl UpdateSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: Value) -> Self {
        self.set.insert(key.into(), value);
        self
    }

    pub fn set_all(mut self, fields: Document) -> Self {
        self.set.extend(fields);
        self
    }

    pub fn inc(mut self, key: impl Into<String>, by: i64) -> Self {
        *self.inc.entry(key.into()).or_insert(0) += by;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Cast, validate and store a new document. Generates `_id` when absent.
    async fn insert(&self, schema: &CollectionSchema, document: Document) -> StoreResult<Document>;

    async fn find(
        &self,
        schema: &CollectionSchema,
        filter: &Filter,
        query: &FindQuery,
    ) -> StoreResult<Vec<Document>>;

    async fn find_by_id(&self, schema: &CollectionSchema, id: &ObjectId) -> StoreResult<Option<Document>>;

    async fn count(&self, schema: &CollectionSchema, filter: &Filter) -> StoreResult<u64>;

    /// Update the first document matching `filter`
    async fn update_one(
        &self,
        schema: &CollectionSchema,
        filter: &Filter,
        update: &UpdateSpec,
    ) -> StoreResult<UpdateOutcome>;

    async fn delete_many(&self, schema: &CollectionSchema, filter: &Filter) -> StoreResult<u64>;
}
