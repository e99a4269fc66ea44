// src/db/memory_store.rs
//
// In-process document store. Collections keep insertion order.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::document_store::{Document, DocumentStore, Filter, FindQuery, UpdateOutcome, UpdateSpec};
use super::object_id::ObjectId;
use super::query::{matches, select};
use super::schema::{document_id, CollectionSchema};
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently stored in `collection`
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert(&self, schema: &CollectionSchema, document: Document) -> StoreResult<Document> {
        let (id, document) = schema.prepare_insert(document)?;

        let mut collections = self.collections.write().await;
        let documents = collections.entry(schema.name().to_string()).or_default();

        if documents.iter().any(|d| document_id(d) == Some(id.as_str())) {
            return Err(StoreError::DuplicateKey {
                collection: schema.name().to_string(),
                id,
            });
        }

        documents.push(document.clone());
        Ok(document)
    }

    async fn find(
        &self,
        schema: &CollectionSchema,
        filter: &Filter,
        query: &FindQuery,
    ) -> StoreResult<Vec<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(schema.name())
            .map(|documents| select(documents, filter, query))
            .unwrap_or_default())
    }

    async fn find_by_id(&self, schema: &CollectionSchema, id: &ObjectId) -> StoreResult<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections.get(schema.name()).and_then(|documents| {
            documents
                .iter()
                .find(|d| document_id(d) == Some(id.as_str()))
                .cloned()
        }))
    }

    async fn count(&self, schema: &CollectionSchema, filter: &Filter) -> StoreResult<u64> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(schema.name())
            .map_or(0, |documents| documents.iter().filter(|d| matches(d, filter)).count()) as u64)
    }

    async fn update_one(
        &self,
        schema: &CollectionSchema,
        filter: &Filter,
        update: &UpdateSpec,
    ) -> StoreResult<UpdateOutcome> {
        let mut collections = self.collections.write().await;
        let Some(documents) = collections.get_mut(schema.name()) else {
            return Ok(UpdateOutcome::default());
        };
        let Some(current) = documents.iter_mut().find(|d| matches(d, filter)) else {
            return Ok(UpdateOutcome::default());
        };

        let next = schema.prepare_update(current, update)?;
        let modified = next != *current;
        *current = next;

        Ok(UpdateOutcome {
            matched: 1,
            modified: modified as u64,
        })
    }

    async fn delete_many(&self, schema: &CollectionSchema, filter: &Filter) -> StoreResult<u64> {
        let mut collections = self.collections.write().await;
        let Some(documents) = collections.get_mut(schema.name()) else {
            return Ok(0);
        };

        let before = documents.len();
        documents.retain(|d| !matches(d, filter));
        Ok((before - documents.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::FieldRule;
    use serde_json::{json, Value};

    fn schema() -> CollectionSchema {
        CollectionSchema::new("pets")
            .field(FieldRule::string("name").required("name required"))
            .field(FieldRule::string_array("tags"))
            .with_timestamps()
    }

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_find_by_id() {
        let store = MemoryDocumentStore::new();
        let stored = store.insert(&schema(), doc(json!({ "name": "Rex" }))).await.unwrap();

        let id = ObjectId::parse(document_id(&stored).unwrap()).unwrap();
        let found = store.find_by_id(&schema(), &id).await.unwrap().unwrap();

        assert_eq!(found, stored);
        assert_eq!(store.len("pets").await, 1);
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_and_invalid() {
        let store = MemoryDocumentStore::new();
        let first = doc(json!({ "_id": "65f0c0ffee0000000000beef", "name": "Rex" }));
        store.insert(&schema(), first.clone()).await.unwrap();

        let duplicate = store.insert(&schema(), first).await;
        assert!(matches!(duplicate, Err(StoreError::DuplicateKey { .. })));

        let invalid = store.insert(&schema(), doc(json!({ "tags": ["x"] }))).await;
        assert!(matches!(invalid, Err(StoreError::Validation { .. })));
        assert_eq!(store.len("pets").await, 1);
    }

    #[tokio::test]
    async fn test_update_one_reports_matched_and_modified() {
        let store = MemoryDocumentStore::new();
        let stored = store.insert(&schema(), doc(json!({ "name": "Rex" }))).await.unwrap();
        let by_id = doc(json!({ "_id": stored["_id"].clone() }));

        let outcome = store
            .update_one(&schema(), &by_id, &UpdateSpec::new().set("tags", json!("solo")).inc("__v", 1))
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome { matched: 1, modified: 1 });

        let found = store.find(&schema(), &by_id, &FindQuery::first()).await.unwrap();
        assert_eq!(found[0]["tags"], json!(["solo"]));
        assert_eq!(found[0]["__v"], json!(1));

        let missing = doc(json!({ "_id": "65f0c0ffee0000000000beef" }));
        let outcome = store
            .update_one(&schema(), &missing, &UpdateSpec::new().inc("__v", 1))
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::default());
    }

    #[tokio::test]
    async fn test_delete_many_and_count() {
        let store = MemoryDocumentStore::new();
        for name in ["Rex", "Tom", "Rex"] {
            store.insert(&schema(), doc(json!({ "name": name }))).await.unwrap();
        }

        let rex = doc(json!({ "name": "Rex" }));
        assert_eq!(store.count(&schema(), &rex).await.unwrap(), 2);
        assert_eq!(store.delete_many(&schema(), &rex).await.unwrap(), 2);
        assert_eq!(store.count(&schema(), &Filter::new()).await.unwrap(), 1);
        assert_eq!(store.delete_many(&schema(), &Filter::new()).await.unwrap(), 1);
        assert_eq!(store.len("pets").await, 0);
    }

    #[tokio::test]
    async fn test_unknown_collection_is_empty() {
        let store = MemoryDocumentStore::new();
        let other = CollectionSchema::new("owners");

        assert!(store.find(&other, &Filter::new(), &FindQuery::default()).await.unwrap().is_empty());
        assert_eq!(store.count(&other, &Filter::new()).await.unwrap(), 0);
        assert_eq!(store.delete_many(&other, &Filter::new()).await.unwrap(), 0);
    }
}
