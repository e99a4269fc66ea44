// src/repositories/store_repository.rs
//
// Generic repository over a DocumentStore
//
// RULES:
// - Maps entities to documents and back, nothing else
// - Validation belongs to the collection schema, enforced by the store
// - Every store failure is wrapped into AppError::Storage and logged

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::{Map, Value};

use super::repository::{Direction, Page, PageCursor, Repository, SearchOptions, DEFAULT_PAGE_SIZE};
use crate::db::{
    CollectionSchema, Document, DocumentStore, Filter, FindQuery, ObjectId, SortOrder, UpdateSpec,
};
use crate::domain::entity::{
    format_timestamp, DirtyTrackable, Entity, Serializable, CREATED_AT_KEY, ID_KEY, NATIVE_ID_KEY,
    UPDATED_AT_KEY, VERSION_KEY,
};
use crate::error::{AppError, AppResult, StoreError};

/// How the public `id` relates to the store's native `_id`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdMode {
    /// Public `id` is stored as `_id` and translated both ways
    #[default]
    Custom,
    /// Documents carry `id` themselves; the schema must declare it
    Native,
}

pub struct StoreRepository<E> {
    store: Arc<dyn DocumentStore>,
    schema: CollectionSchema,
    id_mode: IdMode,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> StoreRepository<E> {
    pub fn new(store: Arc<dyn DocumentStore>, schema: CollectionSchema) -> AppResult<Self> {
        Self::with_id_mode(store, schema, IdMode::Custom)
    }

    pub fn with_id_mode(
        store: Arc<dyn DocumentStore>,
        schema: CollectionSchema,
        id_mode: IdMode,
    ) -> AppResult<Self> {
        if schema.name().trim().is_empty() {
            return Err(AppError::storage(
                format!("{} repository has a null or empty collection name", E::ENTITY_NAME),
                StoreError::InvalidCollection(schema.name().to_string()),
            ));
        }

        Ok(Self {
            store,
            schema,
            id_mode,
            _entity: PhantomData,
        })
    }

    pub fn schema(&self) -> &CollectionSchema {
        &self.schema
    }

    pub fn id_mode(&self) -> IdMode {
        self.id_mode
    }

    fn fail(&self, operation: &str, err: StoreError) -> AppError {
        log::error!("[{}] {} in `{}`: {}", operation, E::ENTITY_NAME, self.schema.name(), err);
        AppError::storage(format!("[{}] {}", operation, err), err)
    }

    /// Entity to document. A public id that is a valid ObjectId becomes `_id`;
    /// anything else is dropped so the store generates one.
    fn map_to_persistence(&self, entity: &E) -> Document {
        let mut document = entity.to_json();
        if self.id_mode == IdMode::Native {
            return document;
        }

        if let Some(Value::String(id)) = document.remove(ID_KEY) {
            if let Some(id) = ObjectId::parse(&id) {
                document.insert(NATIVE_ID_KEY.to_string(), Value::String(id.to_string()));
            }
        }
        document
    }

    fn map_to_entity(&self, mut document: Document) -> E {
        if self.id_mode == IdMode::Custom {
            let id = match document.remove(NATIVE_ID_KEY) {
                Some(Value::String(id)) => id,
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            };
            document.insert(ID_KEY.to_string(), Value::String(id));
        }
        E::from_record(document)
    }

    /// Public `id` becomes `_id`; a valid ObjectId string is matched in its
    /// stored lowercase form.
    fn transform_where(&self, mut filter: Map<String, Value>) -> Filter {
        if self.id_mode == IdMode::Custom {
            if let Some(id) = filter.remove(ID_KEY) {
                filter.insert(NATIVE_ID_KEY.to_string(), Self::normalize_key(id));
            }
        }
        filter
    }

    fn normalize_key(id: Value) -> Value {
        match id {
            Value::String(raw) => match ObjectId::parse(&raw) {
                Some(id) => Value::String(id.to_string()),
                None => Value::String(raw),
            },
            other => other,
        }
    }

    fn transform_order(order: Vec<(String, Direction)>) -> Vec<(String, SortOrder)> {
        order
            .into_iter()
            .map(|(field, direction)| {
                let order = match direction {
                    Direction::Asc => SortOrder::Ascending,
                    Direction::Desc => SortOrder::Descending,
                };
                (field, order)
            })
            .collect()
    }

    fn id_filter(&self, entity: &E) -> AppResult<Filter> {
        if entity.id().is_empty() {
            return Err(self.fail(
                "update",
                StoreError::MissingKey {
                    collection: self.schema.name().to_string(),
                    entity: E::ENTITY_NAME.to_string(),
                },
            ));
        }

        let id = Value::String(entity.id().to_string());
        let mut filter = Filter::new();
        match self.id_mode {
            IdMode::Custom => filter.insert(NATIVE_ID_KEY.to_string(), Self::normalize_key(id)),
            IdMode::Native => filter.insert(ID_KEY.to_string(), id),
        };
        Ok(filter)
    }

    /// Serialized keys that differ from the committed snapshot, plus `updatedAt`
    fn changed_representation(entity: &E) -> Document {
        let changed_fields = entity.changed_fields();
        let snapshot = entity.state().snapshot();

        let mut changes: Document = entity
            .to_json()
            .into_iter()
            .filter(|(key, value)| {
                match E::descriptors().iter().find(|d| d.name == key.as_str()) {
                    Some(descriptor) => changed_fields.contains(&descriptor.name),
                    None if [ID_KEY, CREATED_AT_KEY, UPDATED_AT_KEY].contains(&key.as_str()) => false,
                    None => snapshot.get(key) != Some(value),
                }
            })
            .collect();

        if let Some(updated_at) = entity.updated_at() {
            changes.insert(UPDATED_AT_KEY.to_string(), Value::String(format_timestamp(&updated_at)));
        }
        changes
    }
}

#[async_trait]
impl<E: Entity> Repository<E> for StoreRepository<E> {
    async fn find_one(&self, options: SearchOptions) -> AppResult<Option<E>> {
        let filter = self.transform_where(options.filter);
        let query = FindQuery::first().sorted(Self::transform_order(options.order));

        let records = self
            .store
            .find(&self.schema, &filter, &query)
            .await
            .map_err(|e| self.fail("find_one", e))?;

        Ok(records.into_iter().next().map(|doc| self.map_to_entity(doc)))
    }

    async fn find(&self, options: SearchOptions) -> AppResult<Page<E>> {
        let filter = self.transform_where(options.filter);
        let page_size = options.limit.filter(|&n| n > 0).unwrap_or(DEFAULT_PAGE_SIZE);
        let skip = match options.cursor {
            Some(cursor) => cursor.offset(),
            None => options.skip.unwrap_or(0),
        };

        let total = self
            .store
            .count(&self.schema, &filter)
            .await
            .map_err(|e| self.fail("find", e))?;

        let query = FindQuery::default()
            .sorted(Self::transform_order(options.order))
            .page(skip, page_size);
        let records = self
            .store
            .find(&self.schema, &filter, &query)
            .await
            .map_err(|e| self.fail("find", e))?;

        let next = skip + records.len();
        let cursor = (!records.is_empty() && (next as u64) < total).then(|| PageCursor::at(next));

        Ok(Page {
            page: skip / page_size + 1,
            page_size,
            total,
            results: records.into_iter().map(|doc| self.map_to_entity(doc)).collect(),
            cursor,
        })
    }

    async fn find_by_key(&self, key: &str) -> AppResult<Option<E>> {
        let Some(id) = ObjectId::parse(key) else {
            log::debug!("{} key {:?} is not a valid ObjectId", E::ENTITY_NAME, key);
            return Ok(None);
        };

        let record = self
            .store
            .find_by_id(&self.schema, &id)
            .await
            .map_err(|e| self.fail("find_by_key", e))?;

        Ok(record.map(|doc| self.map_to_entity(doc)))
    }

    async fn create(&self, entity: &mut E) -> AppResult<E> {
        let document = self.map_to_persistence(entity);

        let stored = self
            .store
            .insert(&self.schema, document)
            .await
            .map_err(|e| self.fail("create", e))?;

        let created = self.map_to_entity(stored);

        entity.mark_as_created();
        entity.state_mut().assign_id(created.id().to_string());
        entity.commit().await;

        log::debug!("Created {} {}", E::ENTITY_NAME, created.id());
        Ok(created)
    }

    async fn update(&self, entity: &mut E) -> AppResult<E> {
        if !entity.is_dirty() {
            return Ok(entity.clone());
        }

        let filter = self.id_filter(entity)?;
        let update = UpdateSpec::new()
            .set_all(Self::changed_representation(entity))
            .inc(VERSION_KEY, 1);

        let outcome = self
            .store
            .update_one(&self.schema, &filter, &update)
            .await
            .map_err(|e| self.fail("update", e))?;

        if outcome.modified == 0 {
            return Err(self.fail(
                "update",
                StoreError::NoMatch {
                    collection: self.schema.name().to_string(),
                    key: entity.id().to_string(),
                },
            ));
        }

        entity.commit().await;
        log::debug!("Updated {} {}", E::ENTITY_NAME, entity.id());

        let reread = self
            .store
            .find(&self.schema, &filter, &FindQuery::first())
            .await
            .map_err(|e| self.fail("update", e))?;

        Ok(match reread.into_iter().next() {
            Some(doc) => self.map_to_entity(doc),
            None => entity.clone(),
        })
    }

    async fn delete(&self, filter: Map<String, Value>, force: bool) -> AppResult<u64> {
        let filter = self.transform_where(filter);
        if filter.is_empty() && !force {
            log::warn!("Refusing unfiltered delete on `{}`", self.schema.name());
            return Err(AppError::UnsafeDelete);
        }

        let records = self
            .store
            .find(&self.schema, &filter, &FindQuery::default())
            .await
            .map_err(|e| self.fail("delete", e))?;

        let bookkeeping: Vec<_> = records
            .into_iter()
            .map(|doc| {
                let mut entity = self.map_to_entity(doc);
                tokio::spawn(async move {
                    entity.mark_as_deleted();
                    entity.commit().await;
                    log::debug!("Deleted {} {}", E::ENTITY_NAME, entity.id());
                })
            })
            .collect();

        let deleted = self.store.delete_many(&self.schema, &filter).await;

        for result in join_all(bookkeeping).await {
            if let Err(e) = result {
                log::warn!("Delete bookkeeping for {} failed: {}", E::ENTITY_NAME, e);
            }
        }

        deleted.map_err(|e| self.fail("delete", e))
    }
}
