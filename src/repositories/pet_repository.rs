// src/repositories/pet_repository.rs
//
// Pet persistence: the `pets` collection schema bound to the generic
// store repository. Validation messages are user-facing.

use std::sync::Arc;

use super::store_repository::StoreRepository;
use crate::db::{CollectionSchema, DocumentStore, FieldRule};
use crate::domain::Pet;
use crate::error::AppResult;

pub const PETS_COLLECTION: &str = "pets";

pub type PetRepository = StoreRepository<Pet>;

pub fn pet_schema() -> CollectionSchema {
    CollectionSchema::new(PETS_COLLECTION)
        .field(
            FieldRule::string("name")
                .required("Please provide a name for this pet.")
                .max_length(60, "Name cannot be more than 60 characters"),
        )
        .field(
            FieldRule::string("owner_name")
                .required("Please provide the pet owner's name")
                .max_length(60, "Owner's Name cannot be more than 60 characters"),
        )
        .field(
            FieldRule::string("species")
                .required("Please specify the species of your pet.")
                .max_length(40, "Species specified cannot be more than 40 characters"),
        )
        .field(FieldRule::number("age"))
        .field(FieldRule::boolean("poddy_trained"))
        .field(FieldRule::string_array("diet"))
        .field(FieldRule::string_array("image_url").required("Please provide an image url for this pet."))
        .field(FieldRule::string_array("images"))
        .field(FieldRule::string_array("likes"))
        .field(FieldRule::string_array("dislikes"))
        .with_timestamps()
}

impl StoreRepository<Pet> {
    pub fn pets(store: Arc<dyn DocumentStore>) -> AppResult<Self> {
        Self::new(store, pet_schema())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryDocumentStore, ObjectId};
    use crate::domain::{DirtyTrackable, Entity, PetPatch, Serializable};
    use crate::error::{AppError, StoreError};
    use crate::repositories::{Repository, SearchOptions};
    use serde_json::{json, Map};
    use std::time::Duration;

    fn repository() -> (Arc<MemoryDocumentStore>, PetRepository) {
        let store = Arc::new(MemoryDocumentStore::new());
        let repo = PetRepository::pets(store.clone()).unwrap();
        (store, repo)
    }

    fn rex() -> Pet {
        Pet::from_value(json!({
            "name": "Rex",
            "owner_name": "Ana",
            "species": "Dog",
            "age": 3,
            "poddy_trained": true,
            "image_url": "data:image/png;base64,AAA",
            "likes": ["balls"]
        }))
    }

    fn violated_fields(err: &AppError) -> Vec<String> {
        match err.store_error() {
            Some(StoreError::Validation { violations, .. }) => {
                violations.iter().map(|v| v.field.clone()).collect()
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rex_lifecycle() {
        let (store, repo) = repository();

        let created = repo.create(&mut rex()).await.unwrap();
        assert!(ObjectId::is_valid(created.id()));
        assert_eq!(created.images(), ["data:image/png;base64,AAA".to_string()]);

        let mut loaded = repo.find_by_key(created.id()).await.unwrap().unwrap();
        assert_eq!(loaded.to_json(), created.to_json());

        tokio::time::sleep(Duration::from_millis(5)).await;
        loaded.update(PetPatch {
            name: Some("Rex2".to_string()),
            ..Default::default()
        });
        let updated = repo.update(&mut loaded).await.unwrap();
        assert_eq!(updated.name(), "Rex2");
        assert_eq!(updated.id(), created.id());
        assert_eq!(updated.images(), created.images());
        assert!(updated.updated_at() > created.updated_at());
        assert!(!loaded.is_dirty());

        let mut by_id = Map::new();
        by_id.insert("id".to_string(), json!(created.id()));
        assert_eq!(repo.delete(by_id, false).await.unwrap(), 1);

        assert!(repo.find_by_key(created.id()).await.unwrap().is_none());
        assert_eq!(store.len(PETS_COLLECTION).await, 0);
    }

    #[tokio::test]
    async fn test_stored_document_shape() {
        let (store, repo) = repository();
        let created = repo.create(&mut rex()).await.unwrap();

        let id = ObjectId::parse(created.id()).unwrap();
        let raw = store.find_by_id(&pet_schema(), &id).await.unwrap().unwrap();

        assert_eq!(raw["_id"], json!(created.id()));
        assert_eq!(raw["__v"], json!(0));
        assert_eq!(raw["image_url"], json!(["data:image/png;base64,AAA"]));
        assert_eq!(raw["images"], raw["image_url"]);
        assert!(raw["createdAt"].is_string());
        assert!(!raw.contains_key("id"));
    }

    #[tokio::test]
    async fn test_missing_required_fields_are_rejected() {
        let (store, repo) = repository();
        let mut incomplete = Pet::from_value(json!({ "name": "Rex" }));

        let err = repo.create(&mut incomplete).await.unwrap_err();

        assert_eq!(violated_fields(&err), vec!["owner_name", "species", "image_url"]);
        assert_eq!(store.len(PETS_COLLECTION).await, 0);
    }

    #[tokio::test]
    async fn test_length_limits_are_enforced() {
        let (_, repo) = repository();
        let created = repo.create(&mut rex()).await.unwrap();

        let mut pet = repo.find_by_key(created.id()).await.unwrap().unwrap();
        pet.update(PetPatch {
            species: Some("x".repeat(41)),
            ..Default::default()
        });
        let err = repo.update(&mut pet).await.unwrap_err();
        assert_eq!(violated_fields(&err), vec!["species"]);

        let stored = repo
            .find_one(SearchOptions::new().where_eq("id", created.id()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.species(), "Dog");
    }
}
