// src/domain/pet/entity.rs
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use super::images::ImageInput;
use crate::domain::entity::{Entity, EntityState, FieldDescriptor, FieldKind};

/// Key the image list is also serialized under, for older readers
pub const LEGACY_IMAGE_KEY: &str = "image_url";
pub const IMAGES_KEY: &str = "images";

pub const PET_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::new("name", FieldKind::Text),
    FieldDescriptor::new("owner_name", FieldKind::Text),
    FieldDescriptor::new("species", FieldKind::Text),
    FieldDescriptor::new("age", FieldKind::Number),
    FieldDescriptor::new("poddy_trained", FieldKind::Boolean),
    FieldDescriptor::new("diet", FieldKind::List),
    FieldDescriptor::new(IMAGES_KEY, FieldKind::List),
    FieldDescriptor::new("likes", FieldKind::List),
    FieldDescriptor::new("dislikes", FieldKind::List),
];

/// A pet record with its images, likes and dislikes.
///
/// Required fields (`name`, `owner_name`, `species`, at least one image) are
/// not checked here; the `pets` collection schema rejects them on write.
#[derive(Debug, Clone)]
pub struct Pet {
    state: EntityState,
    name: String,
    owner_name: String,
    species: String,
    age: Option<Number>,
    poddy_trained: Option<bool>,
    diet: Vec<String>,
    images: Vec<String>,
    likes: Vec<String>,
    dislikes: Vec<String>,
}

impl Pet {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner_name(&self) -> &str {
        &self.owner_name
    }

    pub fn species(&self) -> &str {
        &self.species
    }

    pub fn age(&self) -> Option<f64> {
        self.age.as_ref().and_then(Number::as_f64)
    }

    pub fn poddy_trained(&self) -> Option<bool> {
        self.poddy_trained
    }

    pub fn diet(&self) -> &[String] {
        &self.diet
    }

    /// Encoded images, in display order
    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn likes(&self) -> &[String] {
        &self.likes
    }

    pub fn dislikes(&self) -> &[String] {
        &self.dislikes
    }
}

impl Entity for Pet {
    const ENTITY_NAME: &'static str = "Pet";

    fn descriptors() -> &'static [FieldDescriptor] {
        PET_FIELDS
    }

    fn from_record(mut record: Map<String, Value>) -> Self {
        let state = EntityState::from_record(&mut record, Self::USE_TIMESTAMPS);
        let images = take_images(&mut record);

        let mut pet = Pet {
            state,
            name: String::new(),
            owner_name: String::new(),
            species: String::new(),
            age: None,
            poddy_trained: None,
            diet: Vec::new(),
            images,
            likes: Vec::new(),
            dislikes: Vec::new(),
        };

        for descriptor in PET_FIELDS.iter().filter(|d| d.name != IMAGES_KEY) {
            if let Some(value) = record.remove(descriptor.name) {
                pet.set_field(descriptor.name, value);
            }
        }

        pet.into_baseline()
    }

    fn state(&self) -> &EntityState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut EntityState {
        &mut self.state
    }

    fn field(&self, name: &str) -> Value {
        match name {
            "name" => Value::String(self.name.clone()),
            "owner_name" => Value::String(self.owner_name.clone()),
            "species" => Value::String(self.species.clone()),
            "age" => self.age.clone().map(Value::Number).unwrap_or(Value::Null),
            "poddy_trained" => self.poddy_trained.map(Value::Bool).unwrap_or(Value::Null),
            "diet" => string_list_value(&self.diet),
            IMAGES_KEY => string_list_value(&self.images),
            "likes" => string_list_value(&self.likes),
            "dislikes" => string_list_value(&self.dislikes),
            _ => Value::Null,
        }
    }

    fn set_field(&mut self, name: &str, value: Value) {
        match name {
            "name" => self.name = text(&value),
            "owner_name" => self.owner_name = text(&value),
            "species" => self.species = text(&value),
            "age" => self.age = number(&value),
            "poddy_trained" => self.poddy_trained = boolean(&value),
            "diet" => self.diet = string_list(&value),
            IMAGES_KEY => {
                self.images = ImageInput::from_value(&value)
                    .map(ImageInput::into_images)
                    .unwrap_or_default()
            }
            "likes" => self.likes = string_list(&value),
            "dislikes" => self.dislikes = string_list(&value),
            _ => log::debug!("Pet has no field `{}`, ignoring", name),
        }
    }

    fn normalize_patch(patch: &mut Map<String, Value>) {
        let has_images = [IMAGES_KEY, LEGACY_IMAGE_KEY]
            .iter()
            .any(|key| patch.get(*key).is_some_and(|v| !v.is_null()));
        if has_images {
            let images = take_images(patch);
            patch.insert(IMAGES_KEY.to_string(), string_list_value(&images));
        } else {
            patch.remove(LEGACY_IMAGE_KEY);
        }

        for key in ["diet", "likes", "dislikes"] {
            if let Some(Value::String(single)) = patch.get(key) {
                let wrapped = Value::Array(vec![Value::String(single.clone())]);
                patch.insert(key.to_string(), wrapped);
            }
        }
    }

    fn extend_json(&self, json: &mut Map<String, Value>) {
        json.insert(LEGACY_IMAGE_KEY.to_string(), string_list_value(&self.images));
    }
}

/// `images` wins when it carries anything; otherwise the legacy `image_url`
fn take_images(record: &mut Map<String, Value>) -> Vec<String> {
    let read = |value: Option<Value>| {
        value
            .as_ref()
            .and_then(ImageInput::from_value)
            .map(ImageInput::into_images)
            .unwrap_or_default()
    };
    let current = read(record.remove(IMAGES_KEY));
    let legacy = read(record.remove(LEGACY_IMAGE_KEY));
    if current.is_empty() {
        legacy
    } else {
        current
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn number(value: &Value) -> Option<Number> {
    match value {
        Value::Number(n) => Some(n.clone()),
        Value::String(s) => s.trim().parse::<f64>().ok().and_then(Number::from_f64),
        _ => None,
    }
}

fn boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        Value::String(s) => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn string_list_value(items: &[String]) -> Value {
    Value::Array(items.iter().cloned().map(Value::String).collect())
}

/// Typed partial update. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PetPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poddy_trained: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diet: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "image_url")]
    pub images: Option<ImageInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dislikes: Option<Vec<String>>,
}

impl From<PetPatch> for Map<String, Value> {
    fn from(patch: PetPatch) -> Self {
        match serde_json::to_value(patch) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

impl From<PetPatch> for Pet {
    fn from(patch: PetPatch) -> Self {
        Pet::from_record(patch.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::{DirtyTrackable, LifecycleAction, Serializable};
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn rex() -> Pet {
        Pet::from_value(json!({
            "_id": "65f0c0ffee0000000000beef",
            "name": "Rex",
            "owner_name": "Ana",
            "species": "Dog",
            "age": 3,
            "image_url": ["data:image/png;base64,A"],
            "likes": ["balls"],
            "createdAt": "2024-01-01T00:00:00.000Z",
            "updatedAt": "2024-01-01T00:00:00.000Z",
            "__v": 0
        }))
    }

    #[test]
    fn test_legacy_image_string_is_normalized() {
        let pet = Pet::from_value(json!({ "name": "Rex", "image_url": "data:A" }));
        let json = pet.to_json();

        assert_eq!(pet.images(), ["data:A"]);
        assert_eq!(json["images"], json!(["data:A"]));
        assert_eq!(json["image_url"], json!(["data:A"]));
    }

    #[test]
    fn test_absent_images_default_to_empty_lists() {
        let json = Pet::from_value(json!({ "name": "Rex" })).to_json();

        assert_eq!(json["images"], json!([]));
        assert_eq!(json["image_url"], json!([]));
        assert_eq!(json["diet"], json!([]));
        assert_eq!(json["likes"], json!([]));
        assert_eq!(json["dislikes"], json!([]));
        assert_eq!(json["age"], Value::Null);
    }

    #[test]
    fn test_images_key_takes_precedence_over_legacy() {
        let pet = Pet::from_value(json!({ "images": ["new"], "image_url": "old" }));
        assert_eq!(pet.images(), ["new"]);

        let pet = Pet::from_value(json!({ "images": [], "image_url": "old" }));
        assert_eq!(pet.images(), ["old"]);
    }

    #[test]
    fn test_to_json_round_trip_is_idempotent() {
        let first = rex().to_json();
        let second = Pet::from_record(first.clone()).to_json();

        assert_eq!(first, second);
        assert_eq!(first["id"], json!("65f0c0ffee0000000000beef"));
        assert!(!first.contains_key("__v"));
        assert!(!first.contains_key("_id"));
        assert!(!first.contains_key("entityName"));
    }

    #[test]
    fn test_update_with_same_values_is_not_dirty() {
        let mut pet = rex();
        let before = pet.updated_at();

        let changed = pet.update(PetPatch {
            name: Some("Rex".to_string()),
            age: Some(3.0),
            images: Some(ImageInput::from("data:image/png;base64,A")),
            likes: Some(vec!["balls".to_string()]),
            ..Default::default()
        });

        assert!(!changed);
        assert!(!pet.is_dirty());
        assert_eq!(pet.updated_at(), before);
        assert_eq!(pet.last_action(), LifecycleAction::Updated);
    }

    #[test]
    fn test_update_with_changes_marks_dirty_and_touches() {
        let mut pet = rex();
        let before = pet.updated_at().unwrap();

        let changed = pet.update(PetPatch {
            name: Some("Rex2".to_string()),
            likes: Some(vec!["balls".to_string(), "naps".to_string()]),
            ..Default::default()
        });

        assert!(changed);
        assert!(pet.is_dirty());
        assert_eq!(pet.name(), "Rex2");
        assert!(pet.updated_at().unwrap() > before);
        assert!(pet.updated_at().unwrap() > Utc::now() - Duration::minutes(1));
        assert_eq!(pet.changed_fields(), vec!["name", "likes"]);
    }

    #[test]
    fn test_patch_accepts_legacy_image_key() {
        let mut pet = rex();
        let patch: Map<String, Value> = json!({ "image_url": "data:B" }).as_object().cloned().unwrap();

        assert!(pet.update(patch));
        assert_eq!(pet.images(), ["data:B"]);
        assert_eq!(pet.to_json()["image_url"], json!(["data:B"]));
    }

    #[test]
    fn test_patch_deserializes_from_request_body() {
        let patch: PetPatch =
            serde_json::from_value(json!({ "name": "Max", "image_url": "data:C" })).unwrap();
        assert_eq!(patch.images, Some(ImageInput::Single("data:C".to_string())));

        let map: Map<String, Value> = patch.into();
        assert_eq!(map.len(), 2);
        assert!(map.contains_key("images"));
    }

    #[tokio::test]
    async fn test_commit_clears_dirty_and_second_commit_is_noop() {
        let mut pet = rex();
        pet.update(PetPatch {
            species: Some("Wolf".to_string()),
            ..Default::default()
        });
        assert!(pet.is_dirty());

        pet.commit().await;
        assert!(!pet.is_dirty());
        assert!(pet.changed_fields().is_empty());
        let stamped = pet.updated_at();

        pet.commit().await;
        assert!(!pet.is_dirty());
        assert_eq!(pet.updated_at(), stamped);
    }

    #[test]
    fn test_mark_as_created_only_touches_bookkeeping() {
        let mut pet = rex();
        let before = pet.to_json();

        pet.mark_as_created();

        assert!(pet.is_dirty());
        assert_eq!(pet.last_action(), LifecycleAction::Created);
        assert_eq!(pet.to_json(), before);
    }

    #[test]
    fn test_malformed_input_never_fails() {
        let pet = Pet::from_value(json!({ "name": 7, "age": "abc", "poddy_trained": "yes", "likes": "naps" }));

        assert_eq!(pet.name(), "7");
        assert_eq!(pet.age(), None);
        assert_eq!(pet.poddy_trained(), None);
        assert_eq!(pet.likes(), ["naps"]);
        assert_eq!(pet.id(), "");

        let empty = Pet::from_value(Value::Null);
        assert_eq!(empty.species(), "");
    }
}
