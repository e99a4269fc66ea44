// src/domain/entity/traits.rs
//
// Capabilities shared by every storable domain object.
//
// A concrete entity embeds an `EntityState` and implements `Entity`:
// its field descriptor list plus typed get/set for those fields.
// `Serializable` and `DirtyTrackable` are derived from that.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::field::FieldDescriptor;
use super::state::{EntityState, LifecycleAction};

pub trait Entity: Clone + Send + Sync + 'static {
    /// Discriminator of the concrete type, e.g. "Pet"
    const ENTITY_NAME: &'static str;

    /// Whether `createdAt`/`updatedAt` are kept
    const USE_TIMESTAMPS: bool = true;

    /// Public fields, in serialization order
    fn descriptors() -> &'static [FieldDescriptor];

    /// Build from a raw record (request body or stored document).
    ///
    /// Never fails: missing or malformed business fields fall back to their
    /// defaults and are left for the store to reject on write.
    fn from_record(record: Map<String, Value>) -> Self;

    fn state(&self) -> &EntityState;

    fn state_mut(&mut self) -> &mut EntityState;

    /// Current value of a declared field, `Null` for unknown names
    fn field(&self, name: &str) -> Value;

    /// Assign a declared field; unknown names are ignored
    fn set_field(&mut self, name: &str, value: Value);

    /// Rewrite legacy or alternate input shapes before a partial update is diffed
    fn normalize_patch(_patch: &mut Map<String, Value>) {}

    /// Extra keys appended after the declared fields when serializing
    fn extend_json(&self, _json: &mut Map<String, Value>) {}

    fn from_value(value: Value) -> Self {
        match value {
            Value::Object(record) => Self::from_record(record),
            _ => Self::from_record(Map::new()),
        }
    }

    fn entity_name(&self) -> &'static str {
        Self::ENTITY_NAME
    }

    fn id(&self) -> &str {
        self.state().id()
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.state().created_at()
    }

    fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.state().updated_at()
    }

    /// Take the current public state as the committed baseline.
    /// Concrete constructors finish with this.
    fn into_baseline(mut self) -> Self {
        let public_state = public_state(&self);
        self.state_mut().accept(public_state);
        self
    }
}

fn public_state<E: Entity>(entity: &E) -> Map<String, Value> {
    let mut json = Map::new();
    entity.state().write_header(&mut json);
    for descriptor in E::descriptors() {
        json.insert(descriptor.name.to_string(), entity.field(descriptor.name));
    }
    entity.extend_json(&mut json);
    json
}

pub trait Serializable {
    /// `id`, timestamps when enabled and every declared field.
    /// Internal tracking state is never included.
    fn to_json(&self) -> Map<String, Value>;

    fn to_value(&self) -> Value {
        Value::Object(self.to_json())
    }
}

impl<E: Entity> Serializable for E {
    fn to_json(&self) -> Map<String, Value> {
        public_state(self)
    }
}

#[async_trait]
pub trait DirtyTrackable: Send {
    fn mark_as_created(&mut self);

    fn mark_as_deleted(&mut self);

    /// Apply a partial update field by field. Returns whether any field changed.
    fn update<P>(&mut self, patch: P) -> bool
    where
        P: Into<Map<String, Value>>;

    async fn commit(&mut self);

    fn is_dirty(&self) -> bool;

    fn last_action(&self) -> LifecycleAction;

    /// Declared fields that differ from the last committed snapshot
    fn changed_fields(&self) -> Vec<&'static str>;

    /// Restore every declared field from the last committed snapshot
    fn rollback(&mut self);
}

#[async_trait]
impl<E: Entity> DirtyTrackable for E {
    fn mark_as_created(&mut self) {
        self.state_mut().mark(LifecycleAction::Created);
    }

    fn mark_as_deleted(&mut self) {
        self.state_mut().mark(LifecycleAction::Deleted);
    }

    fn update<P>(&mut self, patch: P) -> bool
    where
        P: Into<Map<String, Value>>,
    {
        let mut patch = patch.into();
        E::normalize_patch(&mut patch);

        let mut changed = false;
        for descriptor in E::descriptors() {
            let incoming = match patch.get(descriptor.name) {
                Some(value) if !value.is_null() => value,
                _ => continue,
            };
            if !descriptor.values_equal(&self.field(descriptor.name), incoming) {
                self.set_field(descriptor.name, incoming.clone());
                changed = true;
            }
        }

        self.state_mut().record_update(changed);
        changed
    }

    async fn commit(&mut self) {
        if !self.state().is_dirty() {
            return;
        }
        let public_state = public_state(self);
        self.state_mut().accept(public_state);
    }

    fn is_dirty(&self) -> bool {
        self.state().is_dirty()
    }

    fn last_action(&self) -> LifecycleAction {
        self.state().last_action()
    }

    fn changed_fields(&self) -> Vec<&'static str> {
        let snapshot = self.state().snapshot();
        E::descriptors()
            .iter()
            .filter(|d| {
                let committed = snapshot.get(d.name).unwrap_or(&Value::Null);
                !d.values_equal(committed, &self.field(d.name))
            })
            .map(|d| d.name)
            .collect()
    }

    fn rollback(&mut self) {
        let snapshot = self.state().snapshot().clone();
        for descriptor in E::descriptors() {
            let committed = snapshot.get(descriptor.name).cloned().unwrap_or(Value::Null);
            self.set_field(descriptor.name, committed);
        }
        let state = self.state_mut();
        state.restore_updated_at();
        state.accept(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::{parse_timestamp, FieldKind};
    use serde_json::json;

    const NOTE_FIELDS: &[FieldDescriptor] = &[
        FieldDescriptor::new("title", FieldKind::Text),
        FieldDescriptor::new("tags", FieldKind::List),
        FieldDescriptor::new("due", FieldKind::Timestamp),
    ];

    /// Minimal entity without timestamps
    #[derive(Debug, Clone)]
    struct Note {
        state: EntityState,
        title: String,
        tags: Vec<Value>,
        due: Option<DateTime<Utc>>,
    }

    impl Entity for Note {
        const ENTITY_NAME: &'static str = "Note";
        const USE_TIMESTAMPS: bool = false;

        fn descriptors() -> &'static [FieldDescriptor] {
            NOTE_FIELDS
        }

        fn from_record(mut record: Map<String, Value>) -> Self {
            let state = EntityState::from_record(&mut record, Self::USE_TIMESTAMPS);
            let mut note = Note {
                state,
                title: String::new(),
                tags: Vec::new(),
                due: None,
            };
            for d in NOTE_FIELDS {
                if let Some(value) = record.remove(d.name) {
                    note.set_field(d.name, value);
                }
            }
            note.into_baseline()
        }

        fn state(&self) -> &EntityState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut EntityState {
            &mut self.state
        }

        fn field(&self, name: &str) -> Value {
            match name {
                "title" => json!(self.title),
                "tags" => Value::Array(self.tags.clone()),
                "due" => self
                    .due
                    .map(|t| json!(crate::domain::entity::format_timestamp(&t)))
                    .unwrap_or(Value::Null),
                _ => Value::Null,
            }
        }

        fn set_field(&mut self, name: &str, value: Value) {
            match name {
                "title" => self.title = value.as_str().unwrap_or_default().to_string(),
                "tags" => self.tags = value.as_array().cloned().unwrap_or_default(),
                "due" => self.due = parse_timestamp(&value),
                _ => {}
            }
        }
    }

    fn note() -> Note {
        Note::from_value(json!({
            "id": "n1",
            "title": "groceries",
            "tags": ["home", 1],
            "due": "2024-05-01T08:00:00.000Z"
        }))
    }

    #[test]
    fn test_to_json_without_timestamps() {
        let json = note().to_json();
        let keys: Vec<&str> = json.keys().map(String::as_str).collect();
        assert_eq!(keys.len(), 4);
        assert!(!json.contains_key("createdAt"));
        assert_eq!(json["id"], json!("n1"));
        assert_eq!(json["tags"], json!(["home", 1]));
    }

    #[test]
    fn test_equal_values_leave_entity_clean() {
        let mut n = note();
        let changed = n.update(
            json!({
                "title": "groceries",
                "tags": ["home", 1],
                "due": "2024-05-01T10:00:00+02:00"
            })
            .as_object()
            .cloned()
            .unwrap(),
        );

        assert!(!changed);
        assert!(!n.is_dirty());
        assert_eq!(n.last_action(), LifecycleAction::Updated);
    }

    #[test]
    fn test_null_and_undeclared_keys_are_ignored() {
        let mut n = note();
        let changed = n.update(
            json!({ "title": null, "id": "other", "color": "red" })
                .as_object()
                .cloned()
                .unwrap(),
        );

        assert!(!changed);
        assert_eq!(n.id(), "n1");
        assert_eq!(n.title, "groceries");
    }

    #[test]
    fn test_changed_fields_and_rollback() {
        let mut n = note();
        n.update(json!({ "tags": ["home"] }).as_object().cloned().unwrap());

        assert!(n.is_dirty());
        assert_eq!(n.changed_fields(), vec!["tags"]);

        n.rollback();
        assert!(!n.is_dirty());
        assert!(n.changed_fields().is_empty());
        assert_eq!(n.to_json()["tags"], json!(["home", 1]));
    }

    #[tokio::test]
    async fn test_mark_as_deleted_then_commit() {
        let mut n = note();
        n.mark_as_deleted();
        assert!(n.is_dirty());
        assert_eq!(n.last_action(), LifecycleAction::Deleted);

        n.commit().await;
        assert!(!n.is_dirty());
        assert_eq!(n.last_action(), LifecycleAction::Deleted);
    }
}
