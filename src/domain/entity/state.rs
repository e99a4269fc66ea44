// src/domain/entity/state.rs
//
// Bookkeeping embedded in every entity: identity, timestamps, dirty flag,
// last committed snapshot and the last lifecycle action.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Public identifier key
pub const ID_KEY: &str = "id";
/// Store-native identifier key
pub const NATIVE_ID_KEY: &str = "_id";
/// Store-internal revision counter, never part of the entity
pub const VERSION_KEY: &str = "__v";
pub const CREATED_AT_KEY: &str = "createdAt";
pub const UPDATED_AT_KEY: &str = "updatedAt";

/// Last lifecycle action recorded on an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleAction {
    /// Freshly constructed, nothing recorded yet
    Built,
    Created,
    Updated,
    Deleted,
}

#[derive(Debug, Clone)]
pub struct EntityState {
    id: String,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    dirty: bool,
    snapshot: Map<String, Value>,
    last_action: LifecycleAction,
}

impl EntityState {
    /// Take identity, timestamps and store bookkeeping out of a raw record.
    ///
    /// `id` wins over `_id` unless it is empty. `__v` is discarded. What is
    /// left in `record` are the business fields for the concrete entity.
    pub fn from_record(record: &mut Map<String, Value>, use_timestamps: bool) -> Self {
        let public_id = record.remove(ID_KEY).and_then(|v| coerce_id(&v));
        let native_id = record.remove(NATIVE_ID_KEY).and_then(|v| coerce_id(&v));
        record.remove(VERSION_KEY);

        let created = record.remove(CREATED_AT_KEY);
        let updated = record.remove(UPDATED_AT_KEY);

        let (created_at, updated_at) = if use_timestamps {
            let now = Utc::now();
            (
                Some(created.as_ref().and_then(parse_timestamp).unwrap_or(now)),
                Some(updated.as_ref().and_then(parse_timestamp).unwrap_or(now)),
            )
        } else {
            (None, None)
        };

        Self {
            id: public_id.or(native_id).unwrap_or_default(),
            created_at,
            updated_at,
            dirty: false,
            snapshot: Map::new(),
            last_action: LifecycleAction::Built,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn last_action(&self) -> LifecycleAction {
        self.last_action
    }

    pub fn snapshot(&self) -> &Map<String, Value> {
        &self.snapshot
    }

    /// Adopt the key the store assigned
    pub(crate) fn assign_id(&mut self, id: String) {
        self.id = id;
    }

    pub(crate) fn mark(&mut self, action: LifecycleAction) {
        self.last_action = action;
        self.dirty = true;
    }

    pub(crate) fn record_update(&mut self, changed: bool) {
        if changed {
            self.dirty = true;
            if self.updated_at.is_some() {
                self.updated_at = Some(Utc::now());
            }
        }
        self.last_action = LifecycleAction::Updated;
    }

    pub(crate) fn accept(&mut self, public_state: Map<String, Value>) {
        self.dirty = false;
        self.snapshot = public_state;
    }

    pub(crate) fn restore_updated_at(&mut self) {
        if self.updated_at.is_some() {
            if let Some(previous) = self.snapshot.get(UPDATED_AT_KEY).and_then(parse_timestamp) {
                self.updated_at = Some(previous);
            }
        }
    }

    /// Id, then timestamps when enabled, as they appear in serialized output
    pub(crate) fn write_header(&self, json: &mut Map<String, Value>) {
        json.insert(ID_KEY.to_string(), Value::String(self.id.clone()));
        if let Some(created_at) = self.created_at {
            json.insert(CREATED_AT_KEY.to_string(), Value::String(format_timestamp(&created_at)));
        }
        if let Some(updated_at) = self.updated_at {
            json.insert(UPDATED_AT_KEY.to_string(), Value::String(format_timestamp(&updated_at)));
        }
    }
}

/// ISO-8601 with millisecond precision and a `Z` suffix
pub fn format_timestamp(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Accepts RFC 3339 strings and epoch milliseconds
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

fn coerce_id(value: &Value) -> Option<String> {
    let id = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Object(obj) => obj.get("$oid")?.as_str()?.to_string(),
        _ => return None,
    };
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}
