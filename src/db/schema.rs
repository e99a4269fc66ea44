// src/db/schema.rs
//
// Collection schemas
//
// Declared once per collection by the repository binding; the store casts
// and validates every write against it. Fields outside the schema are
// dropped unless the schema is non-strict.

use chrono::Utc;
use serde_json::{Number, Value};

use super::document_store::{Document, UpdateSpec};
use super::object_id::ObjectId;
use crate::domain::entity::{format_timestamp, CREATED_AT_KEY, NATIVE_ID_KEY, UPDATED_AT_KEY, VERSION_KEY};
use crate::error::{FieldViolation, StoreError, StoreResult};

/// Keys the store manages itself; never cast, never dropped
const RESERVED_KEYS: [&str; 4] = [NATIVE_ID_KEY, VERSION_KEY, CREATED_AT_KEY, UPDATED_AT_KEY];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaType {
    String,
    Number,
    Boolean,
    StringArray,
}

impl SchemaType {
    fn label(self) -> &'static str {
        match self {
            SchemaType::String => "String",
            SchemaType::Number => "Number",
            SchemaType::Boolean => "Boolean",
            SchemaType::StringArray => "[String]",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    pub name: &'static str,
    pub kind: SchemaType,
    pub required: Option<&'static str>,
    pub max_length: Option<(usize, &'static str)>,
}

impl FieldRule {
    pub fn new(name: &'static str, kind: SchemaType) -> Self {
        Self {
            name,
            kind,
            required: None,
            max_length: None,
        }
    }

    pub fn string(name: &'static str) -> Self {
        Self::new(name, SchemaType::String)
    }

    pub fn number(name: &'static str) -> Self {
        Self::new(name, SchemaType::Number)
    }

    pub fn boolean(name: &'static str) -> Self {
        Self::new(name, SchemaType::Boolean)
    }

    pub fn string_array(name: &'static str) -> Self {
        Self::new(name, SchemaType::StringArray)
    }

    /// Strings must be non-empty, arrays must hold at least one element
    pub fn required(mut self, message: &'static str) -> Self {
        self.required = Some(message);
        self
    }

    /// Character count, strings only
    pub fn max_length(mut self, max: usize, message: &'static str) -> Self {
        self.max_length = Some((max, message));
        self
    }

    fn cast(&self, value: Value) -> Result<Value, String> {
        let cast = match (self.kind, &value) {
            (_, Value::Null) => Some(Value::Null),
            (SchemaType::String, _) => cast_string(&value).map(Value::String),
            (SchemaType::Number, Value::Number(_)) => Some(value.clone()),
            (SchemaType::Number, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number),
            (SchemaType::Boolean, Value::Bool(_)) => Some(value.clone()),
            (SchemaType::Boolean, Value::String(s)) => match s.as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            (SchemaType::Boolean, Value::Number(n)) => match n.as_i64() {
                Some(1) => Some(Value::Bool(true)),
                Some(0) => Some(Value::Bool(false)),
                _ => None,
            },
            (SchemaType::StringArray, Value::Array(items)) => items
                .iter()
                .map(|item| cast_string(item).map(Value::String))
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
            (SchemaType::StringArray, Value::String(s)) => {
                Some(Value::Array(vec![Value::String(s.clone())]))
            }
            _ => None,
        };

        cast.ok_or_else(|| {
            format!(
                "Cast to {} failed for value {} at path \"{}\"",
                self.kind.label(),
                value,
                self.name
            )
        })
    }

    fn check(&self, value: Option<&Value>) -> Option<&'static str> {
        let value = value.unwrap_or(&Value::Null);

        if let Some(message) = self.required {
            let missing = match value {
                Value::Null => true,
                Value::String(s) => s.is_empty(),
                Value::Array(items) => items.is_empty(),
                _ => false,
            };
            if missing {
                return Some(message);
            }
        }

        if let (Some((max, message)), Value::String(s)) = (self.max_length, value) {
            if s.chars().count() > max {
                return Some(message);
            }
        }

        None
    }
}

fn cast_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSchema {
    name: String,
    fields: Vec<FieldRule>,
    timestamps: bool,
    strict: bool,
}

impl CollectionSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            timestamps: false,
            strict: true,
        }
    }

    pub fn field(mut self, rule: FieldRule) -> Self {
        self.fields.push(rule);
        self
    }

    /// Maintain `createdAt`/`updatedAt` on write
    pub fn with_timestamps(mut self) -> Self {
        self.timestamps = true;
        self
    }

    /// Keep fields the schema does not declare
    pub fn non_strict(mut self) -> Self {
        self.strict = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.fields
    }

    pub fn has_timestamps(&self) -> bool {
        self.timestamps
    }

    pub fn rule(&self, name: &str) -> Option<&FieldRule> {
        self.fields.iter().find(|rule| rule.name == name)
    }

    /// Cast every field, drop unknown ones (strict mode) and validate
    pub fn conform(&self, document: Document) -> StoreResult<Document> {
        let mut conformed = Document::new();
        let mut violations = Vec::new();

        for (key, value) in document {
            if RESERVED_KEYS.contains(&key.as_str()) {
                conformed.insert(key, value);
                continue;
            }
            match self.rule(&key) {
                Some(rule) => match rule.cast(value) {
                    Ok(cast) => {
                        conformed.insert(key, cast);
                    }
                    Err(message) => violations.push(FieldViolation::new(key, message)),
                },
                None if self.strict => {
                    log::debug!("Dropping `{}`: not in the `{}` schema", key, self.name);
                }
                None => {
                    conformed.insert(key, value);
                }
            }
        }

        for rule in &self.fields {
            if violations.iter().any(|v| v.field == rule.name) {
                continue;
            }
            if let Some(message) = rule.check(conformed.get(rule.name)) {
                violations.push(FieldViolation::new(rule.name, message));
            }
        }

        if violations.is_empty() {
            Ok(conformed)
        } else {
            Err(StoreError::Validation {
                collection: self.name.clone(),
                violations,
            })
        }
    }

    /// Assign `_id`, `__v` and timestamps, then conform.
    /// Returns the document key alongside the stored document.
    pub fn prepare_insert(&self, mut document: Document) -> StoreResult<(String, Document)> {
        let id = match document.remove(NATIVE_ID_KEY) {
            Some(Value::String(s)) if !s.is_empty() => s,
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Null) | Some(Value::String(_)) | None => ObjectId::new().to_string(),
            Some(other) => {
                return Err(StoreError::Schema(format!(
                    "Unsupported {} value {} in `{}`",
                    NATIVE_ID_KEY, other, self.name
                )))
            }
        };
        document.insert(NATIVE_ID_KEY.to_string(), Value::String(id.clone()));
        document.insert(VERSION_KEY.to_string(), Value::from(0));

        if self.timestamps {
            let now = Value::String(format_timestamp(&Utc::now()));
            for key in [CREATED_AT_KEY, UPDATED_AT_KEY] {
                if !document.get(key).is_some_and(Value::is_string) {
                    document.insert(key.to_string(), now.clone());
                }
            }
        }

        Ok((id, self.conform(document)?))
    }

    /// Apply `$set`/`$inc` to a copy of `current` and conform the result.
    /// `_id` is never changed.
    pub fn prepare_update(&self, current: &Document, update: &UpdateSpec) -> StoreResult<Document> {
        let mut next = current.clone();

        for (key, value) in &update.set {
            if key != NATIVE_ID_KEY {
                next.insert(key.clone(), value.clone());
            }
        }
        for (key, by) in &update.inc {
            let base = next.get(key).and_then(Value::as_i64).unwrap_or(0);
            next.insert(key.clone(), Value::from(base + by));
        }
        if self.timestamps && !update.set.contains_key(UPDATED_AT_KEY) {
            next.insert(
                UPDATED_AT_KEY.to_string(),
                Value::String(format_timestamp(&Utc::now())),
            );
        }

        self.conform(next)
    }
}

/// The `_id` of a stored document
pub fn document_id(document: &Document) -> Option<&str> {
    document.get(NATIVE_ID_KEY).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> CollectionSchema {
        CollectionSchema::new("things")
            .field(
                FieldRule::string("title")
                    .required("Title is required")
                    .max_length(5, "Title too long"),
            )
            .field(FieldRule::number("weight"))
            .field(FieldRule::boolean("active"))
            .field(FieldRule::string_array("tags").required("At least one tag"))
            .with_timestamps()
    }

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn violations(err: StoreError) -> Vec<String> {
        match err {
            StoreError::Validation { violations, .. } => {
                violations.into_iter().map(|v| v.field).collect()
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_casts_loose_values() {
        let conformed = schema()
            .conform(doc(json!({
                "title": 12,
                "weight": " 4.5 ",
                "active": "true",
                "tags": "solo"
            })))
            .unwrap();

        assert_eq!(conformed["title"], json!("12"));
        assert_eq!(conformed["weight"], json!(4.5));
        assert_eq!(conformed["active"], json!(true));
        assert_eq!(conformed["tags"], json!(["solo"]));
    }

    #[test]
    fn test_strict_mode_drops_unknown_fields() {
        let conformed = schema()
            .conform(doc(json!({ "title": "a", "tags": ["x"], "color": "red", "__v": 2 })))
            .unwrap();
        assert!(!conformed.contains_key("color"));
        assert_eq!(conformed["__v"], json!(2));

        let loose = schema()
            .non_strict()
            .conform(doc(json!({ "title": "a", "tags": ["x"], "color": "red" })))
            .unwrap();
        assert_eq!(loose["color"], json!("red"));
    }

    #[test]
    fn test_reports_every_violation() {
        let err = schema()
            .conform(doc(json!({ "title": "", "weight": "heavy", "tags": [] })))
            .unwrap_err();

        assert_eq!(violations(err), vec!["weight", "title", "tags"]);
    }

    #[test]
    fn test_max_length_counts_characters() {
        assert!(schema()
            .conform(doc(json!({ "title": "ñandú", "tags": ["x"] })))
            .is_ok());

        let err = schema()
            .conform(doc(json!({ "title": "toolong", "tags": ["x"] })))
            .unwrap_err();
        assert_eq!(violations(err), vec!["title"]);
    }

    #[test]
    fn test_prepare_insert_assigns_bookkeeping() {
        let (id, stored) = schema()
            .prepare_insert(doc(json!({ "title": "a", "tags": ["x"] })))
            .unwrap();

        assert!(ObjectId::is_valid(&id));
        assert_eq!(document_id(&stored), Some(id.as_str()));
        assert_eq!(stored["__v"], json!(0));
        assert!(stored["createdAt"].is_string());
        assert_eq!(stored["createdAt"], stored["updatedAt"]);
    }

    #[test]
    fn test_prepare_insert_keeps_given_id_and_timestamps() {
        let (id, stored) = schema()
            .prepare_insert(doc(json!({
                "_id": "65f0c0ffee0000000000beef",
                "title": "a",
                "tags": ["x"],
                "createdAt": "2024-01-01T00:00:00.000Z"
            })))
            .unwrap();

        assert_eq!(id, "65f0c0ffee0000000000beef");
        assert_eq!(stored["createdAt"], json!("2024-01-01T00:00:00.000Z"));
    }

    #[test]
    fn test_prepare_update_sets_increments_and_revalidates() {
        let (_, current) = schema()
            .prepare_insert(doc(json!({ "title": "a", "tags": ["x"] })))
            .unwrap();

        let next = schema()
            .prepare_update(
                &current,
                &UpdateSpec::new()
                    .set("title", json!("b"))
                    .set("_id", json!("ignored"))
                    .inc("__v", 1),
            )
            .unwrap();
        assert_eq!(next["title"], json!("b"));
        assert_eq!(next["__v"], json!(1));
        assert_eq!(next["_id"], current["_id"]);

        let err = schema()
            .prepare_update(&current, &UpdateSpec::new().set("tags", json!([])))
            .unwrap_err();
        assert_eq!(violations(err), vec!["tags"]);
    }
}
