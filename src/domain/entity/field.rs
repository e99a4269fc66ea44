// src/domain/entity/field.rs
//
// Field descriptors
//
// Every concrete entity declares its public fields once, with the semantic
// type that decides how two values of the field are compared.

use serde_json::Value;

use super::state::parse_timestamp;

/// Semantic type of a declared entity field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Boolean,
    /// Ordered list, compared by length and per-index value
    List,
    /// Instant in time, compared by instant rather than by representation
    Timestamp,
}

impl FieldKind {
    /// Type-aware equality used when diffing a field
    pub fn values_equal(self, current: &Value, incoming: &Value) -> bool {
        match self {
            FieldKind::List => match (current.as_array(), incoming.as_array()) {
                (Some(current), Some(incoming)) => {
                    current.len() == incoming.len()
                        && current.iter().zip(incoming).all(|(a, b)| a == b)
                }
                // A missing or scalar previous value never equals a list
                (None, Some(_)) | (Some(_), None) => false,
                (None, None) => current == incoming,
            },
            FieldKind::Timestamp => match (parse_timestamp(current), parse_timestamp(incoming)) {
                (Some(a), Some(b)) => a == b,
                _ => current == incoming,
            },
            FieldKind::Number => match (current.as_f64(), incoming.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => current == incoming,
            },
            FieldKind::Text | FieldKind::Boolean => current == incoming,
        }
    }
}

/// A public field of a concrete entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }

    pub fn values_equal(&self, current: &Value, incoming: &Value) -> bool {
        self.kind.values_equal(current, incoming)
    }
}
