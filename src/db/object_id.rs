// src/db/object_id.rs
//
// Store-native primary key: 12 bytes rendered as 24 lowercase hex chars.
// The first 4 bytes are the creation second (big-endian), the rest random.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;

const HEX_LEN: usize = 24;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new() -> Self {
        let seconds = Utc::now().timestamp().clamp(0, u32::MAX as i64) as u32;
        let random = Uuid::new_v4();

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..].copy_from_slice(&random.as_bytes()[..8]);

        ObjectId(bytes.iter().map(|b| format!("{:02x}", b)).collect())
    }

    /// `None` unless `raw` is exactly 24 hex digits (any case)
    pub fn parse(raw: &str) -> Option<Self> {
        if Self::is_valid(raw) {
            Some(ObjectId(raw.to_ascii_lowercase()))
        } else {
            None
        }
    }

    pub fn is_valid(raw: &str) -> bool {
        raw.len() == HEX_LEN && raw.bytes().all(|b| b.is_ascii_hexdigit())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ObjectId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| StoreError::Schema(format!("Invalid ObjectId: {:?}", s)))
    }
}

impl TryFrom<String> for ObjectId {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}
