// src/domain/pet/images.rs
//
// Pet images arrive either as the legacy single `image_url` string or as a
// list of encoded images. Both are normalized here, once, into a list.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageInput {
    Single(String),
    Multiple(Vec<String>),
}

impl ImageInput {
    /// Read either shape out of raw JSON. Non-string list items are dropped.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(ImageInput::Single(s.clone())),
            Value::Array(items) => Some(ImageInput::Multiple(
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect(),
            )),
            _ => None,
        }
    }

    /// Canonical list form. An empty legacy string carries no image.
    pub fn into_images(self) -> Vec<String> {
        match self {
            ImageInput::Single(url) if url.is_empty() => Vec::new(),
            ImageInput::Single(url) => vec![url],
            ImageInput::Multiple(images) => images,
        }
    }
}

impl From<String> for ImageInput {
    fn from(url: String) -> Self {
        ImageInput::Single(url)
    }
}

impl From<&str> for ImageInput {
    fn from(url: &str) -> Self {
        ImageInput::Single(url.to_string())
    }
}

impl From<Vec<String>> for ImageInput {
    fn from(images: Vec<String>) -> Self {
        ImageInput::Multiple(images)
    }
}
