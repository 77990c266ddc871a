use serde::{Deserialize, Serialize};

/// Avatar image bytes, keyed by the URL they were downloaded from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarRecord {
    pub url: String,
    pub image: Vec<u8>,
}

impl AvatarRecord {
    pub fn new(url: impl Into<String>, image: Vec<u8>) -> Self {
        Self {
            url: url.into(),
            image,
        }
    }

    pub fn len(&self) -> usize {
        self.image.len()
    }

    pub fn is_empty(&self) -> bool {
        self.image.is_empty()
    }
}
