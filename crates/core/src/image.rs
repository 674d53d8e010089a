use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stored_name::StoredName;

/// Identifier assigned to an image record by the metadata store on insert.
///
/// Identifiers are monotonic within a store, so ordering by id is ordering
/// by insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(i64);

impl ImageId {
    /// Wrap a raw identifier.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// The raw identifier value.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Error returned when an image id cannot be parsed from text.
#[derive(Debug, Error)]
#[error("invalid image id: {0:?}")]
pub struct ParseImageIdError(String);

impl FromStr for ImageId {
    type Err = ParseImageIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|_| ParseImageIdError(s.to_owned()))
    }
}

impl From<i64> for ImageId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

/// Metadata describing one uploaded image.
///
/// Field names on the wire follow the gallery's JSON contract
/// (`id`, `filename`, `originalname`, `mimetype`, `size`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Store-assigned identifier.
    pub id: ImageId,
    /// Name of the blob holding the image bytes.
    #[serde(rename = "filename")]
    pub stored_name: StoredName,
    /// File name supplied by the uploader. Mutable via rename.
    #[serde(rename = "originalname")]
    pub original_name: String,
    /// MIME type accepted at upload time; always starts with `image/`.
    #[serde(rename = "mimetype")]
    pub mime_type: String,
    /// Size of the stored blob in bytes.
    #[serde(rename = "size")]
    pub size_bytes: u64,
}

/// An image record that has not been persisted yet and therefore has no id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImageRecord {
    pub stored_name: StoredName,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

impl NewImageRecord {
    /// Attach a store-assigned id, producing the persisted record.
    pub fn with_id(self, id: ImageId) -> ImageRecord {
        ImageRecord {
            id,
            stored_name: self.stored_name,
            original_name: self.original_name,
            mime_type: self.mime_type,
            size_bytes: self.size_bytes,
        }
    }
}
