use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest stored name accepted, matching common filesystem limits.
pub const MAX_STORED_NAME_LEN: usize = 255;

/// Reasons a string is rejected as a [`StoredName`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoredNameError {
    #[error("stored name is empty")]
    Empty,

    #[error("stored name exceeds {MAX_STORED_NAME_LEN} bytes")]
    TooLong,

    #[error("stored name must not start with '.'")]
    LeadingDot,

    #[error("stored name contains invalid character {0:?}")]
    InvalidChar(char),
}

/// Name of a blob in the blob store.
///
/// A stored name is a single path component made of ASCII alphanumerics,
/// `-`, `_` and `.`, never starting with `.`. Anything that reaches the blob
/// store from outside goes through [`StoredName::parse`], so a name can never
/// address a file outside the store's root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StoredName(String);

impl StoredName {
    /// Validate and wrap a stored name.
    pub fn parse(raw: impl Into<String>) -> Result<Self, StoredNameError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(StoredNameError::Empty);
        }
        if raw.len() > MAX_STORED_NAME_LEN {
            return Err(StoredNameError::TooLong);
        }
        if raw.starts_with('.') {
            return Err(StoredNameError::LeadingDot);
        }
        if let Some(bad) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(StoredNameError::InvalidChar(bad));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The extension after the last `.`, if any.
    pub fn extension(&self) -> Option<&str> {
        self.0
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty())
    }
}

impl fmt::Display for StoredName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StoredName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StoredName {
    type Error = StoredNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<StoredName> for String {
    fn from(name: StoredName) -> Self {
        name.0
    }
}
