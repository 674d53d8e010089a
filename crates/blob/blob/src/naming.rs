use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use uuid::Uuid;

use galleria_core::StoredName;

use crate::error::BlobError;

/// Longest extension kept on a stored name.
const MAX_EXTENSION_LEN: usize = 10;

/// Normalize an uploader-supplied extension for use in a stored name.
///
/// Strips a leading `.`, lowercases, and returns `None` unless the result is
/// 1 to 10 ASCII alphanumerics.
pub fn sanitize_extension(raw: &str) -> Option<String> {
    let ext = raw.strip_prefix('.').unwrap_or(raw);
    if ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Generates collision-resistant stored names.
///
/// Names have the shape `{field}-{unix_micros}-{seq:06}-{rand8}[.ext]`. The
/// atomic sequence makes names distinct within a process even when the clock
/// does not advance between calls; the random suffix keeps names distinct
/// across processes and restarts that share a clock reading.
#[derive(Debug)]
pub struct StoredNameGenerator {
    field: String,
    seq: AtomicU64,
}

impl StoredNameGenerator {
    /// Create a generator that prefixes names with `field` (the upload
    /// form-field tag). Characters outside `[A-Za-z0-9_-]` are dropped; an
    /// empty result falls back to `blob`.
    pub fn new(field: &str) -> Self {
        let mut field: String = field
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
            .take(32)
            .collect();
        if field.is_empty() {
            field.push_str("blob");
        }
        Self {
            field,
            seq: AtomicU64::new(0),
        }
    }

    /// The sanitized field tag used as name prefix.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Produce the next stored name.
    pub fn next_name(&self, extension: Option<&str>) -> Result<StoredName, BlobError> {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) % 1_000_000;
        let micros = Utc::now().timestamp_micros();
        let random = Uuid::new_v4().simple().to_string();
        let suffix = random.get(..8).unwrap_or(&random);

        let mut name = format!("{}-{micros}-{seq:06}-{suffix}", self.field);
        if let Some(ext) = extension.and_then(sanitize_extension) {
            name.push('.');
            name.push_str(&ext);
        }
        Ok(StoredName::parse(name)?)
    }
}

impl Default for StoredNameGenerator {
    fn default() -> Self {
        Self::new("image")
    }
}
