use serde::Deserialize;

/// Viewer notification settings.
#[derive(Debug, Deserialize)]
pub struct NotifyConfig {
    /// Events buffered per viewer before further deliveries are skipped.
    #[serde(default = "default_session_buffer")]
    pub session_buffer: usize,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            session_buffer: default_session_buffer(),
        }
    }
}

fn default_session_buffer() -> usize {
    16
}

/// Query and delete behavior.
#[derive(Debug, Deserialize)]
pub struct GalleryConfig {
    /// Remove the stored blob after its record is deleted.
    #[serde(default = "default_remove_blob_on_delete")]
    pub remove_blob_on_delete: bool,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            remove_blob_on_delete: default_remove_blob_on_delete(),
        }
    }
}

fn default_remove_blob_on_delete() -> bool {
    true
}

/// Periodic orphan reconciliation. Disabled unless an interval is set.
#[derive(Debug, Default, Deserialize)]
pub struct ReconcileConfig {
    pub interval_seconds: Option<u64>,
}
