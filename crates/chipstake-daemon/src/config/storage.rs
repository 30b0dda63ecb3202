use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub cache_capacity_mb: u64,
    pub flush_every_ms: Option<u64>,
    /// Flush sled after every committed transaction instead of on the timer.
    pub sync_on_commit: bool,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            cache_capacity_mb: 64,
            flush_every_ms: Some(30_000),
            sync_on_commit: true,
        }
    }
}
