//! Storage configuration.

use serde::Deserialize;

/// Order storage settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Persist orders in SQLite. When disabled, orders live in memory only.
    #[serde(default)]
    pub enabled: bool,
    /// Path to the SQLite database file.
    pub path: Option<String>,
    /// Maximum number of pooled connections.
    pub max_connections: Option<u32>,
}
