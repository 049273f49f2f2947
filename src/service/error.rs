//! Service error types.

use crate::config::ConfigError;
use crate::gateway::GatewayError;
use crate::storage::StorageError;

/// Service error type.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("service is already running")]
    AlreadyRunning,
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}
