//! Service configuration.

use crate::config::Config;

/// Service construction options.
pub struct ServiceConfig {
    /// Application configuration.
    pub app_config: Config,
    /// Application version.
    pub version: String,
}
