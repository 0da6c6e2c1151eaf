//! Configuration module for Vigil
//!
//! Provides layered configuration loading from files, environment variables, and defaults.

pub mod error;
pub mod http_client;
pub mod logging;
pub mod mongo;
pub mod scheduler;
pub mod server;

pub use error::ConfigError;
pub use http_client::HttpClientConfig;
pub use logging::{LogFormat, LoggingConfig};
pub use mongo::MongoConfig;
pub use scheduler::SchedulerConfig;
pub use server::ServerConfig;

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration struct that holds all sub-configurations
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct VigilConfig {
    pub server: ServerConfig,
    pub mongo: MongoConfig,
    pub scheduler: SchedulerConfig,
    pub http_client: HttpClientConfig,
    pub logging: LoggingConfig,
}

impl VigilConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Invalid values are silently ignored (defaults are kept).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(uri) = std::env::var("MONGO_URI") {
            if !uri.is_empty() {
                self.mongo.uri = uri;
            }
        }
        if let Ok(database) = std::env::var("MONGO_DATABASE") {
            if !database.is_empty() {
                self.mongo.database = database;
            }
        }

        if let Ok(port) = std::env::var("VIGIL_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }

        if let Ok(level) = std::env::var("VIGIL_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("VIGIL_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }

        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation {
                field: "server.port".to_string(),
                message: "port must be non-zero".to_string(),
            });
        }

        if self.mongo.uri.is_empty() {
            return Err(ConfigError::Validation {
                field: "mongo.uri".to_string(),
                message: "URI cannot be empty".to_string(),
            });
        }
        if self.mongo.database.is_empty() {
            return Err(ConfigError::Validation {
                field: "mongo.database".to_string(),
                message: "database name cannot be empty".to_string(),
            });
        }

        if self.scheduler.reconcile_interval_seconds == 0 {
            return Err(ConfigError::Validation {
                field: "scheduler.reconcile_interval_seconds".to_string(),
                message: "reconcile interval must be at least 1 second".to_string(),
            });
        }

        Ok(())
    }
}
