//! Configuration module for the Piwik PRO tag service
//!
//! This module handles loading and validating process configuration from
//! environment variables. The tag configuration itself lives in a JSON file
//! referenced from the environment.

use envconfig::Envconfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::models::TagConfig;

/// Main configuration structure for the service
#[derive(Debug, Clone, Deserialize, Serialize, Envconfig)]
pub struct Config {
    /// Server configuration
    #[serde(flatten)]
    #[envconfig(nested)]
    pub server: ServerConfig,

    /// Tracker configuration
    #[serde(flatten)]
    #[envconfig(nested)]
    pub tracker: TrackerConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize, Envconfig)]
pub struct ServerConfig {
    /// Host to bind to
    #[envconfig(from = "HOST", default = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[envconfig(from = "PORT", default = "8080")]
    pub port: u16,

    /// Log level
    #[envconfig(from = "LOG_LEVEL", default = "info")]
    pub log_level: String,

    /// Environment (development, staging, production)
    #[envconfig(from = "ENVIRONMENT", default = "development")]
    pub environment: String,

    /// Request timeout in seconds
    #[envconfig(from = "REQUEST_TIMEOUT_SECS", default = "30")]
    pub request_timeout_secs: u64,

    /// Shutdown timeout in seconds
    #[envconfig(from = "SHUTDOWN_TIMEOUT_SECS", default = "30")]
    pub shutdown_timeout_secs: u64,
}

impl ServerConfig {
    /// Get the server address as a string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Check if running in production mode
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Tracker configuration
#[derive(Debug, Clone, Deserialize, Serialize, Envconfig)]
pub struct TrackerConfig {
    /// Path to the tag configuration JSON file
    #[envconfig(from = "TAG_CONFIG_PATH", default = "./tag-config.json")]
    pub tag_config_path: String,

    /// Budget for one tracking request in milliseconds
    #[envconfig(from = "PPMS_TIMEOUT_MS", default = "1000")]
    pub timeout_ms: u64,

    /// Send every tracking request here instead of the instance endpoint
    #[envconfig(from = "PPMS_ENDPOINT")]
    pub endpoint_override: Option<String>,
}

impl TrackerConfig {
    /// Get the tracking request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load the tag configuration file
    pub fn load_tag_config(&self) -> Result<TagConfig> {
        TagConfig::from_file(&self.tag_config_path)
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenv::dotenv().ok();

        Config::init_from_env().map_err(Error::from)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::config("Server port cannot be 0"));
        }

        if self.tracker.timeout_ms == 0 {
            return Err(Error::config("Tracking timeout must be at least 1ms"));
        }

        if self.tracker.tag_config_path.trim().is_empty() {
            return Err(Error::config("Tag config path cannot be empty"));
        }

        if let Some(endpoint) = &self.tracker.endpoint_override {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(Error::config(format!(
                    "Endpoint override must be an http(s) URL, got {}",
                    endpoint
                )));
            }
        }

        Ok(())
    }

    /// Log configuration
    pub fn log_config(&self) {
        tracing::info!(
            server_address = %self.server.address(),
            environment = %self.server.environment,
            log_level = %self.server.log_level,
            "Server configuration"
        );

        tracing::info!(
            tag_config_path = %self.tracker.tag_config_path,
            timeout_ms = %self.tracker.timeout_ms,
            endpoint_override = ?self.tracker.endpoint_override,
            "Tracker configuration"
        );
    }
}
