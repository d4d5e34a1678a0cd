//! API module for the Piwik PRO tag service
//!
//! This module contains the HTTP endpoints and server setup: the collect
//! endpoint that runs events through the tag, plus health and build info.

pub mod collect;
pub mod health;
pub mod server;

pub use collect::{collect, AppState, PREVIEW_HEADER, TRACE_ID_HEADER};
pub use health::{build_info, health_check, ready_check, HealthState};
pub use server::{create_router, create_server, shutdown_signal};

use crate::tracking::{LIBRARY_NAME, LIBRARY_VERSION};

/// Build information populated at compile time
pub const BUILD_INFO: BuildInfo = BuildInfo {
    name: LIBRARY_NAME,
    version: LIBRARY_VERSION,
    commit: match option_env!("GIT_COMMIT") {
        Some(commit) => commit,
        None => "unknown",
    },
};

/// Build information structure
#[derive(Debug, Clone, serde::Serialize)]
pub struct BuildInfo {
    /// Tracker name reported to Piwik PRO
    pub name: &'static str,
    /// Application version from Cargo.toml
    pub version: &'static str,
    /// Git commit hash
    pub commit: &'static str,
}

/// Health check response
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: HealthStatus,
    /// Optional message
    pub message: Option<String>,
    /// Current timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Ready check response
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ReadyResponse {
    /// Overall readiness status
    pub status: HealthStatus,
    /// Individual component checks
    pub checks: std::collections::HashMap<String, ComponentHealth>,
    /// Current timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Component health status
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ComponentHealth {
    /// Component status
    pub status: HealthStatus,
    /// Optional error message
    pub message: Option<String>,
    /// Last check timestamp
    pub last_check: chrono::DateTime<chrono::Utc>,
}

/// Health status enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Service is healthy
    Healthy,
    /// Service is degraded but operational
    Degraded,
    /// Service is unhealthy
    Unhealthy,
}

impl HealthStatus {
    /// Check if the status is healthy
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    /// Convert to HTTP status code
    pub fn to_status_code(&self) -> axum::http::StatusCode {
        match self {
            HealthStatus::Healthy => axum::http::StatusCode::OK,
            HealthStatus::Degraded => axum::http::StatusCode::OK,
            HealthStatus::Unhealthy => axum::http::StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_status() {
        assert!(HealthStatus::Healthy.is_healthy());
        assert!(!HealthStatus::Unhealthy.is_healthy());

        assert_eq!(
            HealthStatus::Degraded.to_status_code(),
            axum::http::StatusCode::OK
        );
        assert_eq!(
            HealthStatus::Unhealthy.to_status_code(),
            axum::http::StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_build_info() {
        assert_eq!(BUILD_INFO.name, "ppms-tag");
        assert!(!BUILD_INFO.version.is_empty());
        assert!(!BUILD_INFO.commit.is_empty());
    }
}
