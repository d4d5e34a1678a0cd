//! Health check endpoints
//!
//! This module implements health and readiness checks for Kubernetes
//! and other orchestration platforms.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::{ComponentHealth, HealthResponse, HealthStatus, ReadyResponse, BUILD_INFO};
use crate::models::TagConfig;

/// Application state for health checks
#[derive(Clone)]
pub struct HealthState {
    /// Shared state for component health tracking
    pub components: Arc<tokio::sync::RwLock<HashMap<String, ComponentHealth>>>,
}

impl HealthState {
    /// Create a new health state
    pub fn new() -> Self {
        Self {
            components: Arc::new(tokio::sync::RwLock::new(HashMap::new())),
        }
    }

    /// Update component health status
    pub async fn update_component(
        &self,
        name: String,
        status: HealthStatus,
        message: Option<String>,
    ) {
        let mut components = self.components.write().await;
        components.insert(
            name,
            ComponentHealth {
                status,
                message,
                last_check: Utc::now(),
            },
        );
    }

    /// Get overall health status
    pub async fn get_status(&self) -> HealthStatus {
        let components = self.components.read().await;

        if components.values().any(|c| c.status == HealthStatus::Unhealthy) {
            return HealthStatus::Unhealthy;
        }

        if components.values().any(|c| c.status == HealthStatus::Degraded) {
            return HealthStatus::Degraded;
        }

        HealthStatus::Healthy
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

/// Basic liveness check endpoint
///
/// Returns 200 OK if the service is alive.
///
/// # Example
/// ```text
/// GET /healthz
/// ```
pub async fn health_check() -> Response {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        message: Some("Service is running".to_string()),
        timestamp: Utc::now(),
    };

    (StatusCode::OK, Json(response)).into_response()
}

/// Readiness check endpoint
///
/// # Example
/// ```text
/// GET /readyz
/// ```
pub async fn ready_check(State(state): State<Arc<HealthState>>) -> Response {
    let components = state.components.read().await.clone();
    let overall_status = state.get_status().await;

    let response = ReadyResponse {
        status: overall_status,
        checks: components,
        timestamp: Utc::now(),
    };

    let status_code = overall_status.to_status_code();
    (status_code, Json(response)).into_response()
}

/// Build information endpoint
///
/// # Example
/// ```text
/// GET /build
/// ```
pub async fn build_info() -> Response {
    (StatusCode::OK, Json(&BUILD_INFO)).into_response()
}

/// Check the loaded tag configuration
///
/// The tracker is degraded when the configuration has no site id from any
/// static source, since every hit then depends on the event carrying one.
pub fn check_tracker_health(config: &TagConfig) -> ComponentHealth {
    let has_site_id = config.explicit("idsite").is_some()
        || config.parameter_overrides.iter().any(|p| p.name == "idsite");

    let (status, message) = match config.validate_fields() {
        Err(e) => (HealthStatus::Unhealthy, e.to_string()),
        Ok(()) if !has_site_id => (
            HealthStatus::Degraded,
            format!(
                "No site id configured for {}, relying on event data",
                config.endpoint()
            ),
        ),
        Ok(()) => (
            HealthStatus::Healthy,
            format!("Sending to {}", config.endpoint()),
        ),
    };

    ComponentHealth {
        status,
        message: Some(message),
        last_check: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_state() {
        let state = HealthState::new();

        assert_eq!(state.get_status().await, HealthStatus::Healthy);

        state
            .update_component("tracker".to_string(), HealthStatus::Degraded, None)
            .await;
        assert_eq!(state.get_status().await, HealthStatus::Degraded);

        state
            .update_component(
                "tracker".to_string(),
                HealthStatus::Unhealthy,
                Some("Invalid tag config".to_string()),
            )
            .await;
        assert_eq!(state.get_status().await, HealthStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_health_check_endpoint() {
        let response = health_check().await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ready_check_endpoint() {
        let state = Arc::new(HealthState::new());
        state
            .update_component("tracker".to_string(), HealthStatus::Unhealthy, None)
            .await;

        let response = ready_check(State(state)).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_build_info_endpoint() {
        let response = build_info().await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_check_tracker_health() {
        let mut config = TagConfig::new("shop");
        assert_eq!(check_tracker_health(&config).status, HealthStatus::Degraded);

        config.site_id = Some("site-1".to_string());
        let health = check_tracker_health(&config);
        assert_eq!(health.status, HealthStatus::Healthy);
        assert!(health.message.unwrap().contains("https://shop.piwik.pro/ppms.php"));

        config.instance_name = "Not Valid".to_string();
        assert_eq!(check_tracker_health(&config).status, HealthStatus::Unhealthy);
    }
}
