//! HTTP server implementation
//!
//! This module sets up the Axum web server with all routes, middleware,
//! and graceful shutdown handling.

use axum::{
    extract::MatchedPath,
    http::{header, HeaderName, Method, Request},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestId, RequestId, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer},
    LatencyUnit,
};
use uuid::Uuid;

use crate::{
    api::collect::{collect, AppState, TRACE_ID_HEADER},
    api::health::{build_info, check_tracker_health, health_check, ready_check},
    config::Config,
    error::Result,
};

/// Request ID generator
#[derive(Clone, Default)]
struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        Some(RequestId::new(id.parse().ok()?))
    }
}

/// Create the main application router
pub fn create_router(config: Arc<Config>, state: AppState) -> Router {
    let health_routes = Router::new()
        .route("/healthz", get(health_check))
        .route("/readyz", get(ready_check))
        .route("/build", get(build_info))
        .with_state(state.health.clone());

    let collect_routes = Router::new().route("/collect", post(collect)).with_state(state);

    let app = Router::new().merge(health_routes).merge(collect_routes);

    app.layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static("x-request-id"),
            MakeRequestUuid,
        ))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(TRACE_ID_HEADER)]),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let matched_path =
                        request.extensions().get::<MatchedPath>().map(MatchedPath::as_str);
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("unknown");

                    tracing::info_span!(
                        "http_request",
                        method = ?request.method(),
                        matched_path,
                        request_id,
                        latency = tracing::field::Empty,
                        status = tracing::field::Empty,
                    )
                })
                .on_request(DefaultOnRequest::new().level(tracing::Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(tracing::Level::INFO)
                        .latency_unit(LatencyUnit::Millis),
                ),
        )
}

/// Create and start the HTTP server
pub async fn create_server(config: Arc<Config>, state: AppState) -> Result<()> {
    let tracker = check_tracker_health(&state.tag_config);
    state
        .health
        .update_component("tracker".to_string(), tracker.status, tracker.message)
        .await;

    let app = create_router(config.clone(), state);
    let addr: SocketAddr = config
        .server
        .address()
        .parse()
        .map_err(|e| crate::error::Error::config(format!("Invalid server address: {}", e)))?;

    tracing::info!(
        address = %addr,
        environment = %config.server.environment,
        "Starting HTTP server"
    );

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| crate::error::Error::internal(format!("Failed to bind to {}: {}", addr, e)))?;

    tracing::info!(address = %addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| crate::error::Error::internal(format!("Server error: {}", e)))
}

/// Shutdown signal handler
///
/// Waits for CTRL+C or SIGTERM signals to gracefully shutdown the server.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received CTRL+C, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
