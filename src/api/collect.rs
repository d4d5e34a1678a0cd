//! Collect endpoint
//!
//! Receives one generic event as a JSON object, runs it through the tag and
//! relays the tracking endpoint's status and `cache-control` header.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use std::sync::Arc;

use crate::api::health::HealthState;
use crate::error::{Error, Result};
use crate::logging::Timer;
use crate::models::{EventRecord, TagConfig};
use crate::tracking::{Dispatcher, InvocationContext};

/// Inbound header carrying the trace id
pub const TRACE_ID_HEADER: &str = "trace-id";

/// Inbound header marking a debug/preview invocation
pub const PREVIEW_HEADER: &str = "x-tag-preview";

/// Shared state of the collect endpoint
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub tag_config: Arc<TagConfig>,
    pub health: Arc<HealthState>,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher, tag_config: TagConfig) -> Self {
        Self {
            dispatcher,
            tag_config: Arc::new(tag_config),
            health: Arc::new(HealthState::new()),
        }
    }
}

/// Build the invocation context from inbound headers
pub fn invocation_context(headers: &HeaderMap) -> InvocationContext {
    let trace_id = headers
        .get(TRACE_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string);
    let debug_mode = headers.contains_key(PREVIEW_HEADER);
    InvocationContext::new(trace_id, debug_mode)
}

/// Collect endpoint handler
///
/// # Example
/// ```text
/// POST /collect
/// trace-id: 4bf92f3577b34da6
///
/// {"event_name": "page_view", "page_title": "Home", "client_id": "123.456"}
/// ```
pub async fn collect(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let value: Value = serde_json::from_slice(&body)?;
    let event = EventRecord::from_value(value)?;
    let ctx = invocation_context(&headers);

    let timer = Timer::start("collect");
    let result = state.dispatcher.dispatch(&state.tag_config, &event, &ctx).await;
    timer.stop();

    let outcome = result.map_err(|e| {
        crate::log_error!(e, "Dispatch failed", trace_id = ctx.trace_id.clone().unwrap_or_default());
        e
    })?;

    let status = StatusCode::from_u16(outcome.status)
        .map_err(|e| Error::http(format!("Invalid upstream status {}: {}", outcome.status, e)))?;

    let mut response = status.into_response();
    if let Some(cache_control) = outcome.cache_control {
        match HeaderValue::from_str(&cache_control) {
            Ok(value) => {
                response.headers_mut().insert(header::CACHE_CONTROL, value);
            },
            Err(e) => tracing::warn!(error = %e, "Dropping invalid cache-control header"),
        }
    }

    Ok(response)
}
