//! Diagnostic records
//!
//! One record is emitted before a tracking request is sent and one after its
//! response arrives, when the tag's log mode allows it.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::EventRecord;
use crate::transport::{TrackingRequest, TransportResponse};

/// Name identifying this tag in diagnostic records
pub const DIAGNOSTIC_NAME: &str = "PiwikPro";

/// Target used by [`TracingSink`]
pub const DIAGNOSTIC_TARGET: &str = "ppms_tag::diagnostics";

/// A structured log record for one side of a tracking exchange
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DiagnosticRecord {
    pub name: &'static str,
    pub trace_id: Option<String>,
    pub event_name: Option<String>,
    #[serde(flatten)]
    pub entry: DiagnosticEntry,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "Type")]
pub enum DiagnosticEntry {
    #[serde(rename_all = "PascalCase")]
    Request {
        request_method: String,
        request_url: String,
        request_headers: BTreeMap<String, String>,
        request_body: String,
    },
    #[serde(rename_all = "PascalCase")]
    Response {
        response_status_code: u16,
        response_headers: BTreeMap<String, String>,
        response_body: String,
    },
}

impl DiagnosticRecord {
    pub fn request(
        trace_id: Option<&str>,
        event: &EventRecord,
        request: &TrackingRequest,
    ) -> Self {
        Self {
            name: DIAGNOSTIC_NAME,
            trace_id: trace_id.map(str::to_string),
            event_name: event.event_name().map(str::to_string),
            entry: DiagnosticEntry::Request {
                request_method: request.method.clone(),
                request_url: request.url.clone(),
                request_headers: request.headers.clone(),
                request_body: request.body.clone(),
            },
        }
    }

    pub fn response(
        trace_id: Option<&str>,
        event: &EventRecord,
        response: &TransportResponse,
    ) -> Self {
        Self {
            name: DIAGNOSTIC_NAME,
            trace_id: trace_id.map(str::to_string),
            event_name: event.event_name().map(str::to_string),
            entry: DiagnosticEntry::Response {
                response_status_code: response.status,
                response_headers: response.headers.clone(),
                response_body: response.body.clone(),
            },
        }
    }
}

/// Destination for diagnostic records
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, record: &DiagnosticRecord);
}

/// Sink writing records as JSON through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, record: &DiagnosticRecord) {
        match serde_json::to_string(record) {
            Ok(json) => tracing::info!(
                target: DIAGNOSTIC_TARGET,
                trace_id = record.trace_id.as_deref().unwrap_or(""),
                record = %json,
                "Tracking diagnostics"
            ),
            Err(e) => tracing::warn!(
                target: DIAGNOSTIC_TARGET,
                error = %e,
                "Failed to serialize diagnostic record"
            ),
        }
    }
}
