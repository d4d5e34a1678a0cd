//! Test utilities for the Piwik PRO tag
//!
//! This module provides mock implementations and builders for testing.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::models::{EventRecord, TagConfig, VENDOR_PREFIX};
use crate::tracking::{DiagnosticRecord, DiagnosticSink};
use crate::transport::{Transport, TrackingRequest, TransportResponse};

/// Mock transport recording every request it is asked to send
#[derive(Debug, Clone)]
pub struct MockTransport {
    requests: Arc<Mutex<Vec<TrackingRequest>>>,
    response: Arc<Mutex<TransportResponse>>,
    fail_next: Arc<Mutex<bool>>,
    error_message: Arc<Mutex<Option<String>>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Create a mock answering every request with 200
    pub fn new() -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            response: Arc::new(Mutex::new(TransportResponse::with_status(200))),
            fail_next: Arc::new(Mutex::new(false)),
            error_message: Arc::new(Mutex::new(None)),
        }
    }

    /// Answer subsequent requests with `response`
    pub fn respond_with(&self, response: TransportResponse) {
        *self.response.lock().unwrap() = response;
    }

    /// Configure the mock to fail on the next send
    pub fn fail_next_operation(&self, error_message: &str) {
        *self.fail_next.lock().unwrap() = true;
        *self.error_message.lock().unwrap() = Some(error_message.to_string());
    }

    /// Get all requests sent so far
    pub fn requests(&self) -> Vec<TrackingRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn check_failure(&self) -> Result<()> {
        let mut fail = self.fail_next.lock().unwrap();
        if *fail {
            *fail = false;
            let msg = self
                .error_message
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| "Mock failure".to_string());
            return Err(Error::http(msg));
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &TrackingRequest) -> Result<TransportResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.check_failure()?;
        Ok(self.response.lock().unwrap().clone())
    }
}

/// Diagnostic sink keeping records in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<DiagnosticRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all records emitted so far
    pub fn records(&self) -> Vec<DiagnosticRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(&self, record: &DiagnosticRecord) {
        self.records.lock().unwrap().push(record.clone());
    }
}

/// Create a tag configuration for the `shop` instance with a site id
pub fn create_test_tag_config() -> TagConfig {
    let mut config = TagConfig::new("shop");
    config.site_id = Some("site-1".to_string());
    config
}

/// Create a page view event with a title and a client id
pub fn create_test_page_view() -> EventRecord {
    create_test_event(&[
        ("event_name", Value::from("page_view")),
        ("page_title", Value::from("Home")),
        ("page_location", Value::from("https://example.com/")),
        ("client_id", Value::from("1234567890.1700000000")),
    ])
}

/// Create an event from key/value pairs
pub fn create_test_event(fields: &[(&str, Value)]) -> EventRecord {
    fields
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect::<Map<String, Value>>()
        .into()
}

/// Prefix a Piwik PRO parameter name with the vendor marker
pub fn vendor_key(param: &str) -> String {
    format!("{VENDOR_PREFIX}{param}")
}
