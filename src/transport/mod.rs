//! Outbound transport for tracking requests
//!
//! This module provides:
//! - The request/response types exchanged with the tracking endpoint
//! - The `Transport` trait the dispatcher sends through
//! - A `reqwest` backed implementation with a fixed timeout

mod http;

pub use http::HttpTransport;

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::Result;
use crate::models::ParameterSet;

/// Content type of every tracking request
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Default budget for one tracking request
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// A fully built tracking request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackingRequest {
    pub method: String,
    pub url: String,
    /// Header names are lowercase
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl TrackingRequest {
    /// Build a form POST carrying the parameter set
    pub fn post_form(url: impl Into<String>, params: &ParameterSet) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), FORM_CONTENT_TYPE.to_string());

        Self {
            method: "POST".to_string(),
            url: url.into(),
            headers,
            body: params.to_form_body(),
        }
    }
}

/// Response from the tracking endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransportResponse {
    pub status: u16,
    /// Header names are lowercase
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl TransportResponse {
    /// Create a response with a status and no headers or body
    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// Add a header, lowercasing its name
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Look up a header by name, case-insensitively
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// Sends tracking requests
///
/// Implementations make a single attempt and report transport failures as
/// errors. Any response, whatever its status, is returned as `Ok`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &TrackingRequest) -> Result<TransportResponse>;
}
