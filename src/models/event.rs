//! Generic event model
//!
//! This module defines the read-only event record handed to the tag by its
//! host. Events are free-form JSON objects; keys carrying the vendor prefix
//! hold Piwik PRO parameters that were mapped upstream.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::{ValidationError, ValidationErrorKind};
use super::value::{is_present, to_text};

/// Prefix marking pre-mapped Piwik PRO fields on an event
pub const VENDOR_PREFIX: &str = "x-pp-";

/// Event name classifying an event as a page view
pub const PAGE_VIEW_EVENT: &str = "page_view";

/// Generic event record
///
/// Lookups treat `null` the same as a missing key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventRecord(Map<String, Value>);

impl EventRecord {
    /// Wrap an already parsed JSON object
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Build an event from any JSON value, rejecting non-objects
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(ValidationError::with_context(
                ValidationErrorKind::NotAnObject,
                "event",
                format!("got {}", json_type(&other)),
            )),
        }
    }

    /// Get a generic field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// Get a vendor-prefixed field by its Piwik PRO parameter name
    pub fn vendor(&self, param: &str) -> Option<&Value> {
        self.get(&format!("{VENDOR_PREFIX}{param}"))
    }

    /// Get a generic field as a string slice
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Iterate over all vendor-prefixed fields, with the prefix stripped
    pub fn vendor_fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().filter_map(|(key, value)| {
            key.strip_prefix(VENDOR_PREFIX)
                .filter(|param| !param.is_empty())
                .map(|param| (param, value))
        })
    }

    /// The generic event name
    pub fn event_name(&self) -> Option<&str> {
        self.str_field("event_name")
    }

    /// Check if this event is a page view
    pub fn is_page_view(&self) -> bool {
        self.event_name() == Some(PAGE_VIEW_EVENT)
    }

    /// The raw client identifier, vendor field first
    pub fn client_id(&self) -> Option<String> {
        self.vendor("_id")
            .filter(|v| is_present(v))
            .or_else(|| self.get("client_id").filter(|v| is_present(v)))
            .map(to_text)
    }

    /// Number of fields on the record
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the record has no fields
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for EventRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self::new(fields)
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Builder for creating test events
#[cfg(test)]
pub struct EventBuilder {
    fields: Map<String, Value>,
}

#[cfg(test)]
impl EventBuilder {
    pub fn new() -> Self {
        Self { fields: Map::new() }
    }

    pub fn page_view() -> Self {
        Self::new().field("event_name", PAGE_VIEW_EVENT)
    }

    pub fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn vendor(self, param: &str, value: impl Into<Value>) -> Self {
        self.field(&format!("{VENDOR_PREFIX}{param}"), value)
    }

    pub fn build(self) -> EventRecord {
        EventRecord::new(self.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(EventRecord::from_value(json!({"event_name": "x"})).is_ok());

        let err = EventRecord::from_value(json!(["page_view"])).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::NotAnObject);
        assert!(err.to_string().contains("array"));
    }

    #[test]
    fn test_null_is_missing() {
        let event = EventBuilder::new().field("page_title", Value::Null).build();
        assert!(event.get("page_title").is_none());
        assert_eq!(event.len(), 1);
    }

    #[test]
    fn test_vendor_fields() {
        let event = EventBuilder::new()
            .vendor("idsite", "site-1")
            .vendor("e_c", "video")
            .field("x-pp-", "ignored")
            .field("page_title", "Home")
            .build();

        assert_eq!(event.vendor("idsite"), Some(&json!("site-1")));

        let mut params: Vec<&str> = event.vendor_fields().map(|(k, _)| k).collect();
        params.sort();
        assert_eq!(params, vec!["e_c", "idsite"]);
    }

    #[test]
    fn test_page_view_classification() {
        assert!(EventBuilder::page_view().build().is_page_view());
        assert!(!EventBuilder::new().field("event_name", "purchase").build().is_page_view());
        assert!(!EventBuilder::new().build().is_page_view());
    }

    #[test]
    fn test_client_id_precedence() {
        let event = EventBuilder::new()
            .vendor("_id", "vendor-id")
            .field("client_id", "generic-id")
            .build();
        assert_eq!(event.client_id().as_deref(), Some("vendor-id"));

        let event = EventBuilder::new().vendor("_id", "").field("client_id", 42).build();
        assert_eq!(event.client_id().as_deref(), Some("42"));

        assert!(EventBuilder::new().build().client_id().is_none());
    }

    #[test]
    fn test_json_round_trip_is_transparent() {
        let event = EventBuilder::page_view().field("page_title", "Home").build();
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json, json!({"event_name": "page_view", "page_title": "Home"}));
    }
}
