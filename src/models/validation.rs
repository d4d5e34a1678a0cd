//! Custom validation functions for tag models
//!
//! This module provides reusable validation functions for the identifier and
//! URL shaped fields of the tag configuration.

use regex::Regex;
use std::sync::OnceLock;
use validator::ValidationError;

use super::error::{ValidationError as ModelValidationError, ValidationErrorKind};

// Lazy static regex patterns
static VISITOR_ID_REGEX: OnceLock<Regex> = OnceLock::new();
static INSTANCE_NAME_REGEX: OnceLock<Regex> = OnceLock::new();
static URL_REGEX: OnceLock<Regex> = OnceLock::new();

/// Get or initialize the visitor id regex pattern
fn visitor_id_regex() -> &'static Regex {
    VISITOR_ID_REGEX.get_or_init(|| {
        Regex::new(r"^[0-9a-fA-F]{16}$").expect("Invalid visitor id regex pattern")
    })
}

/// Get or initialize the instance name regex pattern
fn instance_name_regex() -> &'static Regex {
    INSTANCE_NAME_REGEX.get_or_init(|| {
        Regex::new(r"^[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?$")
            .expect("Invalid instance name regex pattern")
    })
}

/// Get or initialize the URL regex pattern
fn url_regex() -> &'static Regex {
    URL_REGEX.get_or_init(|| {
        Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("Invalid URL regex pattern")
    })
}

/// Check whether a value is a well-formed visitor id (16 hex characters)
pub fn is_visitor_id(value: &str) -> bool {
    visitor_id_regex().is_match(value)
}

/// Validate the instance name for the validator crate
pub fn validate_instance_name(name: &str) -> Result<(), ValidationError> {
    if instance_name_regex().is_match(name) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_instance_name"))
    }
}

/// Validate an optional visitor id
///
/// Empty values count as absent, since the resolver ignores them.
pub fn validate_visitor_id_field(
    visitor_id: Option<&str>,
    field_name: &str,
) -> Result<(), ModelValidationError> {
    match visitor_id {
        Some(id) if !id.is_empty() && !is_visitor_id(id) => {
            Err(ModelValidationError::with_context(
                ValidationErrorKind::InvalidVisitorId,
                field_name,
                format!("got '{}'", id),
            ))
        },
        _ => Ok(()),
    }
}

/// Validate an optional absolute http(s) URL
pub fn validate_optional_url(
    url: Option<&str>,
    field_name: &str,
) -> Result<(), ModelValidationError> {
    if let Some(url_str) = url {
        if !url_str.is_empty() && !url_regex().is_match(url_str) {
            return Err(ModelValidationError::with_context(
                ValidationErrorKind::InvalidUrl,
                field_name,
                format!("Invalid URL format: {}", url_str),
            ));
        }
    }
    Ok(())
}

/// Validate a required field is not empty
pub fn validate_required(value: &str, field_name: &str) -> Result<(), ModelValidationError> {
    if value.trim().is_empty() {
        Err(ModelValidationError::new(
            ValidationErrorKind::RequiredField,
            field_name,
        ))
    } else {
        Ok(())
    }
}
