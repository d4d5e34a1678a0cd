//! Tag configuration model
//!
//! The tag configuration holds the operator's explicit per-event values and
//! the tabular settings (custom dimensions, custom variables, free-form
//! parameter overrides). It is loaded once and never mutated.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use validator::Validate;

use super::error::{ValidationError, ValidationErrorKind, ValidationErrors};
use super::validation::{
    validate_instance_name, validate_optional_url, validate_required, validate_visitor_id_field,
};
use crate::error::{Error, Result};

/// How the anonymization flag (`uia`) is decided
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnonymizationMode {
    /// Take the flag from the event, defaulting to 0
    #[default]
    Event,
    /// Always flag the visitor as anonymous
    Anonymous,
    /// Never flag the visitor as anonymous
    Identified,
}

/// When diagnostic records are emitted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogMode {
    /// Never log
    No,
    /// Log only while the host runs in debug/preview mode
    #[default]
    Debug,
    /// Always log
    Always,
}

impl LogMode {
    /// Check whether diagnostics are enabled for an invocation
    pub fn is_enabled(&self, debug_mode: bool) -> bool {
        match self {
            LogMode::No => false,
            LogMode::Debug => debug_mode,
            LogMode::Always => true,
        }
    }
}

/// A custom dimension set by the operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomDimension {
    /// Numeric dimension index, 1-based
    pub index: u32,
    /// Dimension value
    pub value: String,
}

impl CustomDimension {
    /// The tracking parameter this dimension is sent as
    pub fn param_name(&self) -> String {
        format!("dimension{}", self.index)
    }
}

/// A custom variable slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomVariable {
    pub id: String,
    pub name: String,
    pub value: String,
}

/// A free-form parameter override
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterOverride {
    pub name: String,
    pub value: String,
}

/// Tag configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TagConfig {
    /// Piwik PRO account name, the subdomain of `piwik.pro`
    #[validate(custom(function = "validate_instance_name"))]
    pub instance_name: String,

    /// Site or app id (`idsite`)
    pub site_id: Option<String>,

    pub action_name: Option<String>,
    pub page_url: Option<String>,
    pub referrer_url: Option<String>,
    pub user_id: Option<String>,

    /// Visitor id, only used when it is 16 hexadecimal characters
    pub visitor_id: Option<String>,

    pub event_category: Option<String>,
    pub event_action: Option<String>,
    pub event_name: Option<String>,
    pub event_value: Option<String>,

    pub search_keyword: Option<String>,
    pub search_categories: Vec<String>,
    pub search_count: Option<String>,

    pub goal_id: Option<String>,
    pub revenue: Option<String>,

    pub order_id: Option<String>,
    /// Purchased items in the generic item format
    pub ecommerce_items: Option<Value>,
    pub subtotal: Option<String>,
    pub tax: Option<String>,
    pub shipping: Option<String>,
    pub discount: Option<String>,

    /// Recording flag (`rec`), enabled unless set to false
    pub record: Option<bool>,
    pub anonymization: AnonymizationMode,

    pub custom_dimensions: Vec<CustomDimension>,
    pub event_custom_variables: Vec<CustomVariable>,
    pub session_custom_variables: Vec<CustomVariable>,
    pub parameter_overrides: Vec<ParameterOverride>,

    pub log_mode: LogMode,
}

impl TagConfig {
    /// Create a configuration for an instance with everything else unset
    pub fn new(instance_name: impl Into<String>) -> Self {
        Self {
            instance_name: instance_name.into(),
            ..Self::default()
        }
    }

    /// Parse and validate a configuration from JSON text
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: TagConfig = serde_json::from_str(json)?;
        config.validate_fields()?;
        Ok(config)
    }

    /// Load and validate a configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read tag config {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    /// The explicit value for a tracking parameter, if set and non-empty
    pub fn explicit(&self, param: &str) -> Option<&str> {
        let value = match param {
            "idsite" => &self.site_id,
            "action_name" => &self.action_name,
            "url" => &self.page_url,
            "urlref" => &self.referrer_url,
            "uid" => &self.user_id,
            "e_c" => &self.event_category,
            "e_a" => &self.event_action,
            "e_n" => &self.event_name,
            "e_v" => &self.event_value,
            "search" => &self.search_keyword,
            "search_count" => &self.search_count,
            "idgoal" => &self.goal_id,
            "revenue" => &self.revenue,
            "ec_id" => &self.order_id,
            "ec_st" => &self.subtotal,
            "ec_tx" => &self.tax,
            "ec_sh" => &self.shipping,
            "ec_dt" => &self.discount,
            _ => return None,
        };
        value.as_deref().filter(|v| !v.is_empty())
    }

    /// The tracking endpoint for this instance
    pub fn endpoint(&self) -> String {
        format!("https://{}.piwik.pro/ppms.php", self.instance_name)
    }

    /// Validate all fields, collecting every problem
    pub fn validate_fields(&self) -> std::result::Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_required(&self.instance_name, "instance_name") {
            errors.add(e);
        } else if self.validate().is_err() {
            errors.add(ValidationError::with_context(
                ValidationErrorKind::InvalidInstanceName,
                "instance_name",
                format!("got '{}'", self.instance_name),
            ));
        }

        // A malformed visitor id is ignored in favour of the event's client id
        if let Err(e) = validate_visitor_id_field(self.visitor_id.as_deref(), "visitor_id") {
            tracing::warn!(error = %e, "Configured visitor id will be ignored");
        }

        if let Err(e) = validate_optional_url(self.page_url.as_deref(), "page_url") {
            errors.add(e);
        }

        if let Err(e) = validate_optional_url(self.referrer_url.as_deref(), "referrer_url") {
            errors.add(e);
        }

        for (i, dimension) in self.custom_dimensions.iter().enumerate() {
            if dimension.index == 0 {
                errors.add(ValidationError::new(
                    ValidationErrorKind::InvalidDimensionIndex,
                    format!("custom_dimensions[{}].index", i),
                ));
            }
        }

        for (i, param) in self.parameter_overrides.iter().enumerate() {
            if let Err(e) =
                validate_required(&param.name, &format!("parameter_overrides[{}].name", i))
            {
                errors.add(e);
            }
        }

        errors.into_result(())
    }
}
