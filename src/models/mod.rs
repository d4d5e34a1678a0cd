//! Data models for the Piwik PRO tag
//!
//! This module contains the domain models used throughout the crate: the
//! generic event record, the tag configuration, the outbound parameter set and
//! the validation logic around them.

pub mod error;
pub mod event;
pub mod parameters;
pub mod tag_config;
pub mod validation;
pub mod value;

// Re-export commonly used types
pub use error::{ValidationError, ValidationErrorKind, ValidationErrors};
pub use event::{EventRecord, PAGE_VIEW_EVENT, VENDOR_PREFIX};
pub use parameters::ParameterSet;
pub use tag_config::{
    AnonymizationMode, CustomDimension, CustomVariable, LogMode, ParameterOverride, TagConfig,
};
pub use validation::is_visitor_id;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_exports() {
        let _event = EventRecord::default();
        let _config = TagConfig::new("shop");
        let _params = ParameterSet::new();
        let _error = ValidationError::new(ValidationErrorKind::RequiredField, "instance_name");
        assert!(is_visitor_id("00000000000000ff"));
    }
}
