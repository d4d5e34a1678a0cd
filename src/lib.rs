//! Piwik PRO server-side tag
//!
//! This library maps generic analytics events onto Piwik PRO tracking
//! requests and sends them. It also exposes the HTTP service used to run the
//! tag as a standalone collector.

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod tracking;
pub mod transport;

#[doc(hidden)]
pub mod test_utils;

// Re-export commonly used types at the crate root
pub use config::Config;
pub use error::{Error, Result};

// Re-export model types
pub use models::{
    AnonymizationMode, CustomDimension, CustomVariable, EventRecord, LogMode, ParameterOverride,
    ParameterSet, TagConfig, ValidationError, ValidationErrorKind,
};

// Re-export the tracking pipeline
pub use tracking::{
    convert_items, resolve_parameters, DispatchOutcome, Dispatcher, InvocationContext,
};
pub use transport::{HttpTransport, TrackingRequest, Transport, TransportResponse};

// Re-export API server functions
pub use api::server::{create_router, create_server, shutdown_signal};
pub use api::AppState;
