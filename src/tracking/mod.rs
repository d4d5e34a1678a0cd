//! Piwik PRO tracking
//!
//! This module turns a generic event into a tracking request:
//! - Parameter resolution across configuration and event data
//! - Ecommerce item conversion
//! - Visitor id derivation
//! - Dispatch through a transport, with diagnostic records

pub mod diagnostics;
pub mod dispatcher;
pub mod ecommerce;
pub mod resolver;
pub mod visitor;

pub use diagnostics::{DiagnosticEntry, DiagnosticRecord, DiagnosticSink, TracingSink};
pub use dispatcher::{DispatchOutcome, Dispatcher, InvocationContext};
pub use ecommerce::convert_items;
pub use resolver::resolve_parameters;
pub use visitor::{hash_visitor_id, resolve_visitor_id};

/// Tracker name parameter
pub const LIBRARY_NAME_PARAM: &str = "ts_n";

/// Tracker version parameter
pub const LIBRARY_VERSION_PARAM: &str = "ts_v";

/// Name reported as the tracker
pub const LIBRARY_NAME: &str = env!("CARGO_PKG_NAME");

/// Version reported as the tracker version
pub const LIBRARY_VERSION: &str = env!("CARGO_PKG_VERSION");
