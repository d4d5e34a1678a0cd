//! Event dispatch
//!
//! Runs one event through the tag: resolve parameters, build the request,
//! send it once and report the upstream outcome. There is no retry.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn, Instrument};

use super::diagnostics::{DiagnosticRecord, DiagnosticSink, TracingSink};
use super::resolver::resolve_parameters;
use crate::dispatch_span;
use crate::error::Result;
use crate::models::{EventRecord, TagConfig};
use crate::transport::{Transport, TrackingRequest, TransportResponse};

/// Per-invocation facts supplied by the host
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationContext {
    /// Trace id from the inbound request, if any
    pub trace_id: Option<String>,
    /// Whether the host runs in debug/preview mode
    pub debug_mode: bool,
}

impl InvocationContext {
    pub fn new(trace_id: Option<String>, debug_mode: bool) -> Self {
        Self {
            trace_id,
            debug_mode,
        }
    }
}

/// What the host should report for a dispatched event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchOutcome {
    /// Upstream status code
    pub status: u16,
    /// Upstream `cache-control` header, verbatim
    pub cache_control: Option<String>,
    /// True for status codes below 400
    pub success: bool,
}

impl From<&TransportResponse> for DispatchOutcome {
    fn from(response: &TransportResponse) -> Self {
        Self {
            status: response.status,
            cache_control: response.get_header("cache-control").map(str::to_string),
            success: response.status < 400,
        }
    }
}

/// Maps events onto tracking requests and sends them
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    sink: Arc<dyn DiagnosticSink>,
    endpoint_override: Option<String>,
}

impl Dispatcher {
    /// Create a dispatcher logging diagnostics through `tracing`
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            sink: Arc::new(TracingSink),
            endpoint_override: None,
        }
    }

    /// Send diagnostics to another sink
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Send every request to `url` instead of the instance endpoint
    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint_override = Some(url.into());
        self
    }

    /// Resolve an event into the request that would be sent
    pub fn build_request(&self, config: &TagConfig, event: &EventRecord) -> TrackingRequest {
        let params = resolve_parameters(config, event);
        let url = self
            .endpoint_override
            .clone()
            .unwrap_or_else(|| config.endpoint());
        TrackingRequest::post_form(url, &params)
    }

    /// Dispatch one event
    ///
    /// Transport failures are returned as errors. Any upstream response is
    /// returned as an outcome, with `success` set for status codes below 400.
    pub async fn dispatch(
        &self,
        config: &TagConfig,
        event: &EventRecord,
        ctx: &InvocationContext,
    ) -> Result<DispatchOutcome> {
        let span = dispatch_span!(
            ctx.trace_id.as_deref().unwrap_or(""),
            event.event_name().unwrap_or("")
        );
        self.dispatch_inner(config, event, ctx).instrument(span).await
    }

    async fn dispatch_inner(
        &self,
        config: &TagConfig,
        event: &EventRecord,
        ctx: &InvocationContext,
    ) -> Result<DispatchOutcome> {
        let request = self.build_request(config, event);
        let logging = config.log_mode.is_enabled(ctx.debug_mode);
        let trace_id = ctx.trace_id.as_deref();

        if logging {
            self.sink.emit(&DiagnosticRecord::request(trace_id, event, &request));
        }

        let response = self.transport.send(&request).await.map_err(|e| {
            warn!(error = %e, url = %request.url, "Tracking request failed");
            e
        })?;

        if logging {
            self.sink.emit(&DiagnosticRecord::response(trace_id, event, &response));
        }

        let outcome = DispatchOutcome::from(&response);
        if outcome.success {
            debug!(status = outcome.status, "Tracking request accepted");
        } else {
            warn!(status = outcome.status, "Tracking request rejected");
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::EventBuilder;
    use crate::models::LogMode;
    use crate::test_utils::{MemorySink, MockTransport};

    fn dispatcher(transport: &MockTransport, sink: &MemorySink) -> Dispatcher {
        Dispatcher::new(Arc::new(transport.clone())).with_sink(Arc::new(sink.clone()))
    }

    #[tokio::test]
    async fn test_dispatch_success() {
        let transport = MockTransport::new();
        transport.respond_with(
            TransportResponse::with_status(202).header("Cache-Control", "private, no-cache"),
        );
        let sink = MemorySink::new();

        let mut config = TagConfig::new("shop");
        config.site_id = Some("site-1".to_string());
        let outcome = dispatcher(&transport, &sink)
            .dispatch(&config, &EventBuilder::page_view().build(), &InvocationContext::default())
            .await
            .unwrap();

        assert_eq!(outcome.status, 202);
        assert_eq!(outcome.cache_control.as_deref(), Some("private, no-cache"));
        assert!(outcome.success);

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "https://shop.piwik.pro/ppms.php");
        assert!(requests[0].body.contains("idsite=site-1"));
    }

    #[tokio::test]
    async fn test_dispatch_failure_status() {
        let transport = MockTransport::new();
        transport.respond_with(TransportResponse::with_status(404));
        let sink = MemorySink::new();

        let outcome = dispatcher(&transport, &sink)
            .dispatch(&TagConfig::new("shop"), &EventBuilder::new().build(), &InvocationContext::default())
            .await
            .unwrap();

        assert_eq!(outcome.status, 404);
        assert!(!outcome.success);
        assert_eq!(outcome.cache_control, None);
    }

    #[tokio::test]
    async fn test_transport_error_is_surfaced_once() {
        let transport = MockTransport::new();
        transport.fail_next_operation("connection reset");
        let sink = MemorySink::new();

        let mut config = TagConfig::new("shop");
        config.log_mode = LogMode::Always;
        let result = dispatcher(&transport, &sink)
            .dispatch(&config, &EventBuilder::new().build(), &InvocationContext::default())
            .await;

        assert!(result.unwrap_err().is_transport());
        assert_eq!(transport.requests().len(), 1);
        // Only the request record; there is no response to log
        assert_eq!(sink.records().len(), 1);
    }

    #[tokio::test]
    async fn test_diagnostics_follow_log_mode() {
        let cases = vec![
            (LogMode::No, true, 0),
            (LogMode::Debug, false, 0),
            (LogMode::Debug, true, 2),
            (LogMode::Always, false, 2),
        ];

        for (mode, debug_mode, expected) in cases {
            let transport = MockTransport::new();
            let sink = MemorySink::new();
            let mut config = TagConfig::new("shop");
            config.log_mode = mode;

            let ctx = InvocationContext::new(Some("trace-9".to_string()), debug_mode);
            dispatcher(&transport, &sink)
                .dispatch(&config, &EventBuilder::new().build(), &ctx)
                .await
                .unwrap();

            let records = sink.records();
            assert_eq!(records.len(), expected, "mode {mode:?}, debug {debug_mode}");
            assert!(records.iter().all(|r| r.trace_id.as_deref() == Some("trace-9")));
        }
    }

    #[test]
    fn test_build_request_uses_endpoint_override() {
        let dispatcher = Dispatcher::new(Arc::new(MockTransport::new()))
            .with_endpoint("http://localhost:9999/ppms.php");

        let request = dispatcher.build_request(&TagConfig::new("shop"), &EventBuilder::new().build());
        assert_eq!(request.url, "http://localhost:9999/ppms.php");
        assert_eq!(request.method, "POST");
        assert!(request.body.contains("rec=1"));
        assert!(!request.body.ends_with('&'));
    }
}
