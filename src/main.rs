//! Piwik PRO tag collector
//!
//! Receives generic analytics events over HTTP, maps them onto Piwik PRO
//! tracking requests and forwards them to the configured instance.

use std::sync::Arc;

use ppms_tag::{
    api::{self, AppState},
    config::Config,
    logging, Dispatcher, HttpTransport, Result,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration from environment
    let config = Arc::new(Config::from_env()?);

    // Validate configuration
    config.validate()?;

    // Initialize logging/tracing
    logging::init_tracing(&config.server.log_level, &config.server.environment)?;

    config.log_config();

    let tag_config = config.tracker.load_tag_config()?;
    tracing::info!(
        instance = %tag_config.instance_name,
        endpoint = %tag_config.endpoint(),
        log_mode = ?tag_config.log_mode,
        "Tag configuration loaded"
    );

    let transport = HttpTransport::new(config.tracker.timeout())?;
    let mut dispatcher = Dispatcher::new(Arc::new(transport));
    if let Some(endpoint) = &config.tracker.endpoint_override {
        dispatcher = dispatcher.with_endpoint(endpoint.clone());
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting ppms-tag");

    api::server::create_server(config, AppState::new(dispatcher, tag_config)).await?;

    tracing::info!("ppms-tag shutdown complete");
    Ok(())
}
