pub mod collator;
pub mod config;
pub mod endpoints;
pub mod errors;
pub mod fanout;
pub mod handler;
pub mod metrics_defs;
pub mod normalizer;
pub mod origin;
pub mod response;
pub mod service;
pub mod upstream;

#[cfg(test)]
mod testutils;

use crate::errors::RelayError;
use crate::handler::WeatherHandler;
use crate::service::RelayService;
use crate::upstream::HttpUpstreamClient;
use shared::admin_service::AdminService;
use shared::http::run_http_service;
use std::sync::Arc;

/// Runs the relay and admin listeners until either one fails.
///
/// `api_key` is the resolved upstream key, see
/// [`config::UpstreamConfig::resolve_api_key`].
pub async fn run(config: config::Config, api_key: String) -> Result<(), RelayError> {
    config.validate()?;

    let client = HttpUpstreamClient::new(&config.upstream)?;
    let handler = WeatherHandler::new(&config, &api_key, Arc::new(client))?;

    for endpoint in handler.endpoints() {
        tracing::info!(
            endpoint = endpoint.name(),
            url = endpoint.public_template(),
            "Configured endpoint"
        );
    }

    let relay_service = RelayService::new(Arc::new(handler));
    let admin_service = AdminService::<_, RelayError>::new(|| true);

    let relay_task = run_http_service(&config.listener.host, config.listener.port, relay_service);
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        admin_service,
    );

    tokio::try_join!(relay_task, admin_task)?;
    Ok(())
}
