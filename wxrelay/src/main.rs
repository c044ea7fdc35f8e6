use clap::{Args, Parser};
use std::path::PathBuf;
use std::process::ExitCode;
use weather_router::config::ValidationError;
use weather_router::endpoints::Endpoints;
use weather_router::errors::RelayError;

mod config;
mod telemetry;

#[derive(Parser)]
#[command(name = "wxrelay", about = "Weather API fan-out relay")]
enum CliCommand {
    /// Serve the relay and admin listeners
    Run(ConfigArgs),
    /// Load and validate a config file, then print the configured endpoints
    Validate(ConfigArgs),
}

#[derive(Args)]
struct ConfigArgs {
    #[arg(long)]
    config_file: PathBuf,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error("invalid config: {0}")]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Telemetry(#[from] telemetry::TelemetryError),
    #[error("could not start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error(transparent)]
    Relay(#[from] RelayError),
}

fn main() -> ExitCode {
    let cli = CliCommand::parse();

    let result = match &cli {
        CliCommand::Run(args) => run(args),
        CliCommand::Validate(args) => validate(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("wxrelay: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load(args: &ConfigArgs) -> Result<(config::Config, String), CliError> {
    let config = config::Config::from_file(&args.config_file)?;
    config.weather_router.validate()?;
    let api_key = config.weather_router.upstream.resolve_api_key()?;

    Ok((config, api_key))
}

fn run(args: &ConfigArgs) -> Result<(), CliError> {
    let (config, api_key) = load(args)?;

    let _sentry = telemetry::init_logging(config.common.logging.as_ref())?;
    telemetry::init_metrics(config.common.metrics.as_ref())?;

    let router = config.weather_router;
    tracing::info!(
        host = %router.listener.host,
        port = router.listener.port,
        admin_port = router.admin_listener.port,
        "Starting wxrelay"
    );

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(weather_router::run(router, api_key))?;

    Ok(())
}

fn validate(args: &ConfigArgs) -> Result<(), CliError> {
    let (config, api_key) = load(args)?;
    let router = &config.weather_router;

    let base_url = router.upstream.parsed_base_url()?;
    let endpoints = Endpoints::new(&base_url, &router.endpoints, &api_key);

    println!("Config OK, {} endpoints:", endpoints.len());
    for endpoint in endpoints.iter() {
        println!("  {}: {}", endpoint.name(), endpoint.public_template());
    }

    Ok(())
}
