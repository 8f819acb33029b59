mod config;
mod telemetry;

use clap::{Args, Parser};
use config::{Config, ConfigError};
use geo::{GeoError, GeoResolver};
use relay::{DeliveryError, DiscordClient, NotificationRelay};
use std::path::PathBuf;
use std::sync::Arc;
use telemetry::TelemetryError;

#[derive(Parser)]
#[command(name = "doorman", about = "Verifies visitors through Discord OAuth")]
enum CliCommand {
    /// Start the gateway and the notification relay.
    Run(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    #[arg(long)]
    config_file_path: PathBuf,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("could not start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("could not build geo resolver: {0}")]
    Geo(#[from] GeoError),
    #[error("could not build chat client: {0}")]
    Delivery(#[from] DeliveryError),
    #[error("gateway stopped: {0}")]
    Gateway(#[from] gateway::errors::GatewayError),
}

fn main() -> Result<(), CliError> {
    let cli = CliCommand::parse();

    match cli {
        CliCommand::Run(args) => run(args),
    }
}

fn run(args: RunArgs) -> Result<(), CliError> {
    let config = Config::from_file(&args.config_file_path)?;
    config.validate()?;

    let _sentry_guard = telemetry::init_logging(&config.common.logging)?;
    if let Some(metrics_config) = &config.common.metrics {
        telemetry::init_metrics(metrics_config)?;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(config))
}

async fn serve(config: Config) -> Result<(), CliError> {
    let resolver = GeoResolver::from_config(&config.geo)?;
    let platform = Arc::new(DiscordClient::new(&config.relay)?);
    let relay = NotificationRelay::spawn(platform);

    tracing::info!(
        providers = config.geo.providers.len(),
        join_guild = config.gateway.join_guild,
        "Starting doorman"
    );

    let result = tokio::select! {
        result = gateway::run(config.gateway, resolver, relay.handle()) => result.map_err(CliError::from),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
            Ok(())
        }
    };

    relay.shutdown().await;
    result
}
