use anyhow::Result;
use clap::Parser;
use kaspazof::{
    app, cli::Args, config::Config, monitoring::setup_metrics, tracing_setup::setup_tracing,
};

use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_tracing(&args.log_level, args.json_logs)?;

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("A rustls crypto provider was already installed");
    }

    info!("Starting KaspaZof dashboard v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_args(&args)?;

    if config.metrics.enabled {
        setup_metrics(config.metrics.port).await?;
        info!("Metrics server started on port {}", config.metrics.port);
    }

    if let Err(e) = app::run(config).await {
        error!("Dashboard error: {}", e);
        return Err(e);
    }

    info!("Dashboard stopped");
    Ok(())
}
