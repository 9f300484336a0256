//! braidd - the braid IRC daemon.

use braid::config::Config;
use braid::network::Gateway;
use braid::state::{Matrix, MatrixHandle};
use braid::telemetry;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        eprintln!("Failed to load config from {config_path}: {e}");
        e
    })?;

    telemetry::init_tracing(&config.logging);

    info!(
        server = %config.server.name,
        network = %config.server.network,
        "Starting braidd"
    );

    let state = MatrixHandle::new(Matrix::new(config.server_info(), config.matrix_config()));
    let shutdown = CancellationToken::new();

    let gateway = Gateway::bind(
        config.listen.address,
        config.listen.relay_address,
        state,
        config.endpoint_settings(),
        shutdown.clone(),
    )
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to bind listeners");
        e
    })?;

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = ?err, "failed to install ctrl-c handler");
                return;
            }
            info!("Received ctrl-c, shutting down");
            shutdown.cancel();
        });
    }

    gateway.run().await?;
    info!("braidd stopped");
    Ok(())
}
