use anyhow::Result;
use solis_flux::options::Options;
use solis_flux::service::TestRequest;
use solis_flux::{App, Config};
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let options = Options::new();

    let config = match &options.config_file {
        Some(path) => Config::from_file(path),
        None => Config::load(),
    }
    .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    solis_flux::logging::init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;
    info!("Solis Flux {} starting up", env!("CARGO_PKG_VERSION"));

    let app = App::from_config(config)
        .map_err(|e| anyhow::anyhow!("Failed to create application: {}", e))?;

    if let Some(action) = options.test_action {
        let report = app
            .web_state()
            .service
            .test(TestRequest {
                action,
                level_required: options.level_required,
                use_forecast: options.use_forecast,
            })
            .await;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    app.run(shutdown_rx)
        .await
        .map_err(|e| anyhow::anyhow!("Application error: {}", e))
}
