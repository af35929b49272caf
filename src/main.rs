// src/main.rs
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use truck_packer::api;
use truck_packer::config::AppConfig;

#[tokio::main]
async fn main() {
    let env_result = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    if let Err(err) = env_result {
        if !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            warn!("Could not load .env: {}", err);
        }
    }

    let app_config = AppConfig::from_env();

    info!("Truck packing service starting...");
    if let Err(err) = api::start_api_server(app_config.api, app_config.optimizer).await {
        error!("API server terminated with an error: {err}");
        std::process::exit(1);
    }
}
