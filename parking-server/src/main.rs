use std::error::Error;
use std::sync::Arc;

use parking_server::config::Settings;
use parking_server::providers;
use parking_server::service::{ParkingService, RefreshConfig};
use parking_server::web::{AppState, create_router};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parking_server=info,tower_http=info".into()),
        )
        .init();

    let settings = Settings::from_env().inspect_err(|e| error!(error = %e, "invalid configuration"))?;

    let provider = providers::from_settings(&settings.provider)
        .inspect_err(|e| error!(error = %e, "failed to create data source"))?;

    let service = Arc::new(ParkingService::new(
        provider,
        RefreshConfig {
            interval: settings.refresh_interval,
        },
    ));

    // Fail fast rather than serve an empty cache
    service
        .start()
        .await
        .inspect_err(|e| error!(error = %e, "initial parking data fetch failed"))?;

    let app = create_router(AppState::new(Arc::clone(&service)));

    let listener = tokio::net::TcpListener::bind(settings.bind_addr).await?;
    info!(addr = %settings.bind_addr, "Corfu parking API listening");
    info!("  GET  /                       - Landing");
    info!("  GET  /health                 - Health check");
    info!("  GET  /parking                - All streets");
    info!("  GET  /parking/{{street_name}}  - One street");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    service.stop().await;
    served?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
