use anyhow::Result;
use open_energy_controller::{api, config::AppConfig, controller, telemetry};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();

    let cfg = AppConfig::load()?;
    let app_state = controller::AppState::new(&cfg).await?;

    let addr = cfg.server.socket_addr()?;
    info!(%addr, "starting Open Energy Controller");

    controller::spawn_dispatch_tasks(app_state.clone());

    let app = api::router(app_state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;

    warn!("shutdown complete");
    Ok(())
}
