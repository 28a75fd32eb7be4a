use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::api;
use crate::config::Config;
use crate::domain::UserId;
use crate::services::MemoryBackend;
use crate::state::SharedState;
use crate::store::MemoryStore;

pub async fn cmd_serve(
    config: Config,
    offline: bool,
    prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
) -> anyhow::Result<()> {
    anyhow::ensure!(
        config.server.enabled,
        "HTTP server is disabled (server.enabled = false)"
    );
    info!(
        "SceneBurn v{} starting HTTP API...",
        env!("CARGO_PKG_VERSION")
    );

    let port = config.server.port;
    let shared = if offline {
        let backend = Arc::new(MemoryBackend::new(Arc::new(MemoryStore::new())));
        let token = Uuid::new_v4().simple().to_string();
        backend.register(token.clone(), UserId::new(Uuid::nil())).await;
        warn!("Offline mode: data lives in memory until the server stops");
        println!("Offline bearer token: {token}");
        SharedState::offline(config, backend)?
    } else {
        SharedState::new(config)?
    };

    let app_state = api::create_app_state(Arc::new(shared), prometheus_handle);
    let app = api::router(app_state).await;

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🌐 Web Server running at http://{}", addr);

    let shutdown = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => error!("Error listening for shutdown: {}", e),
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server stopped");
    Ok(())
}
