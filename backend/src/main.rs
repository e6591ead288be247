mod handlers;
mod imaging;
mod models;
mod routes;
mod services;
mod spectral;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use models::config::AppConfig;
use services::audit::AuditLog;
use services::processing::ProcessingService;
use services::storage::FileStore;

pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: FileStore,
    pub processing: ProcessingService,
    pub audit: AuditLog,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let store = FileStore::new(config.clone()).await?;
        let processing = ProcessingService::new(config.clone());
        let audit = AuditLog::new(config.audit_log_capacity);

        Ok(Self {
            config,
            store,
            processing,
            audit,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    handlers::health::init_start_time();

    let state = Arc::new(AppState::new(config).await?);
    tracing::info!(
        operations = state.processing.registry().list().len(),
        storage_dir = %state.config.storage_dir,
        "State initialised"
    );

    let app = routes::build_router(state.clone());

    let cleanup_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            interval.tick().await;
            let removed = cleanup_state.store.cleanup_expired().await;
            if removed > 0 {
                tracing::info!(removed, "Expired files swept");
            }
        }
    });

    let addr = state.config.listen_addr.clone();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
