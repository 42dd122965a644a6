pub mod api;
pub mod config;
pub mod model;
pub mod seed;
pub mod store;

// Export API types
pub use api::{create_app, create_router, AppState, TrackerEvent, TrackerEventKind};

// Export all model types
pub use model::*;

// Export seed module
pub use seed::{load_seed_data, SeedError, SeedPlan, SeedReport, Seeder};

// Export store types
pub use store::{InMemoryStore, PostgresStore, Store, StoreError};

use anyhow::Context;
use log::info;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::{AppConfig, StoreBackend};

/// Open the configured store, seed it, then serve HTTP.
///
/// Seeding completes before the listener is bound; a seeding failure aborts
/// startup with the underlying store error.
pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    match config.database.backend {
        StoreBackend::Postgres => {
            info!("Connecting to PostgreSQL...");
            let store = PostgresStore::new(&config.database_url(), config.max_connections())
                .await
                .context("Failed to create PostgreSQL connection pool")?;

            info!("Running database migrations...");
            store
                .migrate()
                .await
                .context("Failed to run database migrations")?;

            serve(Arc::new(store), &config).await
        }
        StoreBackend::Memory => {
            info!("Using in-memory store; data is lost on shutdown");
            serve(Arc::new(InMemoryStore::new()), &config).await
        }
    }
}

async fn serve<S: Store + 'static>(store: Arc<S>, config: &AppConfig) -> anyhow::Result<()> {
    if let Some(report) = load_seed_data(&*store, &config.seed)
        .await
        .context("Seeding failed; refusing to start")?
    {
        info!(
            "Seed data loaded: {} managers, {} trackers",
            report.managers.len(),
            report.trackers.len()
        );
    }

    let app = create_app(AppState::new(store), config.server.static_dir.as_deref());

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    info!("Tracker server running on http://{}", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
