//! HTTP surface: router assembly and the server loop

pub mod response;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tracing::info;

use crate::config::{Config, StoreBackend};
use crate::features::{self, FeatureState};
use crate::imports::{
    ImportService, InMemoryRecordStore, PgRecordStore, RecordStore, SchemaValidator,
};
use crate::middleware;

/// Build the record store the configuration asks for
pub async fn connect_store(config: &Config) -> anyhow::Result<Arc<dyn RecordStore>> {
    match config.store {
        StoreBackend::Memory => {
            info!("Using in-memory record store");
            Ok(Arc::new(InMemoryRecordStore::new()))
        }
        StoreBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .min_connections(config.database.min_connections)
                .acquire_timeout(Duration::from_secs(config.database.connect_timeout_secs))
                .idle_timeout(Duration::from_secs(config.database.idle_timeout_secs))
                .connect(&config.database.url)
                .await?;
            info!("Database connection pool established");

            let store = PgRecordStore::migrate(pool)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
            info!("Database migrations completed");
            Ok(Arc::new(store))
        }
    }
}

/// Create the application router with all routes and middleware
pub fn create_router(state: FeatureState, config: &Config) -> Router {
    let health_state = state.imports.clone();

    Router::new()
        .route("/health", get(health_check))
        .with_state(health_state)
        .nest("/api/v1", features::router(state))
        .layer(DefaultBodyLimit::max(config.imports.max_upload_bytes))
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

/// Run the server until a shutdown signal arrives
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let store = connect_store(&config).await?;
    let service = ImportService::new(
        Arc::new(SchemaValidator::default_catalog()),
        store,
        config.imports.settings(),
    );

    let _sweeper = config.imports.retention().map(|retention| {
        info!(retention_secs = retention.as_secs(), "Pruning finished import jobs");
        service.registry().spawn_retention_sweeper(retention)
    });

    let state = FeatureState {
        imports: service,
        long_poll_max: config.imports.long_poll_max(),
    };
    let app = create_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

async fn health_check(State(service): State<ImportService>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "jobs": service.registry().len().await,
        })),
    )
}

/// Graceful shutdown signal handler
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    // Running imports keep going on their own tasks; give them a moment.
    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
