// HTTP REST API Server Implementation
// Mounts the legacy annotation and correlation routes plus the generic
// pass-through on one router over a shared, read-only application state.

use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    annotations,
    config::{BridgeConfig, ResourceConfig},
    context::RequestContext,
    correlations,
    datasources::{DatasourceLookup, StaticDatasources},
    errors::AdapterError,
    generic_api,
    observability::get_metrics,
    resource::{ClientProvider, MemoryResourceStore, ResourceClient},
};

// Global server start time for uptime tracking
static SERVER_START_TIME: once_cell::sync::Lazy<Instant> = once_cell::sync::Lazy::new(Instant::now);

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub clients: Arc<dyn ClientProvider>,
    pub datasources: Arc<dyn DatasourceLookup>,
    pub config: Arc<BridgeConfig>,
}

impl AppState {
    pub fn new(
        clients: Arc<dyn ClientProvider>,
        datasources: Arc<dyn DatasourceLookup>,
        config: BridgeConfig,
    ) -> Self {
        Self {
            clients,
            datasources,
            config: Arc::new(config),
        }
    }

    /// State backed by an in-memory store serving both configured resources.
    /// The store handle is returned for seeding and inspection.
    pub fn in_memory(config: BridgeConfig) -> (Self, MemoryResourceStore) {
        let store = MemoryResourceStore::new()
            .with_resource(&config.annotations.gvr(), &config.annotations.kind)
            .with_resource(&config.correlations.gvr(), &config.correlations.kind);
        let datasources = StaticDatasources::new(config.datasources.clone());
        let state = Self::new(Arc::new(store.provider()), Arc::new(datasources), config);
        (state, store)
    }

    /// Fresh namespace-scoped client for one request
    pub async fn client_for(
        &self,
        ctx: &RequestContext,
        resource: &ResourceConfig,
    ) -> Result<Box<dyn ResourceClient>, AdapterError> {
        self.clients
            .client_for(ctx, &resource.gvr())
            .await
            .map_err(AdapterError::ClientAcquisition)
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Create HTTP server with all routes configured
pub fn create_server(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .merge(annotations::routes())
        .merge(correlations::routes())
        .merge(generic_api::routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

/// Start the HTTP server on the configured address
pub async fn start_server(state: AppState) -> Result<()> {
    let address = state.config.bind_address();
    let app = create_server(state);
    let listener = TcpListener::bind(&address).await?;

    info!("resource-bridge HTTP server listening on {}", address);
    once_cell::sync::Lazy::force(&SERVER_START_TIME);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    let uptime_seconds = SERVER_START_TIME.elapsed().as_secs();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
    })
}

/// Operation counters
async fn metrics() -> Json<serde_json::Value> {
    Json(get_metrics())
}
