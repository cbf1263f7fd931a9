// Web server: Axum-based status endpoint for the running monitor.
//
// Read-only: handlers look at the shared MonitorStatus and the seen-set
// count. The poll loop is the only writer of either.

use std::sync::Arc;

use anyhow::Result;
use axum::routing::get;
use axum::Router;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::db::SeenStore;
use crate::monitor::MonitorStatus;

pub mod handlers;

/// Shared application state threaded through all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SeenStore>,
    pub status: Arc<RwLock<MonitorStatus>>,
}

/// Start the Axum web server and block until it exits.
pub async fn run_server(state: AppState, port: u16, bind: &str) -> Result<()> {
    let app = build_router(state);

    let addr = format!("{bind}:{port}");
    info!("Status endpoint listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::status::health))
        .route("/api/status", get(handlers::status::get_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
