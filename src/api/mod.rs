//! Control API for the simulator.
//!
//! - `POST /start_simulation` (form): start or restart a run
//! - `POST /ml_model_epochs` (JSON): workload progress, answered with a
//!   proceed or wind-down recommendation
//! - `POST /stop_simulation`: stop the active run
//! - `GET /state`: reservoir snapshot
//! - `GET /telemetry`: retained tick records with optional range filtering

mod handlers;
mod types;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;

use crate::sim::simulator::EnergyBalanceSimulator;

pub use types::{ErrorResponse, ModelEpochsRequest, StartSimulationForm};

/// Application state shared across all request handlers.
pub struct AppState {
    /// The single simulator instance.
    pub simulator: Arc<EnergyBalanceSimulator>,
    /// Tick interval used when a start request omits one.
    pub default_tick_interval: Duration,
}

/// Builds the axum router with all API routes.
///
/// # Arguments
///
/// * `state` - Shared application state
///
/// # Returns
///
/// Configured `Router` ready to serve.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/start_simulation", post(handlers::start_simulation))
        .route("/ml_model_epochs", post(handlers::model_epochs))
        .route("/stop_simulation", post(handlers::stop_simulation))
        .route("/state", get(handlers::get_state))
        .route("/telemetry", get(handlers::get_telemetry))
        .with_state(state)
}

/// Serves the API on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns the underlying I/O error if the server fails.
pub async fn serve<F>(state: Arc<AppState>, listener: TcpListener, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
