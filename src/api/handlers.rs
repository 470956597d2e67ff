//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::{Form, Json};
use tracing::{info, warn};

use super::AppState;
use super::types::{
    ErrorResponse, ModelEpochsRequest, ModelEpochsResponse, StartResponse, StartSimulationForm,
    StopResponse, TelemetryQuery,
};
use crate::sim::types::{ReservoirSnapshot, TickRecord, WorkloadProgressReport};

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(error: impl Into<ErrorResponse>) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(error.into()))
}

impl From<String> for ErrorResponse {
    fn from(error: String) -> Self {
        Self { error }
    }
}

/// Starts (or restarts) a simulation run.
///
/// `POST /start_simulation` (form) → 200 + `StartResponse`
/// Missing or invalid fields → 400 + `ErrorResponse`, simulator untouched
pub async fn start_simulation(
    State(state): State<Arc<AppState>>,
    form: Result<Form<StartSimulationForm>, FormRejection>,
) -> Result<Json<StartResponse>, ApiError> {
    let Form(form) = form.map_err(|e| bad_request(e.body_text()))?;
    let config = form
        .into_config(state.default_tick_interval)
        .map_err(|e| {
            warn!(error = %e, "rejected start request");
            bad_request(e)
        })?;

    let response = StartResponse {
        message: "Simulation started",
        namespace: config.namespace().to_string(),
        start_date: config.start_date(),
    };
    state.simulator.start(config).await;
    Ok(Json(response))
}

/// Evaluates a workload progress report.
///
/// `POST /ml_model_epochs` (JSON) → 200 + `ModelEpochsResponse`, including
/// wind-down recommendations. Missing or invalid fields → 400.
pub async fn model_epochs(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ModelEpochsRequest>, JsonRejection>,
) -> Result<Json<ModelEpochsResponse>, ApiError> {
    let Json(body) = body.map_err(|e| bad_request(e.body_text()))?;
    let report = WorkloadProgressReport::try_from(body).map_err(|e| {
        warn!(error = %e, "rejected progress report");
        bad_request(e)
    })?;

    let evaluation = state.simulator.evaluate(&report);
    Ok(Json(evaluation.into()))
}

/// Stops the active run and waits for it to quiesce.
///
/// `POST /stop_simulation` → 200 + `StopResponse`
pub async fn stop_simulation(State(state): State<Arc<AppState>>) -> Json<StopResponse> {
    let phase = state.simulator.stop().await;
    info!(%phase, "stop requested over API");
    Json(StopResponse { phase })
}

/// Returns a consistent snapshot of the reservoir.
///
/// `GET /state` → 200 + `ReservoirSnapshot` JSON
pub async fn get_state(State(state): State<Arc<AppState>>) -> Json<ReservoirSnapshot> {
    Json(state.simulator.snapshot())
}

/// Returns retained tick records, optionally filtered by tick range.
///
/// `GET /telemetry` → 200 + `Vec<TickRecord>` JSON
/// `GET /telemetry?from=N&to=M` → filtered range (inclusive)
/// `GET /telemetry?from=10&to=5` → 400 + `ErrorResponse`
pub async fn get_telemetry(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TelemetryQuery>,
) -> Result<Json<Vec<TickRecord>>, ApiError> {
    if let (Some(from), Some(to)) = (query.from, query.to) {
        if from > to {
            return Err(bad_request(format!(
                "`from` ({from}) must be <= `to` ({to})"
            )));
        }
    }

    Ok(Json(state.simulator.history(query.from, query.to)))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use axum::http::header::CONTENT_TYPE;
    use tower::util::ServiceExt;

    use super::*;
    use crate::api::router;
    use crate::error::TelemetryError;
    use crate::profile::CapacityFactorSeries;
    use crate::sim::policy::WindDownPolicy;
    use crate::sim::simulator::{EnergyBalanceSimulator, SimulatorOptions};
    use crate::telemetry::{EnergyReadings, TelemetrySource};

    struct FixedSource;

    #[async_trait]
    impl TelemetrySource for FixedSource {
        async fn poll_cumulative_energy(
            &self,
            _namespace: &str,
        ) -> Result<EnergyReadings, TelemetryError> {
            Ok(EnergyReadings::from([("trainer-0".to_string(), 160.0)]))
        }
    }

    fn make_test_state() -> Arc<AppState> {
        let simulator = EnergyBalanceSimulator::new(
            Arc::new(FixedSource),
            Arc::new(CapacityFactorSeries::empty()),
            WindDownPolicy::default(),
            SimulatorOptions::default(),
        );
        Arc::new(AppState {
            simulator: Arc::new(simulator),
            default_tick_interval: Duration::from_secs(3600),
        })
    }

    fn form_request(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn state_returns_idle_before_start() {
        let app = router(make_test_state());
        let req = Request::builder()
            .uri("/state")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["phase"], "idle");
        assert!(json["latest_tick"].is_null());
    }

    #[tokio::test]
    async fn start_accepts_suffixless_aliases() {
        let state = make_test_state();
        let app = router(Arc::clone(&state));
        let req = form_request(
            "/start_simulation",
            "namespace=workload&start_date=1986-01-01&stored_energy=100\
             &storage_capacity=1000&wind_farm_production_capacity=2400",
        );
        let resp = app.oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["namespace"], "workload");
        assert_eq!(json["start_date"], "1986-01-01");
        assert_eq!(state.simulator.snapshot().stored_energy_kwh, 100.0);
        state.simulator.stop().await;
    }

    #[tokio::test]
    async fn start_missing_field_returns_400() {
        let app = router(make_test_state());
        let req = form_request(
            "/start_simulation",
            "namespace=workload&start_date=1986-01-01&stored_energy_kwh=1",
        );
        let resp = app.oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert!(
            json["error"]
                .as_str()
                .is_some_and(|e| e.contains("storage_capacity_kwh"))
        );
    }

    #[tokio::test]
    async fn epochs_missing_pod_returns_400() {
        let app = router(make_test_state());
        let req = json_request("/ml_model_epochs", serde_json::json!({ "epochs": 3 }));
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn epochs_wrong_type_returns_400() {
        let app = router(make_test_state());
        let req = json_request(
            "/ml_model_epochs",
            serde_json::json!({ "epochs": "three", "pod_name": "trainer-0" }),
        );
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(resp).await.get("error").is_some());
    }

    #[tokio::test]
    async fn epochs_low_reservoir_uses_lookahead() {
        let state = make_test_state();
        let start = form_request(
            "/start_simulation",
            "namespace=workload&start_date=1986-01-01&stored_energy_kwh=150\
             &storage_capacity_kwh=1000&wind_farm_production_capacity_kwh=0",
        );
        let resp = router(Arc::clone(&state)).oneshot(start).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let req = json_request(
            "/ml_model_epochs",
            serde_json::json!({
                "epochs": 8,
                "pod_name": "trainer-0",
                "estimated_total_epochs": 10
            }),
        );
        let resp = router(Arc::clone(&state)).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["decision"], "proceed");
        assert_eq!(json["reason"], "lookahead_fits");
        assert_eq!(
            json["message"],
            "Complete or wind down before estimated_total_epochs"
        );

        let req = json_request(
            "/ml_model_epochs",
            serde_json::json!({ "epochs": 8, "pod_name": "trainer-0" }),
        );
        let resp = router(Arc::clone(&state)).oneshot(req).await.unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["decision"], "wind_down");
        assert_eq!(json["message"], "Wind down instruction");

        state.simulator.stop().await;
    }

    #[tokio::test]
    async fn epochs_sent_as_float_are_accepted() {
        let app = router(make_test_state());
        let req = json_request(
            "/ml_model_epochs",
            serde_json::json!({
                "epochs": 8.0,
                "pod_name": "trainer-0",
                "estimated_total_epochs": 10.0
            }),
        );
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["reason"], "reservoir_healthy");
    }

    #[tokio::test]
    async fn epochs_with_fraction_return_400() {
        let app = router(make_test_state());
        let req = json_request(
            "/ml_model_epochs",
            serde_json::json!({ "epochs": 8.5, "pod_name": "trainer-0" }),
        );
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(resp).await.get("error").is_some());
    }

    #[tokio::test]
    async fn stop_returns_phase() {
        let app = router(make_test_state());
        let req = Request::builder()
            .method("POST")
            .uri("/stop_simulation")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["phase"], "idle");
    }

    #[tokio::test]
    async fn telemetry_empty_before_start() {
        let app = router(make_test_state());
        let req = Request::builder()
            .uri("/telemetry")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, serde_json::json!([]));
    }

    #[tokio::test]
    async fn telemetry_invalid_range_returns_400() {
        let app = router(make_test_state());
        let req = Request::builder()
            .uri("/telemetry?from=10&to=5")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(resp).await.get("error").is_some());
    }
}
