//! API request, response, and query types.
//!
//! Form and JSON fields keep the names existing clients already send
//! (`stored_energy_kwh`, `pod_name`, ...). Request fields are optional at the
//! serde level so a missing field yields a named 400 instead of a generic
//! deserialization failure.

use std::time::Duration;

use chrono::NaiveDate;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::profile::CapacityFactorSeries;
use crate::sim::policy::{Decision, Evaluation, Reason};
use crate::sim::types::{Phase, SimulationConfig, WorkloadProgressReport};

/// Form body of `POST /start_simulation`.
#[derive(Debug, Default, Deserialize)]
pub struct StartSimulationForm {
    pub namespace: Option<String>,
    pub start_date: Option<String>,
    #[serde(alias = "stored_energy")]
    pub stored_energy_kwh: Option<String>,
    #[serde(alias = "storage_capacity")]
    pub storage_capacity_kwh: Option<String>,
    #[serde(alias = "wind_farm_production_capacity")]
    pub wind_farm_production_capacity_kwh: Option<String>,
    pub tick_interval_seconds: Option<String>,
}

impl StartSimulationForm {
    /// Validates the form into a run configuration.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found; fields are checked in
    /// form order.
    pub fn into_config(
        self,
        default_tick_interval: Duration,
    ) -> Result<SimulationConfig, ValidationError> {
        let namespace = required("namespace", self.namespace)?;
        let start_date = CapacityFactorSeries::parse_start_date(&required(
            "start_date",
            self.start_date,
        )?)?;
        let stored = parse_number("stored_energy_kwh", self.stored_energy_kwh)?;
        let capacity = parse_number("storage_capacity_kwh", self.storage_capacity_kwh)?;
        let daily = parse_number(
            "wind_farm_production_capacity_kwh",
            self.wind_farm_production_capacity_kwh,
        )?;
        let tick_interval = match blank_to_none(self.tick_interval_seconds) {
            None => default_tick_interval,
            Some(raw) => parse_interval(&raw)?,
        };

        SimulationConfig::from_kwh(namespace, start_date, stored, capacity, daily, tick_interval)
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(field: &'static str, value: Option<String>) -> Result<String, ValidationError> {
    blank_to_none(value).ok_or(ValidationError::MissingField(field))
}

fn parse_number(field: &'static str, value: Option<String>) -> Result<f64, ValidationError> {
    let raw = required(field, value)?;
    raw.parse::<f64>()
        .map_err(|_| ValidationError::invalid(field, format!("\"{raw}\" is not a number")))
}

fn parse_interval(raw: &str) -> Result<Duration, ValidationError> {
    const FIELD: &str = "tick_interval_seconds";
    let secs = raw
        .parse::<f64>()
        .map_err(|_| ValidationError::invalid(FIELD, format!("\"{raw}\" is not a number")))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(ValidationError::invalid(FIELD, "must be a positive number"));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| ValidationError::invalid(FIELD, e.to_string()))
}

/// Successful start response.
#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub message: &'static str,
    pub namespace: String,
    pub start_date: NaiveDate,
}

/// JSON body of `POST /ml_model_epochs`.
///
/// Epoch counts may arrive as floats (`8.0`) from Python clients; any value
/// with no fractional part is accepted.
#[derive(Debug, Deserialize)]
pub struct ModelEpochsRequest {
    /// Epochs completed so far.
    #[serde(default, deserialize_with = "whole_count")]
    pub epochs: Option<u64>,
    /// Workload identifier as it appears in telemetry.
    pub pod_name: Option<String>,
    /// Workload's estimate of its total epoch count.
    #[serde(default, deserialize_with = "whole_count")]
    pub estimated_total_epochs: Option<u64>,
}

fn whole_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(number) = Option::<serde_json::Number>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Some(n) = number.as_u64() {
        return Ok(Some(n));
    }
    match number.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f < u64::MAX as f64 => Ok(Some(f as u64)),
        _ => Err(de::Error::custom(format!(
            "expected a non-negative whole number, got {number}"
        ))),
    }
}

impl TryFrom<ModelEpochsRequest> for WorkloadProgressReport {
    type Error = ValidationError;

    fn try_from(req: ModelEpochsRequest) -> Result<Self, Self::Error> {
        let epochs_completed = req.epochs.ok_or(ValidationError::MissingField("epochs"))?;
        let workload_id = required("pod_name", req.pod_name)?;
        Ok(Self {
            workload_id,
            epochs_completed,
            estimated_total_epochs: req.estimated_total_epochs,
        })
    }
}

/// Wind-down evaluation returned to a workload.
#[derive(Debug, Serialize)]
pub struct ModelEpochsResponse {
    pub message: &'static str,
    pub decision: Decision,
    pub reason: Reason,
}

impl From<Evaluation> for ModelEpochsResponse {
    fn from(eval: Evaluation) -> Self {
        Self {
            message: eval.reason.message(),
            decision: eval.decision,
            reason: eval.reason,
        }
    }
}

/// Response of `POST /stop_simulation`.
#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub phase: Phase,
}

/// Optional range query parameters for the telemetry endpoint.
#[derive(Debug, Deserialize)]
pub struct TelemetryQuery {
    /// Start tick (inclusive).
    pub from: Option<u64>,
    /// End tick (inclusive).
    pub to: Option<u64>,
}

/// Error response body for 400-class errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}

impl From<ValidationError> for ErrorResponse {
    fn from(e: ValidationError) -> Self {
        Self {
            error: e.to_string(),
        }
    }
}
