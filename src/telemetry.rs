//! Workload energy telemetry.
//!
//! The simulator only sees [`TelemetrySource`]: a pull-based capability that
//! returns the cumulative joule counter of every workload in a namespace.
//! [`PrometheusSource`] implements it against the Prometheus instant-query
//! API, reading Kepler container counters by default.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::TelemetryError;

/// Cumulative joules per workload identifier.
pub type EnergyReadings = HashMap<String, f64>;

/// Placeholder substituted with the namespace in query templates.
pub const NAMESPACE_PLACEHOLDER: &str = "{namespace}";

/// Default per-pod Kepler energy query.
pub const DEFAULT_QUERY: &str =
    r#"sum by (pod_name)(kepler_container_joules_total{container_namespace="{namespace}"})"#;

/// Default label carrying the workload identifier.
pub const DEFAULT_WORKLOAD_LABEL: &str = "pod_name";

/// Source of cumulative per-workload energy counters.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Returns the latest cumulative energy (J) of every workload in `namespace`.
    async fn poll_cumulative_energy(&self, namespace: &str)
    -> Result<EnergyReadings, TelemetryError>;
}

/// Prometheus-backed telemetry source.
#[derive(Debug, Clone)]
pub struct PrometheusSource {
    client: reqwest::Client,
    base_url: String,
    query_template: String,
    workload_label: String,
}

impl PrometheusSource {
    /// Creates a client for the Prometheus server at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::Http`] if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        query_template: impl Into<String>,
        workload_label: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TelemetryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            query_template: query_template.into(),
            workload_label: workload_label.into(),
        })
    }

    /// Query text for `namespace`.
    pub fn render_query(&self, namespace: &str) -> String {
        self.query_template.replace(NAMESPACE_PLACEHOLDER, namespace)
    }

    fn query_url(&self) -> String {
        format!("{}/api/v1/query", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl TelemetrySource for PrometheusSource {
    async fn poll_cumulative_energy(
        &self,
        namespace: &str,
    ) -> Result<EnergyReadings, TelemetryError> {
        let query = self.render_query(namespace);
        debug!(url = %self.query_url(), %query, "querying prometheus");

        let body = self
            .client
            .get(self.query_url())
            .query(&[("query", query.as_str())])
            .send()
            .await?
            .text()
            .await?;

        parse_query_response(&body, &self.workload_label)
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default, rename = "errorType")]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(rename = "resultType")]
    result_type: String,
    #[serde(default)]
    result: Vec<VectorSample>,
}

#[derive(Debug, Deserialize)]
struct VectorSample {
    #[serde(default)]
    metric: HashMap<String, String>,
    value: (f64, String),
}

/// Decodes a Prometheus instant-vector response into per-workload readings.
///
/// Samples lacking `workload_label` or carrying a non-numeric value are
/// skipped.
///
/// # Errors
///
/// [`TelemetryError::Decode`] for bodies that are not an instant vector,
/// [`TelemetryError::Query`] when Prometheus reports an error status.
pub fn parse_query_response(
    body: &str,
    workload_label: &str,
) -> Result<EnergyReadings, TelemetryError> {
    let response: QueryResponse =
        serde_json::from_str(body).map_err(|e| TelemetryError::Decode(e.to_string()))?;

    if response.status != "success" {
        return Err(TelemetryError::Query {
            error_type: response.error_type.unwrap_or_else(|| "unknown".to_string()),
            error: response.error.unwrap_or_default(),
        });
    }

    let data = response
        .data
        .ok_or_else(|| TelemetryError::Decode("missing `data`".to_string()))?;
    if data.result_type != "vector" {
        return Err(TelemetryError::Decode(format!(
            "expected vector result, got `{}`",
            data.result_type
        )));
    }

    let mut readings = EnergyReadings::with_capacity(data.result.len());
    for sample in data.result {
        let Some(workload) = sample.metric.get(workload_label) else {
            debug!(label = workload_label, "sample without workload label skipped");
            continue;
        };
        match sample.value.1.parse::<f64>() {
            Ok(joules) if joules.is_finite() => {
                readings.insert(workload.clone(), joules);
            }
            _ => debug!(%workload, value = %sample.value.1, "non-numeric sample skipped"),
        }
    }
    Ok(readings)
}
