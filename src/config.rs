//! TOML-based service configuration and preset definitions.

use std::fmt;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::sim::policy::WindDownPolicy;
use crate::sim::simulator::SimulatorOptions;
use crate::telemetry::{DEFAULT_QUERY, DEFAULT_WORKLOAD_LABEL, NAMESPACE_PLACEHOLDER};

/// Prometheus address inside the cluster.
pub const IN_CLUSTER_PROMETHEUS_URL: &str = "http://prometheus-k8s.monitoring.svc:9090";
/// Prometheus address for a port-forwarded local setup.
pub const LOCAL_PROMETHEUS_URL: &str = "http://localhost:9090";

/// Top-level service configuration parsed from TOML.
///
/// Every section is optional and defaults to the in-cluster deployment.
/// Load from TOML with [`ServiceConfig::from_toml_file`] or pick a preset
/// with [`ServiceConfig::from_preset`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// HTTP listener.
    #[serde(default)]
    pub server: ServerConfig,
    /// Prometheus telemetry source.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Capacity-factor series location.
    #[serde(default)]
    pub profile: ProfileConfig,
    /// Run defaults.
    #[serde(default)]
    pub simulation: TickConfig,
    /// Wind-down thresholds.
    #[serde(default)]
    pub policy: PolicyConfig,
    /// Log filter.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. `"0.0.0.0:5001"`.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5001".to_string(),
        }
    }
}

/// Prometheus telemetry source.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetryConfig {
    /// Prometheus base URL.
    pub prometheus_url: String,
    /// PromQL template; `{namespace}` is replaced per poll.
    pub query: String,
    /// Label carrying the workload identifier in query results.
    pub workload_label: String,
    /// Per-poll timeout (seconds, must be > 0).
    pub timeout_secs: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            prometheus_url: IN_CLUSTER_PROMETHEUS_URL.to_string(),
            query: DEFAULT_QUERY.to_string(),
            workload_label: DEFAULT_WORKLOAD_LABEL.to_string(),
            timeout_secs: 10,
        }
    }
}

/// Capacity-factor series location.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileConfig {
    /// Newline-delimited hourly capacity factors.
    pub power_factors_path: PathBuf,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            power_factors_path: PathBuf::from("wind_uk_offshore.txt"),
        }
    }
}

/// Run defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TickConfig {
    /// Tick interval used when a start request omits one (seconds).
    pub default_tick_interval_secs: u64,
    /// Tick records retained for the telemetry endpoint.
    pub history_len: usize,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            default_tick_interval_secs: 15,
            history_len: 1440,
        }
    }
}

/// Wind-down thresholds as fractions of reservoir capacity.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    /// Below this fill fraction workloads are asked to wind down.
    pub wind_down_fraction: f64,
    /// Fill fraction that must remain after finishing estimated work.
    pub reserve_floor_fraction: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        let policy = WindDownPolicy::default();
        Self {
            wind_down_fraction: policy.wind_down_fraction,
            reserve_floor_fraction: policy.reserve_floor_fraction,
        }
    }
}

/// Log filter.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` takes precedence.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"telemetry.timeout_secs"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

impl ServiceConfig {
    /// In-cluster deployment: Prometheus reached through its service DNS name.
    pub fn in_cluster() -> Self {
        Self::default()
    }

    /// Local development against a port-forwarded Prometheus.
    pub fn local() -> Self {
        Self {
            telemetry: TelemetryConfig {
                prometheus_url: LOCAL_PROMETHEUS_URL.to_string(),
                ..TelemetryConfig::default()
            },
            logging: LoggingConfig {
                filter: "debug".to_string(),
            },
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["in_cluster", "local"];

    /// Loads a configuration from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "in_cluster" => Ok(Self::in_cluster()),
            "local" => Ok(Self::local()),
            _ => Err(ConfigError {
                field: "preset".to_string(),
                message: format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            }),
        }
    }

    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "config".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.bind.parse::<SocketAddr>().is_err() {
            errors.push(ConfigError {
                field: "server.bind".into(),
                message: format!("not a socket address: \"{}\"", self.server.bind),
            });
        }

        let t = &self.telemetry;
        if !(t.prometheus_url.starts_with("http://") || t.prometheus_url.starts_with("https://"))
        {
            errors.push(ConfigError {
                field: "telemetry.prometheus_url".into(),
                message: "must start with http:// or https://".into(),
            });
        }
        if !t.query.contains(NAMESPACE_PLACEHOLDER) {
            errors.push(ConfigError {
                field: "telemetry.query".into(),
                message: format!("must contain the {NAMESPACE_PLACEHOLDER} placeholder"),
            });
        }
        if t.workload_label.trim().is_empty() {
            errors.push(ConfigError {
                field: "telemetry.workload_label".into(),
                message: "must not be empty".into(),
            });
        }
        if t.timeout_secs == 0 {
            errors.push(ConfigError {
                field: "telemetry.timeout_secs".into(),
                message: "must be > 0".into(),
            });
        }

        if self.simulation.default_tick_interval_secs == 0 {
            errors.push(ConfigError {
                field: "simulation.default_tick_interval_secs".into(),
                message: "must be > 0".into(),
            });
        }

        let p = &self.policy;
        for (field, value) in [
            ("policy.wind_down_fraction", p.wind_down_fraction),
            ("policy.reserve_floor_fraction", p.reserve_floor_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                errors.push(ConfigError {
                    field: field.into(),
                    message: "must be in [0.0, 1.0]".into(),
                });
            }
        }

        errors
    }

    /// Wind-down policy built from the `[policy]` section.
    pub fn wind_down_policy(&self) -> WindDownPolicy {
        WindDownPolicy {
            wind_down_fraction: self.policy.wind_down_fraction,
            reserve_floor_fraction: self.policy.reserve_floor_fraction,
        }
    }

    /// Simulator options built from the telemetry and simulation sections.
    pub fn simulator_options(&self) -> SimulatorOptions {
        SimulatorOptions {
            poll_timeout: self.poll_timeout(),
            history_len: self.simulation.history_len,
        }
    }

    /// Per-poll telemetry timeout.
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.telemetry.timeout_secs)
    }

    /// Tick interval applied when a start request omits one.
    pub fn default_tick_interval(&self) -> Duration {
        Duration::from_secs(self.simulation.default_tick_interval_secs)
    }
}
