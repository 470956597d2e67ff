//! Core simulation types: run configuration, tick records, and snapshots.

use std::fmt;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::ValidationError;
use crate::profile::{CapacityFactorSeries, HOURS_PER_DAY};

/// Joules in one kilowatt-hour.
pub const JOULES_PER_KWH: f64 = 3_600_000.0;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Converts kilowatt-hours to joules.
pub fn kwh_to_joules(kwh: f64) -> f64 {
    kwh * JOULES_PER_KWH
}

/// Converts joules to kilowatt-hours.
pub fn joules_to_kwh(joules: f64) -> f64 {
    joules / JOULES_PER_KWH
}

/// Configuration of a single simulation run.
///
/// All energy quantities are in joules. Only [`SimulationConfig::from_kwh`]
/// constructs one, so every instance has a positive finite capacity and a
/// non-zero tick interval.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use chrono::NaiveDate;
/// use winddown_sim::sim::types::SimulationConfig;
///
/// let cfg = SimulationConfig::from_kwh(
///     "workload",
///     NaiveDate::from_ymd_opt(2000, 6, 1).unwrap(),
///     500.0,
///     1000.0,
///     2400.0,
///     Duration::from_secs(15),
/// )
/// .unwrap();
/// assert_eq!(cfg.ticks_per_hour(), 240);
/// assert_eq!(cfg.wind_farm_hourly_capacity_j(), 100.0 * 3_600_000.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    namespace: String,
    start_date: NaiveDate,
    initial_stored_energy_j: f64,
    storage_capacity_j: f64,
    wind_farm_daily_capacity_j: f64,
    tick_interval: Duration,
}

impl SimulationConfig {
    /// Builds a run configuration from kilowatt-hour figures.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the namespace is blank, the date lies
    /// outside the historical series, an energy figure is negative or
    /// non-finite, the capacity is zero, or the tick interval is zero.
    pub fn from_kwh(
        namespace: impl Into<String>,
        start_date: NaiveDate,
        stored_energy_kwh: f64,
        storage_capacity_kwh: f64,
        wind_farm_daily_kwh: f64,
        tick_interval: Duration,
    ) -> Result<Self, ValidationError> {
        let namespace = namespace.into();
        if namespace.trim().is_empty() {
            return Err(ValidationError::MissingField("namespace"));
        }
        if !CapacityFactorSeries::is_within_range(start_date) {
            return Err(ValidationError::StartDateOutOfRange {
                date: start_date.to_string(),
                first: crate::profile::epoch_start().to_string(),
                last: crate::profile::epoch_end().to_string(),
            });
        }
        check_energy("stored_energy_kwh", stored_energy_kwh)?;
        check_energy("storage_capacity_kwh", storage_capacity_kwh)?;
        check_energy("wind_farm_production_capacity_kwh", wind_farm_daily_kwh)?;
        if storage_capacity_kwh <= 0.0 {
            return Err(ValidationError::invalid(
                "storage_capacity_kwh",
                "must be > 0",
            ));
        }
        if tick_interval.is_zero() {
            return Err(ValidationError::invalid(
                "tick_interval_seconds",
                "must be > 0",
            ));
        }

        let storage_capacity_j = kwh_to_joules(storage_capacity_kwh);
        if !storage_capacity_j.is_finite() {
            return Err(ValidationError::invalid(
                "storage_capacity_kwh",
                "too large to represent in joules",
            ));
        }

        Ok(Self {
            namespace,
            start_date,
            initial_stored_energy_j: kwh_to_joules(stored_energy_kwh),
            storage_capacity_j,
            wind_farm_daily_capacity_j: kwh_to_joules(wind_farm_daily_kwh),
            tick_interval,
        })
    }

    /// Namespace whose workloads drain the reservoir.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Calendar date the generation profile starts from.
    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// Stored energy at run start (J).
    pub fn initial_stored_energy_j(&self) -> f64 {
        self.initial_stored_energy_j
    }

    /// Reservoir capacity (J).
    pub fn storage_capacity_j(&self) -> f64 {
        self.storage_capacity_j
    }

    /// Wind farm production capacity per day (J).
    pub fn wind_farm_daily_capacity_j(&self) -> f64 {
        self.wind_farm_daily_capacity_j
    }

    /// Wall-clock time between ticks.
    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Hourly generation capacity, the daily figure spread over 24 hours.
    pub fn wind_farm_hourly_capacity_j(&self) -> f64 {
        self.wind_farm_daily_capacity_j / HOURS_PER_DAY as f64
    }

    /// Whole ticks per simulated hour, never less than one.
    pub fn ticks_per_hour(&self) -> u64 {
        let ticks = (SECONDS_PER_HOUR / self.tick_interval.as_secs_f64()).floor();
        (ticks as u64).max(1)
    }
}

fn check_energy(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::invalid(field, "must be a finite number"));
    }
    if value < 0.0 {
        return Err(ValidationError::invalid(field, "must be >= 0"));
    }
    Ok(())
}

/// Lifecycle phase of the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No run has been started yet.
    #[default]
    Idle,
    /// A tick task is active.
    Running,
    /// Stop has been signalled; waiting for the tick task to exit.
    StopRequested,
    /// The last run has fully quiesced.
    Stopped,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::StopRequested => "stop_requested",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Progress report submitted by a workload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadProgressReport {
    /// Workload identifier as reported by telemetry (pod name).
    pub workload_id: String,
    /// Epochs finished so far.
    pub epochs_completed: u64,
    /// Workload's own estimate of the total epoch count.
    pub estimated_total_epochs: Option<u64>,
}

/// Complete record of one executed tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickRecord {
    /// Tick number within the run, starting at 0.
    pub tick: u64,
    /// Absolute series hour used for this tick.
    pub hour_index: usize,
    /// Capacity factor applied.
    pub capacity_factor: f64,
    /// Energy drawn by workloads since the previous tick (J).
    pub consumption_j: f64,
    /// Energy generated during this tick (J).
    pub generated_j: f64,
    /// `generated_j - consumption_j` before clamping (J).
    pub net_j: f64,
    /// Stored energy after clamping (J).
    pub stored_energy_j: f64,
    /// Whether telemetry failed and consumption was taken as zero.
    pub degraded: bool,
}

impl fmt::Display for TickRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tick={:>5} hour={:>6} | pf={:.3} | used={:.1} J  gen={:.4} kWh  \
             net={:.1} J | stored={:.3} kWh{}",
            self.tick,
            self.hour_index,
            self.capacity_factor,
            self.consumption_j,
            joules_to_kwh(self.generated_j),
            self.net_j,
            joules_to_kwh(self.stored_energy_j),
            if self.degraded { " (degraded)" } else { "" },
        )
    }
}

/// Consistent point-in-time view of the reservoir.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReservoirSnapshot {
    /// Simulator phase.
    pub phase: Phase,
    /// Namespace of the current (or last) run.
    pub namespace: Option<String>,
    /// Start date of the current (or last) run.
    pub start_date: Option<NaiveDate>,
    /// Stored energy (J).
    pub stored_energy_j: f64,
    /// Reservoir capacity (J).
    pub storage_capacity_j: f64,
    /// Stored energy (kWh).
    pub stored_energy_kwh: f64,
    /// Reservoir capacity (kWh).
    pub storage_capacity_kwh: f64,
    /// Stored energy as a fraction of capacity (0.0 when capacity is zero).
    pub fill_fraction: f64,
    /// Current absolute series hour.
    pub hour_index: usize,
    /// Ticks executed in the current run.
    pub ticks: u64,
    /// Workloads with a recorded baseline.
    pub tracked_workloads: usize,
    /// Most recent tick, if any.
    pub latest_tick: Option<TickRecord>,
}
