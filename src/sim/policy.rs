//! Wind-down decision over reservoir state and workload progress.

use serde::Serialize;

use super::types::WorkloadProgressReport;

/// Outcome returned to a workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Keep running.
    Proceed,
    /// Checkpoint and stop.
    WindDown,
}

/// Why a decision was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    /// Reservoir at or above the wind-down threshold.
    ReservoirHealthy,
    /// Below threshold, but finishing the estimated work keeps the reserve floor.
    LookaheadFits,
    /// Below threshold and no total-epoch estimate supplied.
    NoEstimate,
    /// Below threshold and no epochs completed yet.
    NoProgress,
    /// Below threshold and no consumption recorded for the workload.
    UnknownWorkload,
    /// Estimated total is smaller than the epochs already completed.
    InconsistentEstimate,
    /// Finishing the estimated work would breach the reserve floor.
    InsufficientReserve,
}

impl Reason {
    /// Decision implied by this reason.
    pub fn decision(self) -> Decision {
        match self {
            Self::ReservoirHealthy | Self::LookaheadFits => Decision::Proceed,
            _ => Decision::WindDown,
        }
    }

    /// Message returned to the workload.
    pub fn message(self) -> &'static str {
        match self {
            Self::ReservoirHealthy => "Success",
            Self::LookaheadFits => "Complete or wind down before estimated_total_epochs",
            _ => "Wind down instruction",
        }
    }
}

/// Decision plus the reason that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub decision: Decision,
    pub reason: Reason,
}

impl From<Reason> for Evaluation {
    fn from(reason: Reason) -> Self {
        Self {
            decision: reason.decision(),
            reason,
        }
    }
}

/// Threshold policy with a lookahead override for near-complete work.
///
/// Below `wind_down_fraction` of capacity, a workload may still proceed if
/// its projected remaining consumption leaves at least
/// `reserve_floor_fraction` of capacity in the reservoir.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindDownPolicy {
    /// Fill fraction below which workloads are asked to wind down.
    pub wind_down_fraction: f64,
    /// Fill fraction that must remain after finishing estimated work.
    pub reserve_floor_fraction: f64,
}

impl Default for WindDownPolicy {
    fn default() -> Self {
        Self {
            wind_down_fraction: 0.2,
            reserve_floor_fraction: 0.1,
        }
    }
}

impl WindDownPolicy {
    /// Evaluates one progress report.
    ///
    /// # Arguments
    ///
    /// * `stored_j` - Energy currently stored (J)
    /// * `capacity_j` - Reservoir capacity (J)
    /// * `report` - Workload progress
    /// * `energy_consumed_j` - Cumulative energy recorded for the workload, if any
    pub fn evaluate(
        &self,
        stored_j: f64,
        capacity_j: f64,
        report: &WorkloadProgressReport,
        energy_consumed_j: Option<f64>,
    ) -> Evaluation {
        if stored_j >= self.wind_down_fraction * capacity_j {
            return Reason::ReservoirHealthy.into();
        }

        let Some(estimated_total) = report.estimated_total_epochs else {
            return Reason::NoEstimate.into();
        };
        if report.epochs_completed == 0 {
            return Reason::NoProgress.into();
        }
        let Some(consumed_j) = energy_consumed_j else {
            return Reason::UnknownWorkload.into();
        };
        if estimated_total < report.epochs_completed {
            return Reason::InconsistentEstimate.into();
        }

        let per_epoch_j = consumed_j / report.epochs_completed as f64;
        let remaining_epochs = (estimated_total - report.epochs_completed) as f64;
        let to_complete_j = remaining_epochs * per_epoch_j;

        if stored_j - to_complete_j >= self.reserve_floor_fraction * capacity_j {
            Reason::LookaheadFits.into()
        } else {
            Reason::InsufficientReserve.into()
        }
    }
}
