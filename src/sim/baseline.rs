//! Per-workload cumulative counter baselines and delta computation.

use std::collections::HashMap;

use tracing::debug;

use crate::telemetry::EnergyReadings;

/// Last-seen cumulative energy counter per workload.
///
/// A workload seen for the first time contributes a zero delta: its current
/// counter becomes the baseline. A counter that goes backwards (the workload
/// restarted) is treated the same way, re-seeding the baseline with a zero
/// delta for that poll.
#[derive(Debug, Clone, Default)]
pub struct BaselineTracker {
    baselines: HashMap<String, f64>,
}

impl BaselineTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `readings` as baselines without producing any consumption.
    pub fn seed(&mut self, readings: &EnergyReadings) {
        for (workload, joules) in readings {
            self.baselines.insert(workload.clone(), *joules);
        }
    }

    /// Returns the energy consumed since the previous poll, summed over all
    /// workloads in `readings`, and advances every baseline.
    pub fn consume(&mut self, readings: &EnergyReadings) -> f64 {
        let mut total = 0.0;
        for (workload, &current) in readings {
            let previous = self.baselines.insert(workload.clone(), current);
            total += match previous {
                Some(prev) if current >= prev => current - prev,
                Some(prev) => {
                    debug!(%workload, previous = prev, current, "energy counter reset");
                    0.0
                }
                None => 0.0,
            };
        }
        total
    }

    /// Latest cumulative counter recorded for `workload`.
    pub fn get(&self, workload: &str) -> Option<f64> {
        self.baselines.get(workload).copied()
    }

    /// Number of workloads with a baseline.
    pub fn len(&self) -> usize {
        self.baselines.len()
    }

    /// Whether no workload has been observed.
    pub fn is_empty(&self) -> bool {
        self.baselines.is_empty()
    }
}
