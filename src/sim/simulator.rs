//! Long-running simulator: owns the tick task and the shared run state.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::TelemetryError;
use crate::profile::CapacityFactorSeries;
use crate::telemetry::{EnergyReadings, TelemetrySource};

use super::engine::EnergyBalance;
use super::policy::{Decision, Evaluation, WindDownPolicy};
use super::types::{
    Phase, ReservoirSnapshot, SimulationConfig, TickRecord, WorkloadProgressReport,
    joules_to_kwh,
};

/// Tunables that apply to every run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatorOptions {
    /// Upper bound on a single telemetry poll.
    pub poll_timeout: Duration,
    /// Tick records retained for `history` queries.
    pub history_len: usize,
}

impl Default for SimulatorOptions {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_secs(10),
            history_len: 1440,
        }
    }
}

#[derive(Debug, Default)]
struct RunState {
    phase: Phase,
    /// Generation of the installed run; a tick task only touches state
    /// while this still matches the id it was spawned with.
    run_id: u64,
    balance: Option<EnergyBalance>,
    history: VecDeque<TickRecord>,
}

impl RunState {
    fn record(&mut self, record: TickRecord, history_len: usize) {
        if history_len == 0 {
            return;
        }
        while self.history.len() >= history_len {
            self.history.pop_front();
        }
        self.history.push_back(record);
    }
}

struct RunHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Drives an [`EnergyBalance`] from live telemetry on a fixed interval.
///
/// At most one run is active. Readers (`snapshot`, `history`, `evaluate`)
/// take a single read lock each; the tick task is the only writer while a
/// run is active.
pub struct EnergyBalanceSimulator {
    telemetry: Arc<dyn TelemetrySource>,
    series: Arc<CapacityFactorSeries>,
    policy: WindDownPolicy,
    options: SimulatorOptions,
    state: Arc<RwLock<RunState>>,
    run: Mutex<Option<RunHandle>>,
}

impl EnergyBalanceSimulator {
    pub fn new(
        telemetry: Arc<dyn TelemetrySource>,
        series: Arc<CapacityFactorSeries>,
        policy: WindDownPolicy,
        options: SimulatorOptions,
    ) -> Self {
        Self {
            telemetry,
            series,
            policy,
            options,
            state: Arc::new(RwLock::new(RunState::default())),
            run: Mutex::new(None),
        }
    }

    /// Starts a new run, stopping and joining any previous one first.
    ///
    /// Baselines are seeded from one immediate telemetry poll; the first
    /// tick happens one `tick_interval` later. A failed seeding poll leaves
    /// the baselines empty, so every workload is seeded on its first tick.
    ///
    /// Dropping the returned future part-way leaves the previous run either
    /// still registered (and signalled to stop) or fully joined, never
    /// detached.
    pub async fn start(&self, config: SimulationConfig) {
        let mut slot = self.run.lock().await;
        if slot.is_some() {
            info!("stopping previous run before restart");
            self.shutdown(&mut slot).await;
        }

        let namespace = config.namespace().to_string();
        let interval = config.tick_interval();
        let mut balance = EnergyBalance::new(config, Arc::clone(&self.series));

        match poll_with_timeout(self.telemetry.as_ref(), &namespace, self.options.poll_timeout)
            .await
        {
            Ok(readings) => balance.seed(&readings),
            Err(e) => warn!(%namespace, error = %e, "seeding poll failed; baselines start empty"),
        }

        info!(
            %namespace,
            start_date = %balance.config().start_date(),
            stored_kwh = joules_to_kwh(balance.reservoir().stored_j()),
            capacity_kwh = joules_to_kwh(balance.reservoir().capacity_j()),
            interval_secs = interval.as_secs_f64(),
            seeded = balance.baselines().len(),
            "simulation started"
        );

        let run_id = {
            let mut state = self.state.write();
            state.run_id += 1;
            state.phase = Phase::Running;
            state.balance = Some(balance);
            state.history.clear();
            state.run_id
        };

        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(run_loop(
            Arc::clone(&self.state),
            run_id,
            Arc::clone(&self.telemetry),
            namespace,
            interval,
            self.options,
            stop_rx,
        ));
        *slot = Some(RunHandle {
            stop: stop_tx,
            task,
        });
    }

    /// Requests termination of the active run and waits until it has stopped.
    ///
    /// Returns the resulting phase. Calling this with no active run is a no-op.
    pub async fn stop(&self) -> Phase {
        let mut slot = self.run.lock().await;
        self.shutdown(&mut slot).await;
        self.phase()
    }

    /// Signals the registered tick task and joins it.
    ///
    /// The handle leaves `slot` only once the join has completed, so a
    /// cancelled caller leaves it in place for the next one to finish.
    async fn shutdown(&self, slot: &mut Option<RunHandle>) {
        let Some(handle) = slot.as_mut() else {
            return;
        };
        {
            let mut state = self.state.write();
            if state.phase == Phase::Running {
                state.phase = Phase::StopRequested;
            }
        }
        // The loop may already have exited on its own.
        let _ = handle.stop.send(true);
        let joined = (&mut handle.task).await;
        *slot = None;
        if let Err(e) = joined {
            error!(error = %e, "tick task terminated abnormally");
        }
        self.state.write().phase = Phase::Stopped;
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.state.read().phase
    }

    /// Consistent view of the reservoir and run progress.
    pub fn snapshot(&self) -> ReservoirSnapshot {
        let state = self.state.read();
        let latest_tick = state.history.back().cloned();
        match state.balance.as_ref() {
            Some(balance) => {
                let reservoir = balance.reservoir();
                let config = balance.config();
                ReservoirSnapshot {
                    phase: state.phase,
                    namespace: Some(config.namespace().to_string()),
                    start_date: Some(config.start_date()),
                    stored_energy_j: reservoir.stored_j(),
                    storage_capacity_j: reservoir.capacity_j(),
                    stored_energy_kwh: joules_to_kwh(reservoir.stored_j()),
                    storage_capacity_kwh: joules_to_kwh(reservoir.capacity_j()),
                    fill_fraction: reservoir.fill_fraction(),
                    hour_index: balance.clock().hour_index(),
                    ticks: balance.clock().ticks(),
                    tracked_workloads: balance.baselines().len(),
                    latest_tick,
                }
            }
            None => ReservoirSnapshot {
                phase: state.phase,
                namespace: None,
                start_date: None,
                stored_energy_j: 0.0,
                storage_capacity_j: 0.0,
                stored_energy_kwh: 0.0,
                storage_capacity_kwh: 0.0,
                fill_fraction: 0.0,
                hour_index: 0,
                ticks: 0,
                tracked_workloads: 0,
                latest_tick,
            },
        }
    }

    /// Retained tick records with `from <= tick <= to` (bounds optional).
    pub fn history(&self, from: Option<u64>, to: Option<u64>) -> Vec<TickRecord> {
        let from = from.unwrap_or(0);
        let to = to.unwrap_or(u64::MAX);
        self.state
            .read()
            .history
            .iter()
            .filter(|r| r.tick >= from && r.tick <= to)
            .cloned()
            .collect()
    }

    /// Evaluates a workload progress report against the current reservoir.
    ///
    /// Stored energy, capacity and the workload's cumulative counter are read
    /// under one lock. With no run ever started both energies are zero and
    /// the reservoir counts as healthy.
    pub fn evaluate(&self, report: &WorkloadProgressReport) -> Evaluation {
        let (stored_j, capacity_j, consumed_j) = {
            let state = self.state.read();
            match state.balance.as_ref() {
                Some(balance) => (
                    balance.reservoir().stored_j(),
                    balance.reservoir().capacity_j(),
                    balance.baselines().get(&report.workload_id),
                ),
                None => (0.0, 0.0, None),
            }
        };

        let evaluation = self
            .policy
            .evaluate(stored_j, capacity_j, report, consumed_j);
        if evaluation.decision == Decision::WindDown {
            warn!(
                workload = %report.workload_id,
                epochs = report.epochs_completed,
                estimated_total = ?report.estimated_total_epochs,
                reason = ?evaluation.reason,
                stored_kwh = joules_to_kwh(stored_j),
                "recommending wind-down"
            );
        } else {
            debug!(workload = %report.workload_id, reason = ?evaluation.reason, "workload may proceed");
        }
        evaluation
    }
}

async fn poll_with_timeout(
    telemetry: &dyn TelemetrySource,
    namespace: &str,
    timeout: Duration,
) -> Result<EnergyReadings, TelemetryError> {
    match tokio::time::timeout(timeout, telemetry.poll_cumulative_energy(namespace)).await {
        Ok(result) => result,
        Err(_) => Err(TelemetryError::Timeout(timeout)),
    }
}

/// Sleeps for `interval` unless a stop is signalled first.
///
/// Returns `true` when the loop should exit.
async fn wait_or_stop(interval: Duration, stop_rx: &mut watch::Receiver<bool>) -> bool {
    if *stop_rx.borrow() {
        return true;
    }
    let sender_gone = tokio::select! {
        _ = tokio::time::sleep(interval) => false,
        changed = stop_rx.changed() => changed.is_err(),
    };
    sender_gone || *stop_rx.borrow()
}

async fn run_loop(
    state: Arc<RwLock<RunState>>,
    run_id: u64,
    telemetry: Arc<dyn TelemetrySource>,
    namespace: String,
    interval: Duration,
    options: SimulatorOptions,
    mut stop_rx: watch::Receiver<bool>,
) {
    while !wait_or_stop(interval, &mut stop_rx).await {
        let readings =
            match poll_with_timeout(telemetry.as_ref(), &namespace, options.poll_timeout).await {
                Ok(readings) => Some(readings),
                Err(e) => {
                    warn!(%namespace, error = %e, "telemetry poll failed; tick consumes nothing");
                    None
                }
            };

        let record = {
            let mut state = state.write();
            if state.run_id != run_id {
                break;
            }
            let Some(balance) = state.balance.as_mut() else {
                break;
            };
            let record = balance.step(readings.as_ref());
            state.record(record.clone(), options.history_len);
            record
        };
        debug!("{record}");
    }

    {
        let mut state = state.write();
        if state.run_id == run_id {
            state.phase = Phase::Stopped;
        }
    }
    info!(%namespace, run_id, "simulation stopped");
}
