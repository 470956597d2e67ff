//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;

use winddown_sim::error::TelemetryError;
use winddown_sim::profile::{CapacityFactorSeries, EXPECTED_SAMPLES};
use winddown_sim::sim::policy::WindDownPolicy;
use winddown_sim::sim::simulator::{EnergyBalanceSimulator, SimulatorOptions};
use winddown_sim::sim::types::SimulationConfig;
use winddown_sim::telemetry::{EnergyReadings, TelemetrySource};

/// One scripted poll outcome.
#[derive(Debug, Clone)]
pub enum Poll {
    Readings(Vec<(&'static str, f64)>),
    Fail,
}

/// Telemetry double that replays a script, repeating the last entry.
///
/// An optional delay makes every poll slow, for timeout tests.
pub struct ScriptedTelemetry {
    script: Mutex<VecDeque<Poll>>,
    last: Mutex<Poll>,
    delay: Option<Duration>,
    polls: AtomicUsize,
}

impl ScriptedTelemetry {
    pub fn new(script: Vec<Poll>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(Poll::Readings(Vec::new())),
            delay: None,
            polls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Polls served so far, including the seeding poll.
    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    fn next(&self) -> Poll {
        let mut last = self.last.lock();
        if let Some(poll) = self.script.lock().pop_front() {
            *last = poll;
        }
        last.clone()
    }
}

#[async_trait]
impl TelemetrySource for ScriptedTelemetry {
    async fn poll_cumulative_energy(
        &self,
        _namespace: &str,
    ) -> Result<EnergyReadings, TelemetryError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.next() {
            Poll::Readings(pairs) => Ok(pairs
                .into_iter()
                .map(|(pod, joules)| (pod.to_string(), joules))
                .collect()),
            Poll::Fail => Err(TelemetryError::Decode("scripted failure".to_string())),
        }
    }
}

/// Telemetry double that answers per namespace and logs every poll.
///
/// Each poll sleeps for `delay` and returns one pod named `<namespace>-pod`
/// whose counter grows by 1 kJ per poll. The log records the namespace when
/// a poll begins and again when it ends.
pub struct NamespaceTelemetry {
    delay: Duration,
    polls: AtomicUsize,
    log: Mutex<Vec<String>>,
}

impl NamespaceTelemetry {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            polls: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Namespaces in the order polls began and ended.
    pub fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }
}

#[async_trait]
impl TelemetrySource for NamespaceTelemetry {
    async fn poll_cumulative_energy(
        &self,
        namespace: &str,
    ) -> Result<EnergyReadings, TelemetryError> {
        self.log.lock().push(namespace.to_string());
        let n = self.polls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.log.lock().push(namespace.to_string());
        Ok(EnergyReadings::from([(
            format!("{namespace}-pod"),
            1_000.0 * (n + 1) as f64,
        )]))
    }
}

/// Full-length series with the same capacity factor every hour.
pub fn constant_series(capacity_factor: f64) -> Arc<CapacityFactorSeries> {
    Arc::new(CapacityFactorSeries::new(vec![capacity_factor; EXPECTED_SAMPLES]))
}

/// Simulator over `telemetry` with default policy and a short poll timeout.
pub fn simulator(
    telemetry: Arc<dyn TelemetrySource>,
    series: Arc<CapacityFactorSeries>,
) -> EnergyBalanceSimulator {
    EnergyBalanceSimulator::new(
        telemetry,
        series,
        WindDownPolicy::default(),
        SimulatorOptions {
            poll_timeout: Duration::from_millis(50),
            history_len: 1440,
        },
    )
}

/// Like [`simulator`] but with a poll timeout long enough for slow doubles.
pub fn patient_simulator(telemetry: Arc<dyn TelemetrySource>) -> EnergyBalanceSimulator {
    EnergyBalanceSimulator::new(
        telemetry,
        Arc::new(CapacityFactorSeries::empty()),
        WindDownPolicy::default(),
        SimulatorOptions {
            poll_timeout: Duration::from_secs(2),
            history_len: 1440,
        },
    )
}

/// Run config in `namespace` starting 2000-12-31 with a 1000 kWh
/// reservoir and no wind.
pub fn namespace_config(
    namespace: &str,
    stored_kwh: f64,
    tick_interval: Duration,
) -> SimulationConfig {
    SimulationConfig::from_kwh(
        namespace,
        NaiveDate::from_ymd_opt(2000, 12, 31).expect("valid date"),
        stored_kwh,
        1000.0,
        0.0,
        tick_interval,
    )
    .expect("valid run config")
}

/// Run config in namespace `workload` starting 1986-01-01 with a
/// 1000 kWh reservoir and no wind.
pub fn run_config(stored_kwh: f64, tick_interval: Duration) -> SimulationConfig {
    SimulationConfig::from_kwh(
        "workload",
        NaiveDate::from_ymd_opt(1986, 1, 1).expect("valid date"),
        stored_kwh,
        1000.0,
        0.0,
        tick_interval,
    )
    .expect("valid run config")
}

/// Waits until the simulator has executed at least `ticks` ticks.
///
/// # Panics
///
/// Panics if that takes longer than two seconds.
pub async fn wait_for_ticks(sim: &EnergyBalanceSimulator, ticks: u64) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while sim.snapshot().ticks < ticks {
        assert!(Instant::now() < deadline, "timed out waiting for {ticks} ticks");
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}
