//! Energy balance engine: one run's reservoir, hour clock, and baselines.

use std::sync::Arc;

use crate::profile::{CapacityFactorSeries, EXPECTED_SAMPLES};
use crate::telemetry::EnergyReadings;

use super::baseline::BaselineTracker;
use super::clock::HourClock;
use super::power_balance::{generated_energy_j, net_energy_j};
use super::reservoir::Reservoir;
use super::types::{SimulationConfig, TickRecord};

/// State of a single simulation run, advanced one tick at a time.
///
/// Holds no timers or I/O: the caller polls telemetry and passes the
/// readings in, which keeps every tick deterministic for a given input.
#[derive(Debug, Clone)]
pub struct EnergyBalance {
    config: SimulationConfig,
    series: Arc<CapacityFactorSeries>,
    reservoir: Reservoir,
    clock: HourClock,
    baselines: BaselineTracker,
    hourly_capacity_j: f64,
}

impl EnergyBalance {
    /// Creates the run state for `config`, positioned at its start date.
    ///
    /// # Arguments
    ///
    /// * `config` - Validated run configuration
    /// * `series` - Shared capacity-factor series
    pub fn new(config: SimulationConfig, series: Arc<CapacityFactorSeries>) -> Self {
        let wrap_len = if series.is_usable() {
            series.len()
        } else {
            EXPECTED_SAMPLES
        };
        let clock = HourClock::new(
            CapacityFactorSeries::hour_offset(config.start_date()),
            config.ticks_per_hour(),
            wrap_len,
        );
        let reservoir = Reservoir::new(
            config.storage_capacity_j(),
            config.initial_stored_energy_j(),
        );
        let hourly_capacity_j = config.wind_farm_hourly_capacity_j();

        Self {
            config,
            series,
            reservoir,
            clock,
            baselines: BaselineTracker::new(),
            hourly_capacity_j,
        }
    }

    /// Records the first poll of a run as baselines; no energy is consumed.
    pub fn seed(&mut self, readings: &EnergyReadings) {
        self.baselines.seed(readings);
    }

    /// Executes one tick and returns its record.
    ///
    /// # Arguments
    ///
    /// * `readings` - Cumulative counters from this tick's poll, or `None`
    ///   when the poll failed (consumption is then taken as zero)
    pub fn step(&mut self, readings: Option<&EnergyReadings>) -> TickRecord {
        let tick = self.clock.ticks();
        let ticks_per_hour = self.clock.ticks_per_hour();

        // 1. Consumption since the previous poll
        let consumption_j = readings.map_or(0.0, |r| self.baselines.consume(r));

        // 2. Generation for this slice of the current hour
        let hour_index = self.clock.tick();
        let capacity_factor = self.series.value_at(hour_index);
        let generated_j = generated_energy_j(capacity_factor, self.hourly_capacity_j, ticks_per_hour);

        // 3. Clamped reservoir update
        let net_j = net_energy_j(generated_j, consumption_j);
        self.reservoir.apply(net_j);

        TickRecord {
            tick,
            hour_index,
            capacity_factor,
            consumption_j,
            generated_j,
            net_j,
            stored_energy_j: self.reservoir.stored_j(),
            degraded: readings.is_none(),
        }
    }

    /// Run configuration.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Reservoir state.
    pub fn reservoir(&self) -> &Reservoir {
        &self.reservoir
    }

    /// Per-workload baselines.
    pub fn baselines(&self) -> &BaselineTracker {
        &self.baselines
    }

    /// Hour clock.
    pub fn clock(&self) -> &HourClock {
        &self.clock
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::NaiveDate;

    use super::*;
    use crate::sim::types::kwh_to_joules;

    fn config(stored_kwh: f64) -> SimulationConfig {
        SimulationConfig::from_kwh(
            "workload",
            NaiveDate::from_ymd_opt(1986, 1, 1).unwrap(),
            stored_kwh,
            1000.0,
            2400.0,
            Duration::from_secs(15),
        )
        .unwrap()
    }

    fn readings(pairs: &[(&str, f64)]) -> EnergyReadings {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn unusable_series_generates_at_fallback() {
        let mut engine = EnergyBalance::new(config(500.0), Arc::new(CapacityFactorSeries::empty()));
        let record = engine.step(Some(&EnergyReadings::new()));
        assert_eq!(record.capacity_factor, 0.5);
        // 0.5 * 100 kWh / 240 ticks
        assert!((record.generated_j - kwh_to_joules(0.5 * 100.0 / 240.0)).abs() < 1e-3);
    }

    #[test]
    fn consumption_drains_reservoir() {
        let mut engine = EnergyBalance::new(config(500.0), Arc::new(CapacityFactorSeries::empty()));
        engine.seed(&readings(&[("a", 0.0)]));
        let drain = kwh_to_joules(10.0);
        let record = engine.step(Some(&readings(&[("a", drain)])));
        assert_eq!(record.consumption_j, drain);
        assert!(record.stored_energy_j < kwh_to_joules(500.0));
    }

    #[test]
    fn failed_poll_is_degraded_zero_consumption() {
        let mut engine = EnergyBalance::new(config(500.0), Arc::new(CapacityFactorSeries::empty()));
        engine.seed(&readings(&[("a", 0.0)]));
        let record = engine.step(None);
        assert!(record.degraded);
        assert_eq!(record.consumption_j, 0.0);
        assert_eq!(engine.baselines().get("a"), Some(0.0));
    }

    #[test]
    fn stored_energy_never_exceeds_capacity() {
        let mut engine = EnergyBalance::new(config(999.9), Arc::new(CapacityFactorSeries::empty()));
        for _ in 0..500 {
            let r = engine.step(Some(&EnergyReadings::new()));
            assert!(r.stored_energy_j <= kwh_to_joules(1000.0));
        }
        assert_eq!(engine.reservoir().stored_j(), kwh_to_joules(1000.0));
    }

    #[test]
    fn stored_energy_never_below_zero() {
        let mut engine = EnergyBalance::new(config(1.0), Arc::new(CapacityFactorSeries::empty()));
        engine.seed(&readings(&[("a", 0.0)]));
        let mut counter = 0.0;
        for _ in 0..50 {
            counter += kwh_to_joules(5.0);
            let r = engine.step(Some(&readings(&[("a", counter)])));
            assert!(r.stored_energy_j >= 0.0);
        }
        assert_eq!(engine.reservoir().stored_j(), 0.0);
    }

    #[test]
    fn hour_advances_every_ticks_per_hour() {
        let mut engine = EnergyBalance::new(config(500.0), Arc::new(CapacityFactorSeries::empty()));
        let records: Vec<TickRecord> = (0..241).map(|_| engine.step(None)).collect();
        assert_eq!(records[0].hour_index, 0);
        assert_eq!(records[239].hour_index, 0);
        assert_eq!(records[240].hour_index, 1);
        assert_eq!(records[240].tick, 240);
    }
}
