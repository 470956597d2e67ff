//! Per-tick energy balance arithmetic.

/// Energy generated during one tick.
///
/// # Arguments
///
/// * `capacity_factor` - Fraction of nameplate output realised this hour
/// * `hourly_capacity_j` - Nameplate energy per hour (J)
/// * `ticks_per_hour` - Ticks the hour is split into (must be > 0)
///
/// # Returns
///
/// Generated energy in joules for a single tick.
pub fn generated_energy_j(capacity_factor: f64, hourly_capacity_j: f64, ticks_per_hour: u64) -> f64 {
    capacity_factor * hourly_capacity_j / ticks_per_hour as f64
}

/// Net energy flowing into the reservoir (positive = charge).
pub fn net_energy_j(generated_j: f64, consumption_j: f64) -> f64 {
    generated_j - consumption_j
}
