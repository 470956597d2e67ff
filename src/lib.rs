//! Energy reservoir simulator that gates ML training workloads on wind power.
//!
//! A reservoir is charged from an hourly wind capacity-factor series and
//! drained by the measured energy use of workloads in a namespace. Workloads
//! report their progress and are told whether to proceed or wind down.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod io;
pub mod profile;
/// Reservoir, tick engine, simulator, and wind-down policy.
pub mod sim;
pub mod telemetry;
