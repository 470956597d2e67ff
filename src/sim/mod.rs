/// Per-workload cumulative counter baselines.
pub mod baseline;
/// Hour clock mapping ticks onto the generation series.
pub mod clock;
pub mod engine;
/// Wind-down decision policy.
pub mod policy;
pub mod power_balance;
pub mod reservoir;
pub mod simulator;
pub mod types;
