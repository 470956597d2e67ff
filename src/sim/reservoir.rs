/// Bounded energy store fed by generation and drained by workloads.
///
/// Stored energy is kept within `[0, capacity_j]` by clamping every update;
/// an update is never rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct Reservoir {
    /// Energy currently held (J).
    stored_j: f64,
    /// Maximum energy the reservoir can hold (J).
    capacity_j: f64,
}

impl Reservoir {
    /// Creates a reservoir, clamping the initial charge into range.
    ///
    /// # Arguments
    ///
    /// * `capacity_j` - Capacity in joules (must be finite and > 0)
    /// * `stored_j` - Initial stored energy in joules
    ///
    /// # Panics
    ///
    /// Panics if `capacity_j` is not a positive finite number.
    pub fn new(capacity_j: f64, stored_j: f64) -> Self {
        assert!(capacity_j.is_finite() && capacity_j > 0.0);
        Self {
            stored_j: clamp_or_empty(stored_j, capacity_j),
            capacity_j,
        }
    }

    /// Applies a signed energy change and returns the change actually absorbed.
    ///
    /// Positive `net_j` charges, negative `net_j` drains. Surplus beyond
    /// capacity is spilled and deficit below zero is dropped.
    pub fn apply(&mut self, net_j: f64) -> f64 {
        let before = self.stored_j;
        self.stored_j = clamp_or_empty(before + net_j, self.capacity_j);
        self.stored_j - before
    }

    /// Stored energy (J).
    pub fn stored_j(&self) -> f64 {
        self.stored_j
    }

    /// Capacity (J).
    pub fn capacity_j(&self) -> f64 {
        self.capacity_j
    }

    /// Stored energy as a fraction of capacity.
    pub fn fill_fraction(&self) -> f64 {
        self.stored_j / self.capacity_j
    }
}

fn clamp_or_empty(value: f64, capacity_j: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, capacity_j)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_reservoir() {
        let r = Reservoir::new(100.0, 40.0);
        assert_eq!(r.capacity_j(), 100.0);
        assert_eq!(r.stored_j(), 40.0);
        assert_eq!(r.fill_fraction(), 0.4);
    }

    #[test]
    fn test_initial_charge_clamped() {
        assert_eq!(Reservoir::new(100.0, 250.0).stored_j(), 100.0);
        assert_eq!(Reservoir::new(100.0, -5.0).stored_j(), 0.0);
    }

    #[test]
    #[should_panic]
    fn test_invalid_capacity() {
        Reservoir::new(0.0, 0.0);
    }

    #[test]
    fn test_charge_spills_at_capacity() {
        let mut r = Reservoir::new(100.0, 90.0);
        let absorbed = r.apply(25.0);
        assert_eq!(absorbed, 10.0);
        assert_eq!(r.stored_j(), 100.0);
    }

    #[test]
    fn test_drain_stops_at_empty() {
        let mut r = Reservoir::new(100.0, 10.0);
        let absorbed = r.apply(-30.0);
        assert_eq!(absorbed, -10.0);
        assert_eq!(r.stored_j(), 0.0);
    }

    #[test]
    fn test_nan_update_empties() {
        let mut r = Reservoir::new(100.0, 10.0);
        r.apply(f64::NAN);
        assert_eq!(r.stored_j(), 0.0);
    }

    #[test]
    fn test_many_updates_stay_in_bounds() {
        let mut r = Reservoir::new(50.0, 25.0);
        for i in 0..200 {
            let net = if i % 3 == 0 { -17.5 } else { 11.25 };
            r.apply(net);
            assert!((0.0..=50.0).contains(&r.stored_j()));
        }
    }
}
