/// Maps simulation ticks onto hours of the capacity-factor series.
///
/// Every `ticks_per_hour` ticks the hour index advances by one, wrapping
/// back to zero at `wrap_len`.
///
/// # Examples
///
/// ```
/// use winddown_sim::sim::clock::HourClock;
///
/// let mut clock = HourClock::new(10, 2, 12);
/// let hours: Vec<usize> = (0..6).map(|_| clock.tick()).collect();
/// assert_eq!(hours, vec![10, 10, 11, 11, 0, 0]);
/// ```
#[derive(Debug, Clone)]
pub struct HourClock {
    /// Hour index used by the next tick
    hour_index: usize,
    /// Ticks already spent in the current hour
    ticks_into_hour: u64,
    ticks_per_hour: u64,
    wrap_len: usize,
    /// Ticks executed so far
    ticks: u64,
}

impl HourClock {
    /// Creates a clock positioned at `start_hour`.
    ///
    /// # Arguments
    ///
    /// * `start_hour` - Absolute hour index of the first tick
    /// * `ticks_per_hour` - Ticks per simulated hour (must be > 0)
    /// * `wrap_len` - Series length at which the hour index wraps (must be > 0)
    ///
    /// # Panics
    ///
    /// Panics if `ticks_per_hour` or `wrap_len` is zero.
    pub fn new(start_hour: usize, ticks_per_hour: u64, wrap_len: usize) -> Self {
        assert!(ticks_per_hour > 0, "ticks_per_hour must be > 0");
        assert!(wrap_len > 0, "wrap_len must be > 0");
        Self {
            hour_index: start_hour % wrap_len,
            ticks_into_hour: 0,
            ticks_per_hour,
            wrap_len,
            ticks: 0,
        }
    }

    /// Advances by one tick.
    ///
    /// # Returns
    ///
    /// The hour index that applies to the tick just taken.
    pub fn tick(&mut self) -> usize {
        let hour = self.hour_index;
        self.ticks += 1;
        self.ticks_into_hour += 1;
        if self.ticks_into_hour == self.ticks_per_hour {
            self.ticks_into_hour = 0;
            self.hour_index = (self.hour_index + 1) % self.wrap_len;
        }
        hour
    }

    /// Hour index the next tick will use.
    pub fn hour_index(&self) -> usize {
        self.hour_index
    }

    /// Ticks executed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Ticks per simulated hour.
    pub fn ticks_per_hour(&self) -> u64 {
        self.ticks_per_hour
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clock() {
        let clock = HourClock::new(5, 4, 100);
        assert_eq!(clock.hour_index(), 5);
        assert_eq!(clock.ticks(), 0);
    }

    #[test]
    fn test_hour_advances_after_full_hour() {
        let mut clock = HourClock::new(0, 3, 100);
        assert_eq!(clock.tick(), 0);
        assert_eq!(clock.tick(), 0);
        assert_eq!(clock.tick(), 0);
        assert_eq!(clock.tick(), 1);
        assert_eq!(clock.ticks(), 4);
    }

    #[test]
    fn test_wraps_at_series_end() {
        let mut clock = HourClock::new(99, 1, 100);
        assert_eq!(clock.tick(), 99);
        assert_eq!(clock.tick(), 0);
    }

    #[test]
    fn test_start_beyond_wrap_is_reduced() {
        let clock = HourClock::new(250, 1, 100);
        assert_eq!(clock.hour_index(), 50);
    }

    #[test]
    #[should_panic]
    fn test_zero_ticks_per_hour_panics() {
        HourClock::new(0, 0, 10);
    }
}
