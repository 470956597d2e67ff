//! Historical hourly wind capacity factors indexed by calendar date.
//!
//! The source is a newline-delimited list of decimals, one per hour from
//! 1986-01-01 00:00 through 2015-12-31 23:00. Any series whose length differs
//! from [`EXPECTED_SAMPLES`] is kept but treated as unusable: every lookup
//! then yields [`FALLBACK_CAPACITY_FACTOR`].

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::error::{DataLoadError, ValidationError};

/// Hours per calendar day.
pub const HOURS_PER_DAY: usize = 24;
/// Days covered by the historical range (1986 through 2015).
pub const SERIES_SPAN_DAYS: usize = 10_957;
/// Number of hourly samples a complete series must contain.
pub const EXPECTED_SAMPLES: usize = SERIES_SPAN_DAYS * HOURS_PER_DAY;
/// Capacity factor used whenever the series is missing or unusable.
pub const FALLBACK_CAPACITY_FACTOR: f64 = 0.5;

/// Date format accepted for run start dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// First day of the historical range.
pub fn epoch_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(1986, 1, 1).expect("1986-01-01 is a valid date")
}

/// Last day of the historical range (inclusive).
pub fn epoch_end() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 12, 31).expect("2015-12-31 is a valid date")
}

/// Immutable hourly capacity-factor series.
#[derive(Debug, Clone, Default)]
pub struct CapacityFactorSeries {
    values: Vec<f64>,
}

impl CapacityFactorSeries {
    /// Wraps already-parsed values.
    ///
    /// Logs a warning when the sample count does not match
    /// [`EXPECTED_SAMPLES`]; the values are kept either way.
    pub fn new(values: Vec<f64>) -> Self {
        let series = Self { values };
        series.warn_if_unusable();
        series
    }

    /// Series with no data. All lookups return the fallback value.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads the series from a newline-delimited file.
    ///
    /// # Errors
    ///
    /// Returns [`DataLoadError::Io`] if the file cannot be read and
    /// [`DataLoadError::Malformed`] on the first line that is not a decimal.
    pub fn load(path: &Path) -> Result<Self, DataLoadError> {
        let file = File::open(path).map_err(|source| DataLoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let series = Self::parse(BufReader::new(file), &path.display().to_string())?;
        info!(
            path = %path.display(),
            samples = series.len(),
            usable = series.is_usable(),
            "power factors loaded"
        );
        Ok(series)
    }

    /// Parses the series from any buffered reader.
    ///
    /// # Errors
    ///
    /// Same conditions as [`CapacityFactorSeries::load`].
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, DataLoadError> {
        Self::parse(reader, "<reader>")
    }

    fn parse<R: BufRead>(reader: R, origin: &str) -> Result<Self, DataLoadError> {
        let mut values = Vec::with_capacity(EXPECTED_SAMPLES);
        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| DataLoadError::Io {
                path: origin.to_string(),
                source,
            })?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let value = trimmed
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| DataLoadError::Malformed {
                    line: idx + 1,
                    value: trimmed.to_string(),
                })?;
            values.push(value);
        }
        Ok(Self::new(values))
    }

    fn warn_if_unusable(&self) {
        if !self.values.is_empty() && !self.is_usable() {
            warn!(
                samples = self.values.len(),
                expected = EXPECTED_SAMPLES,
                "power factor series has the wrong length; falling back to a flat profile"
            );
        }
    }

    /// Number of samples held.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series holds no samples.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether the series covers the full historical range.
    pub fn is_usable(&self) -> bool {
        self.values.len() == EXPECTED_SAMPLES
    }

    /// Capacity factor at an absolute hour index, wrapping at the series end.
    pub fn value_at(&self, hour_index: usize) -> f64 {
        if !self.is_usable() {
            return FALLBACK_CAPACITY_FACTOR;
        }
        self.values[hour_index % self.values.len()]
    }

    /// Returns the 24 hourly values of the day starting at `date`.
    pub fn window_starting_at(&self, date: NaiveDate) -> Vec<f64> {
        if !self.is_usable() {
            return vec![FALLBACK_CAPACITY_FACTOR; HOURS_PER_DAY];
        }
        let offset = Self::hour_offset(date);
        (0..HOURS_PER_DAY)
            .map(|hour| self.value_at(offset + hour))
            .collect()
    }

    /// Hour offset of midnight on `date` relative to the range start.
    ///
    /// Dates before the range start map to offset zero.
    pub fn hour_offset(date: NaiveDate) -> usize {
        let days = (date - epoch_start()).num_days().max(0);
        usize::try_from(days).unwrap_or(0) * HOURS_PER_DAY
    }

    /// Whether `date` lies within the historical range.
    pub fn is_within_range(date: NaiveDate) -> bool {
        (epoch_start()..=epoch_end()).contains(&date)
    }

    /// Parses a `YYYY-MM-DD` start date and checks it against the range.
    ///
    /// # Errors
    ///
    /// [`ValidationError::InvalidDate`] if the string does not parse,
    /// [`ValidationError::StartDateOutOfRange`] if it falls outside the range.
    pub fn parse_start_date(raw: &str) -> Result<NaiveDate, ValidationError> {
        let date = NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
            .map_err(|_| ValidationError::InvalidDate(raw.to_string()))?;
        if !Self::is_within_range(date) {
            return Err(ValidationError::StartDateOutOfRange {
                date: date.to_string(),
                first: epoch_start().to_string(),
                last: epoch_end().to_string(),
            });
        }
        Ok(date)
    }
}
