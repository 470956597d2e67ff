//! Error types for series loading, telemetry polling, and request validation.

use std::time::Duration;

use thiserror::Error;

/// Failure to load the capacity-factor series.
#[derive(Error, Debug)]
pub enum DataLoadError {
    /// The source could not be opened or read.
    #[error("cannot read power factors from \"{path}\": {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A line did not parse as a decimal value.
    #[error("malformed power factor on line {line}: \"{value}\"")]
    Malformed { line: usize, value: String },
}

/// Failure to obtain cumulative energy readings from the metrics backend.
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// Transport or HTTP status error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the expected shape.
    #[error("unexpected query response: {0}")]
    Decode(String),

    /// Backend answered with a non-success status.
    #[error("query failed ({error_type}): {error}")]
    Query { error_type: String, error: String },

    /// Poll did not finish within the configured bound.
    #[error("poll timed out after {0:?}")]
    Timeout(Duration),
}

/// Rejected control request. Raised before any simulator state is touched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A required field was absent.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// The start date did not parse as `YYYY-MM-DD`.
    #[error("invalid start date \"{0}\", expected YYYY-MM-DD")]
    InvalidDate(String),

    /// The start date lies outside the historical series.
    #[error("start date {date} outside {first}..={last}")]
    StartDateOutOfRange {
        date: String,
        first: String,
        last: String,
    },

    /// A numeric field was negative, non-finite, or otherwise unusable.
    #[error("invalid value for `{field}`: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

impl ValidationError {
    /// Create an invalid value error.
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            message: message.into(),
        }
    }
}
