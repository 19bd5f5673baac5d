//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for slopetrader.
#[derive(Debug, thiserror::Error)]
pub enum SlopetraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {code} in the requested range")]
    NoData { code: String },

    #[error("empty price series")]
    EmptySeries,

    #[error("dates not strictly increasing at bar {index}: {date} follows {previous}")]
    NonMonotonicDates {
        index: usize,
        previous: NaiveDate,
        date: NaiveDate,
    },

    #[error("non-positive {field} price {value} on {date}")]
    NonPositivePrice {
        date: NaiveDate,
        field: &'static str,
        value: f64,
    },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SlopetraderError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        SlopetraderError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors that reject a single price series rather than the run.
    pub fn is_input_violation(&self) -> bool {
        matches!(
            self,
            SlopetraderError::EmptySeries
                | SlopetraderError::NonMonotonicDates { .. }
                | SlopetraderError::NonPositivePrice { .. }
        )
    }
}

impl From<&SlopetraderError> for std::process::ExitCode {
    fn from(err: &SlopetraderError) -> Self {
        let code: u8 = match err {
            SlopetraderError::Io(_) | SlopetraderError::Report { .. } => 1,
            SlopetraderError::ConfigParse { .. }
            | SlopetraderError::ConfigMissing { .. }
            | SlopetraderError::ConfigInvalid { .. } => 2,
            SlopetraderError::Data { .. } => 3,
            SlopetraderError::NoData { .. }
            | SlopetraderError::EmptySeries
            | SlopetraderError::NonMonotonicDates { .. }
            | SlopetraderError::NonPositivePrice { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
