//! Domain error types.

use chrono::{DateTime, Utc};

/// Reasons a bar is refused by the indicator engine.
///
/// A rejected bar leaves every piece of rolling state untouched; the caller
/// may carry on with the next bar.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataError {
    #[error("bar at {timestamp} is earlier than last accepted bar at {last}")]
    OutOfOrder {
        timestamp: DateTime<Utc>,
        last: DateTime<Utc>,
    },

    #[error("bar at {timestamp} has non-finite {field}")]
    NonFinite {
        timestamp: DateTime<Utc>,
        field: &'static str,
    },

    #[error("bar at {timestamp} has non-positive {field}")]
    NonPositivePrice {
        timestamp: DateTime<Utc>,
        field: &'static str,
    },

    #[error("bar at {timestamp} has negative volume")]
    NegativeVolume { timestamp: DateTime<Utc> },

    #[error("bar at {timestamp} has high below low")]
    InvertedRange { timestamp: DateTime<Utc> },
}

/// Top-level error type for scalptrader.
#[derive(Debug, thiserror::Error)]
pub enum ScalperError {
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

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScalperError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        ScalperError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// True for the configuration class of errors (fatal at construction).
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            ScalperError::ConfigParse { .. }
                | ScalperError::ConfigMissing { .. }
                | ScalperError::ConfigInvalid { .. }
        )
    }
}

impl From<&ScalperError> for std::process::ExitCode {
    fn from(err: &ScalperError) -> Self {
        let code: u8 = match err {
            ScalperError::Io(_) => 1,
            ScalperError::ConfigParse { .. }
            | ScalperError::ConfigMissing { .. }
            | ScalperError::ConfigInvalid { .. } => 2,
            ScalperError::DataSource { .. } => 3,
            ScalperError::Data(_) => 5,
        };
        std::process::ExitCode::from(code)
    }
}
