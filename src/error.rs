use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlannerError {
    /// The anchor date is outside the generated calendar span.
    #[error("No calendar week contains {date} (calendar span too short)")]
    NoCurrentWeek { date: NaiveDate },

    #[error("Malformed record '{key}': {reason}")]
    MalformedRecord { key: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown week: {0}")]
    UnknownWeek(String),
}

impl PlannerError {
    pub(crate) fn malformed(key: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::MalformedRecord {
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PlannerError>;
