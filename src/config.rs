//! Planner configuration.

use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, Result};
use crate::scheduler::DEFAULT_TENSION_WINDOW;

/// Planner settings.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```
/// use prep_planner::PlannerConfig;
///
/// let config = PlannerConfig::from_json(r#"{ "end_year": 2030 }"#).unwrap();
/// assert_eq!(config.start_year, 2024);
/// assert_eq!(config.end_year, 2030);
/// assert_eq!(config.tension_window_weeks, 16);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// First calendar year.
    pub start_year: i32,
    /// Last calendar year (inclusive).
    pub end_year: i32,
    /// Look-ahead window of the tension signal, in weeks.
    pub tension_window_weeks: usize,
    /// Move a Sunday anchor date back to the Saturday before.
    pub shift_sunday_anchor: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            start_year: 2024,
            end_year: 2028,
            tension_window_weeks: DEFAULT_TENSION_WINDOW,
            shift_sunday_anchor: true,
        }
    }
}

impl PlannerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the calendar span.
    pub fn with_years(mut self, start_year: i32, end_year: i32) -> Self {
        self.start_year = start_year;
        self.end_year = end_year;
        self
    }

    pub fn with_tension_window(mut self, weeks: usize) -> Self {
        self.tension_window_weeks = weeks;
        self
    }

    pub fn with_sunday_shift(mut self, enabled: bool) -> Self {
        self.shift_sunday_anchor = enabled;
        self
    }

    /// Parses and validates a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PlannerError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the span and window.
    pub fn validate(&self) -> Result<()> {
        // Keep well inside chrono's representable range.
        const YEARS: std::ops::RangeInclusive<i32> = 1..=9998;

        if !YEARS.contains(&self.start_year) || !YEARS.contains(&self.end_year) {
            return Err(PlannerError::InvalidConfig(format!(
                "calendar years must lie in {}..={}",
                YEARS.start(),
                YEARS.end()
            )));
        }
        if self.end_year < self.start_year {
            return Err(PlannerError::InvalidConfig(format!(
                "end_year {} precedes start_year {}",
                self.end_year, self.start_year
            )));
        }
        if self.tension_window_weeks == 0 {
            return Err(PlannerError::InvalidConfig(
                "tension_window_weeks must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PlannerConfig::default();
        assert_eq!(config.start_year, 2024);
        assert_eq!(config.end_year, 2028);
        assert_eq!(config.tension_window_weeks, 16);
        assert!(config.shift_sunday_anchor);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = PlannerConfig::new()
            .with_years(2025, 2026)
            .with_tension_window(8)
            .with_sunday_shift(false);
        assert_eq!(config.start_year, 2025);
        assert_eq!(config.end_year, 2026);
        assert_eq!(config.tension_window_weeks, 8);
        assert!(!config.shift_sunday_anchor);
    }

    #[test]
    fn test_reversed_span_rejected() {
        let err = PlannerConfig::new().with_years(2028, 2024).validate().unwrap_err();
        assert!(matches!(err, PlannerError::InvalidConfig(_)));
    }

    #[test]
    fn test_zero_window_rejected() {
        assert!(PlannerConfig::new().with_tension_window(0).validate().is_err());
    }

    #[test]
    fn test_from_json_errors() {
        assert!(PlannerConfig::from_json("{ not json").is_err());
        assert!(PlannerConfig::from_json(r#"{ "start_year": 2030, "end_year": 2029 }"#).is_err());
        let config = PlannerConfig::from_json(r#"{ "shift_sunday_anchor": false }"#).unwrap();
        assert!(!config.shift_sunday_anchor);
    }
}
