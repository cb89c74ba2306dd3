//! Input validation for planning data.
//!
//! Checks the integrity of the job and capacity stores against the week
//! calendar before leveling. Detects:
//! - Duplicate job IDs
//! - Active jobs owned by an unknown preparer
//! - Allocation, lock or availability keys outside the calendar
//! - Deadlines outside the calendar
//! - Negative effort or allocated minutes
//!
//! None of these stop the leveling passes; they are reported so the caller
//! can log or reject the data.

use crate::models::{CapacityStore, JobStore, WeekCalendar};
use std::collections::HashSet;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two jobs share the same ID.
    DuplicateId,
    /// An active job is owned by a preparer with no capacity record.
    UnknownResource,
    /// A week key is not part of the calendar span.
    WeekOutsideCalendar,
    /// A job is due outside the calendar span.
    DeadlineOutsideCalendar,
    /// Negative effort or allocation.
    NegativeMinutes,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Validates the planning data.
///
/// Checks:
/// 1. No duplicate job IDs
/// 2. Every active job's owner has a capacity record
/// 3. Every allocation and lock key of a job lies in the calendar
/// 4. Every availability key lies in the calendar
/// 5. Every deadline lies in the calendar
/// 6. No negative effort or allocation on a job
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(
    jobs: &JobStore,
    capacity: &CapacityStore,
    calendar: &WeekCalendar,
) -> ValidationResult {
    let mut errors = Vec::new();

    let mut job_ids = HashSet::new();
    for job in jobs.iter() {
        if !job_ids.insert(job.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate job ID: {}", job.id),
            ));
        }

        if job.is_active() {
            if let Some(owner) = job.resource.as_deref() {
                if !capacity.contains(owner) {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::UnknownResource,
                        format!("Job '{}' references unknown preparer '{}'", job.id, owner),
                    ));
                }
            }
        }

        if job.required_minutes < 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::NegativeMinutes,
                format!("Job '{}' requires {} min", job.id, job.required_minutes),
            ));
        }
        for (key, &minutes) in &job.allocation {
            if minutes < 0 {
                errors.push(ValidationError::new(
                    ValidationErrorKind::NegativeMinutes,
                    format!("Job '{}' allocates {} min to '{}'", job.id, minutes, key),
                ));
            }
        }

        for key in job.allocation.keys().chain(job.forced_locks.keys()) {
            if calendar.index_of(key).is_none() {
                errors.push(ValidationError::new(
                    ValidationErrorKind::WeekOutsideCalendar,
                    format!("Job '{}' plans week '{}' outside the calendar", job.id, key),
                ));
            }
        }

        if calendar.index_containing(job.deadline).is_none() {
            errors.push(ValidationError::new(
                ValidationErrorKind::DeadlineOutsideCalendar,
                format!("Job '{}' is due {} outside the calendar", job.id, job.deadline),
            ));
        }
    }

    for resource in capacity.iter() {
        for key in resource.availability.keys() {
            if calendar.index_of(key).is_none() {
                errors.push(ValidationError::new(
                    ValidationErrorKind::WeekOutsideCalendar,
                    format!(
                        "Preparer '{}' has availability for week '{}' outside the calendar",
                        resource.name, key
                    ),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ForcedLock, Job, JobStatus, Resource};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn calendar() -> WeekCalendar {
        WeekCalendar::build(2024, 2028)
    }

    fn sample_capacity() -> CapacityStore {
        CapacityStore::new()
            .with_resource(Resource::new("Alice").with_minutes("2025-W10-1", 2400))
            .unwrap()
            .with_resource(Resource::new("Bob"))
            .unwrap()
    }

    fn sample_jobs() -> JobStore {
        JobStore::new()
            .with_job(
                Job::new("C1", 1200, date(2025, 3, 19))
                    .with_resource("Alice")
                    .with_allocation("2025-W10-1", 600),
            )
            .with_job(Job::new("C2", 300, date(2025, 4, 2)).with_resource("Bob"))
    }

    #[test]
    fn test_valid_input() {
        assert!(validate_input(&sample_jobs(), &sample_capacity(), &calendar()).is_ok());
    }

    #[test]
    fn test_duplicate_job_id() {
        let mut jobs = sample_jobs();
        jobs.as_mut_slice()[1].id = "C1".into();

        let errors = validate_input(&jobs, &sample_capacity(), &calendar()).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::DuplicateId && e.message.contains("C1")));
    }

    #[test]
    fn test_unknown_resource() {
        let jobs = JobStore::new()
            .with_job(Job::new("C1", 60, date(2025, 3, 19)).with_resource("Zoé"));

        let errors = validate_input(&jobs, &sample_capacity(), &calendar()).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::UnknownResource));
    }

    #[test]
    fn test_unknown_resource_ignored_for_closed_job() {
        let jobs = JobStore::new().with_job(
            Job::new("C1", 60, date(2025, 3, 19))
                .with_resource("Zoé")
                .with_status(JobStatus::Closed),
        );
        assert!(validate_input(&jobs, &sample_capacity(), &calendar()).is_ok());
    }

    #[test]
    fn test_week_outside_calendar() {
        let jobs = JobStore::new().with_job(
            Job::new("C1", 60, date(2025, 3, 19))
                .with_resource("Alice")
                .with_allocation("2023-W50-1", 60)
                .with_lock("2030-W02-1", ForcedLock::new(30)),
        );

        let errors = validate_input(&jobs, &sample_capacity(), &calendar()).unwrap_err();
        let outside = errors
            .iter()
            .filter(|e| e.kind == ValidationErrorKind::WeekOutsideCalendar)
            .count();
        assert_eq!(outside, 2);
    }

    #[test]
    fn test_availability_outside_calendar() {
        let capacity = CapacityStore::new()
            .with_resource(Resource::new("Alice").with_minutes("2029-W01-1", 2400))
            .unwrap();

        let errors = validate_input(&JobStore::new(), &capacity, &calendar()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationErrorKind::WeekOutsideCalendar);
    }

    #[test]
    fn test_deadline_outside_calendar() {
        let jobs = JobStore::new()
            .with_job(Job::new("C1", 60, date(2031, 1, 15)).with_resource("Alice"));

        let errors = validate_input(&jobs, &sample_capacity(), &calendar()).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::DeadlineOutsideCalendar));
    }

    #[test]
    fn test_negative_minutes() {
        let jobs = JobStore::new().with_job(
            Job::new("C1", -60, date(2025, 3, 19))
                .with_resource("Alice")
                .with_allocation("2025-W10-1", -30),
        );

        let errors = validate_input(&jobs, &sample_capacity(), &calendar()).unwrap_err();
        let negative = errors
            .iter()
            .filter(|e| e.kind == ValidationErrorKind::NegativeMinutes)
            .count();
        assert_eq!(negative, 2);
    }

    #[test]
    fn test_multiple_errors() {
        let jobs = JobStore::new().with_job(
            Job::new("C1", 60, date(2031, 1, 15))
                .with_resource("Zoé")
                .with_allocation("2023-W50-1", 60),
        );

        let errors = validate_input(&jobs, &sample_capacity(), &calendar()).unwrap_err();
        assert!(errors.len() >= 3);
    }
}
