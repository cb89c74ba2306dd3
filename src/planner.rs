//! Planner façade owning the configuration, the calendar and both stores.

use chrono::NaiveDate;

use crate::config::PlannerConfig;
use crate::error::{PlannerError, Result};
use crate::models::{
    normalize_week_key, AvailabilityEntry, CapacityStore, Job, JobStatus, JobStore, WeekCalendar,
};
use crate::scheduler::{CapacityProjection, Projector, ReallocationSummary, Reallocator};
use crate::validation::{validate_input, ValidationResult};

/// Stateful planner.
///
/// Mutations only touch the stores; leveling happens on [`reallocate`]
/// or [`refresh`], so a batch of edits is leveled once.
///
/// [`reallocate`]: Planner::reallocate
/// [`refresh`]: Planner::refresh
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use prep_planner::models::{AvailabilityEntry, Job};
/// use prep_planner::{Planner, PlannerConfig};
///
/// let mut planner = Planner::new(PlannerConfig::default()).unwrap();
/// planner.set_availability("Alice", "2025-W10-1", AvailabilityEntry::new(600)).unwrap();
/// planner.upsert_job(
///     Job::new("C1", 900, NaiveDate::from_ymd_opt(2025, 3, 7).unwrap()).with_resource("Alice"),
/// );
///
/// let today = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
/// let (summary, projection) = planner.refresh(today).unwrap();
/// assert_eq!(summary.current_week_key, "2025-W10-1");
/// assert_eq!(planner.jobs().get("C1").unwrap().allocation_at("2025-W10-1"), 600);
/// assert_eq!(projection.week("Alice", "2025-W10-1").unwrap().margin, -5.0);
/// ```
#[derive(Debug, Clone)]
pub struct Planner {
    config: PlannerConfig,
    calendar: WeekCalendar,
    capacity: CapacityStore,
    jobs: JobStore,
}

impl Planner {
    /// Creates an empty planner.
    ///
    /// # Errors
    /// [`PlannerError::InvalidConfig`] if the configuration does not validate.
    pub fn new(config: PlannerConfig) -> Result<Self> {
        config.validate()?;
        let calendar = WeekCalendar::build(config.start_year, config.end_year);
        tracing::debug!(
            start_year = config.start_year,
            end_year = config.end_year,
            weeks = calendar.len(),
            "Built week calendar"
        );
        Ok(Self {
            config,
            calendar,
            capacity: CapacityStore::new(),
            jobs: JobStore::new(),
        })
    }

    /// Replaces both stores.
    pub fn with_stores(mut self, capacity: CapacityStore, jobs: JobStore) -> Self {
        self.capacity = capacity;
        self.jobs = jobs;
        self
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn calendar(&self) -> &WeekCalendar {
        &self.calendar
    }

    pub fn capacity(&self) -> &CapacityStore {
        &self.capacity
    }

    pub fn jobs(&self) -> &JobStore {
        &self.jobs
    }

    /// Inserts or replaces a job. Returns the previous version.
    pub fn upsert_job(&mut self, job: Job) -> Option<Job> {
        self.jobs.upsert(job)
    }

    pub fn remove_job(&mut self, id: &str) -> Option<Job> {
        self.jobs.remove(id)
    }

    /// Changes a job's status. Returns `false` for an unknown id.
    ///
    /// A job leaving the active set keeps its allocation until the next
    /// reallocation, which strips its future weeks.
    pub fn set_job_status(&mut self, id: &str, status: JobStatus) -> bool {
        match self.jobs.get_mut(id) {
            Some(job) => {
                job.status = status;
                true
            }
            None => false,
        }
    }

    /// Sets one week of a preparer's availability.
    ///
    /// # Errors
    /// [`PlannerError::UnknownWeek`] if the week is outside the calendar,
    /// [`PlannerError::MalformedRecord`] for negative minutes.
    pub fn set_availability(
        &mut self,
        resource: &str,
        week_key: &str,
        entry: AvailabilityEntry,
    ) -> Result<()> {
        let key = normalize_week_key(week_key)
            .filter(|k| self.calendar.index_of(k).is_some())
            .ok_or_else(|| PlannerError::UnknownWeek(week_key.to_string()))?;
        self.capacity.set_minutes(resource, &key, entry)
    }

    /// Checks the stores against the calendar.
    pub fn validate(&self) -> ValidationResult {
        validate_input(&self.jobs, &self.capacity, &self.calendar)
    }

    /// Current week index for `today` under the configured anchor policy.
    pub fn current_week_index(&self, today: NaiveDate) -> Result<usize> {
        self.calendar
            .anchor_index(today, self.config.shift_sunday_anchor)
    }

    /// Levels every preparer's workload from the current week onward.
    pub fn reallocate(&mut self, today: NaiveDate) -> Result<ReallocationSummary> {
        Reallocator::new(&self.calendar)
            .with_sunday_shift(self.config.shift_sunday_anchor)
            .reallocate(&mut self.jobs, &self.capacity, today)
    }

    /// Projects margins and tension from the current week onward.
    pub fn project(&self, today: NaiveDate) -> Result<CapacityProjection> {
        let current = self.current_week_index(today)?;
        Ok(Projector::new(&self.calendar)
            .with_window(self.config.tension_window_weeks)
            .project(&self.capacity, &self.jobs, current))
    }

    /// Validates, reallocates, then projects on the leveled data.
    ///
    /// Validation findings are logged and do not stop the pass.
    pub fn refresh(
        &mut self,
        today: NaiveDate,
    ) -> Result<(ReallocationSummary, CapacityProjection)> {
        if let Err(errors) = self.validate() {
            for error in &errors {
                tracing::warn!(kind = ?error.kind, "{}", error.message);
            }
        }
        let summary = self.reallocate(today)?;
        let projection = self.project(today)?;
        Ok((summary, projection))
    }
}
