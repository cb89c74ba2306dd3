//! Deadline-ordered greedy reallocation.
//!
//! # Algorithm
//!
//! 1. Resolve the current week from the anchor date (Sunday → Saturday).
//! 2. Strip every allocation entry at or after the current week from
//!    inactive jobs.
//! 3. Per preparer, stable-sort their active jobs by deadline, keep only
//!    past allocation, then fill weeks forward from the current one. Each
//!    job sees the capacity left by the jobs placed before it.
//!
//! Locked weeks (`Job::forced_locks`) are placed before the greedy fill and
//! reserve capacity for every job of the preparer.
//!
//! No feasibility check: effort that does not fit before the deadline
//! spills into later weeks, up to the end of the calendar.
//!
//! # Complexity
//! O(r · j · w) where r=preparers, j=active jobs per preparer,
//! w=weeks from the current one to the calendar end.
//!
//! # Reference
//! Jackson (1955), earliest due date sequencing.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDate;

use crate::error::Result;
use crate::models::{compare_week_keys, CapacityStore, Job, JobStore, Minutes, Week, WeekCalendar};

/// Outcome of one reallocation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReallocationSummary {
    /// Index of the current week in the calendar.
    pub current_week_index: usize,
    /// Key of the current week.
    pub current_week_key: String,
    /// Future entries removed from inactive jobs.
    pub deprogrammed_entries: usize,
    /// Active jobs whose future allocation was recomputed.
    pub jobs_planned: usize,
    /// Minutes placed at or after the current week.
    pub planned_minutes: Minutes,
}

/// Greedy earliest-deadline-first reallocator.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use prep_planner::models::{CapacityStore, Job, JobStore, Resource, WeekCalendar};
/// use prep_planner::scheduler::Reallocator;
///
/// let calendar = WeekCalendar::build(2024, 2028);
/// let mut capacity = CapacityStore::new();
/// capacity
///     .insert(Resource::new("A").with_minutes("2025-W10-1", 2400).with_minutes("2025-W11-1", 2400))
///     .unwrap();
/// let mut jobs = JobStore::new().with_job(
///     Job::new("C1", 3000, NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()).with_resource("A"),
/// );
///
/// let today = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
/// let summary = Reallocator::new(&calendar).reallocate(&mut jobs, &capacity, today).unwrap();
///
/// assert_eq!(summary.current_week_key, "2025-W10-1");
/// let job = jobs.get("C1").unwrap();
/// assert_eq!(job.allocation_at("2025-W10-1"), 2400);
/// assert_eq!(job.allocation_at("2025-W11-1"), 600);
/// ```
#[derive(Debug, Clone)]
pub struct Reallocator<'a> {
    calendar: &'a WeekCalendar,
    shift_sunday_anchor: bool,
}

impl<'a> Reallocator<'a> {
    /// Creates a reallocator over `calendar` (Sunday shift enabled).
    pub fn new(calendar: &'a WeekCalendar) -> Self {
        Self {
            calendar,
            shift_sunday_anchor: true,
        }
    }

    /// Enables or disables the Sunday → Saturday anchor shift.
    pub fn with_sunday_shift(mut self, enabled: bool) -> Self {
        self.shift_sunday_anchor = enabled;
        self
    }

    /// Rewrites the allocation of every job from the current week onward.
    ///
    /// Running it twice with the same inputs and the same `today` yields the
    /// same allocation maps.
    ///
    /// # Errors
    /// [`PlannerError::NoCurrentWeek`](crate::PlannerError::NoCurrentWeek) if
    /// `today` is outside the calendar; no job is touched in that case.
    pub fn reallocate(
        &self,
        jobs: &mut JobStore,
        capacity: &CapacityStore,
        today: NaiveDate,
    ) -> Result<ReallocationSummary> {
        let current = self
            .calendar
            .anchor_index(today, self.shift_sunday_anchor)?;
        let horizon = &self.calendar.weeks()[current..];
        let current_key = horizon[0].week_key.as_str();

        let deprogrammed_entries = deprogram(jobs.as_mut_slice(), current_key);

        let mut summary = ReallocationSummary {
            current_week_index: current,
            current_week_key: current_key.to_string(),
            deprogrammed_entries,
            jobs_planned: 0,
            planned_minutes: 0,
        };

        for resource in resource_names(jobs, capacity) {
            let available: Vec<Minutes> = horizon
                .iter()
                .map(|w| capacity.minutes_at(&resource, &w.week_key))
                .collect();
            let (planned_jobs, planned_minutes) =
                level_resource(jobs.as_mut_slice(), &resource, horizon, &available, current_key);

            tracing::debug!(
                resource = %resource,
                jobs = planned_jobs,
                minutes = planned_minutes,
                "Leveled preparer workload"
            );
            summary.jobs_planned += planned_jobs;
            summary.planned_minutes += planned_minutes;
        }

        tracing::info!(
            current_week = %summary.current_week_key,
            deprogrammed = summary.deprogrammed_entries,
            jobs = summary.jobs_planned,
            minutes = summary.planned_minutes,
            "Reallocation complete"
        );
        Ok(summary)
    }
}

/// Reallocates with a default [`Reallocator`].
pub fn reallocate(
    jobs: &mut JobStore,
    capacity: &CapacityStore,
    calendar: &WeekCalendar,
    today: NaiveDate,
) -> Result<ReallocationSummary> {
    Reallocator::new(calendar).reallocate(jobs, capacity, today)
}

#[inline]
fn is_current_or_later(week_key: &str, current_key: &str) -> bool {
    compare_week_keys(week_key, current_key) != Ordering::Less
}

/// Removes future entries from inactive jobs. Returns the number removed.
fn deprogram(jobs: &mut [Job], current_key: &str) -> usize {
    let mut removed = 0;
    for job in jobs.iter_mut().filter(|j| !j.is_active()) {
        let before = job.allocation.len();
        job.allocation
            .retain(|key, _| !is_current_or_later(key, current_key));
        removed += before - job.allocation.len();
    }
    removed
}

/// Preparers to process: everyone with availability plus every owner of an
/// active job.
fn resource_names(jobs: &JobStore, capacity: &CapacityStore) -> BTreeSet<String> {
    capacity
        .names()
        .map(str::to_string)
        .chain(
            jobs.iter()
                .filter(|j| j.is_active())
                .filter_map(|j| j.resource.clone()),
        )
        .collect()
}

/// Levels one preparer's active jobs over `horizon`.
///
/// Returns `(jobs processed, minutes placed)`.
fn level_resource(
    jobs: &mut [Job],
    resource: &str,
    horizon: &[Week],
    available: &[Minutes],
    current_key: &str,
) -> (usize, Minutes) {
    let mut order: Vec<usize> = jobs
        .iter()
        .enumerate()
        .filter(|(_, j)| j.is_active() && j.is_owned_by(resource))
        .map(|(i, _)| i)
        .collect();
    // Stable: equal deadlines keep store order.
    order.sort_by_key(|&i| jobs[i].deadline);

    let mut remaining: Vec<Minutes> = Vec::with_capacity(order.len());
    for &i in &order {
        let job = &mut jobs[i];
        job.allocation
            .retain(|key, _| !is_current_or_later(key, current_key));
        let past: Minutes = job.allocation.values().sum();
        remaining.push((job.required_minutes - past).max(0));
    }

    let mut consumed: Vec<Minutes> = vec![0; horizon.len()];
    let mut placed: Minutes = 0;

    // Locks reserve capacity before any greedy placement.
    let mut locked: Vec<HashSet<usize>> = Vec::with_capacity(order.len());
    for (slot, &i) in order.iter().enumerate() {
        let job = &mut jobs[i];
        let mut weeks = HashSet::new();
        let locks: Vec<(String, Minutes)> = job
            .forced_locks
            .iter()
            .filter(|(_, lock)| lock.minutes > 0 && lock.applies_to(resource))
            .map(|(key, lock)| (key.clone(), lock.minutes))
            .collect();
        for (key, minutes) in locks {
            let Some(offset) = horizon
                .iter()
                .position(|w| compare_week_keys(&w.week_key, &key) == Ordering::Equal)
            else {
                continue;
            };
            weeks.insert(offset);
            let pinned = minutes.min(remaining[slot]);
            if pinned > 0 {
                // Two keys may name the same week (legacy and canonical).
                *job.allocation
                    .entry(horizon[offset].week_key.clone())
                    .or_insert(0) += pinned;
                consumed[offset] += pinned;
                remaining[slot] -= pinned;
                placed += pinned;
            }
        }
        locked.push(weeks);
    }

    for (slot, &i) in order.iter().enumerate() {
        let job = &mut jobs[i];
        let mut left = remaining[slot];

        for (offset, week) in horizon.iter().enumerate() {
            if left == 0 {
                break;
            }
            if locked[slot].contains(&offset) {
                continue;
            }
            let free = (available[offset] - consumed[offset]).max(0);
            let to_plan = left.min(free);
            if to_plan > 0 {
                *job.allocation.entry(week.week_key.clone()).or_insert(0) += to_plan;
                consumed[offset] += to_plan;
                left -= to_plan;
                placed += to_plan;
            }
        }
    }

    (order.len(), placed)
}
