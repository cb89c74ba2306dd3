//! Forward-looking capacity projection.
//!
//! Derives, per preparer and per week from the current one to the end of
//! the calendar, the display values of the planning grid. Nothing here is
//! persisted and no job is mutated.
//!
//! # Metrics (hours)
//!
//! | Field | Definition |
//! |-------|-----------|
//! | `dispo` | Availability of the week |
//! | `chargeEcheance` | Required effort of active jobs due that week |
//! | `CA` | `dispo` + margin carried from the previous week |
//! | `M` | `CA − chargeEcheance` (carried forward) |
//! | `Tdisp` | Lowest `M` over the look-ahead window |
//! | `badge` | Half-unit rounded change of `Tdisp`, or null |
//!
//! On the current week only, active jobs already past their deadline that
//! still hold allocation from the current week on add to `chargeEcheance`.

use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

use crate::models::{compare_week_keys, week_key_of, CapacityStore, JobStore, Minutes, WeekCalendar};

/// Default look-ahead window of the tension signal (weeks).
pub const DEFAULT_TENSION_WINDOW: usize = 16;

/// Projection of one preparer for one week.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekProjection {
    #[serde(rename = "weekKey")]
    pub week_key: String,
    pub dispo: f64,
    #[serde(rename = "chargeEcheance")]
    pub charge_echeance: f64,
    #[serde(rename = "CA")]
    pub ca: f64,
    #[serde(rename = "M")]
    pub margin: f64,
    #[serde(rename = "Tdisp")]
    pub tdisp: f64,
    pub badge: Option<f64>,
}

/// Projection of one preparer over the visible weeks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceProjection {
    pub resource: String,
    pub weeks: Vec<WeekProjection>,
}

impl ResourceProjection {
    /// Projection of one week, by key.
    pub fn week(&self, week_key: &str) -> Option<&WeekProjection> {
        self.weeks.iter().find(|w| w.week_key == week_key)
    }

    /// Lowest tension over the visible weeks.
    pub fn lowest_tension(&self) -> Option<f64> {
        self.weeks.iter().map(|w| w.tdisp).reduce(f64::min)
    }

    /// First week whose carried margin goes negative.
    pub fn first_deficit_week(&self) -> Option<&str> {
        self.weeks
            .iter()
            .find(|w| w.margin < 0.0)
            .map(|w| w.week_key.as_str())
    }
}

/// Projection of every preparer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityProjection {
    pub current_week_index: usize,
    pub resources: Vec<ResourceProjection>,
}

impl CapacityProjection {
    pub fn get(&self, resource: &str) -> Option<&ResourceProjection> {
        self.resources.iter().find(|r| r.resource == resource)
    }

    /// Projection of one preparer for one week.
    pub fn week(&self, resource: &str, week_key: &str) -> Option<&WeekProjection> {
        self.get(resource).and_then(|r| r.week(week_key))
    }
}

/// Computes margins, tension and badges.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use prep_planner::models::{CapacityStore, Job, JobStore, Resource, WeekCalendar};
/// use prep_planner::scheduler::Projector;
///
/// let calendar = WeekCalendar::build(2024, 2028);
/// let mut capacity = CapacityStore::new();
/// capacity.insert(Resource::new("A").with_minutes("2025-W10-1", 600)).unwrap();
/// let jobs = JobStore::new().with_job(
///     Job::new("C1", 900, NaiveDate::from_ymd_opt(2025, 3, 5).unwrap()).with_resource("A"),
/// );
///
/// let current = calendar.index_of("2025-W10-1").unwrap();
/// let projection = Projector::new(&calendar).project(&capacity, &jobs, current);
/// let week = projection.week("A", "2025-W10-1").unwrap();
/// assert_eq!(week.dispo, 10.0);
/// assert_eq!(week.charge_echeance, 15.0);
/// assert_eq!(week.margin, -5.0);
/// ```
#[derive(Debug, Clone)]
pub struct Projector<'a> {
    calendar: &'a WeekCalendar,
    window_weeks: usize,
}

impl<'a> Projector<'a> {
    pub fn new(calendar: &'a WeekCalendar) -> Self {
        Self {
            calendar,
            window_weeks: DEFAULT_TENSION_WINDOW,
        }
    }

    /// Sets the tension look-ahead window (at least one week).
    pub fn with_window(mut self, weeks: usize) -> Self {
        self.window_weeks = weeks.max(1);
        self
    }

    /// Projects every preparer from `current_week_index` to the calendar end.
    pub fn project(
        &self,
        capacity: &CapacityStore,
        jobs: &JobStore,
        current_week_index: usize,
    ) -> CapacityProjection {
        let names: BTreeSet<&str> = capacity
            .names()
            .chain(
                jobs.iter()
                    .filter(|j| j.is_active())
                    .filter_map(|j| j.resource.as_deref()),
            )
            .collect();

        let resources = names
            .into_iter()
            .map(|name| self.project_resource(name, capacity, jobs, current_week_index))
            .collect();

        CapacityProjection {
            current_week_index,
            resources,
        }
    }

    fn project_resource(
        &self,
        resource: &str,
        capacity: &CapacityStore,
        jobs: &JobStore,
        current: usize,
    ) -> ResourceProjection {
        let horizon = self.calendar.weeks().get(current..).unwrap_or(&[]);

        // Required hours by deadline week.
        let mut due: HashMap<String, f64> = HashMap::new();
        for job in jobs.active_for(resource) {
            *due.entry(week_key_of(job.deadline)).or_insert(0.0) += hours(job.required_minutes);
        }

        let catch_up: f64 = match horizon.first() {
            Some(first) => jobs
                .active_for(resource)
                .filter(|j| j.deadline < first.start)
                .filter(|j| {
                    j.allocation.iter().any(|(key, &m)| {
                        m > 0 && compare_week_keys(key, &first.week_key).is_ge()
                    })
                })
                .map(|j| hours(j.required_minutes))
                .sum(),
            None => 0.0,
        };

        // Pass 1: carried margin.
        let mut carry = 0.0;
        let mut weeks: Vec<WeekProjection> = Vec::with_capacity(horizon.len());
        for (offset, week) in horizon.iter().enumerate() {
            let dispo = hours(capacity.minutes_at(resource, &week.week_key));
            let mut charge = due.get(&week.week_key).copied().unwrap_or(0.0);
            if offset == 0 {
                charge += catch_up;
            }
            let ca = dispo + carry;
            let margin = ca - charge;
            carry = margin;

            weeks.push(WeekProjection {
                week_key: week.week_key.clone(),
                dispo,
                charge_echeance: charge,
                ca,
                margin,
                tdisp: margin,
                badge: None,
            });
        }

        // Pass 2: worst margin over the window.
        let margins: Vec<f64> = weeks.iter().map(|w| w.margin).collect();
        for (k, week) in weeks.iter_mut().enumerate() {
            let end = k.saturating_add(self.window_weeks).min(margins.len());
            week.tdisp = margins[k..end].iter().copied().fold(f64::INFINITY, f64::min);
        }

        // Pass 3: badges.
        let mut last_tdisp: Option<f64> = None;
        for week in &mut weeks {
            week.badge = badge(week.dispo, week.tdisp, last_tdisp);
            last_tdisp = Some(week.tdisp);
        }

        ResourceProjection {
            resource: resource.to_string(),
            weeks,
        }
    }
}

/// Projects with the default window.
pub fn project(
    capacity: &CapacityStore,
    jobs: &JobStore,
    calendar: &WeekCalendar,
    current_week_index: usize,
) -> CapacityProjection {
    Projector::new(calendar).project(capacity, jobs, current_week_index)
}

#[inline]
fn hours(minutes: Minutes) -> f64 {
    minutes as f64 / 60.0
}

/// Rounds to the nearest half unit, halves rounding up.
#[inline]
fn round_half(x: f64) -> f64 {
    (x * 2.0 + 0.5).floor() / 2.0
}

fn badge(dispo: f64, tdisp: f64, last_tdisp: Option<f64>) -> Option<f64> {
    if dispo == 0.0 {
        return None;
    }
    match last_tdisp {
        None => Some(round_half(tdisp)),
        Some(last) if tdisp == last => None,
        Some(last) => {
            let diff = if last > 0.0 { tdisp - last } else { tdisp };
            Some(round_half(diff))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Job, JobStatus, Resource};
    use chrono::NaiveDate;

    const EPS: f64 = 1e-9;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn calendar() -> WeekCalendar {
        WeekCalendar::build(2024, 2028)
    }

    fn current(cal: &WeekCalendar) -> usize {
        cal.index_of("2025-W10-1").unwrap()
    }

    fn week_key(n: u32) -> String {
        format!("2025-W{n:02}-1")
    }

    fn capacity(name: &str, weeks: &[(u32, Minutes)]) -> CapacityStore {
        let mut resource = Resource::new(name);
        for &(n, minutes) in weeks {
            resource = resource.with_minutes(week_key(n), minutes);
        }
        CapacityStore::new().with_resource(resource).unwrap()
    }

    fn tdisps(p: &ResourceProjection, n: usize) -> Vec<f64> {
        p.weeks.iter().take(n).map(|w| w.tdisp).collect()
    }

    fn badges(p: &ResourceProjection, n: usize) -> Vec<Option<f64>> {
        p.weeks.iter().take(n).map(|w| w.badge).collect()
    }

    #[test]
    fn test_round_half_up() {
        assert!((round_half(7.3) - 7.5).abs() < EPS);
        assert!((round_half(7.2) - 7.0).abs() < EPS);
        assert!((round_half(2.25) - 2.5).abs() < EPS);
        assert!((round_half(-2.25) - -2.0).abs() < EPS);
        assert!((round_half(-20.0) - -20.0).abs() < EPS);
    }

    #[test]
    fn test_margin_carries_forward() {
        let cal = calendar();
        let cap = capacity("A", &[(10, 2400), (11, 2400), (12, 2400)]);
        let jobs =
            JobStore::new().with_job(Job::new("C1", 5000, date(2025, 3, 19)).with_resource("A"));

        let projection = project(&cap, &jobs, &cal, current(&cal));
        let a = projection.get("A").unwrap();

        assert_eq!(a.weeks.len(), cal.len() - current(&cal));
        let w10 = a.week("2025-W10-1").unwrap();
        assert!((w10.dispo - 40.0).abs() < EPS);
        assert!((w10.ca - 40.0).abs() < EPS);
        assert!((w10.margin - 40.0).abs() < EPS);

        let w12 = a.week("2025-W12-1").unwrap();
        assert!((w12.charge_echeance - 5000.0 / 60.0).abs() < EPS);
        assert!((w12.ca - 120.0).abs() < EPS);
        assert!((w12.margin - (120.0 - 5000.0 / 60.0)).abs() < EPS);

        let w13 = a.week("2025-W13-1").unwrap();
        assert!((w13.ca - w12.margin).abs() < EPS);
    }

    #[test]
    fn test_charge_independent_of_split() {
        let cal = calendar();
        let cap = capacity("A", &[(10, 2400), (11, 2400), (12, 2400)]);
        let unplanned =
            JobStore::new().with_job(Job::new("C1", 5000, date(2025, 3, 19)).with_resource("A"));
        let planned = JobStore::new().with_job(
            Job::new("C1", 5000, date(2025, 3, 19))
                .with_resource("A")
                .with_allocation(week_key(10), 2400)
                .with_allocation(week_key(11), 2400)
                .with_allocation(week_key(12), 200),
        );

        let a = project(&cap, &unplanned, &cal, current(&cal));
        let b = project(&cap, &planned, &cal, current(&cal));
        assert_eq!(a, b);
    }

    #[test]
    fn test_inactive_jobs_not_charged() {
        let cal = calendar();
        let cap = capacity("A", &[(10, 600)]);
        let jobs = JobStore::new().with_job(
            Job::new("C1", 600, date(2025, 3, 5))
                .with_resource("A")
                .with_status(JobStatus::Prepared),
        );

        let projection = project(&cap, &jobs, &cal, current(&cal));
        let w10 = projection.week("A", &week_key(10)).unwrap();
        assert_eq!(w10.charge_echeance, 0.0);
    }

    #[test]
    fn test_overdue_catch_up_on_current_week() {
        let cal = calendar();
        let cap = capacity("A", &[(10, 600), (11, 600)]);
        let jobs = JobStore::new()
            .with_job(
                Job::new("late-still-planned", 300, date(2025, 2, 20))
                    .with_resource("A")
                    .with_allocation(week_key(11), 300),
            )
            .with_job(
                Job::new("late-unplanned", 600, date(2025, 2, 20))
                    .with_resource("A")
                    .with_allocation(week_key(7), 600),
            )
            .with_job(
                Job::new("late-closed", 900, date(2025, 2, 20))
                    .with_resource("A")
                    .with_status(JobStatus::Closed)
                    .with_allocation(week_key(11), 900),
            );

        let projection = project(&cap, &jobs, &cal, current(&cal));
        let a = projection.get("A").unwrap();
        assert!((a.week(&week_key(10)).unwrap().charge_echeance - 5.0).abs() < EPS);
        assert_eq!(a.week(&week_key(11)).unwrap().charge_echeance, 0.0);
    }

    #[test]
    fn test_tension_looks_ahead() {
        let cal = calendar();
        let weeks: Vec<(u32, Minutes)> = (10..=40).map(|n| (n, 600)).collect();
        let cap = capacity("A", &weeks);
        // 200 h due in W20.
        let jobs =
            JobStore::new().with_job(Job::new("C1", 12_000, date(2025, 5, 14)).with_resource("A"));

        let projection = project(&cap, &jobs, &cal, current(&cal));
        let a = projection.get("A").unwrap();

        assert!((a.week(&week_key(10)).unwrap().margin - 10.0).abs() < EPS);
        assert!((a.week(&week_key(20)).unwrap().margin - -90.0).abs() < EPS);
        assert!((a.week(&week_key(10)).unwrap().tdisp - -90.0).abs() < EPS);
        assert!((a.week(&week_key(20)).unwrap().tdisp - -90.0).abs() < EPS);
        assert!((a.week(&week_key(21)).unwrap().tdisp - -80.0).abs() < EPS);
        assert_eq!(a.first_deficit_week(), Some("2025-W20-1"));
        assert!((a.lowest_tension().unwrap() - -90.0).abs() < EPS);
    }

    #[test]
    fn test_tension_window_configurable() {
        let cal = calendar();
        let weeks: Vec<(u32, Minutes)> = (10..=40).map(|n| (n, 600)).collect();
        let cap = capacity("A", &weeks);
        let jobs =
            JobStore::new().with_job(Job::new("C1", 12_000, date(2025, 5, 14)).with_resource("A"));

        let projection = Projector::new(&cal)
            .with_window(4)
            .project(&cap, &jobs, current(&cal));
        let a = projection.get("A").unwrap();
        assert_eq!(tdisps(a, 3), vec![10.0, 20.0, 30.0]);
        assert!((a.week(&week_key(17)).unwrap().tdisp - -90.0).abs() < EPS);
    }

    #[test]
    fn test_tension_never_above_margin() {
        let cal = calendar();
        let weeks: Vec<(u32, Minutes)> = (10..=30).map(|n| (n, (n as Minutes % 4) * 300)).collect();
        let cap = capacity("A", &weeks);
        let jobs = JobStore::new()
            .with_job(Job::new("C1", 4000, date(2025, 3, 26)).with_resource("A"))
            .with_job(Job::new("C2", 2500, date(2025, 4, 23)).with_resource("A"))
            .with_job(Job::new("C3", 9000, date(2025, 6, 11)).with_resource("A"));

        let projection = project(&cap, &jobs, &cal, current(&cal));
        for week in &projection.get("A").unwrap().weeks {
            assert!(week.tdisp <= week.margin);
        }
    }

    #[test]
    fn test_first_badge_is_rounded_tension() {
        let cal = calendar();
        let cap = capacity("A", &[(10, 438)]); // 7.3 h

        let projection = project(&cap, &JobStore::new(), &cal, current(&cal));
        let a = projection.get("A").unwrap();
        assert_eq!(badges(a, 2), vec![Some(7.5), None]);
    }

    #[test]
    fn test_zero_availability_updates_baseline() {
        let cal = calendar();
        let cap = capacity("A", &[(11, 600), (12, 600)]);

        let projection = project(&cap, &JobStore::new(), &cal, current(&cal));
        let a = projection.get("A").unwrap();
        assert_eq!(tdisps(a, 4), vec![0.0, 10.0, 20.0, 20.0]);
        // W10 has no capacity: no badge, but W11 compares against its 0.0.
        assert_eq!(badges(a, 4), vec![None, Some(10.0), Some(10.0), None]);
    }

    #[test]
    fn test_unchanged_tension_has_no_badge() {
        let cal = calendar();
        let cap = capacity("A", &[(10, 600), (11, 600)]);
        let jobs =
            JobStore::new().with_job(Job::new("C1", 600, date(2025, 3, 12)).with_resource("A"));

        let projection = project(&cap, &jobs, &cal, current(&cal));
        let a = projection.get("A").unwrap();
        assert_eq!(tdisps(a, 2), vec![10.0, 10.0]);
        assert_eq!(badges(a, 2), vec![Some(10.0), None]);
    }

    #[test]
    fn test_negative_baseline_reports_raw_tension() {
        let cal = calendar();
        let cap = capacity("A", &[(10, 600), (11, 600), (12, 600)]);
        let jobs =
            JobStore::new().with_job(Job::new("C1", 1800, date(2025, 3, 5)).with_resource("A"));

        let projection = project(&cap, &jobs, &cal, current(&cal));
        let a = projection.get("A").unwrap();
        assert_eq!(tdisps(a, 3), vec![-20.0, -10.0, 0.0]);
        assert_eq!(badges(a, 3), vec![Some(-20.0), Some(-10.0), Some(0.0)]);
    }

    #[test]
    fn test_job_owner_without_availability_projected() {
        let cal = calendar();
        let jobs =
            JobStore::new().with_job(Job::new("C1", 600, date(2025, 3, 12)).with_resource("B"));

        let projection = project(&CapacityStore::new(), &jobs, &cal, current(&cal));
        let b = projection.get("B").unwrap();
        assert_eq!(b.week(&week_key(10)).unwrap().margin, 0.0);
        assert!((b.week(&week_key(11)).unwrap().margin - -10.0).abs() < EPS);
        assert!(b.weeks.iter().all(|w| w.badge.is_none()));
    }

    #[test]
    fn test_unbounded_window_spans_to_calendar_end() {
        let cal = calendar();
        let cap = capacity("A", &[(10, 600)]);
        let jobs =
            JobStore::new().with_job(Job::new("C1", 1200, date(2025, 3, 19)).with_resource("A"));

        let projection = Projector::new(&cal)
            .with_window(usize::MAX)
            .project(&cap, &jobs, current(&cal));
        let a = projection.get("A").unwrap();
        assert_eq!(a.weeks.len(), cal.len() - current(&cal));
        assert!(a.weeks.iter().all(|w| (w.tdisp - -10.0).abs() < EPS));
    }

    #[test]
    fn test_index_past_calendar_end() {
        let cal = calendar();
        let cap = capacity("A", &[(10, 600)]);
        let projection = project(&cap, &JobStore::new(), &cal, cal.len() + 3);
        assert!(projection.get("A").unwrap().weeks.is_empty());
    }

    #[test]
    fn test_serialized_field_names() {
        let cal = calendar();
        let cap = capacity("A", &[(10, 600)]);
        let projection = project(&cap, &JobStore::new(), &cal, current(&cal));
        let value = serde_json::to_value(projection.week("A", &week_key(10)).unwrap()).unwrap();
        for field in ["weekKey", "dispo", "chargeEcheance", "CA", "M", "Tdisp", "badge"] {
            assert!(value.get(field).is_some(), "missing {field}");
        }
    }
}
