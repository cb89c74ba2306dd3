//! ISO week calendar.
//!
//! Generates the ordered sequence of ISO-8601 weeks over a fixed span of
//! years and provides the week-number arithmetic the rest of the crate
//! relies on.
//!
//! # Time Model
//! All dates are naive calendar dates interpreted as UTC. Callers holding a
//! wall-clock instant convert it with `DateTime<Utc>::date_naive()`; local
//! time never enters week boundary computations.
//!
//! # Week keys
//! Every availability and allocation map is indexed by the canonical key
//! `"<year>-W<2-digit week>-1"` (e.g. `2025-W03-1`). The legacy shape
//! `"<year>-W<week>"` is accepted by [`parse_week_key`] and normalized.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, Result};

/// ISO-8601 week number of a date (a week belongs to the year of its Thursday).
pub fn week_number(date: NaiveDate) -> u32 {
    date.iso_week().week()
}

/// Number of ISO weeks in a year (52 or 53).
///
/// Derived from the week number of December 31; when that day already
/// belongs to week 1 of the following year the year has 52 weeks.
pub fn weeks_in_year(year: i32) -> u32 {
    NaiveDate::from_ymd_opt(year, 12, 31).map_or(52, |dec31| match week_number(dec31) {
        1 => 52,
        n => n,
    })
}

/// The Monday that starts ISO week `week` of `year`.
///
/// Returns `None` for week numbers the year does not have.
pub fn monday_of_week(week: u32, year: i32) -> Option<NaiveDate> {
    NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)
}

/// Formats the canonical week key.
pub fn week_key(year: i32, week: u32) -> String {
    format!("{year}-W{week:02}-1")
}

/// Week key of the ISO week containing `date`.
pub fn week_key_of(date: NaiveDate) -> String {
    let iso = date.iso_week();
    week_key(iso.year(), iso.week())
}

/// Parses a week key into `(year, week)`.
///
/// Accepts the canonical `2025-W03-1` and the legacy `2025-W03` shapes.
/// Week 53 is only valid in years that have one.
pub fn parse_week_key(key: &str) -> Option<(i32, u32)> {
    let (year, rest) = key.split_once("-W")?;
    let week = rest.strip_suffix("-1").unwrap_or(rest);
    if year.len() != 4 || week.is_empty() || week.len() > 2 {
        return None;
    }
    if !year.bytes().all(|b| b.is_ascii_digit()) || !week.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = year.parse().ok()?;
    let week: u32 = week.parse().ok()?;
    (1..=weeks_in_year(year))
        .contains(&week)
        .then_some((year, week))
}

/// Rewrites a week key into its canonical shape.
pub fn normalize_week_key(key: &str) -> Option<String> {
    parse_week_key(key).map(|(year, week)| week_key(year, week))
}

/// Chronological ordering of two week keys.
///
/// Unparseable keys fall back to string ordering, which agrees with
/// chronological ordering for canonical keys.
pub fn compare_week_keys(a: &str, b: &str) -> Ordering {
    match (parse_week_key(a), parse_week_key(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

/// One ISO week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Week {
    /// Display identifier, `S<week>/<year>`.
    pub id: String,
    /// Canonical lookup key.
    pub week_key: String,
    /// ISO week-numbering year.
    pub year: i32,
    /// ISO week number (1..=53).
    pub number: u32,
    /// Monday.
    pub start: NaiveDate,
    /// Sunday.
    pub end: NaiveDate,
}

impl Week {
    /// Builds the week `number` of `year`.
    pub fn new(year: i32, number: u32) -> Option<Self> {
        let start = monday_of_week(number, year)?;
        Some(Self {
            id: format!("S{number}/{year}"),
            week_key: week_key(year, number),
            year,
            number,
            start,
            end: start + Duration::days(6),
        })
    }

    /// Whether `date` falls within `[start, end]`.
    #[inline]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Immutable, chronologically ordered sequence of weeks.
///
/// Passed explicitly to the reallocation and projection passes; there is no
/// ambient notion of "the current week" anywhere in the crate.
///
/// # Example
///
/// ```
/// use prep_planner::models::WeekCalendar;
///
/// let calendar = WeekCalendar::build(2024, 2028);
/// assert_eq!(calendar.len(), 261);
/// assert_eq!(calendar.weeks()[0].week_key, "2024-W01-1");
/// assert_eq!(calendar.index_of("2026-W53-1"), Some(156));
/// ```
#[derive(Debug, Clone)]
pub struct WeekCalendar {
    start_year: i32,
    end_year: i32,
    weeks: Vec<Week>,
    by_key: HashMap<String, usize>,
}

impl WeekCalendar {
    /// Generates every ISO week of every year in `start_year..=end_year`.
    pub fn build(start_year: i32, end_year: i32) -> Self {
        let weeks: Vec<Week> = (start_year..=end_year)
            .flat_map(|year| (1..=weeks_in_year(year)).filter_map(move |n| Week::new(year, n)))
            .collect();
        let by_key = weeks
            .iter()
            .enumerate()
            .map(|(i, w)| (w.week_key.clone(), i))
            .collect();

        Self {
            start_year,
            end_year,
            weeks,
            by_key,
        }
    }

    /// First year of the span.
    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    /// Last year of the span.
    pub fn end_year(&self) -> i32 {
        self.end_year
    }

    /// All weeks in chronological order.
    pub fn weeks(&self) -> &[Week] {
        &self.weeks
    }

    pub fn len(&self) -> usize {
        self.weeks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weeks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Week> {
        self.weeks.get(index)
    }

    /// Index of a week key (canonical or legacy shape).
    pub fn index_of(&self, key: &str) -> Option<usize> {
        if let Some(&i) = self.by_key.get(key) {
            return Some(i);
        }
        normalize_week_key(key).and_then(|k| self.by_key.get(&k).copied())
    }

    /// Index of the week whose `[start, end]` span contains `date`.
    pub fn index_containing(&self, date: NaiveDate) -> Option<usize> {
        let after = self.weeks.partition_point(|w| w.start <= date);
        let idx = after.checked_sub(1)?;
        self.weeks[idx].contains(date).then_some(idx)
    }

    /// Normalizes the planning anchor date.
    ///
    /// With `shift_sunday` set, a Sunday is moved back to the Saturday before.
    pub fn anchor_date(today: NaiveDate, shift_sunday: bool) -> NaiveDate {
        if shift_sunday && today.weekday() == Weekday::Sun {
            today - Duration::days(1)
        } else {
            today
        }
    }

    /// Resolves the current week index for `today`.
    ///
    /// # Errors
    /// [`PlannerError::NoCurrentWeek`] when the anchor lies outside the span.
    pub fn anchor_index(&self, today: NaiveDate, shift_sunday: bool) -> Result<usize> {
        let anchor = Self::anchor_date(today, shift_sunday);
        self.index_containing(anchor)
            .ok_or(PlannerError::NoCurrentWeek { date: anchor })
    }
}
