//! Boundary with the planning board's record formats.
//!
//! The board exchanges two JSON documents:
//!
//! - availability: `{ "<preparer>": { "<weekKey>": {"minutes": 2400, "updatedAt": …} } }`,
//!   where a week may also hold a bare integer (legacy records);
//! - jobs: `{ "<id>": { "status", "prepTime", "endDate": "dd/mm/yyyy",
//!   "preparateur", "planification", "forcedPlanningLock" } }`.
//!
//! Both are normalized here into the store types. Anything that is not a
//! non-negative integer number of minutes, a `dd/mm/yyyy` date, a known
//! status or a week key fails with [`PlannerError::MalformedRecord`]
//! naming the record; nothing is silently coerced to zero.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::{PlannerError, Result};
use crate::models::{
    normalize_week_key, AvailabilityEntry, CapacityStore, ForcedLock, Job, JobStatus, JobStore,
    Minutes,
};

/// Date format of `endDate`.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAvailability {
    Minutes(Minutes),
    Entry {
        minutes: Minutes,
        #[serde(default, rename = "updatedAt")]
        updated_at: Option<Value>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLock {
    Minutes(Minutes),
    Entry {
        #[serde(default, alias = "preparateur")]
        resource: Option<String>,
        minutes: Minutes,
    },
}

#[derive(Deserialize)]
struct RawJob {
    #[serde(default)]
    label: Option<String>,
    status: String,
    #[serde(rename = "prepTime", alias = "requiredMinutes")]
    required_minutes: Minutes,
    #[serde(rename = "endDate", alias = "deadline")]
    deadline: String,
    #[serde(default, rename = "preparateur", alias = "resource")]
    resource: Option<String>,
    #[serde(default, rename = "planification", alias = "allocation")]
    allocation: Option<BTreeMap<String, Minutes>>,
    #[serde(default, rename = "forcedPlanningLock")]
    forced_locks: Option<BTreeMap<String, RawLock>>,
}

/// Parses an availability document into a capacity store.
///
/// A `{ "data": { … } }` envelope is unwrapped.
///
/// # Example
///
/// ```
/// use prep_planner::records::parse_availability;
/// use serde_json::json;
///
/// let store = parse_availability(&json!({
///     "Alice": { "2025-W10-1": { "minutes": 2400, "updatedAt": "2025-03-01" }, "2025-W11-1": 1200 }
/// })).unwrap();
/// assert_eq!(store.minutes_at("Alice", "2025-W11-1"), 1200);
/// ```
pub fn parse_availability(document: &Value) -> Result<CapacityStore> {
    let root = match document.get("data") {
        Some(inner) if inner.is_object() => inner,
        _ => document,
    };
    let preparers = as_object(root, "availability")?;

    let mut store = CapacityStore::new();
    for (name, weeks) in preparers {
        let weeks = as_object(weeks, name)?;
        for (week, raw) in weeks {
            let key = format!("{name}/{week}");
            let raw: RawAvailability = serde_json::from_value(raw.clone()).map_err(|_| {
                PlannerError::malformed(&key, "expected integer minutes or {minutes, updatedAt}")
            })?;
            let entry = match raw {
                RawAvailability::Minutes(minutes) => AvailabilityEntry::new(minutes),
                RawAvailability::Entry {
                    minutes,
                    updated_at,
                } => AvailabilityEntry {
                    minutes,
                    updated_at: updated_at.and_then(timestamp_text),
                },
            };
            store.set_minutes(name, week, entry)?;
        }
        if weeks.is_empty() && !store.contains(name) {
            store.insert(crate::models::Resource::new(name.as_str()))?;
        }
    }
    Ok(store)
}

/// Parses a job document into a job store, keeping document order.
pub fn parse_jobs(document: &Value) -> Result<JobStore> {
    let records = as_object(document, "jobs")?;
    let mut store = JobStore::new();
    for (id, record) in records {
        store.upsert(parse_job(id, record)?);
    }
    Ok(store)
}

/// Parses one job record.
pub fn parse_job(id: &str, record: &Value) -> Result<Job> {
    let raw: RawJob =
        serde_json::from_value(record.clone()).map_err(|e| PlannerError::malformed(id, e))?;

    let status = JobStatus::parse(&raw.status).ok_or_else(|| {
        PlannerError::malformed(format!("{id}/status"), format!("unknown status '{}'", raw.status))
    })?;
    if raw.required_minutes < 0 {
        return Err(PlannerError::malformed(
            format!("{id}/prepTime"),
            format!("negative effort ({} min)", raw.required_minutes),
        ));
    }
    let deadline = parse_date(&raw.deadline).ok_or_else(|| {
        PlannerError::malformed(
            format!("{id}/endDate"),
            format!("expected dd/mm/yyyy, got '{}'", raw.deadline),
        )
    })?;

    let mut job = Job::new(id, raw.required_minutes, deadline)
        .with_label(raw.label.unwrap_or_default())
        .with_status(status);
    job.resource = raw.resource.filter(|r| !r.is_empty());

    for (week, minutes) in raw.allocation.unwrap_or_default() {
        let key = canonical_week(id, "planification", &week)?;
        if minutes < 0 {
            return Err(PlannerError::malformed(
                format!("{id}/planification/{week}"),
                format!("negative allocation ({minutes} min)"),
            ));
        }
        if minutes > 0 {
            job.allocation.insert(key, minutes);
        }
    }

    for (week, raw_lock) in raw.forced_locks.unwrap_or_default() {
        let key = canonical_week(id, "forcedPlanningLock", &week)?;
        let lock = match raw_lock {
            RawLock::Minutes(minutes) => ForcedLock::new(minutes),
            RawLock::Entry { resource, minutes } => ForcedLock {
                resource: resource.filter(|r| !r.is_empty()),
                minutes,
            },
        };
        if lock.minutes < 0 {
            return Err(PlannerError::malformed(
                format!("{id}/forcedPlanningLock/{week}"),
                format!("negative lock ({} min)", lock.minutes),
            ));
        }
        if lock.minutes > 0 {
            job.forced_locks.insert(key, lock);
        }
    }

    Ok(job)
}

/// Serializes the job store back into the board's record shape.
pub fn export_jobs(jobs: &JobStore) -> Value {
    let records: Map<String, Value> = jobs
        .iter()
        .map(|job| {
            let mut record = json!({
                "id": job.id,
                "label": job.label,
                "status": job.status.label(),
                "prepTime": job.required_minutes,
                "endDate": job.deadline.format(DATE_FORMAT).to_string(),
                "preparateur": job.resource,
                "planification": job.allocation,
                "ChargeRestante": job.unplanned_minutes(),
            });
            if !job.forced_locks.is_empty() {
                let locks: Map<String, Value> = job
                    .forced_locks
                    .iter()
                    .map(|(week, lock)| {
                        (
                            week.clone(),
                            json!({ "preparateur": lock.resource, "minutes": lock.minutes }),
                        )
                    })
                    .collect();
                record["forcedPlanningLock"] = Value::Object(locks);
            }
            (job.id.clone(), record)
        })
        .collect();
    Value::Object(records)
}

/// Serializes the capacity store into the canonical availability shape.
pub fn export_availability(capacity: &CapacityStore) -> Value {
    let preparers: Map<String, Value> = capacity
        .iter()
        .map(|resource| {
            let weeks: Map<String, Value> = resource
                .availability
                .iter()
                .map(|(week, entry)| {
                    let mut value = json!({ "minutes": entry.minutes });
                    if let Some(updated_at) = &entry.updated_at {
                        value["updatedAt"] = Value::String(updated_at.clone());
                    }
                    (week.clone(), value)
                })
                .collect();
            (resource.name.clone(), Value::Object(weeks))
        })
        .collect();
    Value::Object(preparers)
}

/// Parses a `dd/mm/yyyy` date.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}

fn as_object<'v>(value: &'v Value, key: &str) -> Result<&'v Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| PlannerError::malformed(key, "expected an object"))
}

fn canonical_week(id: &str, field: &str, week: &str) -> Result<String> {
    normalize_week_key(week)
        .ok_or_else(|| PlannerError::malformed(format!("{id}/{field}/{week}"), "invalid week key"))
}

fn timestamp_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}
