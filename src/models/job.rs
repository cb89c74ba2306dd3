//! Job (chantier) model and the job store.
//!
//! A job is a preparation effort owed by one preparer before a deadline.
//! Its allocation map spreads the required minutes over weeks; the
//! reallocation pass owns every entry from the current week onward.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::calendar::normalize_week_key;
use super::Minutes;

/// Job lifecycle status.
///
/// Serialized with the variant name; the French labels used by the
/// planning board are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    #[serde(alias = "Nouveau")]
    New,
    #[serde(alias = "En cours de préparation")]
    InPrep,
    #[serde(alias = "Préparé")]
    Prepared,
    #[serde(alias = "Terminé")]
    Done,
    #[serde(alias = "Clôturé")]
    Closed,
    #[serde(alias = "Annulé")]
    Cancelled,
}

impl JobStatus {
    pub const ALL: [JobStatus; 6] = [
        JobStatus::New,
        JobStatus::InPrep,
        JobStatus::Prepared,
        JobStatus::Done,
        JobStatus::Closed,
        JobStatus::Cancelled,
    ];

    /// Only active jobs take part in reallocation and in projected demand.
    #[inline]
    pub fn is_active(self) -> bool {
        matches!(self, JobStatus::New | JobStatus::InPrep)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::New => "New",
            JobStatus::InPrep => "InPrep",
            JobStatus::Prepared => "Prepared",
            JobStatus::Done => "Done",
            JobStatus::Closed => "Closed",
            JobStatus::Cancelled => "Cancelled",
        }
    }

    /// Board label.
    pub fn label(self) -> &'static str {
        match self {
            JobStatus::New => "Nouveau",
            JobStatus::InPrep => "En cours de préparation",
            JobStatus::Prepared => "Préparé",
            JobStatus::Done => "Terminé",
            JobStatus::Closed => "Clôturé",
            JobStatus::Cancelled => "Annulé",
        }
    }

    /// Exact-match parse of either the variant name or the board label.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s || status.label() == s)
    }
}

/// Minutes pinned to a week by a planner, overriding the greedy fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForcedLock {
    /// Preparer the lock applies to. `None` = whoever owns the job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    pub minutes: Minutes,
}

impl ForcedLock {
    pub fn new(minutes: Minutes) -> Self {
        Self {
            resource: None,
            minutes,
        }
    }

    pub fn for_resource(resource: impl Into<String>, minutes: Minutes) -> Self {
        Self {
            resource: Some(resource.into()),
            minutes,
        }
    }

    /// Whether the lock binds a job owned by `owner`.
    pub fn applies_to(&self, owner: &str) -> bool {
        self.resource.as_deref().is_none_or(|r| r.is_empty() || r == owner)
    }
}

/// A preparation job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier.
    pub id: String,
    /// Human-readable label.
    pub label: String,
    pub status: JobStatus,
    /// Total preparation effort (minutes).
    pub required_minutes: Minutes,
    /// Date the preparation is due.
    pub deadline: NaiveDate,
    /// Owning preparer.
    pub resource: Option<String>,
    /// weekKey → allocated minutes.
    pub allocation: BTreeMap<String, Minutes>,
    /// weekKey → pinned minutes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub forced_locks: BTreeMap<String, ForcedLock>,
}

impl Job {
    /// Creates a new job with status `New` and no owner.
    pub fn new(id: impl Into<String>, required_minutes: Minutes, deadline: NaiveDate) -> Self {
        Self {
            id: id.into(),
            label: String::new(),
            status: JobStatus::New,
            required_minutes,
            deadline,
            resource: None,
            allocation: BTreeMap::new(),
            forced_locks: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Sets the allocation for one week.
    ///
    /// Legacy week keys are stored in canonical form; unparseable keys are
    /// kept as given and reported by validation.
    pub fn with_allocation(mut self, week_key: impl Into<String>, minutes: Minutes) -> Self {
        self.allocation.insert(canonical_key(week_key.into()), minutes);
        self
    }

    /// Pins minutes to one week, replacing any lock on the same week.
    pub fn with_lock(mut self, week_key: impl Into<String>, lock: ForcedLock) -> Self {
        self.forced_locks.insert(canonical_key(week_key.into()), lock);
        self
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Whether the job belongs to the named preparer.
    pub fn is_owned_by(&self, resource: &str) -> bool {
        self.resource.as_deref() == Some(resource)
    }

    /// Allocated minutes for one week (0 if unset).
    pub fn allocation_at(&self, week_key: &str) -> Minutes {
        self.allocation.get(week_key).copied().unwrap_or(0)
    }

    /// Sum of every allocation entry.
    pub fn allocated_minutes(&self) -> Minutes {
        self.allocation.values().sum()
    }

    /// Effort not yet placed in any week, floored at zero.
    pub fn unplanned_minutes(&self) -> Minutes {
        (self.required_minutes - self.allocated_minutes()).max(0)
    }
}

fn canonical_key(key: String) -> String {
    normalize_week_key(&key).unwrap_or(key)
}

/// Jobs in insertion order.
///
/// Order matters: jobs sharing a deadline keep their relative order when
/// prioritized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobStore {
    jobs: Vec<Job>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a job, replacing (in place) any job with the same id.
    ///
    /// Returns the replaced job, if any.
    pub fn upsert(&mut self, job: Job) -> Option<Job> {
        match self.jobs.iter().position(|j| j.id == job.id) {
            Some(pos) => Some(std::mem::replace(&mut self.jobs[pos], job)),
            None => {
                self.jobs.push(job);
                None
            }
        }
    }

    /// Builder form of [`upsert`](Self::upsert).
    pub fn with_job(mut self, job: Job) -> Self {
        self.upsert(job);
        self
    }

    pub fn remove(&mut self, id: &str) -> Option<Job> {
        let pos = self.jobs.iter().position(|j| j.id == id)?;
        Some(self.jobs.remove(pos))
    }

    pub fn get(&self, id: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|j| j.id == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Job> {
        self.jobs.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Job> {
        self.jobs.iter_mut()
    }

    pub fn as_slice(&self) -> &[Job] {
        &self.jobs
    }

    pub fn as_mut_slice(&mut self) -> &mut [Job] {
        &mut self.jobs
    }

    /// Active jobs owned by `resource`, in store order.
    pub fn active_for<'a>(&'a self, resource: &'a str) -> impl Iterator<Item = &'a Job> + 'a {
        self.jobs
            .iter()
            .filter(move |j| j.is_active() && j.is_owned_by(resource))
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl FromIterator<Job> for JobStore {
    fn from_iter<I: IntoIterator<Item = Job>>(iter: I) -> Self {
        let mut store = JobStore::new();
        for job in iter {
            store.upsert(job);
        }
        store
    }
}
