//! Preparers and their weekly availability (the capacity store).
//!
//! A resource is a preparer identified by name. Each owns a sparse map
//! weekKey → available minutes; a missing week means zero capacity.
//! Availability is written by external collaborators only; the engine
//! reads it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::calendar::normalize_week_key;
use crate::error::{PlannerError, Result};

/// Working minutes.
pub type Minutes = i64;

/// Availability of one preparer for one week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityEntry {
    /// Available minutes (≥ 0).
    pub minutes: Minutes,
    /// Last edit timestamp, as supplied by the editor. Opaque to the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl AvailabilityEntry {
    pub fn new(minutes: Minutes) -> Self {
        Self {
            minutes,
            updated_at: None,
        }
    }

    /// Sets the edit timestamp.
    pub fn with_updated_at(mut self, updated_at: impl Into<String>) -> Self {
        self.updated_at = Some(updated_at.into());
        self
    }
}

/// A preparer and their weekly availability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Unique preparer name.
    pub name: String,
    /// weekKey → availability.
    pub availability: BTreeMap<String, AvailabilityEntry>,
}

impl Resource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            availability: BTreeMap::new(),
        }
    }

    /// Sets the availability for one week.
    pub fn with_minutes(mut self, week_key: impl Into<String>, minutes: Minutes) -> Self {
        self.availability
            .insert(week_key.into(), AvailabilityEntry::new(minutes));
        self
    }

    /// Available minutes for a week (0 if unset).
    pub fn minutes_at(&self, week_key: &str) -> Minutes {
        self.availability.get(week_key).map_or(0, |e| e.minutes)
    }

    /// Total availability across all recorded weeks.
    pub fn total_minutes(&self) -> Minutes {
        self.availability.values().map(|e| e.minutes).sum()
    }
}

/// Per-preparer availability, keyed by preparer name.
///
/// Entries are validated on the way in (canonical week key, non-negative
/// minutes) so the leveling passes only ever see one shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapacityStore {
    resources: BTreeMap<String, Resource>,
}

impl CapacityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a preparer.
    ///
    /// # Errors
    /// [`PlannerError::MalformedRecord`] for an unparseable week key or
    /// negative minutes.
    pub fn insert(&mut self, resource: Resource) -> Result<()> {
        let mut normalized = Resource::new(resource.name.clone());
        for (key, entry) in resource.availability {
            let canonical = checked_week(&resource.name, &key)?;
            check_minutes(&resource.name, &key, entry.minutes)?;
            normalized.availability.insert(canonical, entry);
        }
        self.resources.insert(normalized.name.clone(), normalized);
        Ok(())
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_resource(mut self, resource: Resource) -> Result<Self> {
        self.insert(resource)?;
        Ok(self)
    }

    /// Sets one week of availability, creating the preparer if needed.
    pub fn set_minutes(
        &mut self,
        resource: &str,
        week_key: &str,
        entry: AvailabilityEntry,
    ) -> Result<()> {
        let canonical = checked_week(resource, week_key)?;
        check_minutes(resource, week_key, entry.minutes)?;
        self.resources
            .entry(resource.to_string())
            .or_insert_with(|| Resource::new(resource))
            .availability
            .insert(canonical, entry);
        Ok(())
    }

    /// Removes a preparer and all their availability.
    pub fn remove(&mut self, resource: &str) -> Option<Resource> {
        self.resources.remove(resource)
    }

    pub fn get(&self, resource: &str) -> Option<&Resource> {
        self.resources.get(resource)
    }

    /// Available minutes for a preparer and week (0 if either is unknown).
    pub fn minutes_at(&self, resource: &str, week_key: &str) -> Minutes {
        self.resources
            .get(resource)
            .map_or(0, |r| r.minutes_at(week_key))
    }

    pub fn contains(&self, resource: &str) -> bool {
        self.resources.contains_key(resource)
    }

    /// Preparer names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

fn checked_week(resource: &str, week_key: &str) -> Result<String> {
    normalize_week_key(week_key)
        .ok_or_else(|| PlannerError::malformed(format!("{resource}/{week_key}"), "invalid week key"))
}

fn check_minutes(resource: &str, week_key: &str, minutes: Minutes) -> Result<()> {
    if minutes < 0 {
        return Err(PlannerError::malformed(
            format!("{resource}/{week_key}"),
            format!("negative availability ({minutes} min)"),
        ));
    }
    Ok(())
}
