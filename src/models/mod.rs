//! Planning domain models.
//!
//! Provides the week calendar, the capacity store (preparers and their
//! weekly availability) and the job store the leveling passes read and
//! rewrite.
//!
//! # Domain Mappings
//!
//! | prep-planner | Planning board | Generic scheduling |
//! |--------------|----------------|--------------------|
//! | Week | Semaine | Time bucket |
//! | Resource | Préparateur | Worker |
//! | Job | Chantier | Order with due date |
//! | Allocation | Planification | Bucketed assignment |

mod calendar;
mod job;
mod resource;

pub use calendar::{
    compare_week_keys, monday_of_week, normalize_week_key, parse_week_key, week_key, week_key_of,
    week_number, weeks_in_year, Week, WeekCalendar,
};
pub use job::{ForcedLock, Job, JobStatus, JobStore};
pub use resource::{AvailabilityEntry, CapacityStore, Minutes, Resource};
