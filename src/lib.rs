//! Weekly workload leveling for preparation teams.
//!
//! Spreads each preparer's open jobs over ISO weeks, earliest deadline
//! first, against their weekly availability, then projects the rolling
//! capacity margin and look-ahead tension shown on the planning grid.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `WeekCalendar`, `Week`, `CapacityStore`,
//!   `Resource`, `JobStore`, `Job`, `JobStatus`, `ForcedLock`
//! - **`scheduler`**: `Reallocator` (deadline-ordered greedy leveling) and
//!   `Projector` (margins, tension, badges)
//! - **`records`**: Board record parsing and export
//! - **`validation`**: Input integrity checks (duplicate IDs, unknown
//!   preparers, weeks outside the calendar)
//! - **`planner`**: `Planner` façade owning the config, calendar and stores
//! - **`config`**: `PlannerConfig`
//!
//! # Logging
//!
//! Events are emitted through `tracing`; no subscriber is installed.
//!
//! # References
//!
//! - Jackson (1955), "Scheduling a production line to minimize maximum tardiness"
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - ISO 8601 week dates

pub mod config;
pub mod error;
pub mod models;
pub mod planner;
pub mod records;
pub mod scheduler;
pub mod validation;

pub use config::PlannerConfig;
pub use error::{PlannerError, Result};
pub use planner::Planner;
