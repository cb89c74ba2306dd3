//! Workload leveling and capacity projection.
//!
//! # Algorithm
//!
//! `Reallocator` spreads each active job's remaining effort over the weeks
//! from the current one onward, earliest deadline first, against the
//! preparer's weekly availability. It is greedy and never revisits past
//! weeks.
//!
//! # Projection
//!
//! `Projector` derives the per-week margin (`M`), the look-ahead tension
//! (`Tdisp`) and the display badge from the same stores. It is read-only
//! and must run after reallocation on the same generation of data.
//!
//! # References
//!
//! - Jackson (1955), "Scheduling a production line to minimize maximum tardiness"
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 3

mod projection;
mod reallocation;

pub use projection::{
    project, CapacityProjection, Projector, ResourceProjection, WeekProjection,
    DEFAULT_TENSION_WINDOW,
};
pub use reallocation::{reallocate, ReallocationSummary, Reallocator};
