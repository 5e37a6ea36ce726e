//! Timetable generation and repair.
//!
//! # Components
//!
//! - [`WorkingSet`]: arena of placed entries with occupancy lookups
//! - [`SlotAllocator`]: per-course-type placement rules
//! - [`TimetableValidator`]: invariant checks
//! - [`TimetableGenerator`]: randomized multi-attempt driver
//! - [`RepairEngine`]: bounded conflict repair
//! - [`TimetableScheduler`]: validated, seeded entry point
//! - [`TimetableKpi`]: timetable quality metrics

mod allocator;
mod generator;
mod kpi;
mod repair;
mod timetable;
mod validator;
mod working_set;

pub use allocator::SlotAllocator;
pub use generator::{GenerationOutcome, Shortfall, TimetableGenerator, TimetableRequest};
pub use kpi::TimetableKpi;
pub use repair::{RepairEngine, RepairOutcome};
pub use timetable::{generate_timetable, TimetableScheduler};
pub use validator::TimetableValidator;
pub use working_set::{EntryIdx, WorkingSet};
