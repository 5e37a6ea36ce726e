//! Weekly class timetabling for faculty teaching loads.
//!
//! Places each faculty's course assignments (theory, lab and non-academic)
//! into a weekly period grid, validates the result against the timetabling
//! invariants, and repairs residual conflicts with a bounded local search.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `PeriodGrid`, `TimeSlot`, `SlotKey`,
//!   `CourseAssignment`, `TimetableEntry`, `Timetable`, `Violation`
//! - **`validation`**: Input integrity checks (foreign or duplicate
//!   assignments, mixed course types, malformed grid slots)
//! - **`scheduler`**: Slot allocation, validation, multi-attempt generation,
//!   conflict repair and KPIs
//! - **`store`**: Persistence contract and the serialized generation service
//! - **`config`**: Search bounds and lab policy
//! - **`error`**: Caller-visible errors
//!
//! # Invariants
//!
//! - A faculty holds at most one entry per slot.
//! - A batch holds at most one entry per slot.
//! - A batch has at most `max_labs_per_day` distinct lab courses per day.
//! - A lab block sits on one day in consecutive periods, never in period 1.
//! - A theory course never meets a batch in two adjacent periods.
//!
//! Generation is randomized and bounded. Violations that survive repair are
//! returned as data alongside the entries.
//!
//! # References
//!
//! - Schaerf (1999), "A Survey of Automated Timetabling"
//! - Burke & Petrovic (2002), "Recent research directions in automated
//!   timetabling"

pub mod config;
pub mod error;
pub mod models;
pub mod scheduler;
pub mod store;
pub mod validation;

pub use config::SchedulerConfig;
pub use error::{TimetableError, TimetableResult};
pub use scheduler::generate_timetable;
