//! Timetabling domain models.
//!
//! Provides the core data types for describing a weekly timetabling
//! problem and its solution.
//!
//! # Domain Mappings
//!
//! | u-timetable | University | School |
//! |-------------|------------|--------|
//! | CourseAssignment | Faculty course load | Teacher allocation |
//! | PeriodGrid | Weekly bell schedule | Timetable skeleton |
//! | TimetableEntry | Class meeting | Lesson |
//! | Timetable | Faculty timetable | Teacher timetable |

mod assignment;
mod entry;
mod grid;
mod timetable;

pub use assignment::{CourseAssignment, CourseType};
pub use entry::{Term, TimetableEntry};
pub use grid::{PeriodGrid, SlotKey, TimeSlot, BREAK_PERIOD, TEACHING_DAYS};
pub use timetable::{Timetable, Violation, ViolationKind};
