//! Timetable entry model.
//!
//! An entry is the atomic placement unit: one period of one assignment in
//! one teaching slot. A course requiring K periods per week produces K
//! entries.

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use super::{CourseAssignment, CourseType, SlotKey};

/// Academic term an entry belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Term {
    /// Academic year label (e.g. "2025-2026").
    pub academic_year: String,
    /// Semester label (e.g. "ODD").
    pub semester: String,
}

impl Term {
    /// Creates a term.
    pub fn new(academic_year: impl Into<String>, semester: impl Into<String>) -> Self {
        Self {
            academic_year: academic_year.into(),
            semester: semester.into(),
        }
    }
}

/// One placed period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimetableEntry {
    /// Teaching faculty.
    pub faculty_id: String,
    /// Course taught.
    pub course_id: String,
    /// Attending batch.
    pub batch_id: String,
    /// Course classification (denormalized from the assignment).
    pub course_type: CourseType,
    /// Occupied teaching slot.
    pub slot: SlotKey,
    /// Academic year label.
    pub academic_year: String,
    /// Semester label.
    pub semester: String,
}

impl TimetableEntry {
    /// Creates an entry.
    pub fn new(
        faculty_id: impl Into<String>,
        course_id: impl Into<String>,
        batch_id: impl Into<String>,
        course_type: CourseType,
        slot: SlotKey,
        term: &Term,
    ) -> Self {
        Self {
            faculty_id: faculty_id.into(),
            course_id: course_id.into(),
            batch_id: batch_id.into(),
            course_type,
            slot,
            academic_year: term.academic_year.clone(),
            semester: term.semester.clone(),
        }
    }

    /// Creates an entry placing one period of `assignment` at `slot`.
    pub fn for_assignment(assignment: &CourseAssignment, slot: SlotKey, term: &Term) -> Self {
        Self::new(
            assignment.faculty_id.as_str(),
            assignment.course_id.as_str(),
            assignment.batch_id.as_str(),
            assignment.course_type,
            slot,
            term,
        )
    }

    /// A copy of this entry moved to another slot.
    pub fn moved_to(&self, slot: SlotKey) -> Self {
        Self {
            slot,
            ..self.clone()
        }
    }

    /// Day of the occupied slot.
    #[inline]
    pub fn day(&self) -> Weekday {
        self.slot.day
    }

    /// Period number of the occupied slot.
    #[inline]
    pub fn period(&self) -> u8 {
        self.slot.period
    }

    /// Whether this entry belongs to `term`.
    pub fn in_term(&self, term: &Term) -> bool {
        self.academic_year == term.academic_year && self.semester == term.semester
    }

    /// Whether this entry places a period of `assignment`.
    pub fn belongs_to(&self, assignment: &CourseAssignment) -> bool {
        self.faculty_id == assignment.faculty_id
            && self.is_course_batch(&assignment.course_id, &assignment.batch_id)
    }

    /// Whether this entry is for the given (course, batch) pair.
    #[inline]
    pub fn is_course_batch(&self, course_id: &str, batch_id: &str) -> bool {
        self.course_id == course_id && self.batch_id == batch_id
    }
}
