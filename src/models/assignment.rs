//! Teaching assignment model.
//!
//! An assignment is one (faculty, course, batch) obligation: the faculty
//! teaches the course to the batch for a fixed number of periods per week.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Course classification. Decides which placement rules apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CourseType {
    /// Theory course. Periods are spread out, never back to back.
    Academic,
    /// Laboratory. All periods in one consecutive block on a single day.
    Lab,
    /// Activity course (sports, library, clubs). One period per day.
    NonAcademic,
}

impl fmt::Display for CourseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CourseType::Academic => "ACADEMIC",
            CourseType::Lab => "LAB",
            CourseType::NonAcademic => "NON_ACADEMIC",
        };
        f.write_str(s)
    }
}

/// A faculty's obligation to teach one course to one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseAssignment {
    /// Teaching faculty.
    pub faculty_id: String,
    /// Course taught.
    pub course_id: String,
    /// Student batch (class section) attending.
    pub batch_id: String,
    /// Course classification.
    pub course_type: CourseType,
    /// Contact periods per week.
    pub periods_per_week: u32,
}

impl CourseAssignment {
    /// Creates an assignment.
    pub fn new(
        faculty_id: impl Into<String>,
        course_id: impl Into<String>,
        batch_id: impl Into<String>,
        course_type: CourseType,
        periods_per_week: u32,
    ) -> Self {
        Self {
            faculty_id: faculty_id.into(),
            course_id: course_id.into(),
            batch_id: batch_id.into(),
            course_type,
            periods_per_week,
        }
    }

    /// Creates a theory assignment.
    pub fn academic(
        faculty_id: impl Into<String>,
        course_id: impl Into<String>,
        batch_id: impl Into<String>,
        periods_per_week: u32,
    ) -> Self {
        Self::new(
            faculty_id,
            course_id,
            batch_id,
            CourseType::Academic,
            periods_per_week,
        )
    }

    /// Creates a lab assignment.
    pub fn lab(
        faculty_id: impl Into<String>,
        course_id: impl Into<String>,
        batch_id: impl Into<String>,
        periods_per_week: u32,
    ) -> Self {
        Self::new(
            faculty_id,
            course_id,
            batch_id,
            CourseType::Lab,
            periods_per_week,
        )
    }

    /// Creates a non-academic assignment.
    pub fn non_academic(
        faculty_id: impl Into<String>,
        course_id: impl Into<String>,
        batch_id: impl Into<String>,
        periods_per_week: u32,
    ) -> Self {
        Self::new(
            faculty_id,
            course_id,
            batch_id,
            CourseType::NonAcademic,
            periods_per_week,
        )
    }

    /// Whether this assignment is for the given (course, batch) pair.
    #[inline]
    pub fn covers(&self, course_id: &str, batch_id: &str) -> bool {
        self.course_id == course_id && self.batch_id == batch_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let a = CourseAssignment::lab("F1", "CS101L", "B1", 3);
        assert_eq!(a.course_type, CourseType::Lab);
        assert_eq!(a.periods_per_week, 3);
        assert!(a.covers("CS101L", "B1"));
        assert!(!a.covers("CS101L", "B2"));

        assert_eq!(
            CourseAssignment::academic("F1", "C", "B", 4).course_type,
            CourseType::Academic
        );
        assert_eq!(
            CourseAssignment::non_academic("F1", "C", "B", 2).course_type,
            CourseType::NonAcademic
        );
    }

    #[test]
    fn test_course_type_wire_names() {
        let json = serde_json::to_string(&CourseType::NonAcademic).unwrap();
        assert_eq!(json, "\"NON_ACADEMIC\"");
        let parsed: CourseType = serde_json::from_str("\"LAB\"").unwrap();
        assert_eq!(parsed, CourseType::Lab);
        assert_eq!(CourseType::Academic.to_string(), "ACADEMIC");
    }
}
