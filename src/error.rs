//! Caller-visible errors.
//!
//! Only input problems and total generation failure are errors. Unplaced
//! periods and residual violations are reported as data in the
//! [`GenerationOutcome`](crate::scheduler::GenerationOutcome).

use thiserror::Error;

use crate::validation::ValidationError;

/// Errors returned by timetable generation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimetableError {
    /// The faculty has no course assignments.
    #[error("no courses assigned to faculty {faculty_id}")]
    NoCoursesAssigned {
        /// Requesting faculty.
        faculty_id: String,
    },
    /// The period grid has no teaching slots.
    #[error("period grid is missing or has no teaching slots")]
    MissingGrid,
    /// Structural problems in the assignments or grid.
    #[error("invalid timetable input: {}", summarize(.0))]
    InvalidInput(Vec<ValidationError>),
    /// Not a single entry could be placed.
    #[error("failed to generate any timetable entries after {attempts} attempts")]
    GenerationFailed {
        /// Attempts made.
        attempts: usize,
    },
}

fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result alias for timetable operations.
pub type TimetableResult<T> = Result<T, TimetableError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationErrorKind;

    #[test]
    fn test_messages() {
        let e = TimetableError::NoCoursesAssigned {
            faculty_id: "F1".into(),
        };
        assert_eq!(e.to_string(), "no courses assigned to faculty F1");

        let e = TimetableError::GenerationFailed { attempts: 10 };
        assert!(e.to_string().contains("10 attempts"));
    }

    #[test]
    fn test_invalid_input_lists_problems() {
        let e = TimetableError::InvalidInput(vec![
            ValidationError::new(ValidationErrorKind::ForeignAssignment, "a"),
            ValidationError::new(ValidationErrorKind::DuplicateAssignment, "b"),
        ]);
        assert_eq!(e.to_string(), "invalid timetable input: a; b");
    }
}
