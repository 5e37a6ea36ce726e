//! Input validation for timetabling requests.
//!
//! Checks structural integrity of a faculty's assignments and the period
//! grid before scheduling. Detects:
//! - Assignments belonging to another faculty
//! - Duplicate (course, batch) pairs
//! - One course id declared with two course types
//! - Duplicate or malformed grid slots
//!
//! Assignments with zero weekly periods and lab assignments longer than any
//! consecutive run the grid offers are not errors: they are reported through
//! `tracing` and left to the best-effort allocator.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::models::{CourseAssignment, CourseType, PeriodGrid, SlotKey, BREAK_PERIOD};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// An assignment names a different faculty than the request.
    ForeignAssignment,
    /// The same (course, batch) pair is assigned twice.
    DuplicateAssignment,
    /// One course id appears with different course types.
    InconsistentCourseType,
    /// Two teaching slots share a (day, period) key.
    DuplicateSlot,
    /// A break slot carries a teaching period number, or a teaching slot
    /// carries the break period number.
    MalformedSlot,
}

impl ValidationError {
    /// Creates a validation error.
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates the input of one generation request.
///
/// Checks:
/// 1. Every assignment belongs to `faculty_id`
/// 2. No (course, batch) pair appears twice
/// 3. Each course id has a single course type
/// 4. Grid teaching slots have unique keys and non-zero period numbers
/// 5. Grid break slots use the break period number
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(
    faculty_id: &str,
    assignments: &[CourseAssignment],
    grid: &PeriodGrid,
) -> ValidationResult {
    let mut errors = Vec::new();

    let mut pairs = HashSet::new();
    let mut course_types: HashMap<&str, CourseType> = HashMap::new();

    for a in assignments {
        if a.faculty_id != faculty_id {
            errors.push(ValidationError::new(
                ValidationErrorKind::ForeignAssignment,
                format!(
                    "Course '{}' for batch '{}' is assigned to faculty '{}', not '{}'",
                    a.course_id, a.batch_id, a.faculty_id, faculty_id
                ),
            ));
        }

        if !pairs.insert((a.course_id.as_str(), a.batch_id.as_str())) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateAssignment,
                format!(
                    "Course '{}' is assigned to batch '{}' more than once",
                    a.course_id, a.batch_id
                ),
            ));
        }

        if a.periods_per_week == 0 {
            warn!(
                course = %a.course_id,
                batch = %a.batch_id,
                "assignment requires no periods"
            );
        }

        match course_types.get(a.course_id.as_str()) {
            Some(&existing) if existing != a.course_type => {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InconsistentCourseType,
                    format!(
                        "Course '{}' is declared both {} and {}",
                        a.course_id, existing, a.course_type
                    ),
                ));
            }
            Some(_) => {}
            None => {
                course_types.insert(a.course_id.as_str(), a.course_type);
            }
        }
    }

    errors.extend(validate_grid(grid));

    let longest = grid.longest_run(1);
    for a in assignments
        .iter()
        .filter(|a| a.course_type == CourseType::Lab && a.periods_per_week as usize > longest)
    {
        warn!(
            course = %a.course_id,
            batch = %a.batch_id,
            periods = a.periods_per_week,
            longest_run = longest,
            "lab block is longer than any consecutive run in the grid"
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Checks grid slot keys and break markers.
pub fn validate_grid(grid: &PeriodGrid) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut keys: HashSet<SlotKey> = HashSet::new();

    for slot in grid.slots() {
        if slot.is_break {
            if slot.period != BREAK_PERIOD {
                errors.push(ValidationError::new(
                    ValidationErrorKind::MalformedSlot,
                    format!(
                        "Break on {} at {} carries period number {}",
                        slot.day, slot.start, slot.period
                    ),
                ));
            }
            continue;
        }

        if slot.period == BREAK_PERIOD {
            errors.push(ValidationError::new(
                ValidationErrorKind::MalformedSlot,
                format!("Teaching slot on {} at {} has period 0", slot.day, slot.start),
            ));
        } else if !keys.insert(slot.key()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateSlot,
                format!("Duplicate teaching slot {}", slot.key()),
            ));
        }
    }

    errors
}
