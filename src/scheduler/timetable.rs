//! Top-level scheduling entry points.

use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::{info, warn};

use super::{GenerationOutcome, TimetableGenerator, TimetableRequest};
use crate::config::SchedulerConfig;
use crate::error::{TimetableError, TimetableResult};
use crate::models::{CourseAssignment, PeriodGrid, Term, TimetableEntry};
use crate::validation::validate_input;

/// Faculty timetable scheduler.
///
/// Checks the request, seeds the random source from the configuration,
/// and runs the generation driver.
///
/// # Example
///
/// ```
/// use u_timetable::models::{CourseAssignment, PeriodGrid, Term};
/// use u_timetable::scheduler::{TimetableRequest, TimetableScheduler};
/// use u_timetable::config::SchedulerConfig;
///
/// let request = TimetableRequest::new(
///     "F1",
///     vec![
///         CourseAssignment::academic("F1", "MA101", "B1", 4),
///         CourseAssignment::lab("F1", "PH101L", "B1", 3),
///     ],
///     Term::new("2025-2026", "ODD"),
/// );
/// let scheduler = TimetableScheduler::with_config(SchedulerConfig::default().with_seed(42));
/// let outcome = scheduler.schedule(&request, &PeriodGrid::standard()).unwrap();
/// assert_eq!(outcome.timetable.entry_count(), 7);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TimetableScheduler {
    config: SchedulerConfig,
}

impl TimetableScheduler {
    /// Creates a scheduler with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scheduler with the given configuration.
    pub fn with_config(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Generates a timetable for `request` on `grid`.
    ///
    /// # Errors
    /// - [`TimetableError::NoCoursesAssigned`] if the request has no assignments
    /// - [`TimetableError::MissingGrid`] if the grid has no teaching slots
    /// - [`TimetableError::InvalidInput`] if input validation fails
    /// - [`TimetableError::GenerationFailed`] if nothing could be placed
    pub fn schedule(
        &self,
        request: &TimetableRequest,
        grid: &PeriodGrid,
    ) -> TimetableResult<GenerationOutcome> {
        check_request(request, grid)?;

        let mut rng = match self.config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };

        info!(
            faculty = %request.faculty_id,
            assignments = request.assignments.len(),
            year = %request.term.academic_year,
            semester = %request.term.semester,
            "generating timetable"
        );
        TimetableGenerator::new(grid, &self.config)
            .generate(request, &mut rng)
    }
}

fn check_request(request: &TimetableRequest, grid: &PeriodGrid) -> TimetableResult<()> {
    if request.assignments.is_empty() {
        warn!(faculty = %request.faculty_id, "no courses assigned");
        return Err(TimetableError::NoCoursesAssigned {
            faculty_id: request.faculty_id.clone(),
        });
    }
    if grid.is_empty() {
        return Err(TimetableError::MissingGrid);
    }
    validate_input(&request.faculty_id, &request.assignments, grid)
        .map_err(TimetableError::InvalidInput)
}

/// Generates one faculty's timetable with the default configuration and no
/// persisted entries from other faculties.
///
/// Returns the placed entries sorted by slot.
pub fn generate_timetable(
    faculty_id: &str,
    assignments: &[CourseAssignment],
    grid: &PeriodGrid,
    academic_year: &str,
    semester: &str,
) -> TimetableResult<Vec<TimetableEntry>> {
    let term = Term::new(academic_year, semester);
    let request = TimetableRequest::new(faculty_id, assignments.to_vec(), term);
    TimetableScheduler::new()
        .schedule(&request, grid)
        .map(|outcome| outcome.timetable.entries)
}
