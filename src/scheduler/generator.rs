//! Multi-attempt generation driver.
//!
//! # Algorithm
//!
//! 1. Build the fixed layer from entries already persisted for other
//!    faculties in the same term.
//! 2. Up to `max_generation_attempts` times, starting from an empty
//!    placement:
//!    - place labs, in random order
//!    - place non-academic courses, in random order
//!    - place theory courses grouped by course id, groups in random order
//!      and then by batch count (largest first)
//! 3. Keep the attempt with the fewest violations (fewest unplaced periods
//!    on ties). Stop early once an attempt is violation-free and complete.
//! 4. Hand a best attempt that still has violations to the
//!    [`RepairEngine`].
//!
//! An empty result is the only failure; partial placements and residual
//! violations are reported in the [`GenerationOutcome`].

use std::cmp::Reverse;
use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::{RepairEngine, SlotAllocator, TimetableValidator, WorkingSet};
use crate::config::SchedulerConfig;
use crate::error::{TimetableError, TimetableResult};
use crate::models::{
    CourseAssignment, CourseType, PeriodGrid, Term, Timetable, TimetableEntry, Violation,
};

/// Input container for one faculty's generation run.
#[derive(Debug, Clone)]
pub struct TimetableRequest {
    /// Requesting faculty.
    pub faculty_id: String,
    /// The faculty's course assignments.
    pub assignments: Vec<CourseAssignment>,
    /// Term the generated entries belong to.
    pub term: Term,
    /// Entries already persisted (any faculty, any term).
    pub existing: Vec<TimetableEntry>,
}

impl TimetableRequest {
    /// Creates a request with no persisted entries.
    pub fn new(
        faculty_id: impl Into<String>,
        assignments: Vec<CourseAssignment>,
        term: Term,
    ) -> Self {
        Self {
            faculty_id: faculty_id.into(),
            assignments,
            term,
            existing: Vec::new(),
        }
    }

    /// Sets the persisted entries other faculties occupy.
    pub fn with_existing(mut self, existing: Vec<TimetableEntry>) -> Self {
        self.existing = existing;
        self
    }

    /// Persisted entries that constrain this request: other faculties,
    /// same term.
    pub fn fixed_entries(&self) -> impl Iterator<Item = &TimetableEntry> {
        self.existing
            .iter()
            .filter(move |e| e.faculty_id != self.faculty_id && e.in_term(&self.term))
    }
}

/// An assignment that did not get all its periods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortfall {
    /// Course id.
    pub course_id: String,
    /// Batch id.
    pub batch_id: String,
    /// Course type.
    pub course_type: CourseType,
    /// Periods required per week.
    pub required: u32,
    /// Periods placed.
    pub placed: u32,
}

impl Shortfall {
    /// Shortfalls of `assignments` in `entries`, in assignment order.
    pub fn collect(assignments: &[CourseAssignment], entries: &[TimetableEntry]) -> Vec<Self> {
        assignments
            .iter()
            .filter_map(|a| {
                let placed = entries.iter().filter(|e| e.belongs_to(a)).count() as u32;
                (placed < a.periods_per_week).then(|| Self {
                    course_id: a.course_id.clone(),
                    batch_id: a.batch_id.clone(),
                    course_type: a.course_type,
                    required: a.periods_per_week,
                    placed,
                })
            })
            .collect()
    }

    /// Periods missing.
    pub fn missing(&self) -> u32 {
        self.required - self.placed
    }
}

/// Result of a generation run.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    /// Generated entries and residual violations.
    pub timetable: Timetable,
    /// Generation attempts made.
    pub attempts: usize,
    /// Repair passes run on the best attempt.
    pub repair_passes: usize,
    /// Assignments left short of their weekly periods.
    pub shortfalls: Vec<Shortfall>,
}

impl GenerationOutcome {
    /// Whether every period was placed without violations.
    pub fn is_complete(&self) -> bool {
        self.timetable.is_valid() && self.shortfalls.is_empty()
    }
}

/// Generation driver bound to a grid and configuration.
#[derive(Debug, Clone)]
pub struct TimetableGenerator<'a> {
    allocator: SlotAllocator<'a>,
    validator: TimetableValidator,
    repair: RepairEngine<'a>,
    max_attempts: usize,
}

impl<'a> TimetableGenerator<'a> {
    /// Creates a generator.
    pub fn new(grid: &'a PeriodGrid, config: &SchedulerConfig) -> Self {
        Self {
            allocator: SlotAllocator::new(grid, config),
            validator: TimetableValidator::from_config(config),
            repair: RepairEngine::new(grid, config),
            max_attempts: config.max_generation_attempts.max(1),
        }
    }

    /// Generates a timetable for `request`.
    ///
    /// Input is assumed valid; see [`validate_input`](crate::validation::validate_input).
    #[instrument(
        skip_all,
        fields(faculty = %request.faculty_id, assignments = request.assignments.len())
    )]
    pub fn generate<R: Rng + ?Sized>(
        &self,
        request: &TimetableRequest,
        rng: &mut R,
    ) -> TimetableResult<GenerationOutcome> {
        let base = WorkingSet::new(request.fixed_entries());
        let required: usize = request
            .assignments
            .iter()
            .map(|a| a.periods_per_week as usize)
            .sum();

        let mut best: Option<(WorkingSet, Vec<Violation>)> = None;
        let mut attempts = 0;

        for attempt in 1..=self.max_attempts {
            attempts = attempt;
            let set = self.run_attempt(request, &base, rng);
            let violations = self.validator.validate_set(&set);
            let unplaced = required.saturating_sub(set.len());
            info!(
                attempt,
                entries = set.len(),
                unplaced,
                violations = violations.len(),
                "attempt finished"
            );

            if violations.is_empty() {
                best = Some((set, violations));
                break;
            }
            let best_len = best.as_ref().map(|(_, bv)| bv.len());
            if best_len.map_or(true, |n| violations.len() < n) {
                best = Some((set, violations));
            }
        }

        let Some((set, violations)) = best else {
            return Err(TimetableError::GenerationFailed { attempts });
        };

        let (set, violations, repair_passes) = if violations.is_empty() {
            (set, violations, 0)
        } else {
            let outcome = self
                .repair
                .repair(set, violations, &request.faculty_id, rng);
            (outcome.set, outcome.violations, outcome.passes)
        };

        if set.is_empty() {
            warn!(attempts, "no entries could be placed");
            return Err(TimetableError::GenerationFailed { attempts });
        }

        let mut entries = set.into_entries();
        entries.sort_by(|a, b| {
            a.slot
                .cmp(&b.slot)
                .then_with(|| a.course_id.cmp(&b.course_id))
                .then_with(|| a.batch_id.cmp(&b.batch_id))
        });
        let shortfalls = Shortfall::collect(&request.assignments, &entries);

        info!(
            entries = entries.len(),
            attempts,
            repair_passes,
            violations = violations.len(),
            shortfalls = shortfalls.len(),
            "timetable generated"
        );

        Ok(GenerationOutcome {
            timetable: Timetable::new(entries, violations),
            attempts,
            repair_passes,
            shortfalls,
        })
    }

    /// One randomized placement from scratch over `base`'s fixed layer.
    pub fn run_attempt<R: Rng + ?Sized>(
        &self,
        request: &TimetableRequest,
        base: &WorkingSet,
        rng: &mut R,
    ) -> WorkingSet {
        let mut set = base.fresh();
        let term = &request.term;

        let mut labs = by_type(&request.assignments, CourseType::Lab);
        labs.shuffle(rng);
        for a in labs {
            self.allocator.allocate_lab(a, term, &mut set, rng);
        }

        let mut non_academic = by_type(&request.assignments, CourseType::NonAcademic);
        non_academic.shuffle(rng);
        for a in non_academic {
            self.allocator.allocate_non_academic(a, term, &mut set, rng);
        }

        let mut groups: Vec<Vec<&CourseAssignment>> = {
            let mut by_course: BTreeMap<&str, Vec<&CourseAssignment>> = BTreeMap::new();
            for a in by_type(&request.assignments, CourseType::Academic) {
                by_course.entry(a.course_id.as_str()).or_default().push(a);
            }
            by_course.into_values().collect()
        };
        groups.shuffle(rng);
        groups.sort_by_key(|g| Reverse(g.len()));
        for group in groups {
            self.allocator
                .allocate_theory_group(&group, term, &mut set, rng);
        }

        set
    }
}

fn by_type(assignments: &[CourseAssignment], course_type: CourseType) -> Vec<&CourseAssignment> {
    assignments
        .iter()
        .filter(|a| a.course_type == course_type)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SlotKey, ViolationKind};
    use chrono::Weekday;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn term() -> Term {
        Term::new("2025-2026", "ODD")
    }

    fn generate(request: &TimetableRequest, seed: u64) -> GenerationOutcome {
        let grid = PeriodGrid::standard();
        let config = SchedulerConfig::default();
        let mut rng = SmallRng::seed_from_u64(seed);
        TimetableGenerator::new(&grid, &config)
            .generate(request, &mut rng)
            .unwrap()
    }

    #[test]
    fn test_mixed_load_is_complete() {
        let request = TimetableRequest::new(
            "F1",
            vec![
                CourseAssignment::academic("F1", "MA101", "B1", 4),
                CourseAssignment::academic("F1", "MA101", "B2", 4),
                CourseAssignment::academic("F1", "CS102", "B1", 3),
                CourseAssignment::lab("F1", "PH101L", "B1", 3),
                CourseAssignment::lab("F1", "CS102L", "B2", 2),
                CourseAssignment::non_academic("F1", "SPORTS", "B1", 2),
            ],
            term(),
        );

        for seed in 0..10 {
            let outcome = generate(&request, seed);
            assert!(outcome.is_complete(), "seed {seed}");
            assert_eq!(outcome.timetable.entry_count(), 18);
            assert_eq!(outcome.repair_passes, 0);
            assert_eq!(outcome.attempts, 1);
            let entries = &outcome.timetable.entries;
            assert!(entries.iter().all(|e| e.in_term(&term())));
        }
    }

    #[test]
    fn test_third_lab_avoids_saturated_day() {
        let lab = |f: &str, c: &str, p: u8| {
            let slot = SlotKey::new(Weekday::Mon, p);
            TimetableEntry::new(f, c, "B1", CourseType::Lab, slot, &term())
        };
        let existing = vec![
            lab("F2", "L1", 2),
            lab("F2", "L1", 3),
            lab("F3", "L2", 5),
            lab("F3", "L2", 6),
        ];
        let assignments = vec![CourseAssignment::lab("F1", "L3", "B1", 2)];
        let request = TimetableRequest::new("F1", assignments, term())
            .with_existing(existing);

        for seed in 0..20 {
            let outcome = generate(&request, seed);
            assert!(outcome.is_complete());
            let entries = &outcome.timetable.entries;
            assert!(entries.iter().all(|e| e.day() != Weekday::Mon));
        }
    }

    #[test]
    fn test_existing_entries_are_respected() {
        // Every Monday slot of B1 is taken by another faculty
        let existing: Vec<TimetableEntry> = (1..=8)
            .map(|p| {
                let slot = SlotKey::new(Weekday::Mon, p);
                TimetableEntry::new("F2", "X", "B1", CourseType::Academic, slot, &term())
            })
            .collect();
        let assignments = vec![CourseAssignment::academic("F1", "MA101", "B1", 5)];
        let request = TimetableRequest::new("F1", assignments, term())
            .with_existing(existing);

        for seed in 0..10 {
            let outcome = generate(&request, seed);
            assert!(outcome.is_complete());
            let entries = &outcome.timetable.entries;
            assert!(entries.iter().all(|e| e.day() != Weekday::Mon));
        }
    }

    #[test]
    fn test_other_terms_and_own_stale_entries_ignored() {
        let old_term = Term::new("2024-2025", "EVEN");
        let ty = CourseType::Academic;
        let mut existing = Vec::new();
        for day in crate::models::TEACHING_DAYS {
            for p in 1..=8 {
                let slot = SlotKey::new(day, p);
                existing.push(TimetableEntry::new("F2", "X", "B1", ty, slot, &old_term));
                existing.push(TimetableEntry::new("F1", "OLD", "B9", ty, slot, &term()));
            }
        }
        let assignments = vec![CourseAssignment::academic("F1", "MA101", "B1", 3)];
        let request = TimetableRequest::new("F1", assignments, term())
            .with_existing(existing);

        assert_eq!(request.fixed_entries().count(), 0);
        let outcome = generate(&request, 4);
        assert!(outcome.is_complete());
    }

    #[test]
    fn test_clean_attempt_returns_with_shortfall() {
        let request = TimetableRequest::new(
            "F1",
            vec![
                CourseAssignment::academic("F1", "MA101", "B1", 2),
                // No grid day offers eight consecutive periods after period 1
                CourseAssignment::lab("F1", "BIG", "B1", 8),
            ],
            term(),
        );
        let grid = PeriodGrid::standard();
        let config = SchedulerConfig::default().with_max_generation_attempts(3);
        let mut rng = SmallRng::seed_from_u64(9);
        let outcome = TimetableGenerator::new(&grid, &config)
            .generate(&request, &mut rng)
            .unwrap();

        // The first attempt has no violations, so no retry is made
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.repair_passes, 0);
        assert_eq!(outcome.timetable.entry_count(), 2);
        assert_eq!(outcome.shortfalls.len(), 1);
        assert_eq!(outcome.shortfalls[0].course_id, "BIG");
        assert_eq!(outcome.shortfalls[0].missing(), 8);
        assert!(!outcome.is_complete());
    }

    #[test]
    fn test_nothing_placed_fails() {
        let assignments = vec![CourseAssignment::lab("F1", "BIG", "B1", 8)];
        let request = TimetableRequest::new("F1", assignments, term());
        let grid = PeriodGrid::standard();
        let config = SchedulerConfig::default().with_max_generation_attempts(2);
        let mut rng = SmallRng::seed_from_u64(1);
        let err = TimetableGenerator::new(&grid, &config)
            .generate(&request, &mut rng)
            .unwrap_err();
        // An empty placement has no violations, so the first attempt is final
        assert_eq!(err, TimetableError::GenerationFailed { attempts: 1 });
    }

    #[test]
    fn test_multi_batch_course_shares_no_slot() {
        let request = TimetableRequest::new(
            "F1",
            vec![
                CourseAssignment::academic("F1", "CS201", "B1", 2),
                CourseAssignment::academic("F1", "CS201", "B2", 2),
            ],
            term(),
        );
        for seed in 0..10 {
            let outcome = generate(&request, seed);
            let timetable = &outcome.timetable;
            assert_eq!(timetable.entry_count(), 4);
            let slots: HashSet<SlotKey> = timetable.entries.iter().map(|e| e.slot).collect();
            assert_eq!(slots.len(), 4);
            let clashes = timetable.violation_count(ViolationKind::FacultyDoubleBooking);
            assert_eq!(clashes, 0);
        }
    }

    #[test]
    fn test_entries_sorted_by_slot() {
        let assignments = vec![CourseAssignment::academic("F1", "MA101", "B1", 5)];
        let request = TimetableRequest::new("F1", assignments, term());
        let outcome = generate(&request, 2);
        let slots: Vec<SlotKey> = outcome.timetable.entries.iter().map(|e| e.slot).collect();
        let mut sorted = slots.clone();
        sorted.sort();
        assert_eq!(slots, sorted);
    }
}
