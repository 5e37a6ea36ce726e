//! Per-assignment slot allocation.
//!
//! # Algorithm
//!
//! Each course type has its own placement rule:
//!
//! - **Lab**: the whole requirement goes on one day as one run of
//!   consecutive periods, never in period 1. Days are tried in random
//!   order; days on which the batch already has the maximum number of
//!   distinct labs are skipped. The first free run found is committed
//!   atomically. Nothing is placed otherwise.
//! - **Non-academic**: one period at a time, never in a day's first or
//!   last period, preferring days not used yet by the assignment.
//! - **Academic** (theory): one period at a time in a random free slot
//!   that is not adjacent to another period of the same (course, batch).
//!   When one course is taught to several batches, the batches share a
//!   set of slots already used by their siblings, so the course does not
//!   occupy the same slot twice.
//!
//! Placement is best-effort: allocators return the number of periods
//! placed and never error.

use std::collections::HashSet;

use chrono::Weekday;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, trace};

use super::WorkingSet;
use crate::config::SchedulerConfig;
use crate::models::{CourseAssignment, CourseType, PeriodGrid, SlotKey, Term, TimetableEntry};

/// Lab runs never start in or include periods at or below this number.
const LAB_MIN_PERIOD: u8 = 1;

/// Slot allocator bound to a grid and lab policy.
#[derive(Debug, Clone)]
pub struct SlotAllocator<'a> {
    grid: &'a PeriodGrid,
    max_labs_per_day: usize,
}

impl<'a> SlotAllocator<'a> {
    /// Creates an allocator.
    pub fn new(grid: &'a PeriodGrid, config: &SchedulerConfig) -> Self {
        Self {
            grid,
            max_labs_per_day: config.max_labs_per_day,
        }
    }

    /// The grid slots are drawn from.
    pub fn grid(&self) -> &PeriodGrid {
        self.grid
    }

    /// Places one assignment by its course type, returning periods placed.
    ///
    /// Academic assignments are placed without siblings; use
    /// [`allocate_theory_group`](Self::allocate_theory_group) for courses
    /// taught to several batches.
    pub fn allocate<R: Rng + ?Sized>(
        &self,
        assignment: &CourseAssignment,
        term: &Term,
        set: &mut WorkingSet,
        rng: &mut R,
    ) -> usize {
        match assignment.course_type {
            CourseType::Lab => self.allocate_lab(assignment, term, set, rng),
            CourseType::NonAcademic => self.allocate_non_academic(assignment, term, set, rng),
            CourseType::Academic => {
                let mut siblings = HashSet::new();
                self.allocate_theory(assignment, term, set, &mut siblings, rng)
            }
        }
    }

    /// Places a lab block as one consecutive run on one day.
    ///
    /// Returns the block length on success, 0 otherwise.
    pub fn allocate_lab<R: Rng + ?Sized>(
        &self,
        assignment: &CourseAssignment,
        term: &Term,
        set: &mut WorkingSet,
        rng: &mut R,
    ) -> usize {
        let len = assignment.periods_per_week as usize;
        if len == 0 {
            return 0;
        }

        let mut days = self.lab_days_with_slack(&assignment.batch_id, set, None);
        days.shuffle(rng);

        for day in days {
            if let Some(run) =
                self.find_lab_run(&assignment.faculty_id, &assignment.batch_id, day, len, set)
            {
                trace!(
                    course = %assignment.course_id,
                    batch = %assignment.batch_id,
                    %day,
                    "lab run placed"
                );
                for slot in run {
                    set.insert(TimetableEntry::for_assignment(assignment, slot, term));
                }
                return len;
            }
        }

        debug!(
            course = %assignment.course_id,
            batch = %assignment.batch_id,
            periods = len,
            "no day offers a free lab run"
        );
        0
    }

    /// Places non-academic periods away from the edges of the day.
    pub fn allocate_non_academic<R: Rng + ?Sized>(
        &self,
        assignment: &CourseAssignment,
        term: &Term,
        set: &mut WorkingSet,
        rng: &mut R,
    ) -> usize {
        let required = assignment.periods_per_week as usize;
        let mut used_days: HashSet<Weekday> = HashSet::new();
        let mut placed = 0;

        while placed < required {
            let (mut fresh, mut used): (Vec<Weekday>, Vec<Weekday>) = self
                .grid
                .days()
                .into_iter()
                .partition(|d| !used_days.contains(d));
            fresh.shuffle(rng);
            used.shuffle(rng);

            let found = fresh.into_iter().chain(used).find_map(|day| {
                let mut slots = self.inner_slots(day);
                slots.shuffle(rng);
                slots
                    .into_iter()
                    .find(|&s| set.is_free(&assignment.faculty_id, &assignment.batch_id, s))
            });

            match found {
                Some(slot) => {
                    set.insert(TimetableEntry::for_assignment(assignment, slot, term));
                    used_days.insert(slot.day);
                    placed += 1;
                }
                None => break,
            }
        }

        if placed < required {
            debug!(
                course = %assignment.course_id,
                batch = %assignment.batch_id,
                placed,
                required,
                "non-academic course partially placed"
            );
        }
        placed
    }

    /// Places theory periods one at a time.
    ///
    /// `siblings` holds slots already taken by other batches of the same
    /// course; slots placed here are added to it.
    pub fn allocate_theory<R: Rng + ?Sized>(
        &self,
        assignment: &CourseAssignment,
        term: &Term,
        set: &mut WorkingSet,
        siblings: &mut HashSet<SlotKey>,
        rng: &mut R,
    ) -> usize {
        let required = assignment.periods_per_week as usize;
        let mut placed = 0;

        while placed < required {
            let mut candidates = self.grid.teaching_keys();
            candidates.shuffle(rng);

            let found = candidates.into_iter().find(|&slot| {
                !siblings.contains(&slot)
                    && set.is_free(&assignment.faculty_id, &assignment.batch_id, slot)
                    && !set.would_be_continuous(&assignment.course_id, &assignment.batch_id, slot)
            });

            match found {
                Some(slot) => {
                    set.insert(TimetableEntry::for_assignment(assignment, slot, term));
                    siblings.insert(slot);
                    placed += 1;
                }
                None => break,
            }
        }

        if placed < required {
            debug!(
                course = %assignment.course_id,
                batch = %assignment.batch_id,
                placed,
                required,
                "theory course partially placed"
            );
        }
        placed
    }

    /// Places one theory course taught to several batches.
    ///
    /// Returns periods placed per assignment, in input order.
    pub fn allocate_theory_group<R: Rng + ?Sized>(
        &self,
        group: &[&CourseAssignment],
        term: &Term,
        set: &mut WorkingSet,
        rng: &mut R,
    ) -> Vec<usize> {
        let mut siblings = HashSet::new();
        group
            .iter()
            .map(|a| self.allocate_theory(a, term, set, &mut siblings, rng))
            .collect()
    }

    /// First run of `len` consecutive periods on `day` where both the
    /// faculty and the batch are free.
    pub fn find_lab_run(
        &self,
        faculty_id: &str,
        batch_id: &str,
        day: Weekday,
        len: usize,
        set: &WorkingSet,
    ) -> Option<Vec<SlotKey>> {
        self.grid
            .consecutive_runs(day, len, LAB_MIN_PERIOD)
            .into_iter()
            .find(|run| run.iter().all(|&s| set.is_free(faculty_id, batch_id, s)))
    }

    /// Candidate lab runs of `len` periods on `day`, free or not.
    pub fn lab_runs(&self, day: Weekday, len: usize) -> Vec<Vec<SlotKey>> {
        self.grid.consecutive_runs(day, len, LAB_MIN_PERIOD)
    }

    /// Days on which the batch is below the lab cap, Monday first.
    pub fn lab_days_with_slack(
        &self,
        batch_id: &str,
        set: &WorkingSet,
        exclude: Option<Weekday>,
    ) -> Vec<Weekday> {
        self.grid
            .days()
            .into_iter()
            .filter(|&d| Some(d) != exclude)
            .filter(|&d| set.distinct_labs(batch_id, d) < self.max_labs_per_day)
            .collect()
    }

    /// Per-day lab cap.
    pub fn max_labs_per_day(&self) -> usize {
        self.max_labs_per_day
    }

    /// Whether `slot` is the first or last teaching period of its day.
    pub fn is_edge_period(&self, slot: SlotKey) -> bool {
        self.grid.first_period(slot.day) == Some(slot.period)
            || self.grid.last_period(slot.day) == Some(slot.period)
    }

    /// Teaching slots on `day` excluding the first and last period.
    fn inner_slots(&self, day: Weekday) -> Vec<SlotKey> {
        let keys = self.grid.teaching_keys_on(day);
        if keys.len() <= 2 {
            return Vec::new();
        }
        keys[1..keys.len() - 1].to_vec()
    }
}
