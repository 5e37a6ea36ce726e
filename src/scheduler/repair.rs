//! Conflict repair for placements that still carry violations.
//!
//! # Algorithm
//!
//! A repair pass works on a copy of the current best placement and runs
//! three sub-passes in order:
//!
//! 1. **Lab density**: for every (batch, day) above the lab cap, move the
//!    excess lab blocks (other faculties' blocks first) to days with
//!    slack. If no such day has a free run, the block is forced onto the
//!    least loaded day with slack: entries in the way are evicted and
//!    re-placed, and the whole attempt is discarded if any of them cannot
//!    be re-placed.
//! 2. **Faculty double-booking**: for every (faculty, slot) group, keep one
//!    entry (the primary faculty's, labs before single periods) and
//!    relocate the rest.
//! 3. **Batch double-booking**: same as 2, grouped by (batch, slot).
//!
//! Relocation tries a constrained search first (course-type rules
//! honoured), then an aggressive one (occupancy only). Lab entries are
//! always relocated as their whole run. Entries that cannot be relocated
//! stay where they are, so a pass never drops an entry.
//!
//! Passes repeat while the violation count strictly decreases, up to
//! `1 + max_repair_depth` passes. The result is the best placement seen.

use std::collections::BTreeSet;

use chrono::Weekday;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, instrument, trace, warn};

use super::{EntryIdx, SlotAllocator, TimetableValidator, WorkingSet};
use crate::config::SchedulerConfig;
use crate::models::{CourseType, PeriodGrid, SlotKey, TimetableEntry, Violation, ViolationKind};

/// Result of a repair run.
#[derive(Debug, Clone)]
pub struct RepairOutcome {
    /// Best placement found.
    pub set: WorkingSet,
    /// Violations remaining in `set`.
    pub violations: Vec<Violation>,
    /// Passes executed.
    pub passes: usize,
}

/// Bounded local-search repair engine.
#[derive(Debug, Clone)]
pub struct RepairEngine<'a> {
    allocator: SlotAllocator<'a>,
    validator: TimetableValidator,
    max_repair_depth: usize,
}

/// Which occupancy a double-booking group shares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clash {
    Faculty,
    Batch,
}

impl<'a> RepairEngine<'a> {
    /// Creates a repair engine.
    pub fn new(grid: &'a PeriodGrid, config: &SchedulerConfig) -> Self {
        Self {
            allocator: SlotAllocator::new(grid, config),
            validator: TimetableValidator::from_config(config),
            max_repair_depth: config.max_repair_depth,
        }
    }

    /// Repairs `set` until violations stop decreasing.
    ///
    /// `violations` must be the current violations of `set`. The returned
    /// placement never has more violations than the input.
    #[instrument(skip_all, fields(primary = primary_faculty, initial = violations.len()))]
    pub fn repair<R: Rng + ?Sized>(
        &self,
        set: WorkingSet,
        violations: Vec<Violation>,
        primary_faculty: &str,
        rng: &mut R,
    ) -> RepairOutcome {
        let mut best = set;
        let mut best_violations = violations;
        let mut passes = 0;

        while !best_violations.is_empty() && passes <= self.max_repair_depth {
            let candidate = self.run_pass(&best, primary_faculty, rng);
            passes += 1;

            let candidate_violations = self.validator.validate_set(&candidate);
            if candidate_violations.len() < best_violations.len() {
                debug!(
                    pass = passes,
                    before = best_violations.len(),
                    after = candidate_violations.len(),
                    "repair pass improved placement"
                );
                best = candidate;
                best_violations = candidate_violations;
            } else {
                debug!(
                    pass = passes,
                    remaining = best_violations.len(),
                    "repair pass made no progress"
                );
                break;
            }
        }

        RepairOutcome {
            set: best,
            violations: best_violations,
            passes,
        }
    }

    /// Runs one pass of all sub-passes on a copy of `set`.
    pub fn run_pass<R: Rng + ?Sized>(
        &self,
        set: &WorkingSet,
        primary_faculty: &str,
        rng: &mut R,
    ) -> WorkingSet {
        let mut work = set.clone();
        self.repair_lab_density(&mut work, primary_faculty, rng);
        self.repair_double_bookings(&mut work, Clash::Faculty, primary_faculty, rng);
        self.repair_double_bookings(&mut work, Clash::Batch, primary_faculty, rng);
        work
    }

    fn repair_lab_density<R: Rng + ?Sized>(
        &self,
        work: &mut WorkingSet,
        primary_faculty: &str,
        rng: &mut R,
    ) {
        let overloaded: Vec<(String, Weekday)> = self
            .validator
            .validate_set(work)
            .into_iter()
            .filter(|v| v.kind == ViolationKind::LabDensity)
            .filter_map(|v| v.batch_id.map(|b| (b, v.day)))
            .collect();

        for (batch, day) in overloaded {
            let excess = work
                .distinct_labs(&batch, day)
                .saturating_sub(self.allocator.max_labs_per_day());
            if excess == 0 {
                continue;
            }

            let mut courses: Vec<(String, String)> = work
                .iter()
                .filter(|(_, e)| {
                    e.course_type == CourseType::Lab && e.batch_id == batch && e.day() == day
                })
                .map(|(_, e)| (e.course_id.clone(), e.faculty_id.clone()))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            courses.shuffle(rng);
            courses.sort_by_key(|(_, faculty)| faculty == primary_faculty);

            for (course, _) in courses.into_iter().take(excess) {
                self.move_lab_off_day(work, &course, &batch, day, rng);
            }
        }
    }

    /// Moves one lab block of (course, batch) away from `from_day`.
    fn move_lab_off_day<R: Rng + ?Sized>(
        &self,
        work: &mut WorkingSet,
        course_id: &str,
        batch_id: &str,
        from_day: Weekday,
        rng: &mut R,
    ) -> bool {
        let removed = take_lab_run(work, course_id, batch_id, from_day);
        let Some(template) = removed.first().cloned() else {
            return false;
        };
        let len = removed.len();

        let mut days = self
            .allocator
            .lab_days_with_slack(batch_id, work, Some(from_day));
        days.shuffle(rng);

        for &day in &days {
            if let Some(run) = self
                .allocator
                .find_lab_run(&template.faculty_id, batch_id, day, len, work)
            {
                trace!(
                    course = course_id,
                    batch = batch_id,
                    from = %from_day,
                    to = %day,
                    "lab block moved"
                );
                place_run(work, &template, &run);
                return true;
            }
        }

        let target = days.iter().copied().min_by_key(|&d| {
            let labs = work.distinct_labs(batch_id, d);
            (labs, work.batch_load(batch_id, d))
        });
        if let Some(day) = target {
            if let Some(trial) = self.force_lab_onto_day(work, &template, day, len, rng) {
                debug!(
                    course = course_id,
                    batch = batch_id,
                    from = %from_day,
                    to = %day,
                    "lab block forced"
                );
                *work = trial;
                return true;
            }
        }

        for e in removed {
            work.insert(e);
        }
        warn!(
            course = course_id,
            batch = batch_id,
            day = %from_day,
            "lab block could not be moved"
        );
        false
    }

    /// Places a lab block on `day` by evicting whatever is in the way.
    ///
    /// Returns the modified copy, or `None` if no run is free of the fixed
    /// layer or an evicted entry cannot be re-placed.
    fn force_lab_onto_day<R: Rng + ?Sized>(
        &self,
        work: &WorkingSet,
        template: &TimetableEntry,
        day: Weekday,
        len: usize,
        rng: &mut R,
    ) -> Option<WorkingSet> {
        let (faculty, batch) = (template.faculty_id.as_str(), template.batch_id.as_str());
        let run = self
            .allocator
            .lab_runs(day, len)
            .into_iter()
            .find(|run| run.iter().all(|&s| work.is_fixed_free(faculty, batch, s)))?;

        let mut trial = work.clone();
        let mut evicted = Vec::new();
        for &slot in &run {
            let blocking =
                trial.find(|e| e.slot == slot && (e.faculty_id == faculty || e.batch_id == batch));
            evicted.extend(blocking.into_iter().filter_map(|i| trial.remove(i)));
        }

        // Evicted lab periods take the rest of their block with them.
        let mut lab_blocks: Vec<Vec<TimetableEntry>> = Vec::new();
        let mut singles = Vec::new();
        for e in evicted {
            if e.course_type != CourseType::Lab {
                singles.push(e);
                continue;
            }
            let existing = lab_blocks
                .iter_mut()
                .find(|b| b[0].is_course_batch(&e.course_id, &e.batch_id) && b[0].day() == e.day());
            match existing {
                Some(block) => block.push(e),
                None => {
                    let mut block = take_lab_run(&mut trial, &e.course_id, &e.batch_id, e.day());
                    block.insert(0, e);
                    lab_blocks.push(block);
                }
            }
        }

        place_run(&mut trial, template, &run);

        for block in &lab_blocks {
            if !self.place_lab_anywhere(&mut trial, &block[0], block.len(), rng) {
                return None;
            }
        }
        for e in singles {
            if !self.place_single(&mut trial, e, rng) {
                return None;
            }
        }
        Some(trial)
    }

    fn repair_double_bookings<R: Rng + ?Sized>(
        &self,
        work: &mut WorkingSet,
        clash: Clash,
        primary_faculty: &str,
        rng: &mut R,
    ) {
        let kind = match clash {
            Clash::Faculty => ViolationKind::FacultyDoubleBooking,
            Clash::Batch => ViolationKind::BatchDoubleBooking,
        };
        let groups: Vec<(String, SlotKey)> = self
            .validator
            .validate_set(work)
            .into_iter()
            .filter(|v| v.kind == kind)
            .filter_map(|v| {
                let owner = match clash {
                    Clash::Faculty => v.faculty_id,
                    Clash::Batch => v.batch_id,
                }?;
                let period = *v.periods.first()?;
                Some((owner, SlotKey::new(v.day, period)))
            })
            .collect();

        for (owner, slot) in groups {
            let (members, held_by_fixed) = match clash {
                Clash::Faculty => (
                    work.find(|e| e.faculty_id == owner && e.slot == slot),
                    work.fixed_holds_faculty(&owner, slot),
                ),
                Clash::Batch => (
                    work.find(|e| e.batch_id == owner && e.slot == slot),
                    work.fixed_holds_batch(&owner, slot),
                ),
            };
            self.resolve_group(work, members, !held_by_fixed, primary_faculty, rng);
        }
    }

    /// Keeps at most one member of a clashing group and relocates the rest.
    fn resolve_group<R: Rng + ?Sized>(
        &self,
        work: &mut WorkingSet,
        mut members: Vec<EntryIdx>,
        keep_one: bool,
        primary_faculty: &str,
        rng: &mut R,
    ) {
        members.sort_by_key(|&i| {
            work.get(i).map_or((true, true), |e| {
                let foreign = e.faculty_id != primary_faculty;
                (foreign, e.course_type != CourseType::Lab)
            })
        });
        let skip = usize::from(keep_one);

        for idx in members.into_iter().skip(skip) {
            let Some(entry) = work.get(idx) else {
                continue;
            };
            let moved = if entry.course_type == CourseType::Lab {
                self.relocate_lab_block(work, idx, rng)
            } else {
                self.relocate_entry(work, idx, rng)
            };
            if !moved {
                trace!(idx, "entry left in place");
            }
        }
    }

    /// Moves the single entry at `idx`, or leaves it where it is.
    fn relocate_entry<R: Rng + ?Sized>(
        &self,
        work: &mut WorkingSet,
        idx: EntryIdx,
        rng: &mut R,
    ) -> bool {
        let Some(entry) = work.remove(idx) else {
            return false;
        };
        match self.find_slot(work, &entry, rng) {
            Some(slot) => {
                work.insert(entry.moved_to(slot));
                true
            }
            None => {
                work.insert(entry);
                false
            }
        }
    }

    /// Moves the whole lab block containing `idx`, or leaves it in place.
    fn relocate_lab_block<R: Rng + ?Sized>(
        &self,
        work: &mut WorkingSet,
        idx: EntryIdx,
        rng: &mut R,
    ) -> bool {
        let Some(entry) = work.get(idx).cloned() else {
            return false;
        };
        let removed = take_lab_run(work, &entry.course_id, &entry.batch_id, entry.day());
        if self.place_lab_anywhere(work, &entry, removed.len(), rng) {
            true
        } else {
            for e in removed {
                work.insert(e);
            }
            false
        }
    }

    /// Places a lab block of `len` periods on any day with slack.
    fn place_lab_anywhere<R: Rng + ?Sized>(
        &self,
        work: &mut WorkingSet,
        template: &TimetableEntry,
        len: usize,
        rng: &mut R,
    ) -> bool {
        let (faculty, batch) = (template.faculty_id.as_str(), template.batch_id.as_str());
        let mut days = self.allocator.lab_days_with_slack(batch, work, None);
        days.shuffle(rng);
        for day in days {
            if let Some(run) = self.allocator.find_lab_run(faculty, batch, day, len, work) {
                place_run(work, template, &run);
                return true;
            }
        }
        false
    }

    fn place_single<R: Rng + ?Sized>(
        &self,
        work: &mut WorkingSet,
        entry: TimetableEntry,
        rng: &mut R,
    ) -> bool {
        match self.find_slot(work, &entry, rng) {
            Some(slot) => {
                work.insert(entry.moved_to(slot));
                true
            }
            None => false,
        }
    }

    /// Constrained search, then aggressive search.
    fn find_slot<R: Rng + ?Sized>(
        &self,
        work: &WorkingSet,
        entry: &TimetableEntry,
        rng: &mut R,
    ) -> Option<SlotKey> {
        let mut slots = self.allocator.grid().teaching_keys();
        slots.retain(|&s| work.is_free(&entry.faculty_id, &entry.batch_id, s));
        slots.shuffle(rng);

        let constrained = slots.iter().copied().find(|&s| match entry.course_type {
            CourseType::Academic => !work.would_be_continuous(&entry.course_id, &entry.batch_id, s),
            CourseType::NonAcademic => !self.allocator.is_edge_period(s),
            CourseType::Lab => true,
        });
        constrained.or_else(|| slots.first().copied())
    }
}

/// Removes all lab periods of (course, batch) on `day`.
fn take_lab_run(
    work: &mut WorkingSet,
    course_id: &str,
    batch_id: &str,
    day: Weekday,
) -> Vec<TimetableEntry> {
    let run = work.find(|e| {
        e.course_type == CourseType::Lab && e.is_course_batch(course_id, batch_id) && e.day() == day
    });
    run.into_iter().filter_map(|i| work.remove(i)).collect()
}

fn place_run(work: &mut WorkingSet, template: &TimetableEntry, run: &[SlotKey]) {
    for &slot in run {
        work.insert(template.moved_to(slot));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Term, TimeSlot};
    use chrono::NaiveTime;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn term() -> Term {
        Term::new("2025-2026", "ODD")
    }

    fn theory(f: &str, c: &str, b: &str, day: Weekday, period: u8) -> TimetableEntry {
        let slot = SlotKey::new(day, period);
        TimetableEntry::new(f, c, b, CourseType::Academic, slot, &term())
    }

    fn lab(f: &str, c: &str, b: &str, day: Weekday, period: u8) -> TimetableEntry {
        let slot = SlotKey::new(day, period);
        TimetableEntry::new(f, c, b, CourseType::Lab, slot, &term())
    }

    fn run_repair(
        grid: &PeriodGrid,
        fixed: &[TimetableEntry],
        entries: Vec<TimetableEntry>,
        seed: u64,
    ) -> RepairOutcome {
        run_repair_with(grid, &SchedulerConfig::default(), fixed, entries, seed)
    }

    fn run_repair_with(
        grid: &PeriodGrid,
        config: &SchedulerConfig,
        fixed: &[TimetableEntry],
        entries: Vec<TimetableEntry>,
        seed: u64,
    ) -> RepairOutcome {
        let engine = RepairEngine::new(grid, config);
        let set = WorkingSet::with_entries(fixed, entries);
        let violations = TimetableValidator::from_config(config).validate_set(&set);
        let mut rng = SmallRng::seed_from_u64(seed);
        engine.repair(set, violations, "F1", &mut rng)
    }

    #[test]
    fn test_faculty_conflict_resolved() {
        let grid = PeriodGrid::standard();
        for seed in 0..10 {
            let entries = vec![
                theory("F1", "MA101", "B1", Weekday::Mon, 3),
                theory("F1", "MA101", "B2", Weekday::Mon, 3),
            ];
            let outcome = run_repair(&grid, &[], entries, seed);
            assert!(outcome.violations.is_empty());
            assert_eq!(outcome.set.len(), 2);
            assert_eq!(outcome.passes, 1);
        }
    }

    #[test]
    fn test_batch_conflict_with_fixed_layer() {
        let grid = PeriodGrid::standard();
        let fixed = vec![theory("F2", "PH101", "B1", Weekday::Tue, 4)];
        for seed in 0..10 {
            let entries = vec![theory("F1", "MA101", "B1", Weekday::Tue, 4)];
            let outcome = run_repair(&grid, &fixed, entries, seed);
            assert!(outcome.violations.is_empty());
            let moved = outcome.set.entries();
            assert_eq!(moved.len(), 1);
            assert_ne!(moved[0].slot, SlotKey::new(Weekday::Tue, 4));
        }
    }

    #[test]
    fn test_lab_density_moves_whole_block() {
        let grid = PeriodGrid::standard();
        for seed in 0..10 {
            let entries = vec![
                lab("F1", "L1", "B1", Weekday::Mon, 2),
                lab("F1", "L1", "B1", Weekday::Mon, 3),
                lab("F1", "L2", "B1", Weekday::Mon, 4),
                lab("F1", "L2", "B1", Weekday::Mon, 5),
                lab("F1", "L3", "B1", Weekday::Mon, 6),
                lab("F1", "L3", "B1", Weekday::Mon, 7),
            ];
            let outcome = run_repair(&grid, &[], entries, seed);
            assert!(outcome.violations.is_empty());
            assert_eq!(outcome.set.len(), 6);
            assert_eq!(outcome.set.distinct_labs("B1", Weekday::Mon), 2);

            let off_monday: Vec<TimetableEntry> = outcome
                .set
                .entries()
                .into_iter()
                .filter(|e| e.day() != Weekday::Mon)
                .collect();
            assert_eq!(off_monday.len(), 2);
            assert_eq!(off_monday[0].day(), off_monday[1].day());
            assert!(off_monday[0].slot.is_adjacent_to(&off_monday[1].slot));
            assert_eq!(off_monday[0].course_id, off_monday[1].course_id);
        }
    }

    #[test]
    fn test_forced_lab_evicts_and_replaces() {
        let grid = PeriodGrid::standard();
        let mut fixed = Vec::new();
        for day in [Weekday::Wed, Weekday::Thu, Weekday::Fri, Weekday::Sat] {
            fixed.push(lab("F9", "L8", "B1", day, 2));
            fixed.push(lab("F9", "L9", "B1", day, 3));
        }

        for seed in 0..10 {
            let entries = vec![
                lab("F1", "L1", "B1", Weekday::Mon, 2),
                lab("F1", "L1", "B1", Weekday::Mon, 3),
                lab("F1", "L2", "B1", Weekday::Mon, 4),
                lab("F1", "L2", "B1", Weekday::Mon, 5),
                lab("F1", "L3", "B1", Weekday::Mon, 6),
                lab("F1", "L3", "B1", Weekday::Mon, 7),
                // Tuesday has slack but every two-period run is blocked
                theory("F1", "T1", "B1", Weekday::Tue, 3),
                theory("F1", "T1", "B1", Weekday::Tue, 5),
                theory("F1", "T1", "B1", Weekday::Tue, 7),
            ];
            let outcome = run_repair(&grid, &fixed, entries, seed);
            assert!(outcome.violations.is_empty(), "seed {seed}");
            assert_eq!(outcome.set.len(), 9);
            assert_eq!(outcome.set.distinct_labs("B1", Weekday::Mon), 2);
            assert_eq!(outcome.set.distinct_labs("B1", Weekday::Tue), 1);
        }
    }

    #[test]
    fn test_unresolvable_conflict_keeps_entries() {
        let t = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap();
        let slot = TimeSlot::teaching(Weekday::Mon, 1, t(9), t(10));
        let grid = PeriodGrid::new(vec![slot]);
        let entries = vec![
            theory("F1", "MA101", "B1", Weekday::Mon, 1),
            theory("F1", "PH101", "B2", Weekday::Mon, 1),
        ];
        let outcome = run_repair(&grid, &[], entries, 0);
        assert_eq!(outcome.set.len(), 2);
        assert_eq!(outcome.violations.len(), 1);
        assert_eq!(outcome.passes, 1);
    }

    #[test]
    fn test_clean_input_runs_no_pass() {
        let grid = PeriodGrid::standard();
        let entries = vec![theory("F1", "MA101", "B1", Weekday::Mon, 3)];
        let outcome = run_repair(&grid, &[], entries, 0);
        assert_eq!(outcome.passes, 0);
        assert!(outcome.violations.is_empty());
    }

    #[test]
    fn test_passes_bounded_by_depth() {
        // Six batches of one faculty stacked in the same slot
        let crowded = || -> Vec<TimetableEntry> {
            (1..=6)
                .map(|b| theory("F1", "MA101", &format!("B{b}"), Weekday::Mon, 3))
                .collect()
        };
        let grid = PeriodGrid::standard();

        let shallow = SchedulerConfig::default().with_max_repair_depth(0);
        let outcome = run_repair_with(&grid, &shallow, &[], crowded(), 11);
        assert!(outcome.passes <= 1);
        assert_eq!(outcome.set.len(), 6);

        let config = SchedulerConfig::default();
        for seed in 0..10 {
            let outcome = run_repair_with(&grid, &config, &[], crowded(), seed);
            assert!(outcome.passes >= 1);
            assert!(outcome.passes <= 1 + config.max_repair_depth);
            assert!(outcome.violations.len() <= 1);
            assert_eq!(outcome.set.len(), 6);
        }
    }

    #[test]
    fn test_stops_on_first_pass_without_progress() {
        // Two slots, three entries of one faculty: the third has nowhere to go
        let t = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap();
        let grid = PeriodGrid::new(vec![
            TimeSlot::teaching(Weekday::Mon, 1, t(9), t(10)),
            TimeSlot::teaching(Weekday::Mon, 2, t(10), t(11)),
        ]);
        let config = SchedulerConfig::default();
        let before = vec![
            theory("F1", "MA101", "B1", Weekday::Mon, 1),
            theory("F1", "PH101", "B2", Weekday::Mon, 1),
            theory("F1", "CH101", "B3", Weekday::Mon, 2),
        ];
        let initial = TimetableValidator::from_config(&config).validate(&before);
        assert_eq!(initial.len(), 1);

        for seed in 0..10 {
            let outcome = run_repair_with(&grid, &config, &[], before.clone(), seed);
            assert_eq!(outcome.passes, 1);
            assert!(outcome.passes < 1 + config.max_repair_depth);
            assert_eq!(outcome.violations.len(), initial.len());
            assert_eq!(outcome.set.entries(), before);
        }
    }
}
