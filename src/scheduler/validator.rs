//! Timetable constraint validation.
//!
//! Checks a placement against the four timetabling invariants:
//!
//! | Check | Group | Violation when |
//! |-------|-------|----------------|
//! | Faculty double-booking | (faculty, slot) | more than one entry |
//! | Batch double-booking | (batch, slot) | more than one entry |
//! | Lab density | (batch, day) | more distinct lab courses than the cap |
//! | Theory continuity | (academic course, batch, day) | two periods differ by one |
//!
//! Validation is read-only and deterministic: violations come out in
//! check order, each check sorted by its group key.
//!
//! Entries persisted for other faculties can be passed as a fixed layer.
//! They count towards every group, but a group made only of fixed entries
//! is not reported.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Weekday;

use super::WorkingSet;
use crate::config::SchedulerConfig;
use crate::models::{CourseType, SlotKey, TimetableEntry, Violation};

/// Invariant checker for timetable placements.
#[derive(Debug, Clone)]
pub struct TimetableValidator {
    max_labs_per_day: usize,
}

#[derive(Default)]
struct Group {
    count: usize,
    own: bool,
}

impl Group {
    fn add(&mut self, own: bool) {
        self.count += 1;
        self.own |= own;
    }
}

impl TimetableValidator {
    /// Creates a validator with the given per-day lab cap.
    pub fn new(max_labs_per_day: usize) -> Self {
        Self { max_labs_per_day }
    }

    /// Creates a validator using the configured lab cap.
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self::new(config.max_labs_per_day)
    }

    /// Validates a standalone placement.
    pub fn validate(&self, entries: &[TimetableEntry]) -> Vec<Violation> {
        self.validate_layers(entries, &[])
    }

    /// Validates a working set against its fixed layer.
    pub fn validate_set(&self, set: &WorkingSet) -> Vec<Violation> {
        self.validate_layers(&set.entries(), set.fixed_entries())
    }

    /// Validates `own` entries on top of `fixed` entries.
    pub fn validate_layers(
        &self,
        own: &[TimetableEntry],
        fixed: &[TimetableEntry],
    ) -> Vec<Violation> {
        let layered: Vec<(&TimetableEntry, bool)> = own
            .iter()
            .map(|e| (e, true))
            .chain(fixed.iter().map(|e| (e, false)))
            .collect();

        let mut violations = Vec::new();
        violations.extend(self.check_faculty(&layered));
        violations.extend(self.check_batch(&layered));
        violations.extend(self.check_lab_density(&layered));
        violations.extend(self.check_continuity(&layered));
        violations
    }

    /// Number of violations in a standalone placement.
    pub fn count(&self, entries: &[TimetableEntry]) -> usize {
        self.validate(entries).len()
    }

    fn check_faculty(&self, layered: &[(&TimetableEntry, bool)]) -> Vec<Violation> {
        let mut groups: BTreeMap<(&str, SlotKey), Group> = BTreeMap::new();
        for &(e, own) in layered {
            groups
                .entry((e.faculty_id.as_str(), e.slot))
                .or_default()
                .add(own);
        }
        groups
            .into_iter()
            .filter(|(_, g)| g.count > 1 && g.own)
            .map(|((faculty, slot), g)| Violation::faculty_double_booking(faculty, slot, g.count))
            .collect()
    }

    fn check_batch(&self, layered: &[(&TimetableEntry, bool)]) -> Vec<Violation> {
        let mut groups: BTreeMap<(&str, SlotKey), Group> = BTreeMap::new();
        for &(e, own) in layered {
            groups
                .entry((e.batch_id.as_str(), e.slot))
                .or_default()
                .add(own);
        }
        groups
            .into_iter()
            .filter(|(_, g)| g.count > 1 && g.own)
            .map(|((batch, slot), g)| Violation::batch_double_booking(batch, slot, g.count))
            .collect()
    }

    fn check_lab_density(&self, layered: &[(&TimetableEntry, bool)]) -> Vec<Violation> {
        // (batch, day index) -> (day, distinct lab courses, has own lab)
        let mut groups: BTreeMap<(&str, u32), (Weekday, BTreeSet<&str>, bool)> = BTreeMap::new();
        for &(e, own) in layered
            .iter()
            .filter(|(e, _)| e.course_type == CourseType::Lab)
        {
            let day = e.day();
            let group = groups
                .entry((e.batch_id.as_str(), day.num_days_from_monday()))
                .or_insert_with(|| (day, BTreeSet::new(), false));
            group.1.insert(e.course_id.as_str());
            group.2 |= own;
        }
        groups
            .into_iter()
            .filter(|(_, (_, courses, own))| *own && courses.len() > self.max_labs_per_day)
            .map(|((batch, _), (day, courses, _))| {
                Violation::lab_density(batch, day, courses.len(), self.max_labs_per_day)
            })
            .collect()
    }

    fn check_continuity(&self, layered: &[(&TimetableEntry, bool)]) -> Vec<Violation> {
        // (course, batch, day index) -> (day, periods, has own entry)
        let mut groups: BTreeMap<(&str, &str, u32), (Weekday, Vec<u8>, bool)> = BTreeMap::new();
        for &(e, own) in layered
            .iter()
            .filter(|(e, _)| e.course_type == CourseType::Academic)
        {
            let day = e.day();
            let day_idx = day.num_days_from_monday();
            let group = groups
                .entry((e.course_id.as_str(), e.batch_id.as_str(), day_idx))
                .or_insert_with(|| (day, Vec::new(), false));
            group.1.push(e.period());
            group.2 |= own;
        }

        let mut violations = Vec::new();
        for ((course, batch, _), (day, mut periods, own)) in groups {
            if !own {
                continue;
            }
            periods.sort_unstable();
            for pair in periods.windows(2).filter(|p| p[1] == p[0] + 1) {
                let v = Violation::theory_continuity(course, batch, day, pair[0], pair[1]);
                violations.push(v);
            }
        }
        violations
    }
}

impl Default for TimetableValidator {
    fn default() -> Self {
        Self::from_config(&SchedulerConfig::default())
    }
}
