//! Arena-style working set of timetable entries.
//!
//! Entries live in an index-addressable arena; removal leaves a tombstone so
//! indices handed out earlier stay meaningful for the rest of a pass.
//! Occupancy lookups (faculty/batch per slot, course-batch per slot, distinct
//! labs per batch-day) are kept in two layers:
//!
//! - **fixed**: entries already persisted for other faculties. Read-only,
//!   shared between clones.
//! - **placed**: entries in the arena. Updated on every insert/remove.
//!
//! A slot is free for a (faculty, batch) pair only if neither layer has the
//! faculty or the batch in it.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Weekday;

use crate::models::{CourseType, SlotKey, TimetableEntry};

/// Index of an entry in a [`WorkingSet`] arena.
pub type EntryIdx = usize;

type SlotCounts = HashMap<SlotKey, u32>;

#[derive(Debug, Clone, Default)]
struct Occupancy {
    faculty: HashMap<String, SlotCounts>,
    batch: HashMap<String, SlotCounts>,
    course_batch: HashMap<String, HashMap<String, SlotCounts>>,
    labs: HashMap<String, HashMap<Weekday, HashMap<String, u32>>>,
    batch_day_load: HashMap<String, HashMap<Weekday, u32>>,
}

fn bump(counts: &mut HashMap<SlotKey, u32>, slot: SlotKey, add: bool) {
    if add {
        *counts.entry(slot).or_insert(0) += 1;
    } else if let Some(n) = counts.get_mut(&slot) {
        *n = n.saturating_sub(1);
        if *n == 0 {
            counts.remove(&slot);
        }
    }
}

fn bump_named<K>(counts: &mut HashMap<K, u32>, key: K, add: bool)
where
    K: std::hash::Hash + Eq,
{
    if add {
        *counts.entry(key).or_insert(0) += 1;
    } else if let Some(n) = counts.get_mut(&key) {
        *n = n.saturating_sub(1);
        if *n == 0 {
            counts.remove(&key);
        }
    }
}

impl Occupancy {
    fn apply(&mut self, e: &TimetableEntry, add: bool) {
        bump(
            self.faculty.entry(e.faculty_id.clone()).or_default(),
            e.slot,
            add,
        );
        bump(
            self.batch.entry(e.batch_id.clone()).or_default(),
            e.slot,
            add,
        );
        bump(
            self.course_batch
                .entry(e.course_id.clone())
                .or_default()
                .entry(e.batch_id.clone())
                .or_default(),
            e.slot,
            add,
        );
        bump_named(
            self.batch_day_load.entry(e.batch_id.clone()).or_default(),
            e.day(),
            add,
        );
        if e.course_type == CourseType::Lab {
            bump_named(
                self.labs
                    .entry(e.batch_id.clone())
                    .or_default()
                    .entry(e.day())
                    .or_default(),
                e.course_id.clone(),
                add,
            );
        }
    }

    fn faculty_at(&self, faculty_id: &str, slot: SlotKey) -> u32 {
        self.faculty
            .get(faculty_id)
            .and_then(|c| c.get(&slot))
            .copied()
            .unwrap_or(0)
    }

    fn batch_at(&self, batch_id: &str, slot: SlotKey) -> u32 {
        self.batch
            .get(batch_id)
            .and_then(|c| c.get(&slot))
            .copied()
            .unwrap_or(0)
    }

    fn course_batch_at(&self, course_id: &str, batch_id: &str, slot: SlotKey) -> u32 {
        self.course_batch
            .get(course_id)
            .and_then(|m| m.get(batch_id))
            .and_then(|c| c.get(&slot))
            .copied()
            .unwrap_or(0)
    }

    fn labs_on(&self, batch_id: &str, day: Weekday) -> Option<&HashMap<String, u32>> {
        self.labs.get(batch_id).and_then(|m| m.get(&day))
    }

    fn load_on(&self, batch_id: &str, day: Weekday) -> u32 {
        self.batch_day_load
            .get(batch_id)
            .and_then(|m| m.get(&day))
            .copied()
            .unwrap_or(0)
    }
}

/// Owned, cloneable placement state used by allocation and repair.
///
/// Cloning copies the arena and the placed layer; the fixed layer is shared.
#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    entries: Vec<Option<TimetableEntry>>,
    live: usize,
    placed: Occupancy,
    fixed: Arc<Occupancy>,
    fixed_entries: Arc<Vec<TimetableEntry>>,
}

impl WorkingSet {
    /// Creates an empty working set over a fixed layer.
    pub fn new<'a, I>(fixed: I) -> Self
    where
        I: IntoIterator<Item = &'a TimetableEntry>,
    {
        let fixed_entries: Vec<TimetableEntry> = fixed.into_iter().cloned().collect();
        let mut occupancy = Occupancy::default();
        for e in &fixed_entries {
            occupancy.apply(e, true);
        }
        Self {
            entries: Vec::new(),
            live: 0,
            placed: Occupancy::default(),
            fixed: Arc::new(occupancy),
            fixed_entries: Arc::new(fixed_entries),
        }
    }

    /// Creates a working set holding `entries` over a fixed layer.
    pub fn with_entries<'a, I>(fixed: I, entries: Vec<TimetableEntry>) -> Self
    where
        I: IntoIterator<Item = &'a TimetableEntry>,
    {
        let mut set = Self::new(fixed);
        for e in entries {
            set.insert(e);
        }
        set
    }

    /// An empty working set sharing this set's fixed layer.
    pub fn fresh(&self) -> Self {
        Self {
            entries: Vec::new(),
            live: 0,
            placed: Occupancy::default(),
            fixed: Arc::clone(&self.fixed),
            fixed_entries: Arc::clone(&self.fixed_entries),
        }
    }

    /// Adds an entry and returns its index.
    pub fn insert(&mut self, entry: TimetableEntry) -> EntryIdx {
        self.placed.apply(&entry, true);
        self.entries.push(Some(entry));
        self.live += 1;
        self.entries.len() - 1
    }

    /// Removes an entry, leaving a tombstone.
    pub fn remove(&mut self, idx: EntryIdx) -> Option<TimetableEntry> {
        let entry = self.entries.get_mut(idx)?.take()?;
        self.placed.apply(&entry, false);
        self.live -= 1;
        Some(entry)
    }

    /// Entry at `idx`, if still present.
    pub fn get(&self, idx: EntryIdx) -> Option<&TimetableEntry> {
        self.entries.get(idx).and_then(Option::as_ref)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Whether the arena holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Live entries with their indices, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (EntryIdx, &TimetableEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (i, e)))
    }

    /// Indices of live entries matching `pred`.
    pub fn find<F>(&self, pred: F) -> Vec<EntryIdx>
    where
        F: Fn(&TimetableEntry) -> bool,
    {
        self.iter()
            .filter(|(_, e)| pred(e))
            .map(|(i, _)| i)
            .collect()
    }

    /// Live entries, cloned, in insertion order.
    pub fn entries(&self) -> Vec<TimetableEntry> {
        self.iter().map(|(_, e)| e.clone()).collect()
    }

    /// Consumes the set, returning live entries in insertion order.
    pub fn into_entries(self) -> Vec<TimetableEntry> {
        self.entries.into_iter().flatten().collect()
    }

    /// Entries of the fixed layer.
    pub fn fixed_entries(&self) -> &[TimetableEntry] {
        &self.fixed_entries
    }

    /// Whether the faculty has no entry at `slot` in either layer.
    pub fn is_faculty_free(&self, faculty_id: &str, slot: SlotKey) -> bool {
        self.placed.faculty_at(faculty_id, slot) == 0
            && self.fixed.faculty_at(faculty_id, slot) == 0
    }

    /// Whether the batch has no entry at `slot` in either layer.
    pub fn is_batch_free(&self, batch_id: &str, slot: SlotKey) -> bool {
        self.placed.batch_at(batch_id, slot) == 0 && self.fixed.batch_at(batch_id, slot) == 0
    }

    /// Both hard occupancy checks.
    #[inline]
    pub fn is_free(&self, faculty_id: &str, batch_id: &str, slot: SlotKey) -> bool {
        self.is_faculty_free(faculty_id, slot) && self.is_batch_free(batch_id, slot)
    }

    /// Both hard occupancy checks against the fixed layer only.
    pub fn is_fixed_free(&self, faculty_id: &str, batch_id: &str, slot: SlotKey) -> bool {
        !self.fixed_holds_faculty(faculty_id, slot) && !self.fixed_holds_batch(batch_id, slot)
    }

    /// Whether the fixed layer has the faculty at `slot`.
    pub fn fixed_holds_faculty(&self, faculty_id: &str, slot: SlotKey) -> bool {
        self.fixed.faculty_at(faculty_id, slot) > 0
    }

    /// Whether the fixed layer has the batch at `slot`.
    pub fn fixed_holds_batch(&self, batch_id: &str, slot: SlotKey) -> bool {
        self.fixed.batch_at(batch_id, slot) > 0
    }

    /// Whether placing (course, batch) at `slot` would sit directly before
    /// or after another period of the same pair.
    pub fn would_be_continuous(&self, course_id: &str, batch_id: &str, slot: SlotKey) -> bool {
        let neighbours = [slot.period.checked_sub(1), slot.period.checked_add(1)];
        neighbours.into_iter().flatten().any(|p| {
            let n = SlotKey::new(slot.day, p);
            self.placed.course_batch_at(course_id, batch_id, n) > 0
                || self.fixed.course_batch_at(course_id, batch_id, n) > 0
        })
    }

    /// Distinct lab courses the batch has on `day`, both layers combined.
    pub fn distinct_labs(&self, batch_id: &str, day: Weekday) -> usize {
        let placed = self.placed.labs_on(batch_id, day);
        let fixed = self.fixed.labs_on(batch_id, day);
        match (placed, fixed) {
            (None, None) => 0,
            (Some(p), None) => p.len(),
            (None, Some(f)) => f.len(),
            (Some(p), Some(f)) => p.len() + f.keys().filter(|k| !p.contains_key(*k)).count(),
        }
    }

    /// Entries the batch has on `day`, both layers combined.
    pub fn batch_load(&self, batch_id: &str, day: Weekday) -> usize {
        (self.placed.load_on(batch_id, day) + self.fixed.load_on(batch_id, day)) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Term;

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

    #[test]
    fn test_insert_remove_tombstones() {
        let mut set = WorkingSet::default();
        let a = set.insert(theory("F1", "C1", "B1", Weekday::Mon, 2));
        let b = set.insert(theory("F1", "C1", "B1", Weekday::Tue, 2));
        assert_eq!(set.len(), 2);

        let removed = set.remove(a).unwrap();
        assert_eq!(removed.day(), Weekday::Mon);
        assert!(set.get(a).is_none());
        assert!(set.remove(a).is_none());
        assert_eq!(set.get(b).unwrap().day(), Weekday::Tue);
        assert_eq!(set.len(), 1);
        assert_eq!(set.iter().map(|(i, _)| i).collect::<Vec<_>>(), vec![b]);
    }

    #[test]
    fn test_occupancy_tracks_both_layers() {
        let fixed = vec![theory("F2", "C9", "B1", Weekday::Mon, 3)];
        let mut set = WorkingSet::new(&fixed);
        let slot = SlotKey::new(Weekday::Mon, 3);

        assert!(set.is_faculty_free("F1", slot));
        assert!(!set.is_batch_free("B1", slot));
        assert!(!set.is_free("F1", "B1", slot));
        assert!(set.is_free("F1", "B2", slot));
        assert!(!set.is_fixed_free("F1", "B1", slot));

        let idx = set.insert(theory("F1", "C1", "B2", Weekday::Mon, 4));
        assert!(!set.is_faculty_free("F1", SlotKey::new(Weekday::Mon, 4)));
        assert!(set.is_fixed_free("F1", "B2", SlotKey::new(Weekday::Mon, 4)));
        set.remove(idx);
        assert!(set.is_faculty_free("F1", SlotKey::new(Weekday::Mon, 4)));
    }

    #[test]
    fn test_duplicate_occupancy_counts() {
        let mut set = WorkingSet::default();
        let slot = SlotKey::new(Weekday::Wed, 5);
        let a = set.insert(theory("F1", "C1", "B1", Weekday::Wed, 5));
        set.insert(theory("F1", "C2", "B2", Weekday::Wed, 5));
        set.remove(a);
        // One entry still holds F1 at the slot
        assert!(!set.is_faculty_free("F1", slot));
        assert!(set.is_batch_free("B1", slot));
    }

    #[test]
    fn test_continuity_lookup() {
        let mut set = WorkingSet::default();
        set.insert(theory("F1", "C1", "B1", Weekday::Thu, 4));

        let thu = |period| SlotKey::new(Weekday::Thu, period);
        assert!(set.would_be_continuous("C1", "B1", thu(3)));
        assert!(set.would_be_continuous("C1", "B1", thu(5)));
        assert!(!set.would_be_continuous("C1", "B1", thu(6)));
        assert!(!set.would_be_continuous("C1", "B2", thu(5)));
        let fri = SlotKey::new(Weekday::Fri, 5);
        assert!(!set.would_be_continuous("C1", "B1", fri));
    }

    #[test]
    fn test_distinct_labs_merge_layers() {
        let fixed = vec![
            lab("F2", "L1", "B1", Weekday::Mon, 2),
            lab("F2", "L1", "B1", Weekday::Mon, 3),
        ];
        let mut set = WorkingSet::new(&fixed);
        assert_eq!(set.distinct_labs("B1", Weekday::Mon), 1);

        set.insert(lab("F1", "L2", "B1", Weekday::Mon, 5));
        set.insert(lab("F1", "L2", "B1", Weekday::Mon, 6));
        assert_eq!(set.distinct_labs("B1", Weekday::Mon), 2);
        assert_eq!(set.distinct_labs("B1", Weekday::Tue), 0);
        assert_eq!(set.batch_load("B1", Weekday::Mon), 4);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut set = WorkingSet::default();
        set.insert(theory("F1", "C1", "B1", Weekday::Mon, 2));
        let mut copy = set.clone();
        copy.remove(0);
        assert_eq!(set.len(), 1);
        assert!(copy.is_empty());
        assert!(!set.is_faculty_free("F1", SlotKey::new(Weekday::Mon, 2)));
        assert!(copy.is_faculty_free("F1", SlotKey::new(Weekday::Mon, 2)));
        assert!(copy.fresh().is_empty());
    }
}
