//! Persistence boundary and the per-faculty generation service.
//!
//! [`TimetableStore`] is the contract a persistence backend implements.
//! [`TimetableService`] serializes generation requests over a store: each
//! request snapshots the term's entries, generates against the other
//! faculties' entries, and replaces the requesting faculty's entries only
//! when generation succeeds.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, instrument};

use crate::config::SchedulerConfig;
use crate::error::TimetableResult;
use crate::models::{CourseAssignment, PeriodGrid, Term, TimetableEntry};
use crate::scheduler::{GenerationOutcome, TimetableRequest, TimetableScheduler};

/// Storage of persisted timetable entries.
pub trait TimetableStore {
    /// All entries of `term`, any faculty.
    fn entries_for_term(&self, term: &Term) -> Vec<TimetableEntry>;

    /// Replaces every entry of `faculty_id` in `term` with `entries`.
    fn replace_faculty_entries(
        &mut self,
        faculty_id: &str,
        term: &Term,
        entries: Vec<TimetableEntry>,
    );

    /// Entries of one faculty in `term`, sorted by slot.
    fn faculty_timetable(&self, faculty_id: &str, term: &Term) -> Vec<TimetableEntry> {
        sorted(
            self.entries_for_term(term)
                .into_iter()
                .filter(|e| e.faculty_id == faculty_id)
                .collect(),
        )
    }

    /// Entries of one batch in `term`, sorted by slot.
    fn batch_timetable(&self, batch_id: &str, term: &Term) -> Vec<TimetableEntry> {
        sorted(
            self.entries_for_term(term)
                .into_iter()
                .filter(|e| e.batch_id == batch_id)
                .collect(),
        )
    }
}

fn sorted(mut entries: Vec<TimetableEntry>) -> Vec<TimetableEntry> {
    entries.sort_by(|a, b| {
        a.slot
            .cmp(&b.slot)
            .then_with(|| a.course_id.cmp(&b.course_id))
    });
    entries
}

/// `Vec`-backed store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    entries: Vec<TimetableEntry>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `entries`.
    pub fn with_entries(entries: Vec<TimetableEntry>) -> Self {
        Self { entries }
    }

    /// All stored entries.
    pub fn entries(&self) -> &[TimetableEntry] {
        &self.entries
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TimetableStore for InMemoryStore {
    fn entries_for_term(&self, term: &Term) -> Vec<TimetableEntry> {
        self.entries
            .iter()
            .filter(|e| e.in_term(term))
            .cloned()
            .collect()
    }

    fn replace_faculty_entries(
        &mut self,
        faculty_id: &str,
        term: &Term,
        entries: Vec<TimetableEntry>,
    ) {
        self.entries
            .retain(|e| !(e.faculty_id == faculty_id && e.in_term(term)));
        self.entries.extend(entries);
    }
}

/// Serialized generation over a shared store.
#[derive(Debug)]
pub struct TimetableService<S> {
    store: Mutex<S>,
    scheduler: TimetableScheduler,
}

impl<S: TimetableStore> TimetableService<S> {
    /// Creates a service with the default configuration.
    pub fn new(store: S) -> Self {
        Self::with_config(store, SchedulerConfig::default())
    }

    /// Creates a service with the given configuration.
    pub fn with_config(store: S, config: SchedulerConfig) -> Self {
        Self {
            store: Mutex::new(store),
            scheduler: TimetableScheduler::with_config(config),
        }
    }

    /// Generates and persists one faculty's timetable for `term`.
    ///
    /// On error the store is left unchanged.
    #[instrument(
        skip(self, assignments, grid, term),
        fields(year = %term.academic_year, semester = %term.semester)
    )]
    pub fn generate(
        &self,
        faculty_id: &str,
        assignments: Vec<CourseAssignment>,
        grid: &PeriodGrid,
        term: &Term,
    ) -> TimetableResult<GenerationOutcome> {
        let mut store = self.lock();
        let existing = store.entries_for_term(term);
        debug!(persisted = existing.len(), "snapshot taken");

        let request = TimetableRequest::new(faculty_id, assignments, term.clone())
            .with_existing(existing);
        let outcome = self.scheduler.schedule(&request, grid)?;

        store.replace_faculty_entries(faculty_id, term, outcome.timetable.entries.clone());
        info!(entries = outcome.timetable.entry_count(), "faculty timetable replaced");
        Ok(outcome)
    }

    /// Persisted entries of one faculty, sorted by slot.
    pub fn faculty_timetable(&self, faculty_id: &str, term: &Term) -> Vec<TimetableEntry> {
        self.lock().faculty_timetable(faculty_id, term)
    }

    /// Persisted entries of one batch, sorted by slot.
    pub fn batch_timetable(&self, batch_id: &str, term: &Term) -> Vec<TimetableEntry> {
        self.lock().batch_timetable(batch_id, term)
    }

    /// Consumes the service, returning the store.
    pub fn into_store(self) -> S {
        self.store
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> MutexGuard<'_, S> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
