//! Timetable quality metrics (KPIs).
//!
//! Computes placement and load indicators from a generated timetable and
//! the assignments it was generated for.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Placement Rate | placed periods / required periods |
//! | Shortfall | required periods not placed, per assignment |
//! | Violations by Kind | residual violations per invariant |
//! | Entries by Day | placed periods per weekday |
//! | Faculty Utilization | faculty periods / teaching slots per week |
//! | Day Spread | distinct days used per (course, batch), averaged |

use std::collections::{HashMap, HashSet};

use chrono::Weekday;

use super::Shortfall;
use crate::models::{CourseAssignment, PeriodGrid, Timetable, ViolationKind};

/// Timetable performance indicators.
#[derive(Debug, Clone)]
pub struct TimetableKpi {
    /// Periods required by the assignments.
    pub required_periods: usize,
    /// Periods placed for the assignments.
    pub placed_periods: usize,
    /// Fraction of required periods placed (0.0..1.0).
    pub placement_rate: f64,
    /// Required periods left unplaced.
    pub shortfall_periods: usize,
    /// Assignments left short, in assignment order.
    pub shortfalls: Vec<Shortfall>,
    /// Residual violations per kind.
    pub violations_by_kind: HashMap<ViolationKind, usize>,
    /// Placed entries per weekday.
    pub entries_by_day: HashMap<Weekday, usize>,
    /// Per-faculty share of the week's teaching slots (0.0..1.0).
    pub utilization_by_faculty: HashMap<String, f64>,
    /// Mean of `utilization_by_faculty`.
    pub avg_utilization: f64,
    /// Mean number of distinct days per (course, batch) pair.
    pub avg_day_spread: f64,
}

impl TimetableKpi {
    /// Computes KPIs for a timetable.
    ///
    /// # Arguments
    /// * `timetable` - The generated entries and their violations.
    /// * `assignments` - The assignments the timetable was generated for.
    /// * `grid` - The period grid (for utilization).
    pub fn calculate(
        timetable: &Timetable,
        assignments: &[CourseAssignment],
        grid: &PeriodGrid,
    ) -> Self {
        let mut required: usize = 0;
        let mut placed: usize = 0;
        let mut spread_total: usize = 0;

        for a in assignments {
            let matching: Vec<_> = timetable
                .entries
                .iter()
                .filter(|e| e.belongs_to(a))
                .collect();
            let need = a.periods_per_week as usize;
            required += need;
            placed += matching.len().min(need);

            let days: HashSet<Weekday> = matching.iter().map(|e| e.day()).collect();
            spread_total += days.len();
        }

        let mut violations_by_kind = HashMap::new();
        for v in &timetable.violations {
            *violations_by_kind.entry(v.kind).or_insert(0) += 1;
        }

        let mut entries_by_day = HashMap::new();
        let mut periods_by_faculty: HashMap<String, usize> = HashMap::new();
        for e in &timetable.entries {
            *entries_by_day.entry(e.day()).or_insert(0) += 1;
            *periods_by_faculty.entry(e.faculty_id.clone()).or_insert(0) += 1;
        }

        let slots = grid.teaching_slot_count();
        let utilization_by_faculty: HashMap<String, f64> = periods_by_faculty
            .into_iter()
            .map(|(f, n)| {
                let u = if slots == 0 { 0.0 } else { n as f64 / slots as f64 };
                (f, u)
            })
            .collect();
        let avg_utilization = if utilization_by_faculty.is_empty() {
            0.0
        } else {
            let sum: f64 = utilization_by_faculty.values().sum();
            sum / utilization_by_faculty.len() as f64
        };

        let placement_rate = if required == 0 {
            1.0
        } else {
            placed as f64 / required as f64
        };

        let avg_day_spread = if assignments.is_empty() {
            0.0
        } else {
            spread_total as f64 / assignments.len() as f64
        };

        Self {
            required_periods: required,
            placed_periods: placed,
            placement_rate,
            shortfall_periods: required - placed,
            shortfalls: Shortfall::collect(assignments, &timetable.entries),
            violations_by_kind,
            entries_by_day,
            utilization_by_faculty,
            avg_utilization,
            avg_day_spread,
        }
    }

    /// Total residual violations.
    pub fn total_violations(&self) -> usize {
        self.violations_by_kind.values().sum()
    }

    /// Whether the timetable meets the given quality thresholds.
    pub fn meets_thresholds(&self, min_placement_rate: f64, max_violations: usize) -> bool {
        self.placement_rate >= min_placement_rate && self.total_violations() <= max_violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CourseType, SlotKey, Term, TimetableEntry, Violation};

    fn term() -> Term {
        Term::new("2025-2026", "ODD")
    }

    fn academic(course: &str, batch: &str, day: Weekday, period: u8) -> TimetableEntry {
        let slot = SlotKey::new(day, period);
        TimetableEntry::new("F1", course, batch, CourseType::Academic, slot, &term())
    }

    #[test]
    fn test_kpi_full_placement() {
        let grid = PeriodGrid::standard();
        let assignments = vec![CourseAssignment::academic("F1", "MA101", "B1", 2)];
        let timetable = Timetable::new(
            vec![
                academic("MA101", "B1", Weekday::Mon, 2),
                academic("MA101", "B1", Weekday::Wed, 2),
            ],
            Vec::new(),
        );

        let kpi = TimetableKpi::calculate(&timetable, &assignments, &grid);
        assert_eq!(kpi.required_periods, 2);
        assert_eq!(kpi.placed_periods, 2);
        assert_eq!(kpi.shortfall_periods, 0);
        assert!((kpi.placement_rate - 1.0).abs() < 1e-10);
        assert!((kpi.avg_day_spread - 2.0).abs() < 1e-10);
        assert_eq!(kpi.entries_by_day[&Weekday::Mon], 1);
        // 2 of 48 teaching slots
        let utilization = kpi.utilization_by_faculty["F1"];
        assert!((utilization - 2.0 / 48.0).abs() < 1e-10);
    }

    #[test]
    fn test_kpi_shortfall() {
        let grid = PeriodGrid::standard();
        let assignments = vec![
            CourseAssignment::academic("F1", "MA101", "B1", 3),
            CourseAssignment::lab("F1", "L1", "B1", 2),
        ];
        let timetable = Timetable::new(vec![academic("MA101", "B1", Weekday::Mon, 2)], Vec::new());

        let kpi = TimetableKpi::calculate(&timetable, &assignments, &grid);
        assert_eq!(kpi.required_periods, 5);
        assert_eq!(kpi.placed_periods, 1);
        assert_eq!(kpi.shortfall_periods, 4);
        assert_eq!(kpi.shortfalls.len(), 2);
        assert_eq!(kpi.shortfalls[1].missing(), 2);
        assert!((kpi.placement_rate - 0.2).abs() < 1e-10);
    }

    #[test]
    fn test_kpi_violations() {
        let grid = PeriodGrid::standard();
        let slot = SlotKey::new(Weekday::Tue, 3);
        let timetable = Timetable::new(
            Vec::new(),
            vec![
                Violation::faculty_double_booking("F1", slot, 2),
                Violation::batch_double_booking("B1", slot, 2),
                Violation::batch_double_booking("B2", slot, 2),
            ],
        );

        let kpi = TimetableKpi::calculate(&timetable, &[], &grid);
        assert_eq!(kpi.total_violations(), 3);
        let batch_clashes = kpi.violations_by_kind[&ViolationKind::BatchDoubleBooking];
        assert_eq!(batch_clashes, 2);
        assert!(kpi.meets_thresholds(1.0, 3));
        assert!(!kpi.meets_thresholds(1.0, 2));
    }

    #[test]
    fn test_kpi_empty() {
        let kpi = TimetableKpi::calculate(&Timetable::default(), &[], &PeriodGrid::standard());
        assert_eq!(kpi.required_periods, 0);
        assert!((kpi.placement_rate - 1.0).abs() < 1e-10);
        assert!((kpi.avg_utilization - 0.0).abs() < 1e-10);
        assert!((kpi.avg_day_spread - 0.0).abs() < 1e-10);
    }
}
