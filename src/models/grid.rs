//! Weekly period grid.
//!
//! The grid is the fixed calendar every timetable is laid onto: an ordered
//! list of time slots per weekday, each either a teaching period or a break.
//!
//! # Slot Model
//! Teaching slots carry period numbers starting at 1. Break slots carry
//! period number 0 and are never assigned. A teaching slot is addressed by
//! its [`SlotKey`] (day + period number).
//!
//! # Standard Grid
//! [`PeriodGrid::standard`] builds the Monday–Saturday calendar with
//! 8 teaching periods and 3 breaks per day (48 teaching slots per week).

use std::cmp::Ordering;
use std::fmt;

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// Teaching days of the standard week, in calendar order.
pub const TEACHING_DAYS: [Weekday; 6] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

const ALL_DAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Period number reserved for break slots.
pub const BREAK_PERIOD: u8 = 0;

/// Coordinate of a teaching slot in the weekly grid.
///
/// Ordered by weekday (Monday first), then by period number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotKey {
    /// Day of the week.
    pub day: Weekday,
    /// Period number within the day (1-based).
    pub period: u8,
}

impl SlotKey {
    /// Creates a slot key.
    pub fn new(day: Weekday, period: u8) -> Self {
        Self { day, period }
    }

    /// Whether `other` is on the same day and one period before or after.
    #[inline]
    pub fn is_adjacent_to(&self, other: &SlotKey) -> bool {
        self.day == other.day && self.period.abs_diff(other.period) == 1
    }
}

impl Ord for SlotKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.day
            .num_days_from_monday()
            .cmp(&other.day.num_days_from_monday())
            .then(self.period.cmp(&other.period))
    }
}

impl PartialOrd for SlotKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} period {}", self.day, self.period)
    }
}

/// A single cell of the weekly grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    /// Day of the week.
    pub day: Weekday,
    /// Period number (0 for breaks).
    pub period: u8,
    /// Start time of day.
    pub start: NaiveTime,
    /// End time of day.
    pub end: NaiveTime,
    /// Whether this slot is a break (never assigned).
    pub is_break: bool,
}

impl TimeSlot {
    /// Creates a teaching slot.
    pub fn teaching(day: Weekday, period: u8, start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            day,
            period,
            start,
            end,
            is_break: false,
        }
    }

    /// Creates a break slot.
    pub fn break_slot(day: Weekday, start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            day,
            period: BREAK_PERIOD,
            start,
            end,
            is_break: true,
        }
    }

    /// The slot's grid coordinate.
    #[inline]
    pub fn key(&self) -> SlotKey {
        SlotKey::new(self.day, self.period)
    }

    /// Slot length in minutes.
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// The read-only weekly grid consumed by the scheduler.
///
/// Slots are kept sorted by day and start time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeriodGrid {
    slots: Vec<TimeSlot>,
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default()
}

impl PeriodGrid {
    /// Creates a grid from arbitrary slots.
    pub fn new(mut slots: Vec<TimeSlot>) -> Self {
        slots.sort_by(|a, b| {
            a.day
                .num_days_from_monday()
                .cmp(&b.day.num_days_from_monday())
                .then(a.start.cmp(&b.start))
        });
        Self { slots }
    }

    /// The standard Monday–Saturday grid.
    ///
    /// | Slot | Time |
    /// |------|------|
    /// | P1 | 09:00–09:50 |
    /// | P2 | 09:50–10:40 |
    /// | break | 10:40–10:50 |
    /// | P3 | 10:50–11:40 |
    /// | P4 | 11:40–12:30 |
    /// | lunch | 12:30–13:10 |
    /// | P5 | 13:10–14:00 |
    /// | P6 | 14:00–14:50 |
    /// | break | 14:50–15:00 |
    /// | P7 | 15:00–15:50 |
    /// | P8 | 15:50–16:40 |
    pub fn standard() -> Self {
        let mut slots = Vec::with_capacity(TEACHING_DAYS.len() * 11);
        for day in TEACHING_DAYS {
            slots.push(TimeSlot::teaching(day, 1, hm(9, 0), hm(9, 50)));
            slots.push(TimeSlot::teaching(day, 2, hm(9, 50), hm(10, 40)));
            slots.push(TimeSlot::break_slot(day, hm(10, 40), hm(10, 50)));
            slots.push(TimeSlot::teaching(day, 3, hm(10, 50), hm(11, 40)));
            slots.push(TimeSlot::teaching(day, 4, hm(11, 40), hm(12, 30)));
            slots.push(TimeSlot::break_slot(day, hm(12, 30), hm(13, 10)));
            slots.push(TimeSlot::teaching(day, 5, hm(13, 10), hm(14, 0)));
            slots.push(TimeSlot::teaching(day, 6, hm(14, 0), hm(14, 50)));
            slots.push(TimeSlot::break_slot(day, hm(14, 50), hm(15, 0)));
            slots.push(TimeSlot::teaching(day, 7, hm(15, 0), hm(15, 50)));
            slots.push(TimeSlot::teaching(day, 8, hm(15, 50), hm(16, 40)));
        }
        Self::new(slots)
    }

    /// All slots, breaks included.
    pub fn slots(&self) -> &[TimeSlot] {
        &self.slots
    }

    /// Whether the grid has no teaching slots at all.
    pub fn is_empty(&self) -> bool {
        !self.slots.iter().any(|s| !s.is_break)
    }

    /// Keys of all teaching slots, ordered by day then period.
    pub fn teaching_keys(&self) -> Vec<SlotKey> {
        let mut keys: Vec<SlotKey> = self
            .slots
            .iter()
            .filter(|s| !s.is_break)
            .map(TimeSlot::key)
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Keys of the teaching slots on `day`, ordered by period.
    pub fn teaching_keys_on(&self, day: Weekday) -> Vec<SlotKey> {
        let mut keys: Vec<SlotKey> = self
            .slots
            .iter()
            .filter(|s| !s.is_break && s.day == day)
            .map(TimeSlot::key)
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Days that have at least one teaching slot, Monday first.
    pub fn days(&self) -> Vec<Weekday> {
        ALL_DAYS
            .into_iter()
            .filter(|&d| self.slots.iter().any(|s| !s.is_break && s.day == d))
            .collect()
    }

    /// Lowest teaching period number on `day`.
    pub fn first_period(&self, day: Weekday) -> Option<u8> {
        self.teaching_keys_on(day).first().map(|k| k.period)
    }

    /// Highest teaching period number on `day`.
    pub fn last_period(&self, day: Weekday) -> Option<u8> {
        self.teaching_keys_on(day).last().map(|k| k.period)
    }

    /// Resolves a key to its teaching slot.
    pub fn slot(&self, key: SlotKey) -> Option<&TimeSlot> {
        self.slots
            .iter()
            .find(|s| !s.is_break && s.day == key.day && s.period == key.period)
    }

    /// Whether `key` names a teaching slot of this grid.
    pub fn contains(&self, key: SlotKey) -> bool {
        self.slot(key).is_some()
    }

    /// Total number of teaching slots per week.
    pub fn teaching_slot_count(&self) -> usize {
        self.teaching_keys().len()
    }

    /// Candidate lab runs of `len` consecutive periods on `day`.
    ///
    /// Only periods numbered above `min_period` are considered. Windows are
    /// taken over the day's teaching periods in order and kept only when
    /// their period numbers increase by exactly one at every step.
    pub fn consecutive_runs(&self, day: Weekday, len: usize, min_period: u8) -> Vec<Vec<SlotKey>> {
        if len == 0 {
            return Vec::new();
        }
        let keys: Vec<SlotKey> = self
            .teaching_keys_on(day)
            .into_iter()
            .filter(|k| k.period > min_period)
            .collect();
        keys.windows(len)
            .filter(|w| w.windows(2).all(|p| p[1].period == p[0].period + 1))
            .map(<[SlotKey]>::to_vec)
            .collect()
    }

    /// Length of the longest lab run available on any day.
    pub fn longest_run(&self, min_period: u8) -> usize {
        self.days()
            .into_iter()
            .map(|day| {
                let keys: Vec<u8> = self
                    .teaching_keys_on(day)
                    .into_iter()
                    .map(|k| k.period)
                    .filter(|&p| p > min_period)
                    .collect();
                let mut best = 0;
                let mut current = 0;
                let mut prev: Option<u8> = None;
                for p in keys {
                    current = match prev {
                        Some(q) if p == q + 1 => current + 1,
                        _ => 1,
                    };
                    best = best.max(current);
                    prev = Some(p);
                }
                best
            })
            .max()
            .unwrap_or(0)
    }
}
