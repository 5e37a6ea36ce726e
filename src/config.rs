//! Scheduler configuration.
//!
//! All search bounds live here. Defaults reproduce the standard policy:
//! 10 generation attempts, 5 further repair passes, at most 2 labs per
//! batch per day. The struct deserializes from any serde format, with
//! missing fields falling back to the defaults.

use serde::{Deserialize, Serialize};

/// Bounds and policy for timetable generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Randomized generation attempts before falling back to repair.
    pub max_generation_attempts: usize,
    /// Repair passes allowed after the first one, while violations keep
    /// strictly decreasing.
    pub max_repair_depth: usize,
    /// Distinct lab courses a batch may have on one day.
    pub max_labs_per_day: usize,
    /// Seed for the random source. `None` draws a fresh seed per run.
    pub seed: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_generation_attempts: 10,
            max_repair_depth: 5,
            max_labs_per_day: 2,
            seed: None,
        }
    }
}

impl SchedulerConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of generation attempts (at least 1).
    pub fn with_max_generation_attempts(mut self, attempts: usize) -> Self {
        self.max_generation_attempts = attempts.max(1);
        self
    }

    /// Sets the repair depth bound.
    pub fn with_max_repair_depth(mut self, depth: usize) -> Self {
        self.max_repair_depth = depth;
        self
    }

    /// Sets the per-day lab cap (at least 1).
    pub fn with_max_labs_per_day(mut self, labs: usize) -> Self {
        self.max_labs_per_day = labs.max(1);
        self
    }

    /// Fixes the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = SchedulerConfig::default();
        assert_eq!(c.max_generation_attempts, 10);
        assert_eq!(c.max_repair_depth, 5);
        assert_eq!(c.max_labs_per_day, 2);
        assert_eq!(c.seed, None);
    }

    #[test]
    fn test_builders_clamp() {
        let c = SchedulerConfig::new()
            .with_max_generation_attempts(0)
            .with_max_labs_per_day(0)
            .with_max_repair_depth(0)
            .with_seed(7);
        assert_eq!(c.max_generation_attempts, 1);
        assert_eq!(c.max_labs_per_day, 1);
        assert_eq!(c.max_repair_depth, 0);
        assert_eq!(c.seed, Some(7));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let c: SchedulerConfig =
            serde_json::from_str(r#"{"max_labs_per_day": 3, "seed": 42}"#).unwrap();
        assert_eq!(c.max_labs_per_day, 3);
        assert_eq!(c.seed, Some(42));
        assert_eq!(c.max_generation_attempts, 10);
        assert_eq!(c.max_repair_depth, 5);
    }
}
