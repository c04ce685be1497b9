//! Population-scoped statistics counters (part of C4; see §6 External Interfaces "Statistics ids").
//!
//! The framework reserves a small id range for its own counters (stage timings, mating/crossover
//! counts); everything from [`USER_RANGE_START`] up is free for caller-defined counters. Grounded on
//! the teacher's `EvolveReporter`/`HillClimbReporter` running counters in `src/strategy/mod.rs`,
//! generalized from named struct fields to an id-keyed map since this crate does not know the full
//! set of counters a given algorithm stub will want ahead of time.
use rustc_hash::FxHashMap;

pub const STAT_SELECTION_TIME_NS: u32 = 0;
pub const STAT_COUPLING_TIME_NS: u32 = 1;
pub const STAT_REPLACEMENT_TIME_NS: u32 = 2;
pub const STAT_MATING_COUNT: u32 = 3;
pub const STAT_CROSSOVER_COUNT: u32 = 4;
pub const STAT_MUTATION_ATTEMPTED: u32 = 5;
pub const STAT_MUTATION_ACCEPTED: u32 = 6;

/// First id available to caller-defined statistics; below this is the framework's reserved range.
pub const USER_RANGE_START: u32 = 0x100;

#[derive(Debug, Default, Clone)]
pub struct Statistics {
    counters: FxHashMap<u32, i64>,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, id: u32, by: i64) {
        *self.counters.entry(id).or_insert(0) += by;
    }

    pub fn set(&mut self, id: u32, value: i64) {
        self.counters.insert(id, value);
    }

    pub fn get(&self, id: u32) -> i64 {
        self.counters.get(&id).copied().unwrap_or(0)
    }

    pub fn reset(&mut self, id: u32) {
        self.counters.remove(&id);
    }

    pub fn clear(&mut self) {
        self.counters.clear();
    }
}
