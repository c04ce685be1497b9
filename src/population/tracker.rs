//! Tracker registry (part of C4): dispatches `update` to every registered tracker exactly once per
//! generation (P3). Grounded on the teacher's `Reporter` trait dispatch in `src/strategy/mod.rs`,
//! generalized from a single reporter slot to an id-keyed registry so multiple independent trackers
//! (population-size, best-fitness-so-far, diversity, ...) can coexist.
use crate::contract::{ChromosomeValue, Tracker};
use rustc_hash::FxHashMap;

pub struct TrackerRegistry<C: ChromosomeValue> {
    trackers: FxHashMap<u32, Box<dyn Tracker<C>>>,
}

impl<C: ChromosomeValue> Default for TrackerRegistry<C> {
    fn default() -> Self {
        Self {
            trackers: FxHashMap::default(),
        }
    }
}

impl<C: ChromosomeValue> TrackerRegistry<C> {
    pub fn register(&mut self, id: u32, tracker: Box<dyn Tracker<C>>) {
        self.trackers.insert(id, tracker);
    }

    pub fn unregister(&mut self, id: u32) -> bool {
        self.trackers.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }
    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }

    pub(crate) fn dispatch(&mut self, population: &super::Population<C>, generation_index: usize) {
        for tracker in self.trackers.values_mut() {
            tracker.update(population, generation_index);
        }
    }
}
