//! C4: population — main group, crowding staging area, object pool, tag schema and tracker
//! registry bound together as the single owner every other component borrows against.
pub mod pool;
pub mod statistics;
pub mod tracker;

use crate::chromosome::{StorageId, StructuralEvent};
use crate::contract::{ChromosomeValue, Tracker};
use crate::error::{GaError, GaResult};
use crate::group::ChromosomeGroup;
use pool::Arena;
pub use statistics::Statistics;
pub use tracker::TrackerRegistry;

const MAIN_MEMBERSHIP_BIT: u32 = 0;
const CROWDING_MEMBERSHIP_BIT: u32 = 1;

/// Construction parameters for a [`Population`]; validated by `TryFrom` rather than a constructor
/// that can panic, the same split the teacher draws between its `*Builder` structs and their
/// `TryFrom<Builder<_>>` impls.
#[derive(Copy, Clone, Debug)]
pub struct PopulationConfig {
    pub capacity: usize,
    /// Maximum number of recycled storages kept warm in the object pool; defaults to `capacity`.
    pub pool_cap: Option<usize>,
}

pub struct Population<C: ChromosomeValue> {
    arena: Arena<C>,
    main: ChromosomeGroup,
    crowding: ChromosomeGroup,
    trackers: TrackerRegistry<C>,
    statistics: Statistics,
    generation_index: usize,
    initialized: bool,
    pool_cap: usize,
    pending_removals: Vec<StorageId>,
}

impl<C: ChromosomeValue> TryFrom<PopulationConfig> for Population<C> {
    type Error = GaError;

    fn try_from(config: PopulationConfig) -> GaResult<Self> {
        if config.capacity == 0 {
            return Err(GaError::ArgumentOutOfRange(
                "population capacity must be non-zero",
            ));
        }
        Ok(Self {
            arena: Arena::new(crate::chromosome::TagSchema::new()),
            main: ChromosomeGroup::new(config.capacity, false, true)
                .with_membership_bit(MAIN_MEMBERSHIP_BIT),
            crowding: ChromosomeGroup::new(0, true, false).with_membership_bit(CROWDING_MEMBERSHIP_BIT),
            trackers: TrackerRegistry::default(),
            statistics: Statistics::new(),
            generation_index: 0,
            initialized: false,
            pool_cap: config.pool_cap.unwrap_or(config.capacity),
            pending_removals: Vec::new(),
        })
    }
}

impl<C: ChromosomeValue> Population<C> {
    pub fn arena(&self) -> &Arena<C> {
        &self.arena
    }
    pub fn arena_mut(&mut self) -> &mut Arena<C> {
        &mut self.arena
    }

    pub fn main(&self) -> &ChromosomeGroup {
        &self.main
    }
    pub fn main_mut(&mut self) -> &mut ChromosomeGroup {
        &mut self.main
    }

    pub fn crowding(&self) -> &ChromosomeGroup {
        &self.crowding
    }
    pub fn crowding_mut(&mut self) -> &mut ChromosomeGroup {
        &mut self.crowding
    }

    /// Convenience wrappers pairing the main/crowding groups with this population's own arena,
    /// useful to stage operators that would otherwise need two disjoint `&mut` borrows of `self`.
    pub fn sort_main<S: crate::contract::SortCriteria<C>>(&mut self, criteria: &S) {
        self.main.sort(&self.arena, criteria);
    }
    pub fn trim_main(&mut self, n: usize) {
        self.main.trim(&mut self.arena, n);
    }
    pub fn add_to_main(&mut self, id: StorageId) -> GaResult<i64> {
        self.main.add(&mut self.arena, id)
    }
    pub fn add_sorted_to_main<S: crate::contract::SortCriteria<C>>(
        &mut self,
        id: StorageId,
        criteria: &S,
        top_limit: usize,
    ) -> GaResult<Option<usize>> {
        self.main.add_sorted(&mut self.arena, id, criteria, top_limit)
    }
    pub fn remove_from_main(&mut self, id: StorageId) -> bool {
        self.main.remove(&mut self.arena, id, false)
    }
    pub fn add_to_crowding(&mut self, id: StorageId) -> GaResult<i64> {
        self.crowding.add(&mut self.arena, id)
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }
    pub fn statistics_mut(&mut self) -> &mut Statistics {
        &mut self.statistics
    }

    pub fn generation_index(&self) -> usize {
        self.generation_index
    }
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Registers a tag under `id`; must be called before the first storage is allocated (by
    /// `initialize` or any direct `arena_mut().insert`).
    pub fn register_tag<T, D, U>(&mut self, id: u32, default: D, updater: U) -> GaResult<()>
    where
        T: Clone + std::fmt::Debug + Send + Sync + 'static,
        D: Fn() -> T + Send + Sync + 'static,
        U: Fn(&mut T, StructuralEvent) + Send + Sync + 'static,
    {
        self.arena.register_tag(id, default, updater)
    }

    pub fn register_tracker(&mut self, id: u32, tracker: Box<dyn Tracker<C>>) {
        self.trackers.register(id, tracker);
    }
    pub fn unregister_tracker(&mut self, id: u32) -> bool {
        self.trackers.unregister(id)
    }

    /// Marks `id` for removal from the main group at the next `next_generation` call, rather than
    /// removing it immediately (so removals agreed on mid-generation are applied together at the
    /// single point the spec designates for structural changes).
    pub fn queue_removal(&mut self, id: StorageId) {
        self.pending_removals.push(id);
    }

    /// Fills the main group to capacity using `generate`, optionally applying `fitness` in
    /// individual-evaluation mode to each newly created chromosome, then marks the population
    /// initialized.
    pub fn initialize<FGen, FFit>(&mut self, mut generate: FGen, fitness: Option<FFit>) -> GaResult<()>
    where
        FGen: FnMut() -> C,
        FFit: Fn(&C) -> Vec<crate::chromosome::FitnessValue>,
    {
        if self.initialized {
            return Err(GaError::InvalidOperation("population is already initialized"));
        }
        while self.main.len() < self.main.capacity() {
            let chromosome = generate();
            let id = self.arena.insert(chromosome);
            if let Some(fitness) = &fitness {
                let value = fitness(self.arena.get(id).expect("just inserted").chromosome());
                self.arena
                    .get_mut(id)
                    .expect("just inserted")
                    .set_raw_fitness(value);
            }
            self.main.add(&mut self.arena, id)?;
            let schema = self.arena.tag_schema().clone();
            schema.dispatch(
                self.arena.get_mut(id).expect("just inserted").tags_mut(),
                StructuralEvent::Inserted,
            );
        }
        self.initialized = true;
        Ok(())
    }

    /// Dispatches every registered tracker exactly once (P3), finalizes queued removals, promotes
    /// crowding-space offspring into the main group, advances the generation counter, and caps the
    /// object pool.
    pub fn next_generation(&mut self) {
        let mut trackers = std::mem::take(&mut self.trackers);
        trackers.dispatch(self, self.generation_index);
        self.trackers = trackers;

        for id in std::mem::take(&mut self.pending_removals) {
            self.main.remove(&mut self.arena, id, false);
        }

        for id in self.crowding.members().to_vec() {
            let _ = self.main.add(&mut self.arena, id);
        }
        self.crowding.clear(&mut self.arena);

        self.generation_index += 1;
        self.arena.cap_pool(self.pool_cap);
        log::debug!(
            "generation {}: main size {}, pool size {}",
            self.generation_index,
            self.main.len(),
            self.arena.pool_size(),
        );
    }
}
