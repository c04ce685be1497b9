//! The storage arena backing a population: allocation, recycling (the "object pool" of C4), and
//! generation-guarded [`StorageId`] lookups.
//!
//! Grounded two ways: the recycle-instead-of-drop policy mirrors the teacher's
//! `Population::new_chromosome`/`drop_chromosome`/`recycling_bin` in `src/population.rs`; the
//! generation counter guarding reused slots against stale ids is the same technique the
//! `hawkw/sharded-slab` pack example uses for its page slots (`src/page.rs`), needed here because,
//! unlike the teacher's flat `Vec<Chromosome>`, several independent groups hold onto the same
//! storage by id and must not be fooled by a recycled slot.
use crate::chromosome::{ChromosomeStorage, StructuralEvent, TagSchema};
use crate::contract::ChromosomeValue;
use crate::chromosome::StorageId;
use crate::error::{GaError, GaResult};

pub struct Arena<C: ChromosomeValue> {
    slots: Vec<Option<ChromosomeStorage<C>>>,
    generations: Vec<u32>,
    /// Indices whose slot still holds a storage object, ready to be overwritten in place.
    recyclable: Vec<u32>,
    /// Indices whose slot is empty and must be freshly populated.
    empty: Vec<u32>,
    tag_schema: TagSchema,
    allocated_any: bool,
}

impl<C: ChromosomeValue> Arena<C> {
    pub fn new(tag_schema: TagSchema) -> Self {
        Self {
            slots: Vec::new(),
            generations: Vec::new(),
            recyclable: Vec::new(),
            empty: Vec::new(),
            tag_schema,
            allocated_any: false,
        }
    }

    pub fn tag_schema(&self) -> &TagSchema {
        &self.tag_schema
    }

    /// Registers a tag in the schema. Must happen before the first storage is allocated (see
    /// `Population::initialize`), matching the spec's "register_tag ... before the first storage
    /// is allocated" contract.
    pub fn register_tag<T, D, U>(&mut self, id: u32, default: D, updater: U) -> GaResult<()>
    where
        T: Clone + std::fmt::Debug + Send + Sync + 'static,
        D: Fn() -> T + Send + Sync + 'static,
        U: Fn(&mut T, StructuralEvent) + Send + Sync + 'static,
    {
        if self.allocated_any {
            return Err(GaError::InvalidOperation(
                "tag schema is closed after the first storage allocation",
            ));
        }
        self.tag_schema.register(id, default, updater);
        Ok(())
    }

    fn is_valid(&self, id: StorageId) -> bool {
        self.generations
            .get(id.index as usize)
            .is_some_and(|g| *g == id.generation)
    }

    /// Allocates a storage wrapping `chromosome`, trying the pool before the heap.
    pub fn insert(&mut self, chromosome: C) -> StorageId {
        self.allocated_any = true;
        if let Some(index) = self.recyclable.pop() {
            let slot = self.slots[index as usize]
                .as_mut()
                .expect("recyclable slot must retain its storage object");
            *slot = ChromosomeStorage::new(chromosome, self.tag_schema.new_tags());
            return StorageId {
                index,
                generation: self.generations[index as usize],
            };
        }
        if let Some(index) = self.empty.pop() {
            self.slots[index as usize] =
                Some(ChromosomeStorage::new(chromosome, self.tag_schema.new_tags()));
            return StorageId {
                index,
                generation: self.generations[index as usize],
            };
        }
        let index = self.slots.len() as u32;
        self.generations.push(0);
        self.slots
            .push(Some(ChromosomeStorage::new(chromosome, self.tag_schema.new_tags())));
        StorageId { index, generation: 0 }
    }

    /// Returns the storage to the pool, bumping its generation so outstanding [`StorageId`]s
    /// become stale. Returns `false` if `id` was already stale.
    pub fn recycle(&mut self, id: StorageId) -> bool {
        if !self.is_valid(id) {
            return false;
        }
        self.generations[id.index as usize] = self.generations[id.index as usize].wrapping_add(1);
        self.recyclable.push(id.index);
        true
    }

    /// Drops storages beyond `max_pool_size`, reclaiming their memory entirely.
    pub fn cap_pool(&mut self, max_pool_size: usize) {
        while self.recyclable.len() > max_pool_size {
            if let Some(index) = self.recyclable.pop() {
                self.slots[index as usize] = None;
                self.empty.push(index);
            }
        }
    }

    pub fn pool_size(&self) -> usize {
        self.recyclable.len()
    }

    pub fn get(&self, id: StorageId) -> Option<&ChromosomeStorage<C>> {
        if !self.is_valid(id) {
            return None;
        }
        self.slots[id.index as usize].as_ref()
    }

    pub fn get_mut(&mut self, id: StorageId) -> Option<&mut ChromosomeStorage<C>> {
        if !self.is_valid(id) {
            return None;
        }
        self.slots[id.index as usize].as_mut()
    }
}
