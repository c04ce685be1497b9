//! C2: chromosome storage & tags.
//!
//! A storage object wraps a caller-supplied chromosome with both fitness slots, a 32-bit flag word
//! (membership bitset, grounded on the teacher's use of `fixedbitset::FixedBitSet` in
//! `src/genotype.rs` for compact per-gene state), and a schema-driven tag array (see
//! [`tags`]).
pub mod tags;

use crate::contract::ChromosomeValue;
use fixedbitset::FixedBitSet;
use std::cmp::Reverse;

pub use tags::{StructuralEvent, Tag, TagSchema};

/// Scalar fitness type. `f64` rather than the teacher's `isize` `FitnessValue`, since scaled
/// fitness here is genuinely a vector of scalars (multi-objective scaling operators produce
/// several components) and floating scaling math is the norm for SPEA/PESA/RDGA-style operators.
pub type FitnessValue = f64;

/// Number of bits in the membership/flag word (see §3 Data Model — "32-bit flag word").
pub const FLAG_WORD_BITS: usize = 32;

/// A generational index into a population's storage arena, guarding against stale references after
/// a slot is recycled — the same generation-counter idea the `hawkw/sharded-slab` pack example uses
/// in `src/page.rs` to keep freed slots from aliasing live ones.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct StorageId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

/// Total pre-order driven by a caller comparator applied to a storage's scaled fitness, descending
/// (best first). Used anywhere the spec calls for "current order" (Top-N/Bottom-N selection,
/// `add_sorted`'s protected prefix).
#[derive(Copy, Clone, Debug, Default)]
pub struct ByScaledFitnessDesc(pub usize);

impl<C: ChromosomeValue> crate::contract::SortCriteria<C> for ByScaledFitnessDesc {
    fn compare(&self, a: &ChromosomeStorage<C>, b: &ChromosomeStorage<C>) -> std::cmp::Ordering {
        let key = |s: &ChromosomeStorage<C>| {
            s.scaled_fitness()
                .and_then(|f| f.get(self.0).copied())
                .map(OrderedF64)
        };
        Reverse(key(a)).cmp(&Reverse(key(b)))
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
struct OrderedF64(f64);
impl Eq for OrderedF64 {}
impl PartialOrd for OrderedF64 {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for OrderedF64 {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Chromosome storage: owns one chromosome, both fitness slots, the flag word, and the tag array
/// (C2).
#[derive(Debug)]
pub struct ChromosomeStorage<C: ChromosomeValue> {
    chromosome: C,
    raw_fitness: Option<Vec<FitnessValue>>,
    scaled_fitness: Option<Vec<FitnessValue>>,
    flags: FixedBitSet,
    tags: Vec<Box<dyn Tag>>,
    offspring: bool,
}

impl<C: ChromosomeValue> ChromosomeStorage<C> {
    pub fn new(chromosome: C, tags: Vec<Box<dyn Tag>>) -> Self {
        Self {
            chromosome,
            raw_fitness: None,
            scaled_fitness: None,
            flags: FixedBitSet::with_capacity(FLAG_WORD_BITS),
            tags,
            offspring: false,
        }
    }

    pub fn chromosome(&self) -> &C {
        &self.chromosome
    }
    pub fn chromosome_mut(&mut self) -> &mut C {
        &mut self.chromosome
    }

    pub fn raw_fitness(&self) -> Option<&[FitnessValue]> {
        self.raw_fitness.as_deref()
    }
    pub fn set_raw_fitness(&mut self, fitness: Vec<FitnessValue>) {
        self.raw_fitness = Some(fitness);
    }
    pub fn clear_raw_fitness(&mut self) {
        self.raw_fitness = None;
    }

    pub fn scaled_fitness(&self) -> Option<&[FitnessValue]> {
        self.scaled_fitness.as_deref()
    }
    pub fn set_scaled_fitness(&mut self, fitness: Vec<FitnessValue>) {
        self.scaled_fitness = Some(fitness);
    }
    pub fn clear_scaled_fitness(&mut self) {
        self.scaled_fitness = None;
    }

    /// Whether this storage was produced as offspring this generation (as opposed to a surviving
    /// parent); replacement operators use this to tell the two populations of chromosomes apart.
    pub fn is_offspring(&self) -> bool {
        self.offspring
    }
    pub fn set_offspring(&mut self, offspring: bool) {
        self.offspring = offspring;
    }

    pub fn flag_test(&self, bit: u32) -> bool {
        self.flags[bit as usize]
    }
    pub fn flag_set(&mut self, bit: u32) {
        self.flags.set(bit as usize, true);
    }
    pub fn flag_clear(&mut self, bit: u32) {
        self.flags.set(bit as usize, false);
    }

    pub fn tag(&self, position: usize) -> &dyn Tag {
        self.tags[position].as_ref()
    }
    pub fn tag_mut(&mut self, position: usize) -> &mut dyn Tag {
        self.tags[position].as_mut()
    }
    pub fn tags_mut(&mut self) -> &mut [Box<dyn Tag>] {
        &mut self.tags
    }

    /// Copies chromosome + fitness state from `source`, for the object pool's recycle-on-return
    /// path (mirrors the teacher's `Population::new_chromosome`/`copy_from`).
    pub fn copy_from(&mut self, source: &ChromosomeStorage<C>) {
        self.chromosome = source.chromosome.clone();
        self.raw_fitness = source.raw_fitness.clone();
        self.scaled_fitness = source.scaled_fitness.clone();
        self.flags.clear();
        self.offspring = source.offspring;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{Ccb, SortCriteria};
    use std::sync::Arc;

    #[derive(Debug)]
    struct TestCcb;
    impl Ccb for TestCcb {}

    #[derive(Clone, Debug)]
    struct TestChromosome {
        config: Arc<TestCcb>,
    }
    impl ChromosomeValue for TestChromosome {
        type Config = TestCcb;
        fn config(&self) -> &Arc<TestCcb> {
            &self.config
        }
        fn mutation_event(&mut self, _event: crate::contract::MutationEvent) {}
    }

    fn storage(fitness: f64) -> ChromosomeStorage<TestChromosome> {
        let mut s = ChromosomeStorage::new(
            TestChromosome {
                config: Arc::new(TestCcb),
            },
            Vec::new(),
        );
        s.set_scaled_fitness(vec![fitness]);
        s
    }

    #[test]
    fn flags_round_trip() {
        let mut s = storage(1.0);
        assert!(!s.flag_test(3));
        s.flag_set(3);
        assert!(s.flag_test(3));
        s.flag_clear(3);
        assert!(!s.flag_test(3));
    }

    #[test]
    fn sort_criteria_orders_descending() {
        let a = storage(9.0);
        let b = storage(3.0);
        let criteria = ByScaledFitnessDesc(0);
        assert_eq!(criteria.compare(&a, &b), std::cmp::Ordering::Less);
    }
}
