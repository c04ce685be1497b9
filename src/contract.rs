//! External interfaces: the contracts a caller implements to plug a concrete chromosome
//! representation, comparator, or tracker into the engine.
//!
//! Concrete chromosome encodings (arrays, lists, trees, alleles) and their crossover/mutation
//! primitives are out of scope for the core; only the shapes below are specified, exactly as the
//! teacher crate specifies `Fitness`/`Select`/`Crossover` as traits bound to a caller-supplied
//! `Genotype` (see `src/fitness.rs`, `src/select.rs` upstream).
use crate::chromosome::ChromosomeStorage;
use crate::population::Population;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Lifecycle event the engine reports back to a chromosome around a mutation attempt, so a
/// representation can keep cached derived state (e.g. a fitness cache, a validity flag) honest.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MutationEvent {
    /// About to attempt a mutation; the chromosome has not changed yet.
    Prepare,
    /// The mutation was accepted (kept).
    Accept,
    /// The mutation was rejected and rolled back.
    Reject,
}

/// Chromosome Config Block: shared, reference-counted invariants for a representation family
/// (allele ranges, gene counts, ...). Implementations are opaque to the core.
pub trait Ccb: Send + Sync + fmt::Debug {}

/// The chromosome contract (see GLOSSARY). `Allele` concrete types never appear in the core; it
/// only needs `clone`, the mutation lifecycle hook, and a shared reference to its config block.
pub trait ChromosomeValue: Clone + Send + Sync + fmt::Debug {
    type Config: Ccb;

    fn config(&self) -> &Arc<Self::Config>;

    /// Called by the mating contract around a mutation attempt (see `improving_only_mutations`).
    fn mutation_event(&mut self, event: MutationEvent);
}

/// Set of admissible gene values for a generic value type `V`, out of scope for concrete encodings
/// but specified here as the contract the core's mating machinery calls through.
pub trait AlleleSet<V>: Send + Sync {
    fn generate(&self) -> V;
    /// Returns `true` if `value` could be inverted in place (representation-dependent; some
    /// allele sets have no well-defined inverse for every value).
    fn inverse(&self, value: &mut V) -> bool;
    fn belongs(&self, value: &V) -> bool;
    fn closest(&self, value: &mut V);
    fn count(&self) -> i64;
}

/// Deterministic, reflexive fitness comparator. Negative means `a` worse than `b`, zero means
/// equal under the relation, positive means `a` better than `b`.
pub trait FitnessComparator<T>: Clone + Send + Sync + fmt::Debug {
    fn compare(&self, a: &T, b: &T) -> i32;
}

/// A comparator built from a plain `Fn`, for callers who don't need a named type.
#[derive(Clone)]
pub struct FnFitnessComparator<T, F>(pub F, std::marker::PhantomData<T>);

impl<T, F> FnFitnessComparator<T, F>
where
    F: Fn(&T, &T) -> i32 + Clone + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f, std::marker::PhantomData)
    }
}

impl<T, F> fmt::Debug for FnFitnessComparator<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnFitnessComparator(..)")
    }
}

impl<T, F> FitnessComparator<T> for FnFitnessComparator<T, F>
where
    F: Fn(&T, &T) -> i32 + Clone + Send + Sync,
{
    fn compare(&self, a: &T, b: &T) -> i32 {
        (self.0)(a, b)
    }
}

/// Total pre-order on chromosome storages, used by `ChromosomeGroup::sort`/`add_sorted`. Either a
/// static, zero-sized type (monomorphized away) or a dynamic boxed comparator with `clone`, mirroring
/// `Select`/`Compete`'s static-dispatch-by-default-dynamic-when-needed split upstream.
pub trait SortCriteria<C: ChromosomeValue>: Clone + Send + Sync {
    fn compare(&self, a: &ChromosomeStorage<C>, b: &ChromosomeStorage<C>) -> Ordering;
}

/// Statistics tracker contract. `update` must be called exactly once per generation per registered
/// tracker (P3).
pub trait Tracker<C: ChromosomeValue>: Send + Sync + fmt::Debug {
    fn update(&mut self, population: &Population<C>, generation_index: usize);
}
