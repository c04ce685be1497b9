//! C9: algorithm stub — owns a branch group and a typed set of the steps it wires onto the canonical
//! flow, patching them in place when a setup mutator runs and tearing everything down on disconnect.
//!
//! Grounded on the teacher's top-level `HillClimb`/`EvolveConfig` orchestration in `src/strategy/`,
//! generalized from one fixed algorithm loop into the general connect/patch/disconnect protocol the
//! spec specifies, since here the flow topology itself (which conditional edges exist) depends on
//! which setups are currently attached rather than being fixed at compile time.
pub mod simple;
pub mod multi_objective;

use crate::contract::ChromosomeValue;
use crate::error::GaResult;
use crate::flow::FlowGraph;
use crate::population::Population;
use crate::scheduler::BranchScheduler;
use crate::store::{DataId, DataStore, Scope};
use std::sync::RwLock;

/// Reserved data-id range for a stub's own pipeline-private scratch (selection/coupling output
/// groups, the population handle itself); user ids occupy the rest of the id space.
pub const STUB_DATA_RANGE: std::ops::RangeInclusive<DataId> = 0x8000..=0x800F;

pub const POPULATION_DATA_ID: DataId = 0x8000;
pub const PARENTS_DATA_ID: DataId = 0x8001;
pub const OFFSPRING_DATA_ID: DataId = 0x8002;

/// Minimal surface every algorithm stub exposes: wire itself onto a [`FlowGraph`] at `connect`, tear
/// everything back down at `disconnect`. A stub is not thread-safe with respect to its own mutators;
/// the scheduler must be stopped before any re-wiring (see §4.9).
pub trait AlgorithmStub<C: ChromosomeValue> {
    /// Creates the branch group's scratch data, builds every operator step, wires the canonical flow
    /// and its conditional edges, and returns the entry node the flow graph should start its walk
    /// from. `branch_count` is fixed for the lifetime of this connection.
    fn connect(
        &mut self,
        graph: &mut FlowGraph,
        store: &DataStore,
        branch_count: usize,
    ) -> GaResult<crate::flow::NodeId>;

    /// Reverses every registration `connect` made (branch-group-scope data, tag schema slots the
    /// stub itself owns).
    fn disconnect(&mut self, graph: &mut FlowGraph, store: &DataStore) -> GaResult<()>;
}

/// Publishes `population` into `store` under the reserved [`POPULATION_DATA_ID`], the handle every
/// stage's [`crate::flow::step::FnStep`] body resolves to get at the arena.
pub fn publish_population<C: ChromosomeValue>(
    store: &DataStore,
    population: Population<C>,
) -> GaResult<()> {
    store.add(Scope::Workflow, POPULATION_DATA_ID, population)
}

pub fn population_handle<C: ChromosomeValue>(
    store: &DataStore,
) -> GaResult<std::sync::Arc<RwLock<Population<C>>>> {
    store.get::<Population<C>>(Scope::Workflow, POPULATION_DATA_ID).map(|(v, _)| v)
}

pub(crate) fn branch_scheduler_for(branch_count: usize) -> GaResult<BranchScheduler> {
    BranchScheduler::new(branch_count)
}
