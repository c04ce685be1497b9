//! Generic multi-objective stub (C9): `Selection -> Coupling -> Replacement -> PopulationFitness ->
//! Scaling -> Sort -> NextGen`. Unlike [`crate::stub::simple::SimpleGaStub`], scaling is mandatory —
//! a caller without a real multi-objective scaling algorithm (SPEA/PESA/RDGA math, out of scope) has
//! no business using this stub over the simple one.
//!
//! Grounded the same way as `simple`: the teacher's `HillClimb` loop generalized to the connect/patch/
//! disconnect protocol, with the live-parameter-cell trick reused verbatim for the non-topology
//! mutators.
use crate::contract::{ChromosomeValue, FitnessComparator};
use crate::error::{GaError, GaResult};
use crate::flow::step::FnStep;
use crate::flow::{FlowGraph, NodeId};
use crate::stage::coupling::{self, CouplingParameters};
use crate::stage::fitness::{self, FitnessOperation, FitnessSlots};
use crate::stage::mating::{self, MatingParameters};
use crate::stage::replacement::{self, ReplacementParameters};
use crate::stage::scaling::{self, ScalingOperation, ScalingSlots};
use crate::stage::selection::{self, SelectionParameters};
use crate::store::{DataStore, Scope};
use std::sync::Arc;

use super::AlgorithmStub;

const SELECTION_PARAMS_ID: u32 = 0x8006;
const COUPLING_PARAMS_ID: u32 = 0x8007;
const REPLACEMENT_PARAMS_ID: u32 = 0x8008;

pub struct MultiObjectiveGaStub<C: ChromosomeValue, Cmp> {
    selection: SelectionParameters,
    coupling: CouplingParameters,
    mating: Arc<MatingParameters<C, Cmp>>,
    replacement: ReplacementParameters,
    population_fitness: Arc<dyn FitnessOperation<C>>,
    scaling: Arc<dyn ScalingOperation>,
    group_scope: Option<Scope>,
}

impl<C, Cmp> MultiObjectiveGaStub<C, Cmp>
where
    C: ChromosomeValue,
    Cmp: FitnessComparator<C> + 'static,
{
    pub fn new(
        selection: SelectionParameters,
        coupling: CouplingParameters,
        mating: MatingParameters<C, Cmp>,
        replacement: ReplacementParameters,
        population_fitness: Arc<dyn FitnessOperation<C>>,
        scaling: Arc<dyn ScalingOperation>,
    ) -> Self {
        Self {
            selection,
            coupling,
            mating: Arc::new(mating),
            replacement,
            population_fitness,
            scaling,
            group_scope: None,
        }
    }

    pub fn set_selection(&mut self, store: &DataStore, params: SelectionParameters) -> GaResult<()> {
        self.selection = params.clone();
        if let Some(scope) = self.group_scope {
            let (handle, _) = store.get::<SelectionParameters>(scope, SELECTION_PARAMS_ID)?;
            *handle.write().expect("selection params poisoned") = params;
        }
        Ok(())
    }

    pub fn set_coupling(&mut self, store: &DataStore, params: CouplingParameters) -> GaResult<()> {
        self.coupling = params.clone();
        if let Some(scope) = self.group_scope {
            let (handle, _) = store.get::<CouplingParameters>(scope, COUPLING_PARAMS_ID)?;
            *handle.write().expect("coupling params poisoned") = params;
        }
        Ok(())
    }

    pub fn set_replacement(&mut self, store: &DataStore, params: ReplacementParameters) -> GaResult<()> {
        self.replacement = params.clone();
        if let Some(scope) = self.group_scope {
            let (handle, _) = store.get::<ReplacementParameters>(scope, REPLACEMENT_PARAMS_ID)?;
            *handle.write().expect("replacement params poisoned") = params;
        }
        Ok(())
    }

    /// Swapping the scaling algorithm mid-run changes the arity of scaled fitness every storage
    /// carries; doing this live would leave existing members with stale-length vectors, so it's only
    /// permitted while disconnected.
    pub fn set_scaling(&mut self, scaling: Arc<dyn ScalingOperation>) -> GaResult<()> {
        if self.group_scope.is_some() {
            return Err(GaError::InvalidOperation(
                "scaling algorithm cannot change while the stub is connected",
            ));
        }
        self.scaling = scaling;
        Ok(())
    }
}

impl<C, Cmp> AlgorithmStub<C> for MultiObjectiveGaStub<C, Cmp>
where
    C: ChromosomeValue + 'static,
    Cmp: FitnessComparator<C> + 'static,
{
    fn connect(
        &mut self,
        graph: &mut FlowGraph,
        store: &DataStore,
        branch_count: usize,
    ) -> GaResult<NodeId> {
        let scope = Scope::BranchGroup(1);
        self.group_scope = Some(scope);
        store.add(scope, SELECTION_PARAMS_ID, self.selection.clone())?;
        store.add(scope, COUPLING_PARAMS_ID, self.coupling.clone())?;
        store.add(scope, REPLACEMENT_PARAMS_ID, self.replacement.clone())?;
        store.add(scope, super::PARENTS_DATA_ID, Vec::<crate::chromosome::StorageId>::new())?;
        store.add(scope, super::OFFSPRING_DATA_ID, Vec::<crate::chromosome::StorageId>::new())?;

        let selection_step = graph.add_step(Arc::new(FnStep::new(move |ctx, store| {
            ctx.single_executor(|| {
                let population = super::population_handle::<C>(store)?;
                let (params_handle, _) = store.get::<SelectionParameters>(scope, SELECTION_PARAMS_ID)?;
                let params = params_handle.read().expect("selection params poisoned");
                let parents = {
                    let population = population.read().expect("population lock poisoned");
                    selection::select(&population, &params)?
                };
                store_parents(store, scope, parents)?;
                Ok(())
            })
        })));

        let mating = self.mating.clone();
        let coupling_step = graph.add_step(Arc::new(FnStep::new(move |ctx, store| {
            let mating = mating.clone();
            ctx.single_executor(move || {
                let (params_handle, _) = store.get::<CouplingParameters>(scope, COUPLING_PARAMS_ID)?;
                let params = params_handle.read().expect("coupling params poisoned");
                let parents = load_parents(store, scope)?;
                let pairs = coupling::pair(&parents, &params);
                let population = super::population_handle::<C>(store)?;
                let mut offspring = Vec::with_capacity(pairs.len() * 2);
                {
                    let population = population.read().expect("population lock poisoned");
                    for (mother_id, father_id) in &pairs {
                        let mother = population.arena().get(*mother_id).expect("parent resolves").chromosome();
                        let father = population.arena().get(*father_id).expect("parent resolves").chromosome();
                        let (a, b) = mating::mate(mother, father, &mating);
                        offspring.push(a);
                        offspring.push(b);
                    }
                }
                let mut population = population.write().expect("population lock poisoned");
                let ids: Vec<_> = offspring.into_iter().map(|c| population.arena_mut().insert(c)).collect();
                store_offspring(store, scope, ids)?;
                Ok(())
            })
        })));
        graph.connect(selection_step, coupling_step)?;

        let replacement_step = graph.add_step(Arc::new(FnStep::new(move |ctx, store| {
            ctx.single_executor(|| {
                let (params_handle, _) = store.get::<ReplacementParameters>(scope, REPLACEMENT_PARAMS_ID)?;
                let params = params_handle.read().expect("replacement params poisoned");
                let parents = load_parents(store, scope)?;
                let offspring = load_offspring(store, scope)?;
                let population = super::population_handle::<C>(store)?;
                let mut population = population.write().expect("population lock poisoned");
                replacement::replace(&mut population, offspring, &parents, &params)
            })
        })));
        graph.connect(coupling_step, replacement_step)?;

        let fitness_slots: Arc<FitnessSlots> = Arc::new(fitness::new_slots(branch_count));
        let population_fitness = self.population_fitness.clone();
        let fitness_step = graph.add_step(Arc::new(FnStep::new(move |ctx, store| {
            let population = super::population_handle::<C>(store)?;
            fitness::run_population_fitness(&population, ctx, &fitness_slots, population_fitness.as_ref())
        })));
        graph.connect(replacement_step, fitness_step)?;

        let scaling_slots: Arc<ScalingSlots> = Arc::new(scaling::new_slots(branch_count));
        let scaling_operation = self.scaling.clone();
        let scaling_step = graph.add_step(Arc::new(FnStep::new(move |ctx, store| {
            let population = super::population_handle::<C>(store)?;
            scaling::run_scaling(&population, ctx, &scaling_slots, scaling_operation.as_ref())
        })));
        graph.connect(fitness_step, scaling_step)?;

        let sort_step = graph.add_step(Arc::new(FnStep::new(move |ctx, store| {
            ctx.single_executor(|| {
                let population = super::population_handle::<C>(store)?;
                let mut population = population.write().expect("population lock poisoned");
                population.sort_main(&crate::chromosome::ByScaledFitnessDesc(0));
                Ok(())
            })
        })));
        graph.connect(scaling_step, sort_step)?;

        let next_gen_step = graph.add_step(Arc::new(FnStep::new(move |ctx, store| {
            ctx.single_executor(|| {
                let population = super::population_handle::<C>(store)?;
                population.write().expect("population lock poisoned").next_generation();
                Ok(())
            })
        })));
        graph.connect(sort_step, next_gen_step)?;

        graph.prepare_all(branch_count);
        Ok(selection_step)
    }

    fn disconnect(&mut self, graph: &mut FlowGraph, store: &DataStore) -> GaResult<()> {
        graph.clear_all();
        if let Some(scope) = self.group_scope.take() {
            store.clear_scope(scope);
        }
        Ok(())
    }
}

fn store_parents(
    store: &DataStore,
    scope: Scope,
    parents: Vec<crate::chromosome::StorageId>,
) -> GaResult<()> {
    let (handle, _) = store.get::<Vec<crate::chromosome::StorageId>>(scope, super::PARENTS_DATA_ID)?;
    *handle.write().expect("parents cell poisoned") = parents;
    Ok(())
}

fn load_parents(store: &DataStore, scope: Scope) -> GaResult<Vec<crate::chromosome::StorageId>> {
    let (handle, _) = store.get::<Vec<crate::chromosome::StorageId>>(scope, super::PARENTS_DATA_ID)?;
    Ok(handle.read().expect("parents cell poisoned").clone())
}

fn store_offspring(
    store: &DataStore,
    scope: Scope,
    offspring: Vec<crate::chromosome::StorageId>,
) -> GaResult<()> {
    let (handle, _) = store.get::<Vec<crate::chromosome::StorageId>>(scope, super::OFFSPRING_DATA_ID)?;
    *handle.write().expect("offspring cell poisoned") = offspring;
    Ok(())
}

fn load_offspring(store: &DataStore, scope: Scope) -> GaResult<Vec<crate::chromosome::StorageId>> {
    let (handle, _) = store.get::<Vec<crate::chromosome::StorageId>>(scope, super::OFFSPRING_DATA_ID)?;
    Ok(handle.read().expect("offspring cell poisoned").clone())
}
