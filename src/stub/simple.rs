//! Simple GA stub (C9): `Selection -> Coupling -> Replacement -> [PopulationFitness] -> [Sort] ->
//! NextGen`. Scaling is a no-op pass-through (scaled fitness mirrors raw fitness) unless a caller
//! attaches a scaling setup, in which case the stub folds it into the optional steps between
//! Replacement and Sort.
//!
//! Grounded on the teacher's single top-level `HillClimb` loop in `src/strategy/hill_climb.rs`,
//! generalized to the stub protocol: the canonical steps are wired once at `connect`, and every
//! setup mutator after that updates a live parameter cell the step's closure re-reads each call,
//! rather than rebuilding the step — the same "the operator can change, the wiring doesn't" split the
//! teacher keeps between its `Select`/`Crossover` trait objects and the fixed loop body that calls
//! them. The population-fitness stage is the one conditional edge realized as an actual graph edge
//! rather than a captured flag: attaching or clearing it while connected splices the fitness step
//! into or out of the chain via `FlowGraph::connect`/`disconnect`, which runs the step's `clear` hook
//! when it becomes dangling.
use crate::contract::{ChromosomeValue, FitnessComparator};
use crate::error::{GaError, GaResult};
use crate::flow::step::FnStep;
use crate::flow::{FlowGraph, NodeId};
use crate::stage::coupling::{self, CouplingParameters};
use crate::stage::fitness::{self, FitnessOperation, FitnessSlots};
use crate::stage::mating::{self, MatingParameters};
use crate::stage::replacement::{self, ReplacementParameters};
use crate::stage::scaling::{self, PassThroughScaling, ScalingOperation, ScalingSlots};
use crate::stage::selection::{self, SelectionParameters};
use crate::store::{DataStore, Scope};
use std::sync::Arc;

use super::AlgorithmStub;

const SELECTION_PARAMS_ID: u32 = 0x8003;
const COUPLING_PARAMS_ID: u32 = 0x8004;
const REPLACEMENT_PARAMS_ID: u32 = 0x8005;
const FITNESS_OPERATION_ID: u32 = 0x8009;

/// A stub's live, independently swappable parameter cells; the canonical flow's step closures
/// re-read these on every call rather than capturing a fixed snapshot, so `set_*` mutators take
/// effect on the next generation without rebuilding the flow graph.
pub struct SimpleGaStub<C: ChromosomeValue, Cmp> {
    branch_count: usize,
    selection: SelectionParameters,
    coupling: CouplingParameters,
    mating: Arc<MatingParameters<C, Cmp>>,
    replacement: ReplacementParameters,
    scaling: Option<Arc<dyn ScalingOperation>>,
    population_fitness: Option<Arc<dyn FitnessOperation<C>>>,
    connected: bool,
    group_scope: Option<Scope>,
    /// Node ids tracked so a live fitness attach/detach can splice the chain; populated at
    /// `connect`, cleared at `disconnect`.
    replacement_step: Option<NodeId>,
    fitness_step: Option<NodeId>,
    scaling_step: Option<NodeId>,
    fitness_connected: bool,
}

impl<C, Cmp> SimpleGaStub<C, Cmp>
where
    C: ChromosomeValue + 'static,
    Cmp: FitnessComparator<C> + 'static,
{
    pub fn new(
        selection: SelectionParameters,
        coupling: CouplingParameters,
        mating: MatingParameters<C, Cmp>,
        replacement: ReplacementParameters,
    ) -> Self {
        Self {
            branch_count: 1,
            selection,
            coupling,
            mating: Arc::new(mating),
            replacement,
            scaling: None,
            population_fitness: None,
            connected: false,
            group_scope: None,
            replacement_step: None,
            fitness_step: None,
            scaling_step: None,
            fitness_connected: false,
        }
    }

    /// Attaches a population-fitness operator, required when individual-mode evaluation isn't
    /// viable. The fitness step re-reads this from a live store cell on every call, so a swap
    /// between two already-attached operators takes effect on the next generation with no topology
    /// change. Attaching the first operator while connected instead splices the fitness step into
    /// the chain between replacement and scaling, which until now ran straight through.
    pub fn set_population_fitness(
        &mut self,
        graph: &mut FlowGraph,
        store: &DataStore,
        operation: Arc<dyn FitnessOperation<C>>,
    ) -> GaResult<()> {
        self.population_fitness = Some(operation.clone());
        if let Some(scope) = self.group_scope {
            let (handle, _) = store.get::<Option<Arc<dyn FitnessOperation<C>>>>(scope, FITNESS_OPERATION_ID)?;
            *handle.write().expect("fitness operation cell poisoned") = Some(operation);
            if !self.fitness_connected {
                let replacement_step = self.replacement_step.expect("connected stub tracks its own steps");
                let fitness_step = self.fitness_step.expect("connected stub tracks its own steps");
                let scaling_step = self.scaling_step.expect("connected stub tracks its own steps");
                graph.disconnect(replacement_step, scaling_step)?;
                graph.connect(replacement_step, fitness_step)?;
                graph.connect(fitness_step, scaling_step)?;
                self.fitness_connected = true;
            }
        }
        Ok(())
    }

    /// Detaches the population-fitness operator. While connected this splices the fitness step back
    /// out of the chain (replacement wires straight through to scaling again) and runs `clear` on the
    /// now-dangling fitness step via `FlowGraph::disconnect`.
    pub fn clear_population_fitness(&mut self, graph: &mut FlowGraph, store: &DataStore) -> GaResult<()> {
        self.population_fitness = None;
        if let Some(scope) = self.group_scope {
            let (handle, _) = store.get::<Option<Arc<dyn FitnessOperation<C>>>>(scope, FITNESS_OPERATION_ID)?;
            *handle.write().expect("fitness operation cell poisoned") = None;
            if self.fitness_connected {
                let replacement_step = self.replacement_step.expect("connected stub tracks its own steps");
                let fitness_step = self.fitness_step.expect("connected stub tracks its own steps");
                let scaling_step = self.scaling_step.expect("connected stub tracks its own steps");
                graph.disconnect(fitness_step, scaling_step)?;
                graph.disconnect(replacement_step, fitness_step)?;
                graph.connect(replacement_step, scaling_step)?;
                self.fitness_connected = false;
            }
        }
        Ok(())
    }

    /// Attaches a scaling operator, replacing the default pass-through, and turns on sorting by
    /// scaled fitness. Swapping the algorithm changes the arity every storage's scaled-fitness
    /// vector carries, so — like `MultiObjectiveGaStub::set_scaling` — this is only permitted while
    /// the stub is disconnected; already-scaled members would otherwise carry stale-arity vectors
    /// with no way to tell they're stale.
    pub fn set_scaling(&mut self, operation: Arc<dyn ScalingOperation>) -> GaResult<()> {
        if self.group_scope.is_some() {
            return Err(GaError::InvalidOperation(
                "scaling algorithm cannot change while the stub is connected",
            ));
        }
        self.scaling = Some(operation);
        Ok(())
    }

    /// Swaps the selection parameters, live if connected: the selection step's closure re-reads its
    /// parameter cell from the data store on every call, so this takes effect on the next generation
    /// without touching flow topology.
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
}

impl<C, Cmp> AlgorithmStub<C> for SimpleGaStub<C, Cmp>
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
        self.branch_count = branch_count;
        let scope = Scope::BranchGroup(0);
        self.group_scope = Some(scope);
        store.add(scope, SELECTION_PARAMS_ID, self.selection.clone())?;
        store.add(scope, COUPLING_PARAMS_ID, self.coupling.clone())?;
        store.add(scope, REPLACEMENT_PARAMS_ID, self.replacement.clone())?;
        store.add(scope, FITNESS_OPERATION_ID, self.population_fitness.clone())?;
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
        let fitness_step = graph.add_step(Arc::new(
            FnStep::new(move |ctx, store| {
                let (operation_handle, _) =
                    store.get::<Option<Arc<dyn FitnessOperation<C>>>>(scope, FITNESS_OPERATION_ID)?;
                let operation = operation_handle.read().expect("fitness operation cell poisoned").clone();
                let Some(operation) = operation else {
                    return Ok(());
                };
                let population = super::population_handle::<C>(store)?;
                fitness::run_population_fitness(&population, ctx, &fitness_slots, operation.as_ref())
            })
            .with_clear(|| log::debug!("population fitness step detached")),
        ));

        let scaling_slots: Arc<ScalingSlots> = Arc::new(scaling::new_slots(branch_count));
        let scaling_operation = self.scaling.clone();
        let scaling_step = graph.add_step(Arc::new(FnStep::new(move |ctx, store| {
            let population = super::population_handle::<C>(store)?;
            match &scaling_operation {
                Some(operation) => scaling::run_scaling(&population, ctx, &scaling_slots, operation.as_ref()),
                None => scaling::run_scaling(&population, ctx, &scaling_slots, &PassThroughScaling),
            }
        })));

        self.fitness_connected = self.population_fitness.is_some();
        if self.fitness_connected {
            graph.connect(replacement_step, fitness_step)?;
            graph.connect(fitness_step, scaling_step)?;
        } else {
            graph.connect(replacement_step, scaling_step)?;
        }
        self.replacement_step = Some(replacement_step);
        self.fitness_step = Some(fitness_step);
        self.scaling_step = Some(scaling_step);

        let sort_by_scaled_fitness = self.scaling.is_some();
        let sort_step = graph.add_step(Arc::new(FnStep::new(move |ctx, store| {
            if !sort_by_scaled_fitness {
                return Ok(());
            }
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
        self.connected = true;
        Ok(selection_step)
    }

    fn disconnect(&mut self, graph: &mut FlowGraph, store: &DataStore) -> GaResult<()> {
        graph.clear_all();
        if let Some(scope) = self.group_scope.take() {
            store.clear_scope(scope);
        }
        self.connected = false;
        self.replacement_step = None;
        self.fitness_step = None;
        self.scaling_step = None;
        self.fitness_connected = false;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{Ccb, FnFitnessComparator, MutationEvent};
    use crate::population::{Population, PopulationConfig};
    use crate::scheduler::BranchScheduler;
    use crate::stage::coupling::CouplingVariant;
    use crate::stage::replacement::ReplacementVariant;
    use crate::stage::selection::SelectionVariant;

    #[derive(Debug)]
    struct TestCcb;
    impl Ccb for TestCcb {}

    #[derive(Clone, Debug)]
    struct TestChromosome {
        value: f64,
        config: Arc<TestCcb>,
    }
    impl ChromosomeValue for TestChromosome {
        type Config = TestCcb;
        fn config(&self) -> &Arc<TestCcb> {
            &self.config
        }
        fn mutation_event(&mut self, _event: MutationEvent) {}
    }

    struct SquareFitness;
    impl FitnessOperation<TestChromosome> for SquareFitness {
        fn evaluate_individual(&self, chromosome: &TestChromosome) -> Vec<crate::chromosome::FitnessValue> {
            vec![chromosome.value * chromosome.value]
        }
    }

    type Cmp = FnFitnessComparator<TestChromosome, fn(&TestChromosome, &TestChromosome) -> i32>;

    fn stub(selection_size: usize) -> SimpleGaStub<TestChromosome, Cmp> {
        SimpleGaStub::new(
            SelectionParameters {
                selection_size,
                crossover_buffers_tag_id: None,
                variant: SelectionVariant::TopN,
            },
            CouplingParameters {
                variant: CouplingVariant::Simple,
            },
            MatingParameters {
                crossover_probability: 1.0,
                crossover: Arc::new(|a: &TestChromosome, b: &TestChromosome| {
                    let mid = (a.value + b.value) / 2.0;
                    (
                        TestChromosome { value: mid, config: Arc::new(TestCcb) },
                        TestChromosome { value: mid, config: Arc::new(TestCcb) },
                    )
                }),
                mutation_probability: 0.0,
                mutate: Arc::new(|c| c.value += 1.0),
                improving_only_mutations: false,
                comparator: FnFitnessComparator::new(
                    (|a: &TestChromosome, b: &TestChromosome| (a.value - b.value).signum() as i32)
                        as fn(&TestChromosome, &TestChromosome) -> i32,
                ),
            },
            ReplacementParameters {
                variant: ReplacementVariant::Worst { k: selection_size },
            },
        )
    }

    fn population(capacity: usize) -> Population<TestChromosome> {
        let mut next = 1.0;
        let mut pop = Population::try_from(PopulationConfig {
            capacity,
            pool_cap: None,
        })
        .unwrap();
        pop.initialize(
            || {
                let value = next;
                next += 1.0;
                TestChromosome { value, config: Arc::new(TestCcb) }
            },
            None::<fn(&TestChromosome) -> Vec<f64>>,
        )
        .unwrap();
        pop
    }

    #[test]
    fn fitness_step_runs_straight_through_when_never_attached() {
        let store = DataStore::new();
        super::super::publish_population(&store, population(6)).unwrap();
        let mut stub = stub(2);
        let mut graph = FlowGraph::new();
        let start = stub.connect(&mut graph, &store, 1).unwrap();
        let scheduler = BranchScheduler::new(1).unwrap();
        graph.run(&scheduler, &store, start).unwrap();

        let population = super::super::population_handle::<TestChromosome>(&store).unwrap();
        let population = population.read().unwrap();
        for id in population.main().members() {
            assert!(
                population.arena().get(*id).unwrap().raw_fitness().is_none(),
                "no fitness operator attached, raw fitness must stay empty"
            );
        }
    }

    #[test]
    fn attaching_fitness_while_connected_splices_it_into_the_chain() {
        let store = DataStore::new();
        super::super::publish_population(&store, population(6)).unwrap();
        let mut stub = stub(2);
        let mut graph = FlowGraph::new();
        let start = stub.connect(&mut graph, &store, 1).unwrap();
        assert!(!stub.fitness_connected);

        stub.set_population_fitness(&mut graph, &store, Arc::new(SquareFitness)).unwrap();
        assert!(stub.fitness_connected);

        let scheduler = BranchScheduler::new(1).unwrap();
        graph.run(&scheduler, &store, start).unwrap();

        let population = super::super::population_handle::<TestChromosome>(&store).unwrap();
        let population = population.read().unwrap();
        for id in population.main().members() {
            assert!(population.arena().get(*id).unwrap().raw_fitness().is_some());
        }
    }

    #[test]
    fn clearing_fitness_while_connected_detaches_and_clears_the_step() {
        let store = DataStore::new();
        super::super::publish_population(&store, population(4)).unwrap();
        let mut stub = stub(2);
        let mut graph = FlowGraph::new();
        let start = stub.connect(&mut graph, &store, 1).unwrap();
        stub.set_population_fitness(&mut graph, &store, Arc::new(SquareFitness)).unwrap();
        assert!(stub.fitness_connected);

        stub.clear_population_fitness(&mut graph, &store).unwrap();
        assert!(!stub.fitness_connected);

        let scheduler = BranchScheduler::new(1).unwrap();
        graph.run(&scheduler, &store, start).unwrap();

        let population = super::super::population_handle::<TestChromosome>(&store).unwrap();
        let population = population.read().unwrap();
        for id in population.main().members() {
            assert!(
                population.arena().get(*id).unwrap().raw_fitness().is_none(),
                "fitness step was detached, raw fitness must stay empty"
            );
        }
    }

    #[test]
    fn set_scaling_refuses_while_connected() {
        let store = DataStore::new();
        super::super::publish_population(&store, population(4)).unwrap();
        let mut stub = stub(2);
        let mut graph = FlowGraph::new();
        stub.connect(&mut graph, &store, 1).unwrap();
        assert_eq!(
            stub.set_scaling(Arc::new(crate::stage::scaling::PassThroughScaling)),
            Err(GaError::InvalidOperation(
                "scaling algorithm cannot change while the stub is connected"
            ))
        );
    }
}
