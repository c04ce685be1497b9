use ga_workflow_core::chromosome::FitnessValue;
use ga_workflow_core::contract::{Ccb, ChromosomeValue, FnFitnessComparator, MutationEvent};
use ga_workflow_core::stage::fitness::FitnessOperation;
use ga_workflow_core::stage::mating::MatingParameters;
use std::sync::Arc;

#[derive(Debug)]
pub struct TestCcb;
impl Ccb for TestCcb {}

#[derive(Clone, Debug)]
pub struct TestChromosome {
    pub value: f64,
    config: Arc<TestCcb>,
}

impl TestChromosome {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            config: Arc::new(TestCcb),
        }
    }
}

impl ChromosomeValue for TestChromosome {
    type Config = TestCcb;
    fn config(&self) -> &Arc<TestCcb> {
        &self.config
    }
    fn mutation_event(&mut self, _event: MutationEvent) {}
}

/// Individual-mode fitness: a chromosome's own square, so a caller can predict the exact value a
/// generation should leave behind without depending on the shared RNG.
pub struct SquareFitness;
impl FitnessOperation<TestChromosome> for SquareFitness {
    fn evaluate_individual(&self, chromosome: &TestChromosome) -> Vec<FitnessValue> {
        vec![chromosome.value * chromosome.value]
    }
}

fn average_crossover(a: &TestChromosome, b: &TestChromosome) -> (TestChromosome, TestChromosome) {
    let mid = (a.value + b.value) / 2.0;
    (TestChromosome::new(mid), TestChromosome::new(mid))
}

fn nudge_mutation(c: &mut TestChromosome) {
    c.value += 0.5;
}

fn compare_by_value(a: &TestChromosome, b: &TestChromosome) -> i32 {
    (a.value - b.value).signum() as i32
}

pub type TestComparator = FnFitnessComparator<TestChromosome, fn(&TestChromosome, &TestChromosome) -> i32>;

/// Deterministic mating parameters: crossover probability 1.0 and mutation probability 0.0 always
/// resolve the same way regardless of the shared RNG's state, so callers can assert exact values.
pub fn deterministic_mating_parameters() -> MatingParameters<TestChromosome, TestComparator> {
    MatingParameters {
        crossover_probability: 1.0,
        crossover: Arc::new(average_crossover),
        mutation_probability: 0.0,
        mutate: Arc::new(nudge_mutation),
        improving_only_mutations: false,
        comparator: FnFitnessComparator::new(compare_by_value as fn(&TestChromosome, &TestChromosome) -> i32),
    }
}
