//! Mating configuration (C8, "external"): what a coupling operation invokes per pair to fill a
//! crossover buffer with offspring.
//!
//! Concrete crossover/mutation algorithms over a particular allele representation are out of scope
//! (see [`crate::contract::AlleleSet`]); this module only specifies the sequencing contract —
//! crossover with its probability, then mutation with its probability, with the
//! `improving_only_mutations` rollback protocol calling [`ChromosomeValue::mutation_event`] the way
//! the teacher's `Crossover`/`Mutate` traits call their own chromosome hooks in `src/mutate.rs`.
use crate::contract::{ChromosomeValue, FitnessComparator, MutationEvent};
use std::sync::Arc;

pub type CrossoverFn<C> = Arc<dyn Fn(&C, &C) -> (C, C) + Send + Sync>;
pub type MutationFn<C> = Arc<dyn Fn(&mut C) + Send + Sync>;

#[derive(Clone)]
pub struct MatingParameters<C, Cmp> {
    pub crossover_probability: f32,
    pub crossover: CrossoverFn<C>,
    pub mutation_probability: f32,
    pub mutate: MutationFn<C>,
    /// When set, an accepted mutation must leave the chromosome at least as good as it was under
    /// `comparator`; otherwise the mutation is rolled back.
    pub improving_only_mutations: bool,
    pub comparator: Cmp,
}

/// Produces one offspring pair from `(mother, father)`, following §4.8's Mating contract.
pub fn mate<C, Cmp>(mother: &C, father: &C, params: &MatingParameters<C, Cmp>) -> (C, C)
where
    C: ChromosomeValue,
    Cmp: FitnessComparator<C>,
{
    let (mut a, mut b) = if crate::random::gen_probability() < params.crossover_probability {
        (params.crossover)(mother, father)
    } else {
        (mother.clone(), father.clone())
    };
    mutate_one(&mut a, params);
    mutate_one(&mut b, params);
    (a, b)
}

fn mutate_one<C, Cmp>(chromosome: &mut C, params: &MatingParameters<C, Cmp>)
where
    C: ChromosomeValue,
    Cmp: FitnessComparator<C>,
{
    if crate::random::gen_probability() >= params.mutation_probability {
        return;
    }
    if !params.improving_only_mutations {
        (params.mutate)(chromosome);
        return;
    }
    chromosome.mutation_event(MutationEvent::Prepare);
    let before = chromosome.clone();
    (params.mutate)(chromosome);
    if params.comparator.compare(chromosome, &before) >= 0 {
        chromosome.mutation_event(MutationEvent::Accept);
    } else {
        *chromosome = before;
        chromosome.mutation_event(MutationEvent::Reject);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{Ccb, FnFitnessComparator};
    use std::sync::Arc;

    #[derive(Debug)]
    struct TestCcb;
    impl Ccb for TestCcb {}

    #[derive(Clone, Debug, PartialEq)]
    struct Counter {
        value: i32,
        config: Arc<TestCcb>,
        events: Vec<MutationEvent>,
    }
    impl ChromosomeValue for Counter {
        type Config = TestCcb;
        fn config(&self) -> &Arc<TestCcb> {
            &self.config
        }
        fn mutation_event(&mut self, event: MutationEvent) {
            self.events.push(event);
        }
    }

    fn counter(value: i32) -> Counter {
        Counter {
            value,
            config: Arc::new(TestCcb),
            events: Vec::new(),
        }
    }

    fn params(
        improving_only: bool,
    ) -> MatingParameters<Counter, FnFitnessComparator<Counter, fn(&Counter, &Counter) -> i32>> {
        MatingParameters {
            crossover_probability: 1.0,
            crossover: Arc::new(|a, b| (counter(a.value + 1), counter(b.value + 1))),
            mutation_probability: 1.0,
            mutate: Arc::new(|c| c.value += 1),
            improving_only_mutations: improving_only,
            comparator: FnFitnessComparator::new(|a: &Counter, b: &Counter| a.value - b.value),
        }
    }

    #[test]
    fn crossover_and_mutation_both_apply_when_probability_is_one() {
        let params = params(false);
        let (a, b) = mate(&counter(1), &counter(10), &params);
        assert_eq!(a.value, 3); // crossover +1, mutation +1
        assert_eq!(b.value, 12);
    }

    #[test]
    fn improving_only_accepts_a_strictly_better_mutation() {
        crate::random::seed(1);
        let params = params(true);
        let (a, _) = mate(&counter(1), &counter(10), &params);
        assert_eq!(a.value, 3);
        assert_eq!(a.events, vec![MutationEvent::Prepare, MutationEvent::Accept]);
    }

    #[test]
    fn improving_only_rolls_back_a_worsening_mutation() {
        let mut params = params(true);
        params.mutate = Arc::new(|c| c.value -= 100);
        let (a, _) = mate(&counter(1), &counter(10), &params);
        assert_eq!(a.value, 2, "rolled back to the post-crossover, pre-mutation value");
        assert_eq!(a.events, vec![MutationEvent::Prepare, MutationEvent::Reject]);
    }
}
