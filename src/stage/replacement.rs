//! Replacement operation (C8): inserts offspring into the main group.
//!
//! Grounded on the teacher's `Population`-mutation helpers in `src/population.rs` (trimming to
//! capacity, appending children), generalized to the variant table's five contracts.
use crate::chromosome::{ByScaledFitnessDesc, StorageId};
use crate::contract::{ChromosomeValue, SortCriteria};
use crate::error::GaResult;
use crate::population::Population;

#[derive(Clone)]
pub enum ReplacementVariant {
    /// Remove the `k` worst (by current order), append offspring.
    Worst { k: usize },
    /// Insert offspring into crowding space without evicting main; caller trims later.
    Crowding,
    /// Protect the top `e`, remove `k - e` random others from the rest, then append offspring.
    RandomElitism { k: usize, elite: usize },
    /// Replace each offspring's own parent, paired positionally.
    Parent,
    /// Swap in the entire offspring set, preserving the top `e` of the current main group.
    Population { elite: usize },
}

#[derive(Clone)]
pub struct ReplacementParameters {
    pub variant: ReplacementVariant,
}

/// Applies `params.variant`, consuming `offspring` (and, for the `Parent` variant, `parents` paired
/// positionally with `offspring`) into `population`'s main group.
pub fn replace<C: ChromosomeValue>(
    population: &mut Population<C>,
    offspring: Vec<StorageId>,
    parents: &[StorageId],
    params: &ReplacementParameters,
) -> GaResult<()> {
    match &params.variant {
        ReplacementVariant::Worst { k } => {
            population.sort_main(&ByScaledFitnessDesc(0));
            let keep = population.main().len().saturating_sub(*k);
            population.trim_main(keep);
            for id in offspring {
                population.add_to_main(id)?;
            }
            Ok(())
        }
        ReplacementVariant::Crowding => {
            for id in offspring {
                population.add_to_crowding(id)?;
            }
            Ok(())
        }
        ReplacementVariant::RandomElitism { k, elite } => {
            population.sort_main(&ByScaledFitnessDesc(0));
            let main_len = population.main().len();
            let protected = (*elite).min(main_len);
            let evictable_count = main_len.saturating_sub(protected);
            let to_remove = (*k).saturating_sub(*elite).min(evictable_count);
            let mut candidate_offsets =
                crate::random::sample_indices_without_replacement(evictable_count, to_remove);
            candidate_offsets.sort_unstable_by(|a, b| b.cmp(a));
            for offset in candidate_offsets {
                let index = protected + offset;
                let victim = population.main().members()[index];
                population.remove_from_main(victim);
            }
            for id in offspring {
                population.add_to_main(id)?;
            }
            Ok(())
        }
        ReplacementVariant::Parent => {
            for (parent, child) in parents.iter().zip(offspring) {
                population.remove_from_main(*parent);
                population.add_to_main(child)?;
            }
            Ok(())
        }
        ReplacementVariant::Population { elite } => {
            population.sort_main(&ByScaledFitnessDesc(0));
            population.trim_main((*elite).min(population.main().len()));
            for id in offspring {
                population.add_to_main(id)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{Ccb, MutationEvent};
    use crate::population::PopulationConfig;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    #[derive(Debug)]
    struct TestCcb;
    impl Ccb for TestCcb {}

    #[derive(Clone, Debug)]
    struct TestChromosome(Arc<TestCcb>);
    impl ChromosomeValue for TestChromosome {
        type Config = TestCcb;
        fn config(&self) -> &Arc<TestCcb> {
            &self.0
        }
        fn mutation_event(&mut self, _event: MutationEvent) {}
    }

    fn population_with_fitnesses(fitnesses: &[f64]) -> Population<TestChromosome> {
        let mut pop = Population::try_from(PopulationConfig {
            capacity: fitnesses.len(),
            pool_cap: None,
        })
        .unwrap();
        pop.initialize(
            || TestChromosome(Arc::new(TestCcb)),
            None::<fn(&TestChromosome) -> Vec<f64>>,
        )
        .unwrap();
        for (id, fitness) in pop.main().members().to_vec().into_iter().zip(fitnesses) {
            pop.arena_mut().get_mut(id).unwrap().set_scaled_fitness(vec![*fitness]);
        }
        pop
    }

    #[test]
    fn worst_replacement_evicts_worst_k_then_appends() {
        // scenario 4: Worst replacement with elitism framing, k=2
        let mut pop = population_with_fitnesses(&[9.0, 7.0, 5.0, 3.0, 1.0]);
        let child = pop.arena_mut().insert(TestChromosome(Arc::new(TestCcb)));
        pop.arena_mut().get_mut(child).unwrap().set_scaled_fitness(vec![100.0]);
        let params = ReplacementParameters {
            variant: ReplacementVariant::Worst { k: 2 },
        };
        replace(&mut pop, vec![child], &[], &params).unwrap();
        assert_eq!(pop.main().len(), 4);
        let fitnesses: Vec<f64> = pop
            .main()
            .members()
            .iter()
            .map(|id| pop.arena().get(*id).unwrap().scaled_fitness().unwrap()[0])
            .collect();
        assert_eq!(fitnesses, vec![9.0, 7.0, 5.0, 100.0]);
    }

    #[test]
    fn crowding_replacement_does_not_touch_main() {
        let mut pop = population_with_fitnesses(&[9.0, 7.0]);
        let child = pop.arena_mut().insert(TestChromosome(Arc::new(TestCcb)));
        let params = ReplacementParameters {
            variant: ReplacementVariant::Crowding,
        };
        replace(&mut pop, vec![child], &[], &params).unwrap();
        assert_eq!(pop.main().len(), 2);
        assert_eq!(pop.crowding().len(), 1);
    }

    #[test]
    fn population_replacement_preserves_elite_prefix() {
        let mut pop = population_with_fitnesses(&[9.0, 7.0, 5.0]);
        let children: Vec<_> = (0..2)
            .map(|_| pop.arena_mut().insert(TestChromosome(Arc::new(TestCcb))))
            .collect();
        let params = ReplacementParameters {
            variant: ReplacementVariant::Population { elite: 1 },
        };
        replace(&mut pop, children.clone(), &[], &params).unwrap();
        assert_eq!(pop.main().len(), 3);
        let fitnesses: Vec<f64> = pop
            .main()
            .members()
            .iter()
            .map(|id| pop.arena().get(*id).unwrap().scaled_fitness().unwrap().first().copied())
            .collect::<Vec<_>>()
            .into_iter()
            .map(|f| f.unwrap_or(0.0))
            .collect();
        assert_relative_eq!(fitnesses[0], 9.0);
    }
}
