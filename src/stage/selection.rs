//! Selection operation (C8): consumes the population, produces a group of parents in the order the
//! variant defines.
//!
//! Grounded on the teacher's `src/select/` module family (`SelectTournament`, `SelectElite`, ...),
//! generalized from the teacher's fixed fitness-ordering assumption to an explicit [`SortCriteria`]
//! parameter, since here "current order" is whatever the last `Sort` step left the main group in
//! rather than something the operator recomputes itself.
use crate::chromosome::{ByScaledFitnessDesc, StorageId};
use crate::contract::ChromosomeValue;
use crate::error::GaResult;
use crate::population::Population;

#[derive(Clone)]
pub enum SelectionVariant {
    TopN,
    BottomN,
    Random { dedup: bool },
    RouletteWheel { dedup: bool },
    Tournament { rounds: usize, base: Box<SelectionVariant> },
}

#[derive(Clone)]
pub struct SelectionParameters {
    pub selection_size: usize,
    /// `Some(id)` when selection writes offspring directly through a shared crossover buffer,
    /// bypassing a separate coupling stage; `None` otherwise.
    pub crossover_buffers_tag_id: Option<u32>,
    pub variant: SelectionVariant,
}

/// Runs `params.variant` against `population`'s main group, assumed already in the caller's desired
/// "current order" (Top-N/Bottom-N read positionally; the other variants don't care about order).
pub fn select<C: ChromosomeValue>(
    population: &Population<C>,
    params: &SelectionParameters,
) -> GaResult<Vec<StorageId>> {
    select_variant(population, &params.variant, params.selection_size)
}

fn select_variant<C: ChromosomeValue>(
    population: &Population<C>,
    variant: &SelectionVariant,
    selection_size: usize,
) -> GaResult<Vec<StorageId>> {
    let members = population.main().members();
    if members.is_empty() || selection_size == 0 {
        return Ok(Vec::new());
    }
    match variant {
        SelectionVariant::TopN => Ok(members.iter().take(selection_size).copied().collect()),
        SelectionVariant::BottomN => Ok(members.iter().rev().take(selection_size).copied().collect()),
        SelectionVariant::Random { dedup } => Ok(random_selection(members, selection_size, *dedup)),
        SelectionVariant::RouletteWheel { dedup } => roulette_selection(population, members, selection_size, *dedup),
        SelectionVariant::Tournament { rounds, base } => {
            tournament_selection(population, members, selection_size, *rounds, base)
        }
    }
}

fn random_selection(members: &[StorageId], selection_size: usize, dedup: bool) -> Vec<StorageId> {
    if dedup {
        crate::random::sample_indices_without_replacement(members.len(), selection_size.min(members.len()))
            .into_iter()
            .map(|i| members[i])
            .collect()
    } else {
        (0..selection_size)
            .map(|_| members[crate::random::gen_range(0, members.len())])
            .collect()
    }
}

fn roulette_selection<C: ChromosomeValue>(
    population: &Population<C>,
    members: &[StorageId],
    selection_size: usize,
    dedup: bool,
) -> GaResult<Vec<StorageId>> {
    let weight_of = |id: StorageId| -> f64 {
        population
            .arena()
            .get(id)
            .and_then(|s| s.scaled_fitness())
            .and_then(|f| f.first())
            .copied()
            .unwrap_or(0.0)
            .max(0.0)
    };
    let mut pool: Vec<StorageId> = members.to_vec();
    let mut picked = Vec::with_capacity(selection_size);
    for _ in 0..selection_size {
        if pool.is_empty() {
            break;
        }
        let total: f64 = pool.iter().map(|id| weight_of(*id)).sum();
        let draw = crate::random::gen_probability() as f64 * total;
        let mut acc = 0.0;
        let mut chosen_index = pool.len() - 1;
        for (i, id) in pool.iter().enumerate() {
            acc += weight_of(*id);
            if acc >= draw {
                chosen_index = i;
                break;
            }
        }
        let chosen = pool[chosen_index];
        picked.push(chosen);
        if dedup {
            pool.swap_remove(chosen_index);
        }
    }
    Ok(picked)
}

fn tournament_selection<C: ChromosomeValue>(
    population: &Population<C>,
    members: &[StorageId],
    selection_size: usize,
    rounds: usize,
    base: &SelectionVariant,
) -> GaResult<Vec<StorageId>> {
    let criteria = ByScaledFitnessDesc(0);
    let mut winners = Vec::with_capacity(selection_size);
    for _ in 0..selection_size {
        let candidates = select_variant(population, base, rounds)?;
        let winner = candidates
            .into_iter()
            .min_by(|a, b| {
                use crate::contract::SortCriteria;
                let sa = population.arena().get(*a).expect("candidate resolves");
                let sb = population.arena().get(*b).expect("candidate resolves");
                criteria.compare(sa, sb).then_with(|| a.index.cmp(&b.index))
            })
            .unwrap_or(members[0]);
        winners.push(winner);
    }
    Ok(winners)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{Ccb, MutationEvent};
    use crate::population::PopulationConfig;
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
        let mut iter = fitnesses.iter();
        pop.initialize(
            || TestChromosome(Arc::new(TestCcb)),
            None::<fn(&TestChromosome) -> Vec<f64>>,
        )
        .unwrap();
        for id in pop.main().members().to_vec() {
            let fitness = *iter.next().unwrap();
            pop.arena_mut().get_mut(id).unwrap().set_scaled_fitness(vec![fitness]);
        }
        pop
    }

    #[test]
    fn top_n_returns_first_n_in_current_order() {
        // scenario 2: population of 5 with scaled fitnesses [9,7,5,3,1], Top-N, selection_size=2
        let pop = population_with_fitnesses(&[9.0, 7.0, 5.0, 3.0, 1.0]);
        let params = SelectionParameters {
            selection_size: 2,
            crossover_buffers_tag_id: None,
            variant: SelectionVariant::TopN,
        };
        let selected = select(&pop, &params).unwrap();
        let fitnesses: Vec<f64> = selected
            .iter()
            .map(|id| pop.arena().get(*id).unwrap().scaled_fitness().unwrap()[0])
            .collect();
        assert_eq!(fitnesses, vec![9.0, 7.0]);
    }

    #[test]
    fn bottom_n_returns_last_n_in_current_order() {
        let pop = population_with_fitnesses(&[9.0, 7.0, 5.0, 3.0, 1.0]);
        let params = SelectionParameters {
            selection_size: 2,
            crossover_buffers_tag_id: None,
            variant: SelectionVariant::BottomN,
        };
        let selected = select(&pop, &params).unwrap();
        let fitnesses: Vec<f64> = selected
            .iter()
            .map(|id| pop.arena().get(*id).unwrap().scaled_fitness().unwrap()[0])
            .collect();
        assert_eq!(fitnesses, vec![1.0, 3.0]);
    }

    #[test]
    fn tournament_winner_is_always_at_least_as_fit_as_its_candidates() {
        let pop = population_with_fitnesses(&[9.0, 7.0, 5.0, 3.0, 1.0]);
        let params = SelectionParameters {
            selection_size: 3,
            crossover_buffers_tag_id: None,
            variant: SelectionVariant::Tournament {
                rounds: 3,
                base: Box::new(SelectionVariant::Random { dedup: true }),
            },
        };
        let selected = select(&pop, &params).unwrap();
        assert_eq!(selected.len(), 3);
        for id in selected {
            let fitness = pop.arena().get(id).unwrap().scaled_fitness().unwrap()[0];
            assert!(fitness >= 1.0 && fitness <= 9.0);
        }
    }
}
