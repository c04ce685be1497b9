//! Fitness operation (C8): two modes per §4.8 — an individual mode that is a stateless pure function
//! runnable on any chromosome at any time, and a population mode that runs across branches and must
//! sit between replacement and scaling in the pipeline when individual evaluation isn't viable.
//!
//! Grounded on the teacher's `Fitness` trait (`src/fitness.rs`), generalized from single-threaded
//! evaluation to the same branch-parallel read/write split [`crate::stage::scaling`] uses: population
//! mode runs inside one flow step's per-branch call, using a caller-allocated results buffer and the
//! step's own [`BranchContext`] barrier for the write-serial handoff, rather than spinning up a
//! second round of branches.
use crate::chromosome::FitnessValue;
use crate::contract::ChromosomeValue;
use crate::error::GaResult;
use crate::population::Population;
use crate::scheduler::BranchContext;
use std::sync::{Mutex, RwLock};

pub trait FitnessOperation<C: ChromosomeValue>: Send + Sync {
    /// Whether [`Self::evaluate_individual`] is viable for a single chromosome in isolation. When
    /// false, the pipeline must route through [`run_population_fitness`] instead.
    fn allows_individual_evaluation(&self) -> bool {
        true
    }

    /// Individual mode: a pure function from chromosome to fitness.
    fn evaluate_individual(&self, _chromosome: &C) -> Vec<FitnessValue> {
        Vec::new()
    }

    /// Population mode: evaluates one branch's assigned slice of chromosomes, in order.
    fn evaluate_population(&self, chromosomes: &[&C], _branch: usize) -> Vec<Vec<FitnessValue>> {
        chromosomes.iter().map(|c| self.evaluate_individual(c)).collect()
    }
}

/// Evaluates `chromosome` directly, for callers that already confirmed
/// [`FitnessOperation::allows_individual_evaluation`].
pub fn evaluate_individual<C: ChromosomeValue>(
    operation: &dyn FitnessOperation<C>,
    chromosome: &C,
) -> Vec<FitnessValue> {
    operation.evaluate_individual(chromosome)
}

pub type FitnessSlots = Vec<Mutex<Option<Vec<Vec<FitnessValue>>>>>;

pub fn new_slots(branch_count: usize) -> FitnessSlots {
    (0..branch_count).map(|_| Mutex::new(None)).collect()
}

/// One branch's share of a population-fitness step: reads its `split_work` slice of chromosomes,
/// evaluates it, stores the result in `slots[ctx.branch]`; once every branch has done this (the
/// barrier), branch 0 writes every result back into the arena's raw fitness slot.
pub fn run_population_fitness<C: ChromosomeValue>(
    population: &RwLock<Population<C>>,
    ctx: &BranchContext,
    slots: &FitnessSlots,
    operation: &dyn FitnessOperation<C>,
) -> GaResult<()> {
    let members = {
        let population = population.read().expect("population lock poisoned");
        population.main().members().to_vec()
    };

    let (start, len) = ctx.split_work(members.len());
    let evaluated = {
        let population = population.read().expect("population lock poisoned");
        let chromosomes: Vec<&C> = members[start..start + len]
            .iter()
            .map(|id| population.arena().get(*id).expect("member resolves").chromosome())
            .collect();
        operation.evaluate_population(&chromosomes, ctx.branch)
    };
    *slots[ctx.branch].lock().expect("fitness slots mutex poisoned") = Some(evaluated);

    ctx.barrier()?;

    ctx.single_executor(|| {
        let mut population = population.write().expect("population lock poisoned");
        let mut cursor = 0;
        for slot in slots {
            let evaluated = slot.lock().expect("fitness slots mutex poisoned").take().unwrap_or_default();
            for fitness in evaluated {
                let id = members[cursor];
                population
                    .arena_mut()
                    .get_mut(id)
                    .expect("member resolves")
                    .set_raw_fitness(fitness);
                cursor += 1;
            }
        }
        Ok(())
    })
}
