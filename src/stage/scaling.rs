//! Scaling operation (C8): transforms raw fitness into scaled fitness. Pure across branches,
//! results always written into each storage's scaled slot; the arity of scaled fitness is fixed by
//! the setup's configuration at prepare time.
//!
//! Grounded on the teacher's fitness-cache design in `src/fitness.rs` — the core here stays agnostic
//! of any particular scaling algorithm (SPEA/PESA/RDGA math is explicitly out of scope) and only
//! specifies the contract a caller's scaling algorithm must satisfy, mirroring how a stage operator
//! closes over its own `Setup` rather than the flow graph knowing about scaling at all.
//!
//! This runs *inside* one flow step's per-branch call (see [`crate::flow::step::FnStep`]), which is
//! itself already dispatched across branches by the owning step's [`crate::scheduler::BranchScheduler::run`]
//! call — so scaling never spins up a second round of branches; it only uses its [`BranchContext`] for
//! the read-parallel/write-serial handoff, via a results buffer the caller allocates once (sized to
//! the branch count) and passes in by reference on every branch's call.
use crate::chromosome::FitnessValue;
use crate::contract::ChromosomeValue;
use crate::error::GaResult;
use crate::population::Population;
use crate::scheduler::BranchContext;
use std::sync::{Mutex, RwLock};

/// Arity of scaled fitness is fixed once at prepare time and never revisited mid-run (every
/// storage's scaled fitness vector has this length afterwards).
pub trait ScalingOperation: Send + Sync {
    fn arity(&self) -> usize;
    /// Scales one branch's assigned slice of raw fitness values, in order.
    fn scale(&self, raw: &[FitnessValue], branch: usize) -> Vec<Vec<FitnessValue>>;
}

/// Scaled fitness mirrors raw fitness, one component. Used by the Simple GA stub unless the caller
/// attaches a real scaling setup.
pub struct PassThroughScaling;

impl ScalingOperation for PassThroughScaling {
    fn arity(&self) -> usize {
        1
    }
    fn scale(&self, raw: &[FitnessValue], _branch: usize) -> Vec<Vec<FitnessValue>> {
        raw.iter().map(|&v| vec![v]).collect()
    }
}

/// Per-branch results buffer, allocated once (sized to the branch count) by whoever builds the
/// scaling step and shared across every branch's call.
pub type ScalingSlots = Vec<Mutex<Option<Vec<Vec<FitnessValue>>>>>;

pub fn new_slots(branch_count: usize) -> ScalingSlots {
    (0..branch_count).map(|_| Mutex::new(None)).collect()
}

/// One branch's share of a scaling step: reads its `split_work` slice of raw fitness, scales it, and
/// stores the result in `slots[ctx.branch]`; once every branch has done this (the barrier), branch 0
/// writes every result back into the arena.
pub fn run_scaling<C: ChromosomeValue>(
    population: &RwLock<Population<C>>,
    ctx: &BranchContext,
    slots: &ScalingSlots,
    operation: &dyn ScalingOperation,
) -> GaResult<()> {
    let (members, raw_by_member) = {
        let population = population.read().expect("population lock poisoned");
        let members = population.main().members().to_vec();
        let raw = members
            .iter()
            .map(|id| {
                population
                    .arena()
                    .get(*id)
                    .and_then(|s| s.raw_fitness())
                    .and_then(|f| f.first())
                    .copied()
                    .unwrap_or(0.0)
            })
            .collect::<Vec<_>>();
        (members, raw)
    };

    let (start, len) = ctx.split_work(raw_by_member.len());
    let scaled = operation.scale(&raw_by_member[start..start + len], ctx.branch);
    *slots[ctx.branch].lock().expect("scaling slots mutex poisoned") = Some(scaled);

    ctx.barrier()?;

    ctx.single_executor(|| {
        let mut population = population.write().expect("population lock poisoned");
        let mut cursor = 0;
        for slot in slots {
            let scaled = slot.lock().expect("scaling slots mutex poisoned").take().unwrap_or_default();
            for vector in scaled {
                let id = members[cursor];
                population
                    .arena_mut()
                    .get_mut(id)
                    .expect("member resolves")
                    .set_scaled_fitness(vector);
                cursor += 1;
            }
        }
        Ok(())
    })
}
