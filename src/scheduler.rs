//! C7: the branch scheduler. Runs one step's body on a fixed number of branches in parallel,
//! cooperatively synchronised at barriers, with work-splitting and cooperative cancellation.
//!
//! Grounded on the teacher's `rayon`-backed parallel fitness evaluation in `src/fitness.rs` (there,
//! `rayon::prelude::*` drives per-chromosome evaluation across a thread pool); generalized here from
//! a single data-parallel map into a barrier-synchronised branch model, since the spec's branch
//! groups need every branch to reach the same point in a shared step body, not just complete
//! independent work items. `std::sync::Barrier` supplies the reusable rendezvous point (it resets
//! automatically after every `wait()`) and its `BarrierWaitResult::is_leader()` is reused directly as
//! the single-executor region's leader election, so no separate atomic election state is needed.
use crate::error::{GaError, GaResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier, Mutex};

/// Per-branch handle passed into a step body: identifies the branch, exposes the group's shared
/// barrier, and reports cancellation.
pub struct BranchContext<'a> {
    pub branch: usize,
    pub branch_count: usize,
    group_barrier: &'a Barrier,
    cancelled: &'a AtomicBool,
}

impl<'a> BranchContext<'a> {
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// A plain step-boundary barrier: every branch waits for every other branch, then all observe
    /// the same cancellation state.
    pub fn barrier(&self) -> GaResult<()> {
        self.group_barrier.wait();
        if self.is_cancelled() {
            return Err(GaError::Cancelled);
        }
        Ok(())
    }

    /// Wraps `f` so exactly one branch executes it while the others wait at the entry barrier, and
    /// every branch proceeds past the exit barrier together. `f` must not be called by more than one
    /// branch and must not be skipped by the one elected, or the barrier pairing breaks down. Only
    /// the elected branch's `Err` is observed; the others report `Ok(())` regardless, since they
    /// never ran `f`.
    pub fn single_executor<F: FnOnce() -> GaResult<()>>(&self, f: F) -> GaResult<()> {
        let entry = self.group_barrier.wait();
        if self.is_cancelled() {
            self.group_barrier.wait();
            return Err(GaError::Cancelled);
        }
        let outcome = if entry.is_leader() { f() } else { Ok(()) };
        self.group_barrier.wait();
        if self.is_cancelled() {
            return Err(GaError::Cancelled);
        }
        outcome
    }

    /// Divides `total` units evenly across branches, remainder going to the lowest-id branches.
    /// Callers iterate `[start, start + count)`. The union of every branch's range covers
    /// `[0, total)` with no overlap (P8), and this boundary is not itself a barrier.
    pub fn split_work(&self, total: usize) -> (usize, usize) {
        let base = total / self.branch_count;
        let remainder = total % self.branch_count;
        if self.branch < remainder {
            (self.branch * (base + 1), base + 1)
        } else {
            (remainder * (base + 1) + (self.branch - remainder) * base, base)
        }
    }
}

/// Executes flow steps across a fixed branch count (C7).
pub struct BranchScheduler {
    branch_count: usize,
    barrier: Barrier,
    cancelled: Arc<AtomicBool>,
}

impl BranchScheduler {
    pub fn new(branch_count: usize) -> GaResult<Self> {
        if branch_count == 0 {
            return Err(GaError::ArgumentOutOfRange("branch count must be non-zero"));
        }
        Ok(Self {
            branch_count,
            barrier: Barrier::new(branch_count),
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn branch_count(&self) -> usize {
        self.branch_count
    }

    /// Sets the cooperative cancellation flag; observed at the next barrier each branch reaches.
    pub fn stop(&self) {
        log::debug!("branch scheduler cancellation requested");
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clears the cancellation flag, making the scheduler restartable.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    /// Runs `body` once per branch in parallel and blocks until every branch has returned. A branch
    /// returning `Err` does not stop the others from finishing (they may be mid-barrier-wait and
    /// would deadlock if abandoned); the first error observed, by branch id, is returned to the
    /// caller.
    pub fn run<F>(&self, body: F) -> GaResult<()>
    where
        F: Fn(&BranchContext) -> GaResult<()> + Sync,
    {
        if self.is_cancelled() {
            log::trace!("branch scheduler run skipped, already cancelled");
            return Err(GaError::Cancelled);
        }
        let results: Vec<Mutex<Option<GaResult<()>>>> =
            (0..self.branch_count).map(|_| Mutex::new(None)).collect();
        let barrier = &self.barrier;
        let cancelled = &self.cancelled;
        let body = &body;
        let results_ref = &results;
        rayon::scope(|scope| {
            for branch in 0..self.branch_count {
                scope.spawn(move |_| {
                    let ctx = BranchContext {
                        branch,
                        branch_count: self.branch_count,
                        group_barrier: barrier,
                        cancelled,
                    };
                    let outcome = body(&ctx);
                    *results_ref[branch]
                        .lock()
                        .expect("branch result mutex poisoned") = Some(outcome);
                });
            }
        });
        for slot in results {
            slot.into_inner()
                .expect("branch result mutex poisoned")
                .expect("every branch must report a result")?;
        }
        Ok(())
    }
}
