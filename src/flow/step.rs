//! Step bodies (part of C6). A step is whatever implements [`StepBehavior`]; [`FnStep`] is the one
//! concrete implementation the core ships, since every stage operator (C8) closes over its own
//! [`Setup`](crate::operation::Setup) and store keys rather than needing a bespoke step type per
//! operator kind — the same type-erasure-by-closure idiom the teacher uses for `Box<dyn Select>` /
//! `Box<dyn Crossover>` trait objects, just pushed one level further since here the "trait object"
//! is a step's entire per-branch call.
use crate::error::GaResult;
use crate::scheduler::BranchContext;
use crate::store::DataStore;
use std::sync::Arc;

/// A node in the flow graph that runs once per branch per invocation (the spec's Sequential,
/// Operation step and Nop kinds — they differ only in what their call does, not in how the scheduler
/// drives them).
pub trait StepBehavior: Send + Sync {
    /// Runs once per flow connect, with the branch count the owning group was wired with.
    fn prepare(&self, _branch_count: usize) {}
    /// Runs once when this step's operator is disconnected or swapped out.
    fn clear(&self) {}
    /// The per-branch call.
    fn call(&self, ctx: &BranchContext, store: &DataStore) -> GaResult<()>;
}

type CallFn = Arc<dyn Fn(&BranchContext, &DataStore) -> GaResult<()> + Send + Sync>;
type PrepareFn = Arc<dyn Fn(usize) + Send + Sync>;
type ClearFn = Arc<dyn Fn() + Send + Sync>;

/// A [`StepBehavior`] built from plain closures.
#[derive(Clone)]
pub struct FnStep {
    call_fn: CallFn,
    prepare_fn: Option<PrepareFn>,
    clear_fn: Option<ClearFn>,
}

impl FnStep {
    pub fn new<F>(call_fn: F) -> Self
    where
        F: Fn(&BranchContext, &DataStore) -> GaResult<()> + Send + Sync + 'static,
    {
        Self {
            call_fn: Arc::new(call_fn),
            prepare_fn: None,
            clear_fn: None,
        }
    }

    pub fn with_prepare<F>(mut self, prepare_fn: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.prepare_fn = Some(Arc::new(prepare_fn));
        self
    }

    pub fn with_clear<F>(mut self, clear_fn: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.clear_fn = Some(Arc::new(clear_fn));
        self
    }

    /// A no-op step that preserves edge identity (the spec's Nop kind), useful when the stub wants
    /// to keep a connection's shape stable while swapping what runs on either side of it.
    pub fn nop() -> Self {
        Self::new(|_ctx, _store| Ok(()))
    }
}

impl StepBehavior for FnStep {
    fn prepare(&self, branch_count: usize) {
        if let Some(f) = &self.prepare_fn {
            f(branch_count);
        }
    }
    fn clear(&self) {
        if let Some(f) = &self.clear_fn {
            f();
        }
    }
    fn call(&self, ctx: &BranchContext, store: &DataStore) -> GaResult<()> {
        (self.call_fn)(ctx, store)
    }
}

/// A Decision node (the spec's Decision kind): its predicate is evaluated exactly once, on the
/// thread walking the flow graph, and the scheduler never branches it out across worker threads —
/// "the scheduler broadcasts the result across branches" by virtue of the predicate simply deciding
/// which edge the single-threaded graph walk takes next.
#[derive(Clone)]
pub struct DecisionStep {
    predicate: Arc<dyn Fn(&DataStore) -> GaResult<bool> + Send + Sync>,
}

impl DecisionStep {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&DataStore) -> GaResult<bool> + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    pub fn evaluate(&self, store: &DataStore) -> GaResult<bool> {
        (self.predicate)(store)
    }
}
