//! C6: the flow graph — steps and the typed connections between them.
//!
//! A generation is a walk from a start node, synchronously advancing between steps: every step's
//! `scheduler.run` call fully joins its branches before the walk continues (`rayon::scope` blocks
//! until all spawned branch tasks return), which is exactly the "all branch calls of `s_k`
//! happens-before the first branch call of `s_{k+1}`" ordering guarantee (P7) — no extra barrier is
//! needed between steps, only within one step's single-executor regions.
pub mod step;

use crate::error::{GaError, GaResult};
use crate::scheduler::BranchScheduler;
use crate::store::DataStore;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use step::{DecisionStep, StepBehavior};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

enum Node {
    Step(Arc<dyn StepBehavior>),
    /// Out-edges are `[then, else]`; `evaluate` picks which one the walk follows next.
    Decision(DecisionStep),
}

/// Steps and their typed connections (C6). Chromosome-representation-agnostic: a step's body closes
/// over whatever typed data it needs from the [`DataStore`], so the graph itself never needs to be
/// generic over a chromosome type.
#[derive(Default)]
pub struct FlowGraph {
    nodes: FxHashMap<NodeId, Node>,
    /// Out-edges per node, in declared order.
    edges: FxHashMap<NodeId, Vec<NodeId>>,
    next_id: u32,
}

impl FlowGraph {
    pub fn new() -> Self {
        Self {
            nodes: FxHashMap::default(),
            edges: FxHashMap::default(),
            next_id: 0,
        }
    }

    fn fresh_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Adds a Sequential, Operation-step or Nop node — all three are plain [`StepBehavior`]s that
    /// differ only in what they do, not in how the graph drives them.
    pub fn add_step(&mut self, behavior: Arc<dyn StepBehavior>) -> NodeId {
        let id = self.fresh_id();
        self.nodes.insert(id, Node::Step(behavior));
        id
    }

    pub fn add_decision(&mut self, decision: DecisionStep) -> NodeId {
        let id = self.fresh_id();
        self.nodes.insert(id, Node::Decision(decision));
        id
    }

    fn max_out_edges(&self, id: NodeId) -> GaResult<usize> {
        match self.nodes.get(&id) {
            Some(Node::Step(_)) => Ok(1),
            Some(Node::Decision(_)) => Ok(2),
            None => Err(GaError::NotFound),
        }
    }

    /// Adds an edge `from -> to`. A Sequential/Operation/Nop node accepts at most one outgoing edge;
    /// a Decision node accepts at most two (`[then, else]`, in the order added).
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> GaResult<()> {
        if !self.nodes.contains_key(&to) {
            return Err(GaError::NotFound);
        }
        let max_out = self.max_out_edges(from)?;
        let out = self.edges.entry(from).or_default();
        if out.len() >= max_out {
            return Err(GaError::InvalidOperation(
                "node already has its maximum number of outgoing edges",
            ));
        }
        out.push(to);
        Ok(())
    }

    /// Removes the edge `from -> to`. If `to` is left with no remaining incoming edges, its operator
    /// is treated as dangling and `clear` runs on it.
    pub fn disconnect(&mut self, from: NodeId, to: NodeId) -> GaResult<()> {
        let out = self.edges.get_mut(&from).ok_or(GaError::NotFound)?;
        let position = out.iter().position(|n| *n == to).ok_or(GaError::NotFound)?;
        out.remove(position);

        let still_referenced = self.edges.values().any(|outs| outs.contains(&to));
        if !still_referenced {
            if let Some(Node::Step(behavior)) = self.nodes.get(&to) {
                behavior.clear();
            }
        }
        Ok(())
    }

    /// Runs `prepare` on every step in the graph (called by the stub on flow connect).
    pub fn prepare_all(&self, branch_count: usize) {
        for node in self.nodes.values() {
            if let Node::Step(behavior) = node {
                behavior.prepare(branch_count);
            }
        }
    }

    /// Runs `clear` on every step in the graph (called by the stub on flow disconnect).
    pub fn clear_all(&self) {
        for node in self.nodes.values() {
            if let Node::Step(behavior) = node {
                behavior.clear();
            }
        }
    }

    /// Walks the graph from `start`, running each Step node across `scheduler`'s branches and
    /// following Decision nodes to their `then`/`else` edge, until a node has no outgoing edge.
    pub fn run(&self, scheduler: &BranchScheduler, store: &DataStore, start: NodeId) -> GaResult<()> {
        let mut current = start;
        loop {
            let next = match self.nodes.get(&current).ok_or(GaError::NotFound)? {
                Node::Step(behavior) => {
                    scheduler.run(|ctx| behavior.call(ctx, store))?;
                    self.edges.get(&current).and_then(|outs| outs.first().copied())
                }
                Node::Decision(decision) => {
                    let taken = decision.evaluate(store)?;
                    let index = if taken { 0 } else { 1 };
                    self.edges.get(&current).and_then(|outs| outs.get(index).copied())
                }
            };
            match next {
                Some(node) => current = node,
                None => return Ok(()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Scope;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn connect_respects_out_edge_limits() {
        let mut graph = FlowGraph::new();
        let a = graph.add_step(Arc::new(step::FnStep::nop()));
        let b = graph.add_step(Arc::new(step::FnStep::nop()));
        let c = graph.add_step(Arc::new(step::FnStep::nop()));
        graph.connect(a, b).unwrap();
        assert_eq!(
            graph.connect(a, c),
            Err(GaError::InvalidOperation(
                "node already has its maximum number of outgoing edges"
            ))
        );
    }

    #[test]
    fn disconnect_clears_dangling_operator() {
        let mut graph = FlowGraph::new();
        let cleared = Arc::new(AtomicUsize::new(0));
        let a = graph.add_step(Arc::new(step::FnStep::nop()));
        let b = graph.add_step(Arc::new(step::FnStep::nop().with_clear({
            let cleared = cleared.clone();
            move || {
                cleared.fetch_add(1, Ordering::SeqCst);
            }
        })));
        graph.connect(a, b).unwrap();
        graph.disconnect(a, b).unwrap();
        assert_eq!(cleared.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn run_walks_sequential_chain() {
        let mut graph = FlowGraph::new();
        let store = DataStore::new();
        store.add(Scope::Workflow, 0, 0i64).unwrap();
        let make_incrementer = || {
            Arc::new(step::FnStep::new(|ctx, store| {
                if ctx.branch == 0 {
                    let (counter, _) = store.get::<i64>(Scope::Workflow, 0)?;
                    *counter.write().unwrap() += 1;
                }
                Ok(())
            }))
        };
        let a = graph.add_step(make_incrementer());
        let b = graph.add_step(make_incrementer());
        graph.connect(a, b).unwrap();

        let scheduler = BranchScheduler::new(2).unwrap();
        graph.run(&scheduler, &store, a).unwrap();

        let (counter, _) = store.get::<i64>(Scope::Workflow, 0).unwrap();
        assert_eq!(*counter.read().unwrap(), 2);
    }

    #[test]
    fn run_follows_decision_edge() {
        let mut graph = FlowGraph::new();
        let store = DataStore::new();
        let taken_then = Arc::new(AtomicUsize::new(0));
        let taken_else = Arc::new(AtomicUsize::new(0));
        let then_step = graph.add_step(Arc::new(step::FnStep::new({
            let taken_then = taken_then.clone();
            move |_ctx, _store| {
                taken_then.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })));
        let else_step = graph.add_step(Arc::new(step::FnStep::new({
            let taken_else = taken_else.clone();
            move |_ctx, _store| {
                taken_else.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })));
        let decision = graph.add_decision(DecisionStep::new(|_store| Ok(true)));
        graph.connect(decision, then_step).unwrap();
        graph.connect(decision, else_step).unwrap();

        let scheduler = BranchScheduler::new(1).unwrap();
        graph.run(&scheduler, &store, decision).unwrap();

        assert_eq!(taken_then.load(Ordering::SeqCst), 1);
        assert_eq!(taken_else.load(Ordering::SeqCst), 0);
    }
}
