//! C5: the operation setup trio — an (Operation, Parameters, Configuration) bundle with value
//! semantics, the unit every stage operator and the algorithm stub exchange.
//!
//! Grounded on the teacher's own three-way split for pluggable strategies: a stateless operation
//! (the teacher's `Select`/`Crossover`/`Mutate` trait object), cloneable parameters, and a cloneable
//! configuration, mirroring how `HillClimbVariant`/`EvolveConfig` separate "what to run" from
//! "how many/how often" from "shared read-only knobs" in `src/strategy/mod.rs`.
use std::sync::Arc;

/// A stateless operation bundle: `Op` carries no per-call state of its own (branch-local scratch
/// lives in `Parameters`/thread-local caches, never in `self`), matching the concurrency contract
/// that its call operator runs per branch per invocation free of hidden process-wide state.
pub trait Operation<Parameters, Configuration>: Send + Sync {
    type Output;

    /// Runs once per flow connect, given the branch count the group was wired with.
    fn prepare(&self, _params: &mut Parameters, _config: &Configuration, _branch_count: usize) {}

    /// Runs when a collaborating data object is replaced mid-flow (e.g. a swapped comparator).
    fn update(&self, _params: &mut Parameters, _config: &Configuration) {}

    /// Runs on disconnect.
    fn clear(&self, _params: &mut Parameters, _config: &Configuration) {}

    /// The call operator: invoked per branch per step execution.
    fn call(&self, params: &Parameters, config: &Configuration, branch: usize) -> Self::Output;
}

/// The (Operation, Parameters, Configuration) trio a stage's setup exchanges as one value.
///
/// Value semantics: cloning a `Setup` deep-copies `parameters` and `configuration` but shares the
/// stateless `operation` behind an `Arc`, the same split the spec calls for so the stub can swap an
/// operator between generations without caller code losing its handle to the operation vtable.
pub struct Setup<P, Cfg, Out> {
    operation: Arc<dyn Operation<P, Cfg, Output = Out>>,
    parameters: P,
    configuration: Cfg,
    connected: bool,
}

impl<P: Clone, Cfg: Clone, Out> Clone for Setup<P, Cfg, Out> {
    fn clone(&self) -> Self {
        Self {
            operation: self.operation.clone(),
            parameters: self.parameters.clone(),
            configuration: self.configuration.clone(),
            connected: self.connected,
        }
    }
}

impl<P, Cfg, Out> Setup<P, Cfg, Out> {
    pub fn new(operation: Arc<dyn Operation<P, Cfg, Output = Out>>, parameters: P, configuration: Cfg) -> Self {
        Self {
            operation,
            parameters,
            configuration,
            connected: false,
        }
    }

    pub fn parameters(&self) -> &P {
        &self.parameters
    }
    pub fn parameters_mut(&mut self) -> &mut P {
        &mut self.parameters
    }
    pub fn configuration(&self) -> &Cfg {
        &self.configuration
    }

    /// Runs `prepare` on the operation; called once per flow connect with the branch count.
    pub fn prepare(&mut self, branch_count: usize) {
        let operation = self.operation.clone();
        operation.prepare(&mut self.parameters, &self.configuration, branch_count);
        self.connected = true;
    }

    pub fn notify_update(&mut self) {
        let operation = self.operation.clone();
        operation.update(&mut self.parameters, &self.configuration);
    }

    /// Runs `clear` on the operation; called on disconnect.
    pub fn clear(&mut self) {
        let operation = self.operation.clone();
        operation.clear(&mut self.parameters, &self.configuration);
        self.connected = false;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Invokes the call operator for `branch`.
    pub fn call(&self, branch: usize) -> Out {
        self.operation.call(&self.parameters, &self.configuration, branch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Default)]
    struct CountingParams {
        prepared_with: usize,
    }

    #[derive(Clone, Default)]
    struct NoConfig;

    struct DoubleIt(Arc<AtomicUsize>);

    impl Operation<CountingParams, NoConfig> for DoubleIt {
        type Output = usize;

        fn prepare(&self, params: &mut CountingParams, _config: &NoConfig, branch_count: usize) {
            params.prepared_with = branch_count;
            self.0.fetch_add(1, Ordering::SeqCst);
        }

        fn call(&self, _params: &CountingParams, _config: &NoConfig, branch: usize) -> usize {
            branch * 2
        }
    }

    #[test]
    fn prepare_runs_once_and_records_branch_count() {
        let prepares = Arc::new(AtomicUsize::new(0));
        let mut setup = Setup::new(
            Arc::new(DoubleIt(prepares.clone())),
            CountingParams::default(),
            NoConfig,
        );
        setup.prepare(4);
        assert_eq!(setup.parameters().prepared_with, 4);
        assert_eq!(prepares.load(Ordering::SeqCst), 1);
        assert!(setup.is_connected());
    }

    #[test]
    fn clone_deep_copies_parameters_but_shares_operation() {
        let prepares = Arc::new(AtomicUsize::new(0));
        let mut setup = Setup::new(
            Arc::new(DoubleIt(prepares.clone())),
            CountingParams::default(),
            NoConfig,
        );
        setup.prepare(2);
        let mut cloned = setup.clone();
        cloned.parameters_mut().prepared_with = 99;
        assert_eq!(setup.parameters().prepared_with, 2);
        assert_eq!(cloned.call(5), 10);
    }

    #[test]
    fn clear_marks_disconnected() {
        let prepares = Arc::new(AtomicUsize::new(0));
        let mut setup = Setup::new(
            Arc::new(DoubleIt(prepares)),
            CountingParams::default(),
            NoConfig,
        );
        setup.prepare(1);
        setup.clear();
        assert!(!setup.is_connected());
    }
}
