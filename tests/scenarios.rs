//! The worked scenarios from the testable-properties section, reproduced as executable tests.
use crate::support;
use ga_workflow_core::contract::Tracker;
use ga_workflow_core::error::GaError;
use ga_workflow_core::flow::step::FnStep;
use ga_workflow_core::flow::FlowGraph;
use ga_workflow_core::population::{Population, PopulationConfig};
use ga_workflow_core::scheduler::BranchScheduler;
use ga_workflow_core::store::DataStore;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Scenario 1: a tracker observing population size across several generations, including one
/// where a removal is queued mid-generation. Dispatch happens before queued removals are applied
/// (see [`Population::next_generation`]), so the tracker sees the pre-removal size on the
/// generation the removal was queued, and the smaller size from then on.
#[test]
fn population_size_tracker_reports_size_before_queued_removals_apply() {
    #[derive(Debug)]
    struct SizeTracker(Arc<Mutex<Vec<usize>>>);
    impl Tracker<support::TestChromosome> for SizeTracker {
        fn update(&mut self, population: &Population<support::TestChromosome>, _generation_index: usize) {
            self.0.lock().expect("observed sizes mutex poisoned").push(population.main().len());
        }
    }

    let mut population = Population::try_from(PopulationConfig {
        capacity: 5,
        pool_cap: None,
    })
    .unwrap();
    population
        .initialize(
            || support::TestChromosome::new(1.0),
            None::<fn(&support::TestChromosome) -> Vec<f64>>,
        )
        .unwrap();

    let observed = Arc::new(Mutex::new(Vec::new()));
    population.register_tracker(0, Box::new(SizeTracker(observed.clone())));

    population.next_generation();
    let victim = population.main().members()[0];
    population.queue_removal(victim);
    population.next_generation();
    population.next_generation();

    assert_eq!(*observed.lock().unwrap(), vec![5, 5, 4]);
}

/// Scenario 6: cancellation landing while branches are mid-step. Every branch enters the first
/// step before the cancellation lands (observed via a shared counter), but none reach the second
/// step, since the barrier inside the first step's body surfaces `Cancelled` before the flow walk
/// can advance.
#[test]
fn cancellation_landing_mid_step_stops_every_branch_before_the_next_step() {
    let store = DataStore::new();
    let progress = Arc::new(AtomicUsize::new(0));
    let mut graph = FlowGraph::new();

    let first = graph.add_step(Arc::new(FnStep::new({
        let progress = progress.clone();
        move |ctx, _store| {
            progress.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(50));
            ctx.barrier()
        }
    })));
    let second = graph.add_step(Arc::new(FnStep::new({
        let progress = progress.clone();
        move |_ctx, _store| {
            progress.fetch_add(100, Ordering::SeqCst);
            Ok(())
        }
    })));
    graph.connect(first, second).unwrap();

    let scheduler = Arc::new(BranchScheduler::new(3).unwrap());
    let stopper = {
        let scheduler = scheduler.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            scheduler.stop();
        })
    };

    let result = graph.run(&scheduler, &store, first);
    stopper.join().expect("stopper thread panicked");

    assert_eq!(result, Err(GaError::Cancelled));
    assert_eq!(
        progress.load(Ordering::SeqCst),
        3,
        "every branch must have entered the first step before the barrier observed cancellation"
    );
}
