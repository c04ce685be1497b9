//! Process-wide random number source.
//!
//! The upstream `genetic_algorithm` crate keeps a `thread_local!` [`SmallRng`](rand::rngs::SmallRng)
//! in `global_rand.rs`, reseedable via `set_small_rng`. A branch-parallel scheduler needs the same
//! "one shared, thread-safe generator" property but across a fixed, scheduler-managed branch pool
//! rather than arbitrary OS threads, so this module keeps a single process-wide generator behind a
//! `Mutex` instead of one instance per thread. A true lock-free compare-and-swap generator would
//! need to encode the entire `SmallRng` state machine atomically, which isn't practical; a `Mutex`
//! held only for the duration of a single sample is the pragmatic reading of "thread-safe, uniform"
//! in the external interfaces section.
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, OnceLock};

static GLOBAL_RNG: OnceLock<Mutex<SmallRng>> = OnceLock::new();

fn global() -> &'static Mutex<SmallRng> {
    GLOBAL_RNG.get_or_init(|| Mutex::new(SmallRng::from_entropy()))
}

/// Reseed the process-wide generator. Mainly useful for deterministic tests.
pub fn seed(seed: u64) {
    let mut guard = global().lock().expect("global rng poisoned");
    *guard = SmallRng::seed_from_u64(seed);
}

/// Draw a uniform value in `[low, high)`.
pub fn gen_range(low: usize, high: usize) -> usize {
    let mut guard = global().lock().expect("global rng poisoned");
    guard.gen_range(low..high)
}

/// Draw a uniform `f32` in `[0.0, 1.0)`, used for probability gates (crossover/mutation rates).
pub fn gen_probability() -> f32 {
    let mut guard = global().lock().expect("global rng poisoned");
    guard.gen::<f32>()
}

/// Fisher-Yates shuffle of `slice`, drawing from the shared generator.
pub fn shuffle<T>(slice: &mut [T]) {
    use rand::seq::SliceRandom;
    let mut guard = global().lock().expect("global rng poisoned");
    slice.shuffle(&mut *guard);
}

/// Sample `amount` distinct indices from `0..population_size` without replacement.
pub fn sample_indices_without_replacement(population_size: usize, amount: usize) -> Vec<usize> {
    use rand::seq::index::sample;
    let mut guard = global().lock().expect("global rng poisoned");
    sample(&mut *guard, population_size, amount.min(population_size)).into_vec()
}
