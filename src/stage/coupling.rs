//! Coupling operation (C8): pairs selection output into mating tuples and hands each pair to the
//! mating configuration (see [`crate::stage::mating`]), writing offspring into a crossover buffer.
//!
//! Grounded on the teacher's pairing of consecutive `Population` members for crossover in
//! `src/crossover/`, generalized to the variant table the spec calls out (Simple, Inverse, Random,
//! Cellular).
use crate::chromosome::StorageId;

#[derive(Clone)]
pub enum CouplingVariant {
    /// `(i, i+1)` mod N.
    Simple,
    /// Best paired with worst, second-best with second-worst, and so on.
    Inverse,
    /// Shuffle the input, then pair as [`CouplingVariant::Simple`].
    Random,
    /// Pairs determined by a caller-supplied topology (neighbourhood indexing); out of scope in
    /// its concrete form here, only the contract shape is specified.
    Cellular(std::sync::Arc<dyn CellularTopology>),
}

/// Neighbourhood lookup for the Cellular coupling variant.
pub trait CellularTopology: Send + Sync {
    fn neighbors(&self, index: usize, population_size: usize) -> Vec<usize>;
}

#[derive(Clone)]
pub struct CouplingParameters {
    pub variant: CouplingVariant,
}

/// Builds mating pairs from `parents`, in the order the variant defines. `parents[i]` pairs with
/// `parents[partner(i)]`; every input index appears in exactly one pair (the last is dropped on an
/// odd-length input, matching the teacher's own `chunks(2)` pairing for an uneven population).
pub fn pair(parents: &[StorageId], params: &CouplingParameters) -> Vec<(StorageId, StorageId)> {
    match &params.variant {
        CouplingVariant::Simple => simple_pairs(parents),
        CouplingVariant::Inverse => inverse_pairs(parents),
        CouplingVariant::Random => {
            let mut shuffled = parents.to_vec();
            crate::random::shuffle(&mut shuffled);
            simple_pairs(&shuffled)
        }
        CouplingVariant::Cellular(topology) => cellular_pairs(parents, topology.as_ref()),
    }
}

fn simple_pairs(parents: &[StorageId]) -> Vec<(StorageId, StorageId)> {
    parents.chunks_exact(2).map(|pair| (pair[0], pair[1])).collect()
}

/// Pairs index `i` from the front with index `i` from the back: `(0, n-1), (1, n-2), ...`, stopping
/// before the two cursors cross (so an odd middle element is dropped, same rule as `simple_pairs`).
fn inverse_pairs(parents: &[StorageId]) -> Vec<(StorageId, StorageId)> {
    let mut pairs = Vec::with_capacity(parents.len() / 2);
    let mut lo = 0;
    let mut hi = parents.len();
    while lo + 1 < hi {
        hi -= 1;
        pairs.push((parents[lo], parents[hi]));
        lo += 1;
    }
    pairs
}

fn cellular_pairs(
    parents: &[StorageId],
    topology: &dyn CellularTopology,
) -> Vec<(StorageId, StorageId)> {
    let mut pairs = Vec::with_capacity(parents.len());
    let mut paired = vec![false; parents.len()];
    for i in 0..parents.len() {
        if paired[i] {
            continue;
        }
        let Some(&j) = topology
            .neighbors(i, parents.len())
            .iter()
            .find(|&&j| j != i && !paired[j])
        else {
            continue;
        };
        pairs.push((parents[i], parents[j]));
        paired[i] = true;
        paired[j] = true;
    }
    pairs
}
