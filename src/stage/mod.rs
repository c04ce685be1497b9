//! C8: stage operators — the concrete contracts a generation's pipeline wires together. Each
//! submodule is one stage family from the spec's operator table; none of them own a flow node
//! directly (that's C6's [`FnStep`](crate::flow::step::FnStep)) — a stub builds a step whose call
//! closes over the stage function here plus whatever `Setup` parameters it was configured with.
pub mod coupling;
pub mod fitness;
pub mod mating;
pub mod replacement;
pub mod scaling;
pub mod selection;
