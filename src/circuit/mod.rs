//! Bipartite circuit graph representation and validation.
//!
//! A [`CircuitGraph`] holds device nodes, net nodes and the typed pin-edges
//! between them. It is the unit exchanged between the netlist front end,
//! the encoder, the decoder and downstream consumers.

mod adjacency;
mod graph;
mod types;
mod validate;

pub use adjacency::{from_adjacency_csv, to_adjacency_csv};
pub use graph::{CircuitGraph, GraphSummary, NodeRef, PinEdge};
pub use types::*;
pub use validate::{check_complete, check_connected, structural_report, StructuralReport};
