//! # TopoSeq Core
//!
//! A reversible codec between analog circuit topologies and token sequences.
//!
//! This library provides:
//! - A fixed, enumerated vocabulary of devices, nets, compound pin-edge
//!   labels, circuit types and an end marker
//! - A bipartite graph model of device nodes, net nodes and typed pin-edges
//! - A seeded walk encoder and a grammar-checked decoder
//! - A grammar automaton that yields the legal next tokens at any prefix
//! - A grammar-constrained generation controller driven by an external
//!   probability oracle
//! - Isomorphism-preserving renaming for data augmentation
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`vocab`] - Token catalog and id assignment
//! - [`circuit`] - Bipartite graph representation and validation
//! - [`codec`] - Encoder (graph to sequences) and decoder (sequence to graph)
//! - [`grammar`] - Legal-next-token automaton
//! - [`generate`] - Masked sampling against a probability oracle
//! - [`augment`] - Random renaming of device and net indices
//! - [`netlist`] - Parser for SPICE-style instance netlists
//!
//! ## Usage
//!
//! ```
//! use toposeq_core::{decode, graph_from_netlist, BuildConfig, Encoder, Vocabulary};
//!
//! let vocab = Vocabulary::build();
//! let graph = graph_from_netlist("MM0 (VOUT1 VIN1 VSS VSS) nmos4", &BuildConfig::new())?;
//! let sequence = Encoder::new(&vocab).encode(&graph, 0)?;
//! let decoded = decode(&vocab, &sequence)?;
//! assert!(decoded.same_topology(&graph));
//! # Ok::<(), toposeq_core::TopoSeqError>(())
//! ```
//!
//! ## Sequence Format
//!
//! A sequence is an optional circuit-type token followed by a walk that
//! alternates node and pin-edge tokens, ending with `TRUNCATE`:
//!
//! ```text
//! CIRCUIT_Opamp VSS M_BS NM1 M_D VOUT1 M_D NM1 M_G VIN1 M_G NM1 M_BS VSS TRUNCATE
//! ```
//!
//! Every consecutive node-edge-node triple asserts one connection;
//! repeated traversals of the same edge are idempotent.

pub mod augment;
pub mod circuit;
pub mod codec;
pub mod error;
pub mod generate;
pub mod grammar;
pub mod netlist;
pub mod vocab;

// Re-export main types for convenience
pub use augment::{rename_graph, rename_sequence, RenameConfig};
pub use circuit::CircuitGraph;
pub use codec::{decode, Decoder, Encoder, EncoderConfig};
pub use error::{Result, TopoSeqError};
pub use generate::{GenerationConfig, Generator, ProbabilityOracle};
pub use grammar::{Grammar, GrammarState};
pub use netlist::{graph_from_netlist, BuildConfig};
pub use vocab::{TokenId, TokenSequence, Vocabulary};
