//! Data augmentation.
//!
//! Renaming produces lexically distinct but isomorphic variants of a graph
//! or sequence; combined with the encoder's seeded walks it multiplies the
//! sequences available per circuit.

mod rename;

pub use rename::{rename_graph, rename_sequence, NetRenaming, RenameConfig, Renaming};
