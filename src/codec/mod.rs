//! Graph/sequence codec.
//!
//! - [`Encoder`] linearizes a [`CircuitGraph`](crate::circuit::CircuitGraph)
//!   into a [`TokenSequence`](crate::vocab::TokenSequence) with a seeded walk
//! - [`Decoder`] replays a sequence through the grammar and rebuilds the graph

pub(crate) mod assembler;
mod decoder;
mod encoder;

pub use decoder::{decode, Decoder};
pub use encoder::{Encoder, EncoderConfig};
