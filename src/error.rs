//! Error types for the toposeq codec.
//!
//! This module provides a unified error type [`TopoSeqError`] that covers
//! every failure the vocabulary, graph model, encoder, grammar, decoder,
//! renamer, generation controller and netlist front end can report.

use thiserror::Error;

/// Result type alias using [`TopoSeqError`].
pub type Result<T> = std::result::Result<T, TopoSeqError>;

/// Unified error type for all toposeq operations.
#[derive(Error, Debug)]
pub enum TopoSeqError {
    // ============ Vocabulary Errors ============
    /// A token name or id outside the enumerated vocabulary
    #[error("Unknown token '{token}'")]
    UnknownToken { token: String },

    /// A persisted vocabulary table disagrees with the built vocabulary
    #[error("Vocabulary mismatch at id {position}: expected '{expected}', found '{found}'")]
    VocabularyMismatch {
        position: usize,
        expected: String,
        found: String,
    },

    // ============ Graph Errors ============
    /// Part of the graph cannot be reached from the traversal start
    #[error("Disconnected graph: '{node}' is unreachable from '{start}'")]
    DisconnectedGraph { start: String, node: String },

    /// A device still has pins without a net
    #[error("Device '{device}' has unassigned pins: {missing}")]
    IncompletePin { device: String, missing: String },

    /// The graph or sequence contains no pin-edge at all
    #[error("Graph contains no pin-edges")]
    EmptyGraph,

    /// An encoded sequence exceeds the configured length limit
    #[error("Sequence of {length} tokens exceeds the limit of {limit}")]
    SequenceTooLong { length: usize, limit: usize },

    // ============ Decoding Errors ============
    /// The oracle gave zero probability to every legal continuation
    #[error("Grammar dead end at position {position}: no legal token has probability mass")]
    GrammarDeadEnd { position: usize },

    /// A token is not allowed by the grammar in the current state
    #[error("Grammar violation at position {position}: {message}")]
    GrammarViolation { position: usize, message: String },

    /// A device pin is bound to two different nets. `position` is the
    /// offending token when the conflict comes from a sequence.
    #[error(
        "Conflicting connection{} for '{device}' pin {pin}: already on '{existing}', got '{conflicting}'",
        position_suffix(.position)
    )]
    DuplicateEdge {
        position: Option<usize>,
        device: String,
        pin: String,
        existing: String,
        conflicting: String,
    },

    /// Renaming ran out of indices for a device type or net category
    #[error("Index range exhausted for '{kind}': {count} instances, {capacity} indices available")]
    RangeExhausted {
        kind: String,
        count: usize,
        capacity: usize,
    },

    /// The probability oracle misbehaved
    #[error("Oracle error: {message}")]
    OracleError { message: String },

    // ============ Netlist Errors ============
    /// Error during lexical analysis
    #[error("Lexer error at line {line}, column {column}: {message}")]
    LexerError {
        line: usize,
        column: usize,
        message: String,
    },

    /// Error during parsing
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// Malformed device instance
    #[error("Invalid instance '{name}' at line {line}: {message}")]
    InvalidInstance {
        name: String,
        line: usize,
        message: String,
    },

    /// The netlist describes a digital circuit
    #[error("Digital circuit rejected: {reason}")]
    DigitalCircuit { reason: String },

    // ============ I/O Errors ============
    /// Malformed adjacency matrix text
    #[error("Adjacency matrix error at row {row}: {message}")]
    AdjacencyFormat { row: usize, message: String },

    /// Error reading an input file
    #[error("Failed to read '{path}': {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Vocabulary table (de)serialization failure
    #[error("Vocabulary table error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TopoSeqError {
    /// Create an unknown token error
    pub fn unknown_token(token: impl Into<String>) -> Self {
        Self::UnknownToken {
            token: token.into(),
        }
    }

    /// Create a grammar violation error
    pub fn grammar_violation(position: usize, message: impl Into<String>) -> Self {
        Self::GrammarViolation {
            position,
            message: message.into(),
        }
    }

    /// Create a lexer error
    pub fn lexer(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::LexerError {
            line,
            column,
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::ParseError {
            line,
            message: message.into(),
        }
    }

    /// Create an invalid instance error
    pub fn invalid_instance(name: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::InvalidInstance {
            name: name.into(),
            line,
            message: message.into(),
        }
    }

    /// Attach the offending token position to a connection conflict.
    /// Other errors pass through unchanged.
    pub fn at_position(self, position: usize) -> Self {
        match self {
            Self::DuplicateEdge {
                device,
                pin,
                existing,
                conflicting,
                ..
            } => Self::DuplicateEdge {
                position: Some(position),
                device,
                pin,
                existing,
                conflicting,
            },
            other => other,
        }
    }

    /// Create an oracle error
    pub fn oracle(message: impl Into<String>) -> Self {
        Self::OracleError {
            message: message.into(),
        }
    }
}

fn position_suffix(position: &Option<usize>) -> String {
    position.map_or_else(String::new, |p| format!(" at position {}", p))
}
