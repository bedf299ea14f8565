//! Graph to sequence encoding.
//!
//! The encoder linearizes a graph with a randomized closed walk that takes
//! every pin-edge at least once:
//!
//! 1. Start at `VSS` if the graph has it, otherwise at the first net.
//! 2. While the current node has an untaken edge, take one uniformly at
//!    random and emit its label and the node on the other side.
//! 3. When the current node has none left, walk the shortest path over
//!    taken edges to the nearest node that still has one, emitting every
//!    edge and node on the way. Ties are broken by edge order.
//! 4. After the last edge, return to the start node the same way and emit
//!    `TRUNCATE`.
//!
//! All choices depend only on the seed and on node and edge order, so the
//! same graph and seed always give the same sequence.

use std::collections::{HashSet, VecDeque};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::circuit::{check_complete, check_connected, CircuitGraph, NetId, NodeRef};
use crate::error::{Result, TopoSeqError};
use crate::vocab::{TokenId, TokenSequence, Vocabulary};

/// Encoder configuration.
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    /// Reject sequences longer than this (before padding)
    pub max_length: Option<usize>,
    /// Pad with `TRUNCATE` up to this length
    pub pad_to: Option<usize>,
    /// Emit the circuit type token when the graph has one
    pub include_circuit_type: bool,
    /// Attempts allowed per requested sequence in [`Encoder::encode_many`]
    pub attempts_per_sequence: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            max_length: None,
            pad_to: None,
            include_circuit_type: true,
            attempts_per_sequence: 10,
        }
    }
}

impl EncoderConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the length limit.
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Set the padded length.
    pub fn with_pad_to(mut self, pad_to: usize) -> Self {
        self.pad_to = Some(pad_to);
        self
    }

    /// Enable or disable the circuit type prefix.
    pub fn with_circuit_type(mut self, include: bool) -> Self {
        self.include_circuit_type = include;
        self
    }

    /// Set the attempt budget per requested sequence.
    pub fn with_attempts_per_sequence(mut self, attempts: usize) -> Self {
        self.attempts_per_sequence = attempts.max(1);
        self
    }
}

/// Graph to sequence encoder.
#[derive(Debug, Clone)]
pub struct Encoder<'v> {
    vocab: &'v Vocabulary,
    config: EncoderConfig,
}

impl<'v> Encoder<'v> {
    /// Create an encoder with the default configuration.
    pub fn new(vocab: &'v Vocabulary) -> Self {
        Self::with_config(vocab, EncoderConfig::default())
    }

    pub fn with_config(vocab: &'v Vocabulary, config: EncoderConfig) -> Self {
        Self { vocab, config }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Encode a graph with one seed.
    pub fn encode(&self, graph: &CircuitGraph, seed: u64) -> Result<TokenSequence> {
        let start = self.check(graph)?;
        self.walk(graph, start, seed)
    }

    /// Encode a graph into up to `count` distinct sequences, trying seeds
    /// `base_seed`, `base_seed + 1`, ... within the attempt budget.
    pub fn encode_many(
        &self,
        graph: &CircuitGraph,
        base_seed: u64,
        count: usize,
    ) -> Result<Vec<TokenSequence>> {
        let start = self.check(graph)?;
        let budget = count.saturating_mul(self.config.attempts_per_sequence);

        let mut seen = HashSet::new();
        let mut sequences = Vec::with_capacity(count);
        for attempt in 0..budget {
            if sequences.len() == count {
                break;
            }
            let sequence = self.walk(graph, start, base_seed.wrapping_add(attempt as u64))?;
            if seen.insert(sequence.clone()) {
                sequences.push(sequence);
            }
        }
        debug!(requested = count, produced = sequences.len(), "encoded variants");
        Ok(sequences)
    }

    /// Encode many graphs in parallel. Item `i` uses seed
    /// `base_seed + i`; failures are reported per item.
    pub fn encode_batch(
        &self,
        graphs: &[CircuitGraph],
        base_seed: u64,
    ) -> Vec<Result<TokenSequence>> {
        graphs
            .par_iter()
            .enumerate()
            .map(|(i, graph)| self.encode(graph, base_seed.wrapping_add(i as u64)))
            .collect()
    }

    /// Validate the graph and pick the walk's start node.
    fn check(&self, graph: &CircuitGraph) -> Result<NodeRef> {
        if graph.edges().is_empty() {
            return Err(TopoSeqError::EmptyGraph);
        }
        check_complete(graph)?;
        let start = match graph.net_index(&NetId::VSS) {
            Some(n) => NodeRef::Net(n),
            None => NodeRef::Net(0),
        };
        check_connected(graph, start)?;
        Ok(start)
    }

    fn walk(&self, graph: &CircuitGraph, start: NodeRef, seed: u64) -> Result<TokenSequence> {
        let mut rng = StdRng::seed_from_u64(seed);
        let incidence = graph.incidence();
        let mut taken = vec![false; graph.edges().len()];
        let mut remaining = graph.edges().len();

        let mut tokens = Vec::with_capacity(2 * remaining + 4);
        if self.config.include_circuit_type {
            if let Some(t) = graph.circuit_type() {
                tokens.push(self.vocab.circuit_type_id(t)?);
            }
        }
        tokens.push(self.node_token(graph, start)?);

        let mut current = start;
        while remaining > 0 {
            let open: Vec<usize> = incidence[graph.flat_index(current)]
                .iter()
                .copied()
                .filter(|&e| !taken[e])
                .collect();

            if open.is_empty() {
                let path = shortest_path(graph, &incidence, current, |e| !taken[e])?;
                trace!(from = %graph.node_name(current), hops = path.len(), "walk backtracks");
                current = self.emit_path(graph, current, &path, &mut tokens)?;
                continue;
            }

            let edge = open[rng.gen_range(0..open.len())];
            taken[edge] = true;
            remaining -= 1;
            current = self.emit_path(graph, current, &[edge], &mut tokens)?;
        }

        if current != start {
            let target = graph.flat_index(start);
            let path = shortest_path_to(graph, &incidence, current, target)?;
            self.emit_path(graph, current, &path, &mut tokens)?;
        }
        tokens.push(self.vocab.truncate_id());

        if let Some(limit) = self.config.max_length {
            if tokens.len() > limit {
                return Err(TopoSeqError::SequenceTooLong {
                    length: tokens.len(),
                    limit,
                });
            }
        }
        if let Some(pad) = self.config.pad_to {
            tokens.resize(tokens.len().max(pad), self.vocab.truncate_id());
        }

        debug!(seed, edges = graph.edges().len(), length = tokens.len(), "encoded graph");
        Ok(TokenSequence::from(tokens))
    }

    /// Emit `label node` for each edge of a path; returns the end node.
    fn emit_path(
        &self,
        graph: &CircuitGraph,
        mut current: NodeRef,
        path: &[usize],
        tokens: &mut Vec<TokenId>,
    ) -> Result<NodeRef> {
        for &edge in path {
            let label = graph.edge_label(&graph.edges()[edge])?;
            tokens.push(self.vocab.label_id(label)?);
            current = graph.opposite(edge, current);
            tokens.push(self.node_token(graph, current)?);
        }
        Ok(current)
    }

    fn node_token(&self, graph: &CircuitGraph, node: NodeRef) -> Result<TokenId> {
        match node {
            NodeRef::Device(d) => self.vocab.device_id(graph.devices()[d]),
            NodeRef::Net(n) => self.vocab.net_id(graph.nets()[n]),
        }
    }
}

/// Shortest path (as edge indices) from `from` to the nearest node with an
/// incident edge satisfying `wanted`.
fn shortest_path(
    graph: &CircuitGraph,
    incidence: &[Vec<usize>],
    from: NodeRef,
    wanted: impl Fn(usize) -> bool,
) -> Result<Vec<usize>> {
    bfs(graph, incidence, from, |flat| incidence[flat].iter().any(|&e| wanted(e)))
}

fn shortest_path_to(
    graph: &CircuitGraph,
    incidence: &[Vec<usize>],
    from: NodeRef,
    target: usize,
) -> Result<Vec<usize>> {
    bfs(graph, incidence, from, |flat| flat == target)
}

fn bfs(
    graph: &CircuitGraph,
    incidence: &[Vec<usize>],
    from: NodeRef,
    is_target: impl Fn(usize) -> bool,
) -> Result<Vec<usize>> {
    let origin = graph.flat_index(from);
    // (previous node, edge) per visited node
    let mut parent: Vec<Option<(usize, usize)>> = vec![None; graph.node_count()];
    let mut seen = vec![false; graph.node_count()];
    let mut queue = VecDeque::from([from]);
    seen[origin] = true;

    while let Some(node) = queue.pop_front() {
        let flat = graph.flat_index(node);
        if flat != origin && is_target(flat) {
            let mut path = Vec::new();
            let mut at = flat;
            while let Some((prev, edge)) = parent[at] {
                path.push(edge);
                at = prev;
            }
            path.reverse();
            return Ok(path);
        }
        for &edge in &incidence[flat] {
            let next = graph.opposite(edge, node);
            let next_flat = graph.flat_index(next);
            if !seen[next_flat] {
                seen[next_flat] = true;
                parent[next_flat] = Some((flat, edge));
                queue.push_back(next);
            }
        }
    }

    Err(TopoSeqError::DisconnectedGraph {
        start: graph.node_name(from),
        node: "remaining edges".to_string(),
    })
}
