//! Incremental graph assembly from a token stream.
//!
//! Shared by the decoder and the generation session: both feed tokens one
//! at a time through the grammar and, when tracking is on, turn every
//! completed node/edge/node triple into a pin-edge.

use crate::circuit::{check_complete, CircuitGraph, DeviceId, NetId, PinSet};
use crate::error::{Result, TopoSeqError};
use crate::grammar::{Grammar, GrammarState};
use crate::vocab::{PinLabel, Token, TokenId, Vocabulary};

pub(crate) struct Assembler<'v> {
    grammar: Grammar<'v>,
    state: GrammarState,
    graph: CircuitGraph,
    last_node: Option<Token>,
    pending: Option<PinLabel>,
    track: bool,
}

impl<'v> Assembler<'v> {
    /// With `track` off only the grammar state is maintained.
    pub fn new(vocab: &'v Vocabulary, track: bool) -> Self {
        Self {
            grammar: Grammar::new(vocab),
            state: GrammarState::start(),
            graph: CircuitGraph::new(),
            last_node: None,
            pending: None,
            track,
        }
    }

    pub fn grammar(&self) -> &Grammar<'v> {
        &self.grammar
    }

    pub fn state(&self) -> &GrammarState {
        &self.state
    }

    pub fn graph(&self) -> &CircuitGraph {
        &self.graph
    }

    /// The most recent device or net token.
    pub fn last_node(&self) -> Option<Token> {
        self.last_node
    }

    /// The connection `token` would complete, if any.
    pub fn closing(&self, token: Token) -> Option<(DeviceId, NetId, PinSet)> {
        let label = self.pending?;
        match (self.last_node?, token) {
            (Token::Net(net), Token::Device(device)) | (Token::Device(device), Token::Net(net)) => {
                Some((device, net, label.pins()))
            }
            _ => None,
        }
    }

    /// Consume one token. On error nothing changes.
    pub fn push(&mut self, id: TokenId) -> Result<()> {
        let token = self.grammar.vocab().token(id)?;
        let next = self.grammar.advance(&self.state, id)?;

        if self.track {
            if let Some((device, net, pins)) = self.closing(token) {
                let position = self.state.position;
                self.graph
                    .connect(device, net, pins)
                    .map_err(|e| e.at_position(position))?;
            }
            match token {
                Token::Device(device) => {
                    self.graph.add_device(device);
                }
                Token::Net(net) => {
                    self.graph.add_net(net);
                }
                Token::CircuitType(t) => self.graph.set_circuit_type(Some(t)),
                _ => {}
            }
        }

        match token {
            Token::PinEdge(label) => self.pending = Some(label),
            Token::Device(_) | Token::Net(_) => {
                self.last_node = Some(token);
                self.pending = None;
            }
            _ => {}
        }
        self.state = next;
        Ok(())
    }

    /// Close the stream and hand out the graph if it is structurally
    /// complete.
    pub fn finish(self) -> Result<CircuitGraph> {
        if self.state.is_mid_connection() {
            return Err(TopoSeqError::grammar_violation(
                self.state.position,
                "sequence ends inside a connection",
            ));
        }
        check_complete(&self.graph)?;
        if self.graph.edges().is_empty() {
            return Err(TopoSeqError::EmptyGraph);
        }
        Ok(self.graph)
    }
}
