//! Grammar state machine over token sequences.
//!
//! The grammar is a finite-state acceptor that knows, for every state, the
//! exact set of tokens that may come next. It is used both to validate
//! sequences read from storage and to mask the oracle's distribution
//! during generation.
//!
//! | Phase              | Valid next tokens                                  |
//! |--------------------|----------------------------------------------------|
//! | `Start`            | circuit type, net, device                          |
//! | `AfterCircuitType` | net, device                                        |
//! | `AtNet`            | any pin-edge, `TRUNCATE`                           |
//! | `AtDevice`         | pin-edge of the device's family, `TRUNCATE`        |
//! | `EdgeFromNet`      | device of the pin-edge's family                    |
//! | `EdgeFromDevice`   | net                                                |
//! | `Finished`         | nothing                                            |
//!
//! The device family of the current connection travels alongside the phase,
//! since a net can be reached from devices of any family.

use std::fmt;

use crate::circuit::DeviceFamily;
use crate::error::{Result, TopoSeqError};
use crate::vocab::{Token, TokenId, TokenSequence, TokenSet, Vocabulary};

/// Position in the device/edge/net alternation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Start,
    AfterCircuitType,
    AtNet,
    AtDevice,
    EdgeFromNet,
    EdgeFromDevice,
    Finished,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Start => "at sequence start",
            Phase::AfterCircuitType => "after the circuit type",
            Phase::AtNet => "after a net",
            Phase::AtDevice => "after a device",
            Phase::EdgeFromNet => "after a pin-edge leaving a net",
            Phase::EdgeFromDevice => "after a pin-edge leaving a device",
            Phase::Finished => "after TRUNCATE",
        };
        f.write_str(name)
    }
}

/// Grammar cursor: phase, tracked device family and consumed token count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrammarState {
    pub phase: Phase,
    /// Family of the device on the current connection, if known
    pub family: Option<DeviceFamily>,
    /// Number of tokens consumed
    pub position: usize,
}

impl GrammarState {
    /// Initial state.
    pub fn start() -> Self {
        Self {
            phase: Phase::Start,
            family: None,
            position: 0,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// True while a connection is half written (an edge without its
    /// closing node).
    pub fn is_mid_connection(&self) -> bool {
        matches!(self.phase, Phase::EdgeFromNet | Phase::EdgeFromDevice)
    }
}

impl Default for GrammarState {
    fn default() -> Self {
        Self::start()
    }
}

/// The grammar, bound to one vocabulary.
#[derive(Debug, Clone, Copy)]
pub struct Grammar<'v> {
    vocab: &'v Vocabulary,
}

impl<'v> Grammar<'v> {
    pub fn new(vocab: &'v Vocabulary) -> Self {
        Self { vocab }
    }

    pub fn vocab(&self) -> &'v Vocabulary {
        self.vocab
    }

    /// Exact set of tokens accepted in `state`.
    pub fn allowed_tokens(&self, state: &GrammarState) -> TokenSet {
        let vocab = self.vocab;
        let mut allowed = vocab.empty_set();
        match state.phase {
            Phase::Start => {
                allowed.union_with(vocab.circuit_types());
                allowed.union_with(vocab.nets());
                allowed.union_with(vocab.devices());
            }
            Phase::AfterCircuitType => {
                allowed.union_with(vocab.nets());
                allowed.union_with(vocab.devices());
            }
            Phase::AtNet => {
                allowed.union_with(vocab.pin_edges());
                allowed.insert(vocab.truncate_id());
            }
            Phase::AtDevice => {
                if let Some(family) = state.family {
                    allowed.union_with(vocab.edges_of(family));
                }
                allowed.insert(vocab.truncate_id());
            }
            Phase::EdgeFromNet => {
                if let Some(family) = state.family {
                    allowed.union_with(vocab.devices_of(family));
                }
            }
            Phase::EdgeFromDevice => allowed.union_with(vocab.nets()),
            Phase::Finished => {}
        }
        allowed
    }

    /// Consume one token. Fails with `GrammarViolation` exactly when the
    /// token is outside [`allowed_tokens`](Self::allowed_tokens).
    pub fn advance(&self, state: &GrammarState, id: TokenId) -> Result<GrammarState> {
        let token = self.vocab.token(id)?;
        let family = state.family;

        let (phase, family) = match (state.phase, token) {
            (Phase::Start, Token::CircuitType(_)) => (Phase::AfterCircuitType, None),
            (Phase::Start | Phase::AfterCircuitType, Token::Net(_)) => (Phase::AtNet, None),
            (Phase::Start | Phase::AfterCircuitType, Token::Device(d)) => {
                (Phase::AtDevice, Some(d.family()))
            }
            (Phase::AtNet, Token::PinEdge(label)) => (Phase::EdgeFromNet, Some(label.family())),
            (Phase::AtDevice, Token::PinEdge(label)) if family == Some(label.family()) => {
                (Phase::EdgeFromDevice, family)
            }
            (Phase::EdgeFromNet, Token::Device(d)) if family == Some(d.family()) => {
                (Phase::AtDevice, family)
            }
            (Phase::EdgeFromDevice, Token::Net(_)) => (Phase::AtNet, family),
            (Phase::AtNet | Phase::AtDevice, Token::Truncate) => (Phase::Finished, family),
            (phase, token) => {
                let detail = match family {
                    Some(f) if matches!(phase, Phase::AtDevice | Phase::EdgeFromNet) => {
                        format!(" (expecting {})", f)
                    }
                    _ => String::new(),
                };
                return Err(TopoSeqError::grammar_violation(
                    state.position,
                    format!("'{}' is not allowed {}{}", token, phase, detail),
                ));
            }
        };

        Ok(GrammarState {
            phase,
            family,
            position: state.position + 1,
        })
    }

    /// Validate a whole sequence and return the final state. `TRUNCATE`
    /// padding after the first `TRUNCATE` is accepted.
    pub fn validate(&self, sequence: &TokenSequence) -> Result<GrammarState> {
        let mut state = GrammarState::start();
        for (position, id) in sequence.iter().enumerate() {
            if state.is_finished() {
                if id != self.vocab.truncate_id() {
                    return Err(TopoSeqError::grammar_violation(
                        position,
                        format!("'{}' after TRUNCATE", self.vocab.name(id)?),
                    ));
                }
                continue;
            }
            state = self.advance(&state, id)?;
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(grammar: &Grammar, names: &[&str]) -> Result<GrammarState> {
        let vocab = grammar.vocab();
        let mut state = GrammarState::start();
        for name in names {
            state = grammar.advance(&state, vocab.parse(name)?)?;
        }
        Ok(state)
    }

    /// One representative state per phase and family.
    fn sample_states(grammar: &Grammar) -> Vec<GrammarState> {
        let prefixes: &[&[&str]] = &[
            &[],
            &["CIRCUIT_Opamp"],
            &["VSS"],
            &["NM1"],
            &["NPN1"],
            &["R1"],
            &["DIO1"],
            &["VSS", "M_S"],
            &["VSS", "B_CE"],
            &["VSS", "C_C"],
            &["NM1", "M_DG"],
            &["PNP2", "B_B"],
            &["L3", "L_C"],
            &["VSS", "D_P", "DIO1"],
            &["VSS", "TRUNCATE"],
        ];
        prefixes
            .iter()
            .map(|p| walk(grammar, p).unwrap())
            .collect()
    }

    #[test]
    fn test_advance_matches_allowed_tokens() {
        let vocab = Vocabulary::build();
        let grammar = Grammar::new(&vocab);
        for state in sample_states(&grammar) {
            let allowed = grammar.allowed_tokens(&state);
            for i in 0..vocab.len() {
                let id = TokenId(i as u16);
                assert_eq!(
                    grammar.advance(&state, id).is_ok(),
                    allowed.contains(id),
                    "state {:?}, token {}",
                    state,
                    vocab.name(id).unwrap()
                );
            }
        }
    }

    #[test]
    fn test_no_node_node_adjacency() {
        let vocab = Vocabulary::build();
        let grammar = Grammar::new(&vocab);
        for state in sample_states(&grammar) {
            if matches!(state.phase, Phase::AtNet | Phase::AtDevice) {
                let allowed = grammar.allowed_tokens(&state);
                assert!(allowed.iter().all(|id| !vocab.nets().contains(id)));
                assert!(allowed.iter().all(|id| !vocab.devices().contains(id)));
            }
        }
    }

    #[test]
    fn test_family_mismatch_is_rejected() {
        let vocab = Vocabulary::build();
        let grammar = Grammar::new(&vocab);
        assert!(walk(&grammar, &["NM1", "B_B"]).is_err());
        assert!(walk(&grammar, &["VSS", "M_S", "NPN1"]).is_err());
        assert!(walk(&grammar, &["VSS", "M_S", "PM4"]).is_ok());
    }

    #[test]
    fn test_violation_reports_position() {
        let vocab = Vocabulary::build();
        let grammar = Grammar::new(&vocab);
        match walk(&grammar, &["VSS", "M_S", "NM1", "VDD"]) {
            Err(TopoSeqError::GrammarViolation { position, .. }) => assert_eq!(position, 3),
            other => panic!("expected violation, got {:?}", other),
        }
    }

    #[test]
    fn test_expected_transitions() {
        let vocab = Vocabulary::build();
        let grammar = Grammar::new(&vocab);
        let cases: &[(&[&str], Phase)] = &[
            (&["CIRCUIT_LDO"], Phase::AfterCircuitType),
            (&["CIRCUIT_LDO", "VDD"], Phase::AtNet),
            (&["NM1"], Phase::AtDevice),
            (&["NM1", "M_G"], Phase::EdgeFromDevice),
            (&["NM1", "M_G", "VIN1"], Phase::AtNet),
            (&["VIN1", "M_G", "NM1"], Phase::AtDevice),
            (&["NM1", "TRUNCATE"], Phase::Finished),
        ];
        for (names, phase) in cases {
            assert_eq!(walk(&grammar, names).unwrap().phase, *phase, "{:?}", names);
        }
        assert!(walk(&grammar, &["TRUNCATE"]).is_err());
        assert!(walk(&grammar, &["CIRCUIT_LDO", "CIRCUIT_PLL"]).is_err());
        assert!(walk(&grammar, &["VSS", "TRUNCATE", "TRUNCATE"]).is_err());
    }

    #[test]
    fn test_validate_accepts_padding_only() {
        let vocab = Vocabulary::build();
        let grammar = Grammar::new(&vocab);
        let padded = vocab
            .parse_sequence("VSS M_BS NM1 TRUNCATE TRUNCATE TRUNCATE")
            .unwrap();
        assert!(grammar.validate(&padded).unwrap().is_finished());

        let trailing = vocab.parse_sequence("VSS M_BS NM1 TRUNCATE VSS").unwrap();
        match grammar.validate(&trailing) {
            Err(TopoSeqError::GrammarViolation { position, .. }) => assert_eq!(position, 4),
            other => panic!("expected violation, got {:?}", other),
        }
    }
}
