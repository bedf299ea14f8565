//! Sequence to graph decoding.

use tracing::debug;

use crate::circuit::CircuitGraph;
use crate::error::{Result, TopoSeqError};
use crate::vocab::{TokenSequence, Vocabulary};

use super::assembler::Assembler;

/// Rebuilds circuit graphs from token sequences.
///
/// Sequences may come from storage or from a model, so every token is
/// replayed through the grammar. Decoding is all-or-nothing: on failure no
/// partial graph is returned.
#[derive(Debug, Clone, Copy)]
pub struct Decoder<'v> {
    vocab: &'v Vocabulary,
}

impl<'v> Decoder<'v> {
    pub fn new(vocab: &'v Vocabulary) -> Self {
        Self { vocab }
    }

    /// Decode a finished or length-limited sequence.
    ///
    /// `TRUNCATE` padding after the first `TRUNCATE` is skipped. Repeated
    /// identical connections (walk revisits) are merged.
    pub fn decode(&self, sequence: &TokenSequence) -> Result<CircuitGraph> {
        let truncate = self.vocab.truncate_id();
        let mut assembler = Assembler::new(self.vocab, true);

        for (position, id) in sequence.iter().enumerate() {
            if assembler.state().is_finished() {
                if id == truncate {
                    continue;
                }
                return Err(TopoSeqError::grammar_violation(
                    position,
                    format!("'{}' after TRUNCATE", self.vocab.name(id)?),
                ));
            }
            if let Err(e) = assembler.push(id) {
                debug!(position, error = %e, "decode rejected token");
                return Err(e);
            }
        }

        let graph = assembler.finish()?;
        debug!(
            tokens = sequence.len(),
            devices = graph.devices().len(),
            nets = graph.nets().len(),
            edges = graph.edges().len(),
            "decoded sequence"
        );
        Ok(graph)
    }
}

/// Decode `sequence` against `vocab`.
pub fn decode(vocab: &Vocabulary, sequence: &TokenSequence) -> Result<CircuitGraph> {
    Decoder::new(vocab).decode(sequence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{DeviceId, DeviceType, NetId};

    fn decode_str(text: &str) -> Result<CircuitGraph> {
        let vocab = Vocabulary::build();
        let seq = vocab.parse_sequence(text)?;
        decode(&vocab, &seq)
    }

    #[test]
    fn test_decode_single_mosfet() {
        let g = decode_str("VSS->M_BS->NM1->M_G->VIN1->M_G->NM1->M_D->VOUT1->TRUNCATE").unwrap();
        assert_eq!(g.devices(), &[DeviceId::new(DeviceType::Nmos, 1).unwrap()]);
        assert_eq!(g.nets().len(), 3);
        assert_eq!(g.edges().len(), 3);
        assert!(g.net_index(&NetId::VSS).is_some());
    }

    #[test]
    fn test_decode_sets_circuit_type() {
        let g = decode_str("CIRCUIT_Mirror VSS M_BS NM1 M_DG NET1 M_DG NM2 M_BS VSS TRUNCATE")
            .unwrap();
        assert_eq!(g.circuit_type(), Some(crate::circuit::CircuitType::Mirror));
        assert_eq!(g.edges().len(), 4);
    }

    #[test]
    fn test_truncate_on_incomplete_device() {
        match decode_str("VSS->M_S->NM1->TRUNCATE") {
            Err(TopoSeqError::IncompletePin { device, missing }) => {
                assert_eq!(device, "NM1");
                assert_eq!(missing, "BDG");
            }
            other => panic!("expected incomplete pin, got {:?}", other),
        }
        assert!(matches!(
            decode_str("NM1 TRUNCATE"),
            Err(TopoSeqError::IncompletePin { .. })
        ));
    }

    #[test]
    fn test_empty_sequences() {
        assert!(matches!(decode_str("VSS TRUNCATE"), Err(TopoSeqError::EmptyGraph)));
        assert!(matches!(decode_str(""), Err(TopoSeqError::EmptyGraph)));
    }

    #[test]
    fn test_dangling_edge_is_a_violation() {
        match decode_str("VSS M_BDGS") {
            Err(TopoSeqError::GrammarViolation { position, .. }) => assert_eq!(position, 2),
            other => panic!("expected violation, got {:?}", other),
        }
    }

    #[test]
    fn test_conflicting_pin() {
        let err = decode_str("VSS M_BS NM1 M_S VDD").unwrap_err();
        assert!(matches!(err, TopoSeqError::DuplicateEdge { position: Some(4), .. }));

        let err = decode_str("VSS M_BS NM1 M_D VOUT1 M_D NM1 M_S VDD TRUNCATE").unwrap_err();
        assert!(err.to_string().contains("at position 8"), "{}", err);
        match err {
            TopoSeqError::DuplicateEdge {
                position,
                device,
                pin,
                existing,
                conflicting,
            } => {
                assert_eq!(position, Some(8));
                assert_eq!(device, "NM1");
                assert_eq!(pin, "S");
                assert_eq!(existing, "VSS");
                assert_eq!(conflicting, "VDD");
            }
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[test]
    fn test_tokens_after_truncate() {
        assert!(decode_str("VSS M_BDGS NM1 TRUNCATE TRUNCATE").is_ok());
        match decode_str("VSS M_BDGS NM1 TRUNCATE NM1") {
            Err(TopoSeqError::GrammarViolation { position, .. }) => assert_eq!(position, 4),
            other => panic!("expected violation, got {:?}", other),
        }
    }

    #[test]
    fn test_length_limited_sequence_decodes_when_complete() {
        assert!(decode_str("VSS M_BDGS NM1").is_ok());
    }
}
