//! Grammar-guided generation.
//!
//! Each step asks a [`ProbabilityOracle`] for a distribution over the
//! vocabulary, keeps only the tokens the grammar allows next, renormalizes,
//! samples with a seeded RNG and advances the grammar. Generation stops at
//! `TRUNCATE` or after `max_length` tokens.
//!
//! [`GenerationSession`] exposes the loop one step at a time so callers can
//! stop between steps; [`Generator::generate`] runs it to the end.

mod oracle;

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, trace};

use crate::circuit::{check_complete, CircuitType, DeviceId, NetId};
use crate::codec::assembler::Assembler;
use crate::error::{Result, TopoSeqError};
use crate::grammar::Phase;
use crate::vocab::{Token, TokenId, TokenSequence, TokenSet, Vocabulary};

pub use oracle::{BigramOracle, FixedOracle, FnOracle, ProbabilityOracle, UniformOracle};

/// Default context window of the sequence model.
pub const DEFAULT_MAX_LENGTH: usize = 1024;

/// Which constraints shape the mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConstraintMode {
    /// Only the grammar's token-kind and family rules
    #[default]
    Structural,
    /// Grammar rules plus connection tracking: no pin lands on two nets,
    /// passives reach at most two nets, the first node is a supply rail,
    /// and `TRUNCATE` is only offered once every device is complete and
    /// every internal net reaches two devices.
    Electrical,
}

/// Configuration for generation.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Maximum tokens per sequence, circuit type included
    pub max_length: usize,
    /// Circuit type emitted before the first sampled token
    pub circuit_type: Option<CircuitType>,
    pub constraint: ConstraintMode,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_length: DEFAULT_MAX_LENGTH,
            circuit_type: None,
            constraint: ConstraintMode::Structural,
        }
    }
}

impl GenerationConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn with_circuit_type(mut self, circuit_type: CircuitType) -> Self {
        self.circuit_type = Some(circuit_type);
        self
    }

    pub fn with_constraint(mut self, constraint: ConstraintMode) -> Self {
        self.constraint = constraint;
        self
    }
}

/// How a generation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStatus {
    /// `TRUNCATE` was sampled
    Terminated,
    /// `max_length` tokens were emitted without `TRUNCATE`
    LengthLimit,
    /// The caller stopped the session early
    Cancelled,
}

/// A generated sequence and how it ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub sequence: TokenSequence,
    pub status: GenerationStatus,
}

impl GenerationOutcome {
    /// Only terminated sequences are complete; the others must be treated
    /// as incomplete rather than invalid.
    pub fn is_complete(&self) -> bool {
        self.status == GenerationStatus::Terminated
    }
}

/// Restrict `distribution` to `allowed` and renormalize.
///
/// Returns `Ok(None)` when the allowed tokens carry no mass. Negative or
/// non-finite weights are an oracle error.
pub fn mask_distribution(distribution: &[f64], allowed: &TokenSet) -> Result<Option<Vec<f64>>> {
    let mut masked = vec![0.0; distribution.len()];
    let mut total = 0.0;
    for id in allowed.iter() {
        let Some(&p) = distribution.get(id.index()) else {
            continue;
        };
        if !p.is_finite() || p < 0.0 {
            return Err(TopoSeqError::oracle(format!("invalid weight {} for token {}", p, id)));
        }
        masked[id.index()] = p;
        total += p;
    }
    if total <= 0.0 {
        return Ok(None);
    }
    for p in masked.iter_mut() {
        *p /= total;
    }
    Ok(Some(masked))
}

/// One generation in progress. Owns its buffer, grammar cursor and RNG, so
/// dropping it at any step boundary leaves nothing behind.
pub struct GenerationSession<'v> {
    vocab: &'v Vocabulary,
    config: GenerationConfig,
    assembler: Assembler<'v>,
    rng: StdRng,
    tokens: Vec<TokenId>,
    status: Option<GenerationStatus>,
}

impl<'v> GenerationSession<'v> {
    /// Start a session. The configured circuit type, if any, is emitted
    /// immediately.
    pub fn new(vocab: &'v Vocabulary, config: GenerationConfig, seed: u64) -> Result<Self> {
        let track = config.constraint == ConstraintMode::Electrical;
        let mut session = Self {
            vocab,
            assembler: Assembler::new(vocab, track),
            rng: StdRng::seed_from_u64(seed),
            tokens: Vec::new(),
            status: None,
            config,
        };

        if session.config.max_length == 0 {
            session.status = Some(GenerationStatus::LengthLimit);
            return Ok(session);
        }
        if let Some(t) = session.config.circuit_type {
            let id = vocab.circuit_type_id(t)?;
            session.accept(id)?;
        }
        Ok(session)
    }

    /// Tokens emitted so far.
    pub fn context(&self) -> &[TokenId] {
        &self.tokens
    }

    /// `None` while the session can still step.
    pub fn status(&self) -> Option<GenerationStatus> {
        self.status
    }

    pub fn is_done(&self) -> bool {
        self.status.is_some()
    }

    /// Tokens that may be sampled next.
    pub fn allowed_tokens(&self) -> TokenSet {
        let state = self.assembler.state();
        let mut allowed = self.assembler.grammar().allowed_tokens(state);
        if self.config.constraint == ConstraintMode::Structural {
            return allowed;
        }

        match state.phase {
            Phase::Start | Phase::AfterCircuitType => {
                for id in allowed.clone().iter() {
                    match self.vocab.token(id) {
                        Ok(Token::Device(_)) => allowed.remove(id),
                        Ok(Token::Net(n)) if !n.category.is_rail() => allowed.remove(id),
                        _ => {}
                    }
                }
            }
            Phase::EdgeFromNet | Phase::EdgeFromDevice => {
                let graph = self.assembler.graph();
                for id in allowed.clone().iter() {
                    let Ok(token) = self.vocab.token(id) else {
                        continue;
                    };
                    if let Some((device, net, pins)) = self.assembler.closing(token) {
                        if graph.check_connect(device, net, pins).is_err() {
                            allowed.remove(id);
                        }
                    }
                }
            }
            Phase::AtNet | Phase::AtDevice => {
                let graph = self.assembler.graph();
                match self.assembler.last_node() {
                    Some(Token::Device(device)) => self.drop_split_labels(device, &mut allowed),
                    Some(Token::Net(net)) => self.drop_unclosable_labels(net, &mut allowed),
                    _ => {}
                }
                let finished = !graph.edges().is_empty()
                    && check_complete(graph).is_ok()
                    && graph.floating_internal_nets().is_empty();
                if !finished {
                    allowed.remove(self.vocab.truncate_id());
                }
            }
            Phase::Finished => {}
        }
        allowed
    }

    /// Sample and append one token. Returns `None` once the session is
    /// done.
    pub fn step<O: ProbabilityOracle + ?Sized>(&mut self, oracle: &mut O) -> Result<Option<TokenId>> {
        if self.is_done() {
            return Ok(None);
        }
        let position = self.tokens.len();

        let distribution = oracle.next_token_distribution(&self.tokens)?;
        if distribution.len() != self.vocab.len() {
            return Err(TopoSeqError::oracle(format!(
                "distribution has {} entries, vocabulary has {}",
                distribution.len(),
                self.vocab.len()
            )));
        }

        let allowed = self.allowed_tokens();
        let masked = mask_distribution(&distribution, &allowed)?
            .ok_or(TopoSeqError::GrammarDeadEnd { position })?;
        let index = WeightedIndex::new(&masked)
            .map_err(|e| TopoSeqError::oracle(e.to_string()))?
            .sample(&mut self.rng);
        let id = TokenId(index as u16);

        trace!(position, token = %id, "sampled");
        self.accept(id)?;
        Ok(Some(id))
    }

    /// Step until the session is done.
    pub fn run<O: ProbabilityOracle + ?Sized>(mut self, oracle: &mut O) -> Result<GenerationOutcome> {
        while self.step(oracle)?.is_some() {}
        Ok(self.into_outcome())
    }

    /// Stop here. A session that is not done yet is marked cancelled.
    pub fn into_outcome(self) -> GenerationOutcome {
        let status = self.status.unwrap_or(GenerationStatus::Cancelled);
        debug!(length = self.tokens.len(), ?status, "generation finished");
        GenerationOutcome {
            sequence: TokenSequence::from(self.tokens),
            status,
        }
    }

    /// Remove labels whose pins already sit on two different nets; no net
    /// could complete them.
    fn drop_split_labels(&self, device: DeviceId, allowed: &mut TokenSet) {
        if device.family().is_two_terminal() {
            return;
        }
        let graph = self.assembler.graph();
        let Some(d) = graph.device_index(&device) else {
            return;
        };
        for id in allowed.clone().iter() {
            let Ok(Token::PinEdge(label)) = self.vocab.token(id) else {
                continue;
            };
            let nets = graph
                .device_edges(d)
                .filter(|e| !e.pins.intersection(label.pins()).is_empty())
                .count();
            if nets > 1 {
                allowed.remove(id);
            }
        }
    }

    /// Remove labels that no device of their family could close on `net`,
    /// counting unused devices as well as the ones already placed.
    fn drop_unclosable_labels(&self, net: NetId, allowed: &mut TokenSet) {
        let graph = self.assembler.graph();
        for id in allowed.clone().iter() {
            let Ok(Token::PinEdge(label)) = self.vocab.token(id) else {
                continue;
            };
            let closable = self.vocab.devices_of(label.family()).iter().any(|d| {
                matches!(
                    self.vocab.token(d),
                    Ok(Token::Device(device)) if graph.check_connect(device, net, label.pins()).is_ok()
                )
            });
            if !closable {
                allowed.remove(id);
            }
        }
    }

    fn accept(&mut self, id: TokenId) -> Result<()> {
        self.assembler.push(id)?;
        self.tokens.push(id);
        if id == self.vocab.truncate_id() {
            self.status = Some(GenerationStatus::Terminated);
        } else if self.tokens.len() >= self.config.max_length {
            self.status = Some(GenerationStatus::LengthLimit);
        }
        Ok(())
    }
}

/// Runs generation sessions with one configuration.
#[derive(Debug, Clone)]
pub struct Generator<'v> {
    vocab: &'v Vocabulary,
    config: GenerationConfig,
}

impl<'v> Generator<'v> {
    /// Create a generator with the default configuration.
    pub fn new(vocab: &'v Vocabulary) -> Self {
        Self::with_config(vocab, GenerationConfig::default())
    }

    pub fn with_config(vocab: &'v Vocabulary, config: GenerationConfig) -> Self {
        Self { vocab, config }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Open a step-wise session.
    pub fn session(&self, seed: u64) -> Result<GenerationSession<'v>> {
        GenerationSession::new(self.vocab, self.config.clone(), seed)
    }

    /// Generate one sequence.
    pub fn generate<O: ProbabilityOracle + ?Sized>(
        &self,
        oracle: &mut O,
        seed: u64,
    ) -> Result<GenerationOutcome> {
        self.session(seed)?.run(oracle)
    }
}

/// Generate one sequence with structural masking.
pub fn generate<O: ProbabilityOracle + ?Sized>(
    vocab: &Vocabulary,
    oracle: &mut O,
    seed: u64,
    max_length: usize,
    circuit_type: Option<CircuitType>,
) -> Result<GenerationOutcome> {
    let mut config = GenerationConfig::new().with_max_length(max_length);
    config.circuit_type = circuit_type;
    Generator::with_config(vocab, config).generate(oracle, seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode;
    use crate::grammar::Grammar;
    use approx::assert_relative_eq;

    #[test]
    fn test_mask_distribution_renormalizes() {
        let vocab = Vocabulary::build();
        let mut allowed = vocab.empty_set();
        allowed.insert(TokenId(1));
        allowed.insert(TokenId(3));
        let mut dist = vec![0.0; vocab.len()];
        dist[0] = 5.0;
        dist[1] = 1.0;
        dist[3] = 3.0;
        let masked = mask_distribution(&dist, &allowed).unwrap().unwrap();
        assert_relative_eq!(masked[0], 0.0);
        assert_relative_eq!(masked[1], 0.25);
        assert_relative_eq!(masked[3], 0.75);

        let mut empty = vocab.empty_set();
        empty.insert(TokenId(2));
        assert!(mask_distribution(&dist, &empty).unwrap().is_none());

        dist[1] = f64::NAN;
        assert!(mask_distribution(&dist, &allowed).is_err());
    }

    #[test]
    fn test_uniform_generation_respects_grammar() {
        let vocab = Vocabulary::build();
        let grammar = Grammar::new(&vocab);
        let generator = Generator::with_config(&vocab, GenerationConfig::new().with_max_length(40));
        for seed in 0..30 {
            let outcome = generator
                .generate(&mut UniformOracle::new(&vocab), seed)
                .unwrap();
            assert!(outcome.sequence.len() <= 40);
            grammar.validate(&outcome.sequence).unwrap();
            if outcome.status == GenerationStatus::LengthLimit {
                assert_eq!(outcome.sequence.len(), 40);
            }
        }
    }

    #[test]
    fn test_circuit_type_counts_toward_length() {
        let vocab = Vocabulary::build();
        let config = GenerationConfig::new()
            .with_max_length(1)
            .with_circuit_type(CircuitType::Opamp);
        let outcome = Generator::with_config(&vocab, config)
            .generate(&mut UniformOracle::new(&vocab), 0)
            .unwrap();
        assert_eq!(outcome.status, GenerationStatus::LengthLimit);
        assert_eq!(vocab.render(&outcome.sequence).unwrap(), "CIRCUIT_Opamp");

        let none = generate(&vocab, &mut UniformOracle::new(&vocab), 0, 0, None).unwrap();
        assert!(none.sequence.is_empty());
        assert!(!none.is_complete());
    }

    #[test]
    fn test_dead_end_is_reported() {
        let vocab = Vocabulary::build();
        // All mass on TRUNCATE, which is never legal as the first token
        let mut oracle = FixedOracle::certain(&vocab, vocab.truncate_id());
        match generate(&vocab, &mut oracle, 0, 16, None) {
            Err(TopoSeqError::GrammarDeadEnd { position }) => assert_eq!(position, 0),
            other => panic!("expected dead end, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_distribution_length() {
        let vocab = Vocabulary::build();
        let mut oracle = FixedOracle::new(vec![1.0; 3]);
        assert!(matches!(
            generate(&vocab, &mut oracle, 0, 16, None),
            Err(TopoSeqError::OracleError { .. })
        ));
    }

    #[test]
    fn test_session_can_stop_between_steps() {
        let vocab = Vocabulary::build();
        let mut session = Generator::new(&vocab).session(9).unwrap();
        let mut oracle = UniformOracle::new(&vocab);
        session.step(&mut oracle).unwrap();
        session.step(&mut oracle).unwrap();
        assert_eq!(session.context().len(), 2);
        let outcome = session.into_outcome();
        assert_eq!(outcome.status, GenerationStatus::Cancelled);
        assert_eq!(outcome.sequence.len(), 2);
    }

    #[test]
    fn test_electrical_mode_starts_at_a_rail() {
        let vocab = Vocabulary::build();
        let config = GenerationConfig::new()
            .with_constraint(ConstraintMode::Electrical)
            .with_circuit_type(CircuitType::Opamp);
        let session = Generator::with_config(&vocab, config).session(0).unwrap();
        let allowed = session.allowed_tokens();
        assert_eq!(allowed.len(), 2);
        assert!(allowed.contains(vocab.parse("VSS").unwrap()));
        assert!(allowed.contains(vocab.parse("VDD").unwrap()));
    }

    #[test]
    fn test_electrical_mode_never_emits_conflicts() {
        let vocab = Vocabulary::build();
        let config = GenerationConfig::new()
            .with_constraint(ConstraintMode::Electrical)
            .with_max_length(60);
        let generator = Generator::with_config(&vocab, config);
        for seed in 0..30 {
            let outcome = generator
                .generate(&mut UniformOracle::new(&vocab), seed)
                .unwrap();
            match decode(&vocab, &outcome.sequence) {
                Ok(_) => {}
                Err(TopoSeqError::IncompletePin { .. })
                | Err(TopoSeqError::GrammarViolation { .. })
                | Err(TopoSeqError::EmptyGraph) => {
                    assert!(!outcome.is_complete());
                }
                Err(e) => panic!("seed {}: unexpected {:?}", seed, e),
            }
        }
    }
}
