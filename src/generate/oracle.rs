//! Probability oracles.
//!
//! An oracle maps the tokens generated so far to a distribution over every
//! vocabulary id. The generator never looks inside: any model, stub or
//! closure that honours this contract can drive generation.

use crate::error::{Result, TopoSeqError};
use crate::vocab::{TokenId, TokenSequence, Vocabulary};

/// Source of next-token probabilities.
///
/// The returned vector must have one entry per vocabulary id. Entries are
/// non-negative weights; they do not need to sum to one.
pub trait ProbabilityOracle {
    fn next_token_distribution(&mut self, context: &[TokenId]) -> Result<Vec<f64>>;
}

impl<O: ProbabilityOracle + ?Sized> ProbabilityOracle for &mut O {
    fn next_token_distribution(&mut self, context: &[TokenId]) -> Result<Vec<f64>> {
        (**self).next_token_distribution(context)
    }
}

impl<O: ProbabilityOracle + ?Sized> ProbabilityOracle for Box<O> {
    fn next_token_distribution(&mut self, context: &[TokenId]) -> Result<Vec<f64>> {
        (**self).next_token_distribution(context)
    }
}

/// Equal weight on every token.
#[derive(Debug, Clone)]
pub struct UniformOracle {
    size: usize,
}

impl UniformOracle {
    pub fn new(vocab: &Vocabulary) -> Self {
        Self { size: vocab.len() }
    }
}

impl ProbabilityOracle for UniformOracle {
    fn next_token_distribution(&mut self, _context: &[TokenId]) -> Result<Vec<f64>> {
        Ok(vec![1.0; self.size])
    }
}

/// The same distribution at every step.
#[derive(Debug, Clone)]
pub struct FixedOracle {
    distribution: Vec<f64>,
}

impl FixedOracle {
    pub fn new(distribution: Vec<f64>) -> Self {
        Self { distribution }
    }

    /// All mass on a single token.
    pub fn certain(vocab: &Vocabulary, id: TokenId) -> Self {
        let mut distribution = vec![0.0; vocab.len()];
        if let Some(p) = distribution.get_mut(id.index()) {
            *p = 1.0;
        }
        Self { distribution }
    }
}

impl ProbabilityOracle for FixedOracle {
    fn next_token_distribution(&mut self, _context: &[TokenId]) -> Result<Vec<f64>> {
        Ok(self.distribution.clone())
    }
}

/// Adapter turning a closure into an oracle.
pub struct FnOracle<F>(pub F);

impl<F> ProbabilityOracle for FnOracle<F>
where
    F: FnMut(&[TokenId]) -> Result<Vec<f64>>,
{
    fn next_token_distribution(&mut self, context: &[TokenId]) -> Result<Vec<f64>> {
        (self.0)(context)
    }
}

/// Token bigram model fitted on a corpus of sequences.
///
/// Counts are additively smoothed and sharpened or flattened by
/// `temperature` (`p^(1/T)`, renormalized by the generator).
#[derive(Debug, Clone)]
pub struct BigramOracle {
    size: usize,
    /// Counts for the first token of a sequence
    start: Vec<f64>,
    /// Row `a` holds counts of tokens following `a`
    rows: Vec<Vec<f64>>,
    smoothing: f64,
    temperature: f64,
}

impl BigramOracle {
    /// Fit on `corpus`. `TRUNCATE` padding is counted only once per
    /// sequence.
    pub fn fit(vocab: &Vocabulary, corpus: &[TokenSequence]) -> Self {
        let size = vocab.len();
        let truncate = vocab.truncate_id();
        let mut start = vec![0.0; size];
        let mut rows = vec![vec![0.0; size]; size];

        for sequence in corpus {
            let tokens = sequence.as_slice();
            let end = tokens
                .iter()
                .position(|&t| t == truncate)
                .map_or(tokens.len(), |p| p + 1);
            let tokens = &tokens[..end];

            if let Some(first) = tokens.first() {
                if let Some(c) = start.get_mut(first.index()) {
                    *c += 1.0;
                }
            }
            for pair in tokens.windows(2) {
                if let Some(c) = rows
                    .get_mut(pair[0].index())
                    .and_then(|row| row.get_mut(pair[1].index()))
                {
                    *c += 1.0;
                }
            }
        }

        Self {
            size,
            start,
            rows,
            smoothing: 0.0,
            temperature: 1.0,
        }
    }

    /// Add `smoothing` to every count.
    pub fn with_smoothing(mut self, smoothing: f64) -> Self {
        self.smoothing = smoothing.max(0.0);
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }
}

impl ProbabilityOracle for BigramOracle {
    fn next_token_distribution(&mut self, context: &[TokenId]) -> Result<Vec<f64>> {
        if self.temperature <= 0.0 || !self.temperature.is_finite() {
            return Err(TopoSeqError::oracle(format!(
                "temperature must be positive, got {}",
                self.temperature
            )));
        }

        let counts = match context.last() {
            None => &self.start,
            Some(last) => self.rows.get(last.index()).ok_or_else(|| {
                TopoSeqError::oracle(format!("context token {} outside the vocabulary", last))
            })?,
        };

        let exponent = 1.0 / self.temperature;
        let mut distribution = Vec::with_capacity(self.size);
        for &c in counts {
            distribution.push((c + self.smoothing).powf(exponent));
        }
        Ok(distribution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_bigram_counts_follow_the_corpus() {
        let vocab = Vocabulary::build();
        let corpus = vec![
            vocab.parse_sequence("VSS M_BDGS NM1 TRUNCATE TRUNCATE").unwrap(),
            vocab.parse_sequence("VSS M_BS NM1 M_DG VDD M_DG NM1 M_BS VSS TRUNCATE").unwrap(),
        ];
        let mut oracle = BigramOracle::fit(&vocab, &corpus);

        let first = oracle.next_token_distribution(&[]).unwrap();
        assert_relative_eq!(first[vocab.parse("VSS").unwrap().index()], 2.0);

        let vss = vocab.parse("VSS").unwrap();
        let after_vss = oracle.next_token_distribution(&[vss]).unwrap();
        assert_relative_eq!(after_vss[vocab.parse("M_BS").unwrap().index()], 1.0);
        assert_relative_eq!(after_vss[vocab.parse("M_BDGS").unwrap().index()], 1.0);
        assert_relative_eq!(after_vss[vocab.truncate_id().index()], 1.0);

        // Padding is not counted
        let truncate = vocab.truncate_id();
        let after_truncate = oracle.next_token_distribution(&[truncate]).unwrap();
        assert!(after_truncate.iter().all(|&c| c == 0.0));
    }

    #[test]
    fn test_bigram_temperature_and_smoothing() {
        let vocab = Vocabulary::build();
        let corpus = vec![vocab.parse_sequence("VSS M_BDGS NM1 TRUNCATE").unwrap()];
        let mut oracle = BigramOracle::fit(&vocab, &corpus)
            .with_smoothing(1.0)
            .with_temperature(0.5);
        let vss = vocab.parse("VSS").unwrap();
        let dist = oracle.next_token_distribution(&[vss]).unwrap();
        assert_relative_eq!(dist[vocab.parse("M_BDGS").unwrap().index()], 4.0);
        assert_relative_eq!(dist[vocab.parse("M_B").unwrap().index()], 1.0);

        let mut cold = BigramOracle::fit(&vocab, &corpus).with_temperature(0.0);
        assert!(cold.next_token_distribution(&[]).is_err());
    }

    #[test]
    fn test_fixed_and_closure_oracles() {
        let vocab = Vocabulary::build();
        let mut fixed = FixedOracle::certain(&vocab, vocab.truncate_id());
        let dist = fixed.next_token_distribution(&[]).unwrap();
        assert_eq!(dist.len(), vocab.len());
        assert_relative_eq!(dist.iter().sum::<f64>(), 1.0);

        let size = vocab.len();
        let mut closure = FnOracle(|context: &[TokenId]| -> Result<Vec<f64>> {
            Ok(vec![context.len() as f64; size])
        });
        let dist = closure.next_token_distribution(&[TokenId(0), TokenId(1)]).unwrap();
        assert_relative_eq!(dist[0], 2.0);
    }
}
