//! Token sequences.

use super::TokenId;

/// An ordered list of token ids. Sequences are value objects: the encoder
/// and the generation controller create them, nothing mutates them
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TokenSequence {
    tokens: Vec<TokenId>,
}

impl TokenSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn as_slice(&self) -> &[TokenId] {
        &self.tokens
    }

    pub fn iter(&self) -> impl Iterator<Item = TokenId> + '_ {
        self.tokens.iter().copied()
    }

    pub fn last(&self) -> Option<TokenId> {
        self.tokens.last().copied()
    }

    pub fn into_vec(self) -> Vec<TokenId> {
        self.tokens
    }
}

impl From<Vec<TokenId>> for TokenSequence {
    fn from(tokens: Vec<TokenId>) -> Self {
        Self { tokens }
    }
}

impl FromIterator<TokenId> for TokenSequence {
    fn from_iter<I: IntoIterator<Item = TokenId>>(iter: I) -> Self {
        Self {
            tokens: iter.into_iter().collect(),
        }
    }
}
