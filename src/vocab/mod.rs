//! Token vocabulary.
//!
//! The [`Vocabulary`] is the closed catalog of every token a sequence can
//! contain and the bidirectional mapping between tokens and integer ids.
//! It is built once from the declarative [`catalog`] and then passed by
//! reference to every component that reads or writes sequences.
//!
//! # Enumeration order
//!
//! Ids are assigned in this fixed order:
//!
//! 1. pin-edge labels, in [`catalog::PIN_EDGE_TABLE`] order
//! 2. `VSS`, `VDD`
//! 3. circuit types, in [`CircuitType::ALL`] order
//! 4. devices, per [`catalog::DEVICE_CATALOG`] record, ascending index
//! 5. internal nets and ports, per [`catalog::NET_CATALOG`] record (bare
//!    token first, then ascending index), rails excluded
//! 6. `TRUNCATE`

pub mod catalog;
mod sequence;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use catalog::PinLabel;
pub use sequence::TokenSequence;

use crate::circuit::{CircuitType, DeviceFamily, DeviceId, NetId};
use crate::error::{Result, TopoSeqError};

/// Integer id of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenId(pub u16);

impl TokenId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind tag of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Device,
    Net,
    PinEdge,
    CircuitType,
    Control,
}

/// An interned token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    Device(DeviceId),
    Net(NetId),
    PinEdge(PinLabel),
    CircuitType(CircuitType),
    /// End-of-sequence control token
    Truncate,
}

impl Token {
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Device(_) => TokenKind::Device,
            Token::Net(_) => TokenKind::Net,
            Token::PinEdge(_) => TokenKind::PinEdge,
            Token::CircuitType(_) => TokenKind::CircuitType,
            Token::Truncate => TokenKind::Control,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Device(d) => write!(f, "{}", d),
            Token::Net(n) => write!(f, "{}", n),
            Token::PinEdge(l) => write!(f, "{}", l),
            Token::CircuitType(t) => write!(f, "{}", t),
            Token::Truncate => f.write_str("TRUNCATE"),
        }
    }
}

/// A set of token ids, stored as a bit set over the vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSet {
    words: Vec<u64>,
    universe: usize,
}

impl TokenSet {
    /// Empty set over a vocabulary of `universe` tokens.
    pub fn new(universe: usize) -> Self {
        Self {
            words: vec![0; universe.div_ceil(64)],
            universe,
        }
    }

    pub fn insert(&mut self, id: TokenId) {
        let i = id.index();
        if i < self.universe {
            self.words[i / 64] |= 1 << (i % 64);
        }
    }

    pub fn remove(&mut self, id: TokenId) {
        let i = id.index();
        if i < self.universe {
            self.words[i / 64] &= !(1 << (i % 64));
        }
    }

    pub fn contains(&self, id: TokenId) -> bool {
        let i = id.index();
        i < self.universe && self.words[i / 64] & (1 << (i % 64)) != 0
    }

    pub fn union_with(&mut self, other: &TokenSet) {
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a |= *b;
        }
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = TokenId> + '_ {
        (0..self.universe)
            .filter(move |&i| self.words[i / 64] & (1 << (i % 64)) != 0)
            .map(|i| TokenId(i as u16))
    }
}

/// Persisted form of the vocabulary: token names in id order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyTable {
    pub tokens: Vec<String>,
}

/// The closed token catalog and its id mapping.
#[derive(Debug)]
pub struct Vocabulary {
    tokens: Vec<Token>,
    names: Vec<String>,
    ids: HashMap<Token, TokenId>,
    by_name: HashMap<String, TokenId>,
    devices: TokenSet,
    nets: TokenSet,
    pin_edges: TokenSet,
    circuit_types: TokenSet,
    family_devices: HashMap<DeviceFamily, TokenSet>,
    family_edges: HashMap<DeviceFamily, TokenSet>,
    truncate: TokenId,
}

impl Vocabulary {
    /// Enumerate the catalog and assign ids in the documented order.
    pub fn build() -> Self {
        let mut tokens = Vec::new();

        tokens.extend(PinLabel::all().map(Token::PinEdge));
        tokens.push(Token::Net(NetId::VSS));
        tokens.push(Token::Net(NetId::VDD));
        tokens.extend(CircuitType::ALL.iter().map(|&t| Token::CircuitType(t)));

        for record in &catalog::DEVICE_CATALOG {
            for index in record.min_index..=record.max_index {
                tokens.push(Token::Device(DeviceId {
                    device_type: record.device_type,
                    index,
                }));
            }
        }

        for record in catalog::NET_CATALOG.iter().filter(|r| !r.category.is_rail()) {
            if record.bare {
                tokens.push(Token::Net(NetId {
                    category: record.category,
                    index: None,
                }));
            }
            if let Some((lo, hi)) = record.indices {
                for index in lo..=hi {
                    tokens.push(Token::Net(NetId {
                        category: record.category,
                        index: Some(index),
                    }));
                }
            }
        }

        tokens.push(Token::Truncate);

        Self::from_tokens(tokens)
    }

    fn from_tokens(tokens: Vec<Token>) -> Self {
        let universe = tokens.len();
        let mut names = Vec::with_capacity(universe);
        let mut ids = HashMap::with_capacity(universe);
        let mut by_name = HashMap::with_capacity(universe);
        let mut devices = TokenSet::new(universe);
        let mut nets = TokenSet::new(universe);
        let mut pin_edges = TokenSet::new(universe);
        let mut circuit_types = TokenSet::new(universe);
        let mut family_devices: HashMap<DeviceFamily, TokenSet> = DeviceFamily::ALL
            .iter()
            .map(|&f| (f, TokenSet::new(universe)))
            .collect();
        let mut family_edges = family_devices.clone();
        let mut truncate = TokenId(0);

        for (i, token) in tokens.iter().enumerate() {
            let id = TokenId(i as u16);
            let name = token.to_string();
            ids.insert(*token, id);
            by_name.insert(name.clone(), id);
            names.push(name);

            match token {
                Token::Device(d) => {
                    devices.insert(id);
                    if let Some(set) = family_devices.get_mut(&d.family()) {
                        set.insert(id);
                    }
                }
                Token::Net(_) => nets.insert(id),
                Token::PinEdge(label) => {
                    pin_edges.insert(id);
                    if let Some(set) = family_edges.get_mut(&label.family()) {
                        set.insert(id);
                    }
                }
                Token::CircuitType(_) => circuit_types.insert(id),
                Token::Truncate => truncate = id,
            }
        }

        Self {
            tokens,
            names,
            ids,
            by_name,
            devices,
            nets,
            pin_edges,
            circuit_types,
            family_devices,
            family_edges,
            truncate,
        }
    }

    /// Number of tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Token for an id.
    pub fn token(&self, id: TokenId) -> Result<Token> {
        self.tokens
            .get(id.index())
            .copied()
            .ok_or_else(|| TopoSeqError::unknown_token(id.to_string()))
    }

    /// Id for a token.
    pub fn id(&self, token: &Token) -> Result<TokenId> {
        self.ids
            .get(token)
            .copied()
            .ok_or_else(|| TopoSeqError::unknown_token(token.to_string()))
    }

    /// Display name for an id.
    pub fn name(&self, id: TokenId) -> Result<&str> {
        self.names
            .get(id.index())
            .map(String::as_str)
            .ok_or_else(|| TopoSeqError::unknown_token(id.to_string()))
    }

    /// Id for a display name (`NM12`, `M_DG`, `TRUNCATE`, ...).
    pub fn parse(&self, name: &str) -> Result<TokenId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| TopoSeqError::unknown_token(name))
    }

    pub fn kind(&self, id: TokenId) -> Result<TokenKind> {
        self.token(id).map(|t| t.kind())
    }

    pub fn device_id(&self, device: DeviceId) -> Result<TokenId> {
        self.id(&Token::Device(device))
    }

    pub fn net_id(&self, net: NetId) -> Result<TokenId> {
        self.id(&Token::Net(net))
    }

    pub fn label_id(&self, label: PinLabel) -> Result<TokenId> {
        self.id(&Token::PinEdge(label))
    }

    pub fn circuit_type_id(&self, circuit_type: CircuitType) -> Result<TokenId> {
        self.id(&Token::CircuitType(circuit_type))
    }

    /// Id of the `TRUNCATE` control token.
    pub fn truncate_id(&self) -> TokenId {
        self.truncate
    }

    /// An empty set sized for this vocabulary.
    pub fn empty_set(&self) -> TokenSet {
        TokenSet::new(self.len())
    }

    pub fn devices(&self) -> &TokenSet {
        &self.devices
    }

    pub fn nets(&self) -> &TokenSet {
        &self.nets
    }

    pub fn pin_edges(&self) -> &TokenSet {
        &self.pin_edges
    }

    pub fn circuit_types(&self) -> &TokenSet {
        &self.circuit_types
    }

    /// Device tokens of one family.
    pub fn devices_of(&self, family: DeviceFamily) -> &TokenSet {
        &self.family_devices[&family]
    }

    /// Pin-edge tokens legal for one family.
    pub fn edges_of(&self, family: DeviceFamily) -> &TokenSet {
        &self.family_edges[&family]
    }

    /// Export the persisted table.
    pub fn table(&self) -> VocabularyTable {
        VocabularyTable {
            tokens: self.names.clone(),
        }
    }

    /// Serialize the table as JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.table())?)
    }

    /// Check that a persisted table was built from the same enumeration.
    pub fn verify_table(&self, table: &VocabularyTable) -> Result<()> {
        let longest = self.names.len().max(table.tokens.len());
        for position in 0..longest {
            let expected = self.names.get(position).map(String::as_str).unwrap_or("<none>");
            let found = table.tokens.get(position).map(String::as_str).unwrap_or("<none>");
            if expected != found {
                return Err(TopoSeqError::VocabularyMismatch {
                    position,
                    expected: expected.to_string(),
                    found: found.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Load a JSON table and verify it against a freshly built vocabulary.
    pub fn from_json(json: &str) -> Result<Self> {
        let table: VocabularyTable = serde_json::from_str(json)?;
        let vocab = Self::build();
        vocab.verify_table(&table)?;
        Ok(vocab)
    }

    /// Parse a sequence written as `A->B->C->` or whitespace-separated
    /// names.
    pub fn parse_sequence(&self, text: &str) -> Result<TokenSequence> {
        text.split(|c: char| c.is_whitespace() || c == '-' || c == '>')
            .filter(|part| !part.is_empty())
            .map(|part| self.parse(part))
            .collect::<Result<Vec<_>>>()
            .map(TokenSequence::from)
    }

    /// Render a sequence as `A->B->C`.
    pub fn render(&self, sequence: &TokenSequence) -> Result<String> {
        let names = sequence
            .iter()
            .map(|id| self.name(id))
            .collect::<Result<Vec<_>>>()?;
        Ok(names.join("->"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::DeviceType;

    #[test]
    fn test_vocabulary_size_and_order() {
        let vocab = Vocabulary::build();
        // 29 labels, 2 rails, 15 circuit types, 200 devices, 150 nets and ports, TRUNCATE
        assert_eq!(vocab.len(), 397);
        assert_eq!(vocab.name(TokenId(0)).unwrap(), "M_B");
        assert_eq!(vocab.name(TokenId(29)).unwrap(), "VSS");
        assert_eq!(vocab.name(TokenId(30)).unwrap(), "VDD");
        assert_eq!(vocab.name(TokenId(31)).unwrap(), "CIRCUIT_Opamp");
        assert_eq!(vocab.name(TokenId(46)).unwrap(), "NM1");
        assert_eq!(vocab.truncate_id(), TokenId(396));
    }

    #[test]
    fn test_mapping_is_bijective() {
        let vocab = Vocabulary::build();
        for i in 0..vocab.len() {
            let id = TokenId(i as u16);
            let token = vocab.token(id).unwrap();
            assert_eq!(vocab.id(&token).unwrap(), id);
            assert_eq!(vocab.parse(vocab.name(id).unwrap()).unwrap(), id);
        }
    }

    #[test]
    fn test_unknown_tokens_fail() {
        let vocab = Vocabulary::build();
        assert!(matches!(
            vocab.parse("NM99"),
            Err(TopoSeqError::UnknownToken { .. })
        ));
        assert!(vocab.token(TokenId(5000)).is_err());
        assert!(vocab.parse("M_GD").is_err());
    }

    #[test]
    fn test_kind_sets_partition_the_vocabulary() {
        let vocab = Vocabulary::build();
        let total = vocab.devices().len()
            + vocab.nets().len()
            + vocab.pin_edges().len()
            + vocab.circuit_types().len()
            + 1;
        assert_eq!(total, vocab.len());
        assert_eq!(vocab.edges_of(DeviceFamily::Mosfet).len(), 15);
        assert_eq!(vocab.devices_of(DeviceFamily::Mosfet).len(), 70);
        let nm3 = vocab
            .device_id(DeviceId::new(DeviceType::Nmos, 3).unwrap())
            .unwrap();
        assert!(vocab.devices_of(DeviceFamily::Mosfet).contains(nm3));
        assert!(!vocab.devices_of(DeviceFamily::Bjt).contains(nm3));
    }

    #[test]
    fn test_table_round_trip() {
        let vocab = Vocabulary::build();
        let json = vocab.to_json().unwrap();
        let loaded = Vocabulary::from_json(&json).unwrap();
        assert_eq!(loaded.len(), vocab.len());
    }

    #[test]
    fn test_table_mismatch_is_reported() {
        let vocab = Vocabulary::build();
        let mut table = vocab.table();
        table.tokens.swap(0, 1);
        match vocab.verify_table(&table) {
            Err(TopoSeqError::VocabularyMismatch { position, .. }) => assert_eq!(position, 0),
            other => panic!("expected mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_and_render_sequence() {
        let vocab = Vocabulary::build();
        let seq = vocab.parse_sequence("VSS->M_S->NM1->M_B->VSS->TRUNCATE->").unwrap();
        assert_eq!(seq.len(), 6);
        assert_eq!(
            vocab.render(&seq).unwrap(),
            "VSS->M_S->NM1->M_B->VSS->TRUNCATE"
        );
        let spaced = vocab.parse_sequence("VSS M_S NM1").unwrap();
        assert_eq!(spaced.len(), 3);
    }
}
