//! Type-preserving renaming of devices and nets.

use std::collections::{BTreeSet, HashMap};

use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use tracing::debug;

use crate::circuit::{CircuitGraph, DeviceId, NetId};
use crate::error::{Result, TopoSeqError};
use crate::vocab::catalog::{DEVICE_CATALOG, NET_CATALOG};
use crate::vocab::{Token, TokenSequence, Vocabulary};

/// Which nets take part in renaming. Supply rails and the bare `VOUT` are
/// never renamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetRenaming {
    /// Every indexed net: internal nets and ports
    #[default]
    AllIndexed,
    /// Internal `NET*` nets only
    InternalOnly,
    /// Nets keep their names; only devices are renamed
    Keep,
}

/// Configuration for renaming.
#[derive(Debug, Clone, Default)]
pub struct RenameConfig {
    pub nets: NetRenaming,
}

impl RenameConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nets(mut self, nets: NetRenaming) -> Self {
        self.nets = nets;
        self
    }

    fn renames(&self, net: &NetId) -> bool {
        if net.index.is_none() || net.category.is_rail() {
            return false;
        }
        match self.nets {
            NetRenaming::AllIndexed => true,
            NetRenaming::InternalOnly => net.is_internal(),
            NetRenaming::Keep => false,
        }
    }
}

/// An injective map from used identifiers to fresh ones of the same type
/// or category. Identifiers not in the map are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Renaming {
    pub devices: HashMap<DeviceId, DeviceId>,
    pub nets: HashMap<NetId, NetId>,
}

impl Renaming {
    /// Draw a random renaming for the given identifiers.
    ///
    /// Per device type (and per net category), used indices are taken in
    /// ascending order and mapped onto a uniformly drawn subset of the
    /// catalogued range.
    pub fn draw<'a>(
        devices: impl IntoIterator<Item = &'a DeviceId>,
        nets: impl IntoIterator<Item = &'a NetId>,
        seed: u64,
        config: &RenameConfig,
    ) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        let devices: BTreeSet<DeviceId> = devices.into_iter().copied().collect();
        let nets: BTreeSet<NetId> = nets
            .into_iter()
            .filter(|n| config.renames(n))
            .copied()
            .collect();

        let mut renaming = Renaming::default();

        for record in &DEVICE_CATALOG {
            let used: Vec<DeviceId> = devices
                .iter()
                .filter(|d| d.device_type == record.device_type)
                .copied()
                .collect();
            if used.is_empty() {
                continue;
            }
            let capacity = record.device_type.capacity();
            if used.len() > capacity {
                return Err(TopoSeqError::RangeExhausted {
                    kind: record.prefix.to_string(),
                    count: used.len(),
                    capacity,
                });
            }
            let picks = index::sample(&mut rng, capacity, used.len());
            for (old, pick) in used.iter().zip(picks.iter()) {
                let new = DeviceId {
                    device_type: record.device_type,
                    index: record.min_index + pick as u16,
                };
                renaming.devices.insert(*old, new);
            }
        }

        for record in &NET_CATALOG {
            let Some((lo, _)) = record.indices else {
                continue;
            };
            let used: Vec<NetId> = nets
                .iter()
                .filter(|n| n.category == record.category)
                .copied()
                .collect();
            if used.is_empty() {
                continue;
            }
            let capacity = record.capacity();
            if used.len() > capacity {
                return Err(TopoSeqError::RangeExhausted {
                    kind: record.prefix.to_string(),
                    count: used.len(),
                    capacity,
                });
            }
            let picks = index::sample(&mut rng, capacity, used.len());
            for (old, pick) in used.iter().zip(picks.iter()) {
                let new = NetId {
                    category: record.category,
                    index: Some(lo + pick as u16),
                };
                renaming.nets.insert(*old, new);
            }
        }

        Ok(renaming)
    }

    pub fn device(&self, device: DeviceId) -> DeviceId {
        self.devices.get(&device).copied().unwrap_or(device)
    }

    pub fn net(&self, net: NetId) -> NetId {
        self.nets.get(&net).copied().unwrap_or(net)
    }

    /// Rename every node of a graph, keeping node and edge order.
    pub fn apply_to_graph(&self, graph: &CircuitGraph) -> CircuitGraph {
        graph.map_nodes(|d| self.device(d), |n| self.net(n))
    }

    /// Rename every device and net token of a sequence.
    pub fn apply_to_sequence(
        &self,
        vocab: &Vocabulary,
        sequence: &TokenSequence,
    ) -> Result<TokenSequence> {
        sequence
            .iter()
            .map(|id| match vocab.token(id)? {
                Token::Device(d) => vocab.device_id(self.device(d)),
                Token::Net(n) => vocab.net_id(self.net(n)),
                _ => Ok(id),
            })
            .collect()
    }
}

/// Rename a graph with a fresh random renaming.
pub fn rename_graph(graph: &CircuitGraph, seed: u64, config: &RenameConfig) -> Result<CircuitGraph> {
    let renaming = Renaming::draw(graph.devices(), graph.nets(), seed, config)?;
    debug!(
        devices = renaming.devices.len(),
        nets = renaming.nets.len(),
        seed,
        "renamed graph"
    );
    Ok(renaming.apply_to_graph(graph))
}

/// Rename a sequence with a fresh random renaming.
pub fn rename_sequence(
    vocab: &Vocabulary,
    sequence: &TokenSequence,
    seed: u64,
    config: &RenameConfig,
) -> Result<TokenSequence> {
    let mut devices = Vec::new();
    let mut nets = Vec::new();
    for id in sequence.iter() {
        match vocab.token(id)? {
            Token::Device(d) => devices.push(d),
            Token::Net(n) => nets.push(n),
            _ => {}
        }
    }
    let renaming = Renaming::draw(&devices, &nets, seed, config)?;
    renaming.apply_to_sequence(vocab, sequence)
}
