//! Bipartite circuit graph structure.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use super::types::{CircuitType, DeviceId, NetId, PinSet};
use crate::error::{Result, TopoSeqError};
use crate::vocab::PinLabel;

/// A typed edge between one device and one net. `pins` lists every pin of
/// the device tied to that net, so a device has at most one edge per net.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PinEdge {
    /// Index into [`CircuitGraph::devices`]
    pub device: usize,
    /// Index into [`CircuitGraph::nets`]
    pub net: usize,
    pub pins: PinSet,
}

/// Either side of the bipartite graph, by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Device(usize),
    Net(usize),
}

/// A circuit as a bipartite graph of devices and nets.
///
/// Edges can only be created between a device and a net, so the bipartite
/// invariant holds by construction. Node and edge order is insertion order
/// and is preserved by renaming.
#[derive(Debug, Clone, Default)]
pub struct CircuitGraph {
    circuit_type: Option<CircuitType>,
    devices: Vec<DeviceId>,
    nets: Vec<NetId>,
    edges: Vec<PinEdge>,
    device_map: HashMap<DeviceId, usize>,
    net_map: HashMap<NetId, usize>,
    edge_map: HashMap<(usize, usize), usize>,
}

impl CircuitGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty graph tagged with a circuit type.
    pub fn with_circuit_type(circuit_type: CircuitType) -> Self {
        Self {
            circuit_type: Some(circuit_type),
            ..Self::default()
        }
    }

    pub fn circuit_type(&self) -> Option<CircuitType> {
        self.circuit_type
    }

    pub fn set_circuit_type(&mut self, circuit_type: Option<CircuitType>) {
        self.circuit_type = circuit_type;
    }

    pub fn devices(&self) -> &[DeviceId] {
        &self.devices
    }

    pub fn nets(&self) -> &[NetId] {
        &self.nets
    }

    pub fn edges(&self) -> &[PinEdge] {
        &self.edges
    }

    pub fn device_index(&self, device: &DeviceId) -> Option<usize> {
        self.device_map.get(device).copied()
    }

    pub fn net_index(&self, net: &NetId) -> Option<usize> {
        self.net_map.get(net).copied()
    }

    pub fn contains_net(&self, net: &NetId) -> bool {
        self.net_map.contains_key(net)
    }

    /// Add a device node if it is not present yet; returns its position.
    pub fn add_device(&mut self, device: DeviceId) -> usize {
        if let Some(&idx) = self.device_map.get(&device) {
            return idx;
        }
        let idx = self.devices.len();
        self.devices.push(device);
        self.device_map.insert(device, idx);
        idx
    }

    /// Add a net node if it is not present yet; returns its position.
    pub fn add_net(&mut self, net: NetId) -> usize {
        if let Some(&idx) = self.net_map.get(&net) {
            return idx;
        }
        let idx = self.nets.len();
        self.nets.push(net);
        self.net_map.insert(net, idx);
        idx
    }

    /// Tie `pins` of `device` to `net`, merging with an existing edge
    /// between the two. Fails without modifying the graph if a pin is
    /// already on another net.
    pub fn connect(&mut self, device: DeviceId, net: NetId, pins: PinSet) -> Result<()> {
        self.check_connect(device, net, pins)?;

        let d = self.add_device(device);
        let n = self.add_net(net);
        match self.edge_map.get(&(d, n)) {
            Some(&e) => {
                let edge = &mut self.edges[e];
                edge.pins = edge.pins.union(pins);
            }
            None => {
                self.edge_map.insert((d, n), self.edges.len());
                self.edges.push(PinEdge {
                    device: d,
                    net: n,
                    pins,
                });
            }
        }
        Ok(())
    }

    /// Check whether [`connect`](Self::connect) would succeed.
    pub fn check_connect(&self, device: DeviceId, net: NetId, pins: PinSet) -> Result<()> {
        let family = device.family();
        if pins.is_empty() || !pins.is_subset(family.all_pins()) {
            return Err(TopoSeqError::unknown_token(format!(
                "{}_{}",
                family.edge_prefix(),
                pins.letters(family)
            )));
        }

        let Some(d) = self.device_index(&device) else {
            return Ok(());
        };
        let here = self.net_index(&net);

        if family.is_two_terminal() {
            let attached: Vec<usize> = self.device_edges(d).map(|e| e.net).collect();
            if here.map_or(true, |n| !attached.contains(&n)) && attached.len() >= 2 {
                let existing = attached
                    .iter()
                    .map(|&n| self.nets[n].to_string())
                    .collect::<Vec<_>>()
                    .join("/");
                return Err(TopoSeqError::DuplicateEdge {
                    position: None,
                    device: device.to_string(),
                    pin: "C".to_string(),
                    existing,
                    conflicting: net.to_string(),
                });
            }
            return Ok(());
        }

        for edge in self.device_edges(d) {
            if Some(edge.net) == here {
                continue;
            }
            let clash = edge.pins.intersection(pins);
            if !clash.is_empty() {
                return Err(TopoSeqError::DuplicateEdge {
                    position: None,
                    device: device.to_string(),
                    pin: clash.letters(family),
                    existing: self.nets[edge.net].to_string(),
                    conflicting: net.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Edges touching one device, in insertion order.
    pub fn device_edges(&self, device: usize) -> impl Iterator<Item = &PinEdge> + '_ {
        self.edges.iter().filter(move |e| e.device == device)
    }

    /// Pins of a device that are tied to some net.
    pub fn assigned_pins(&self, device: usize) -> PinSet {
        self.device_edges(device)
            .fold(PinSet::EMPTY, |acc, e| acc.union(e.pins))
    }

    /// Canonical label of an edge.
    pub fn edge_label(&self, edge: &PinEdge) -> Result<PinLabel> {
        let family = self.devices[edge.device].family();
        PinLabel::for_pins(family, edge.pins).ok_or_else(|| {
            TopoSeqError::unknown_token(format!("{}_{}", family.edge_prefix(), edge.pins.letters(family)))
        })
    }

    /// Internal nets touching fewer than two distinct devices.
    pub fn floating_internal_nets(&self) -> Vec<NetId> {
        let mut degree = vec![0usize; self.nets.len()];
        for edge in &self.edges {
            degree[edge.net] += 1;
        }
        self.nets
            .iter()
            .zip(degree)
            .filter(|(net, d)| net.is_internal() && *d < 2)
            .map(|(net, _)| *net)
            .collect()
    }

    /// Total node count (devices and nets).
    pub fn node_count(&self) -> usize {
        self.devices.len() + self.nets.len()
    }

    /// Flat index of a node: devices first, then nets.
    pub fn flat_index(&self, node: NodeRef) -> usize {
        match node {
            NodeRef::Device(d) => d,
            NodeRef::Net(n) => self.devices.len() + n,
        }
    }

    /// Incident edge indices per flat node index, in edge order.
    pub fn incidence(&self) -> Vec<Vec<usize>> {
        let mut incidence = vec![Vec::new(); self.node_count()];
        for (e, edge) in self.edges.iter().enumerate() {
            incidence[edge.device].push(e);
            incidence[self.devices.len() + edge.net].push(e);
        }
        incidence
    }

    /// The node on the other side of an edge.
    pub fn opposite(&self, edge: usize, from: NodeRef) -> NodeRef {
        let edge = &self.edges[edge];
        match from {
            NodeRef::Device(_) => NodeRef::Net(edge.net),
            NodeRef::Net(_) => NodeRef::Device(edge.device),
        }
    }

    /// Node for a flat index.
    pub fn node_at(&self, flat: usize) -> NodeRef {
        if flat < self.devices.len() {
            NodeRef::Device(flat)
        } else {
            NodeRef::Net(flat - self.devices.len())
        }
    }

    /// Display name of a node.
    pub fn node_name(&self, node: NodeRef) -> String {
        match node {
            NodeRef::Device(d) => self.devices[d].to_string(),
            NodeRef::Net(n) => self.nets[n].to_string(),
        }
    }

    /// Order-independent view of the graph: every `(device, net, pins)`
    /// triple.
    pub fn topology(&self) -> BTreeSet<(DeviceId, NetId, PinSet)> {
        self.edges
            .iter()
            .map(|e| (self.devices[e.device], self.nets[e.net], e.pins))
            .collect()
    }

    /// True when both graphs have the same nodes and the same typed edges,
    /// regardless of insertion order.
    pub fn same_topology(&self, other: &CircuitGraph) -> bool {
        let devices: BTreeSet<_> = self.devices.iter().collect();
        let other_devices: BTreeSet<_> = other.devices.iter().collect();
        let nets: BTreeSet<_> = self.nets.iter().collect();
        let other_nets: BTreeSet<_> = other.nets.iter().collect();
        devices == other_devices && nets == other_nets && self.topology() == other.topology()
    }

    /// Rebuild the graph with every node renamed, keeping node and edge
    /// order. The maps must be injective.
    pub(crate) fn map_nodes(
        &self,
        device_map: impl Fn(DeviceId) -> DeviceId,
        net_map: impl Fn(NetId) -> NetId,
    ) -> CircuitGraph {
        let devices: Vec<DeviceId> = self.devices.iter().map(|&d| device_map(d)).collect();
        let nets: Vec<NetId> = self.nets.iter().map(|&n| net_map(n)).collect();
        CircuitGraph {
            circuit_type: self.circuit_type,
            device_map: devices.iter().enumerate().map(|(i, &d)| (d, i)).collect(),
            net_map: nets.iter().enumerate().map(|(i, &n)| (n, i)).collect(),
            devices,
            nets,
            edges: self.edges.clone(),
            edge_map: self.edge_map.clone(),
        }
    }

    /// Serializable summary for reports.
    pub fn summary(&self) -> GraphSummary {
        GraphSummary {
            circuit_type: self.circuit_type.map(|t| t.token_name().to_string()),
            devices: self.devices.iter().map(ToString::to_string).collect(),
            nets: self.nets.iter().map(ToString::to_string).collect(),
            edges: self
                .edges
                .iter()
                .map(|e| {
                    let label = self
                        .edge_label(e)
                        .map(|l| l.name().to_string())
                        .unwrap_or_default();
                    [
                        self.devices[e.device].to_string(),
                        label,
                        self.nets[e.net].to_string(),
                    ]
                })
                .collect(),
        }
    }
}

/// Flat, serializable description of a graph.
#[derive(Debug, Clone, Serialize)]
pub struct GraphSummary {
    pub circuit_type: Option<String>,
    pub devices: Vec<String>,
    pub nets: Vec<String>,
    /// `[device, label, net]` triples
    pub edges: Vec<[String; 3]>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{DeviceFamily, DeviceType};

    fn nm(i: u16) -> DeviceId {
        DeviceId::new(DeviceType::Nmos, i).unwrap()
    }

    fn pins(letters: &str) -> PinSet {
        PinSet::from_letters(DeviceFamily::Mosfet, letters).unwrap()
    }

    #[test]
    fn test_connect_merges_pins_on_same_net() {
        let mut g = CircuitGraph::new();
        let net = NetId::internal(1).unwrap();
        g.connect(nm(1), net, pins("D")).unwrap();
        g.connect(nm(1), net, pins("G")).unwrap();
        assert_eq!(g.edges().len(), 1);
        assert_eq!(g.edge_label(&g.edges()[0]).unwrap().name(), "M_DG");
    }

    #[test]
    fn test_repeated_connection_is_idempotent() {
        let mut g = CircuitGraph::new();
        g.connect(nm(1), NetId::VSS, pins("S")).unwrap();
        g.connect(nm(1), NetId::VSS, pins("S")).unwrap();
        assert_eq!(g.edges().len(), 1);
        assert_eq!(g.nets().len(), 1);
    }

    #[test]
    fn test_pin_on_two_nets_is_rejected() {
        let mut g = CircuitGraph::new();
        g.connect(nm(1), NetId::VSS, pins("S")).unwrap();
        let err = g.connect(nm(1), NetId::VDD, pins("BS")).unwrap_err();
        match err {
            TopoSeqError::DuplicateEdge { pin, existing, .. } => {
                assert_eq!(pin, "S");
                assert_eq!(existing, "VSS");
            }
            other => panic!("unexpected error {:?}", other),
        }
        // Nothing was added by the failed call
        assert!(!g.contains_net(&NetId::VDD));
    }

    #[test]
    fn test_passive_limited_to_two_nets() {
        let r1 = DeviceId::new(DeviceType::Resistor, 1).unwrap();
        let c = PinSet::from_letters(DeviceFamily::Resistor, "C").unwrap();
        let mut g = CircuitGraph::new();
        g.connect(r1, NetId::VSS, c).unwrap();
        g.connect(r1, NetId::VDD, c).unwrap();
        g.connect(r1, NetId::VDD, c).unwrap();
        assert!(g.connect(r1, NetId::internal(1).unwrap(), c).is_err());
    }

    #[test]
    fn test_floating_internal_nets() {
        let mut g = CircuitGraph::new();
        let n1 = NetId::internal(1).unwrap();
        g.connect(nm(1), n1, pins("D")).unwrap();
        assert_eq!(g.floating_internal_nets(), vec![n1]);
        g.connect(nm(2), n1, pins("G")).unwrap();
        assert!(g.floating_internal_nets().is_empty());
    }

    #[test]
    fn test_topology_ignores_order() {
        let mut a = CircuitGraph::new();
        a.connect(nm(1), NetId::VSS, pins("S")).unwrap();
        a.connect(nm(1), NetId::VDD, pins("D")).unwrap();
        let mut b = CircuitGraph::new();
        b.connect(nm(1), NetId::VDD, pins("D")).unwrap();
        b.connect(nm(1), NetId::VSS, pins("S")).unwrap();
        assert!(a.same_topology(&b));
    }
}
