//! Netlist to graph conversion.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, warn};

use super::ast::{InstanceDef, NetlistAst};
use crate::circuit::{
    check_complete, CircuitGraph, CircuitType, DeviceId, DeviceType, NetCategory, NetId, PinSet,
};
use crate::error::{Result, TopoSeqError};
use crate::vocab::catalog::NET_CATALOG;

/// Net name fragments that mark a digital circuit.
pub const DIGITAL_NETS: [&str; 12] = [
    "VCLK", "LOGICA", "LOGICB", "LOGICD", "LOGICF", "LOGICG", "LOGICQ", "LOGICQA", "LOGICQB",
    "VLATCH", "VHOLD", "VTRACK",
];

/// Device models that mark a digital circuit.
pub const DIGITAL_MODELS: [&str; 4] = ["XOR", "PFD", "INVERTER", "TRANSMISSION_GATE"];

/// Configuration for building a graph from a netlist.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Tag the resulting graph with a circuit type
    pub circuit_type: Option<CircuitType>,
    /// Fail with `DigitalCircuit` on digital models or nets
    pub reject_digital: bool,
    /// Fail with `IncompletePin` when a device is left with unassigned pins
    pub require_complete: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            circuit_type: None,
            reject_digital: true,
            require_complete: true,
        }
    }
}

impl BuildConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_circuit_type(mut self, circuit_type: CircuitType) -> Self {
        self.circuit_type = Some(circuit_type);
        self
    }

    pub fn with_reject_digital(mut self, reject: bool) -> Self {
        self.reject_digital = reject;
        self
    }

    pub fn with_require_complete(mut self, require: bool) -> Self {
        self.require_complete = require;
        self
    }
}

/// Device type and pin letters (in net-list order) for a model name.
fn model_pins(model: &str) -> Option<(DeviceType, &'static str)> {
    let entry = match model.to_ascii_lowercase().as_str() {
        "nmos4" | "nmos" => (DeviceType::Nmos, "DGSB"),
        "pmos4" | "pmos" => (DeviceType::Pmos, "DGSB"),
        "npn" => (DeviceType::Npn, "CBE"),
        "pnp" => (DeviceType::Pnp, "CBE"),
        "resistor" => (DeviceType::Resistor, "CC"),
        "capacitor" => (DeviceType::Capacitor, "CC"),
        "inductor" => (DeviceType::Inductor, "CC"),
        "diode" => (DeviceType::Diode, "PN"),
        _ => return None,
    };
    Some(entry)
}

/// Check a netlist for digital content.
pub fn check_digital(ast: &NetlistAst) -> Result<()> {
    for inst in &ast.instances {
        let model = inst.model.to_ascii_uppercase();
        if DIGITAL_MODELS.contains(&model.as_str()) {
            return Err(TopoSeqError::DigitalCircuit {
                reason: format!("instance '{}' uses digital model '{}'", inst.name, inst.model),
            });
        }
        for net in &inst.nets {
            let upper = net.to_ascii_uppercase();
            if let Some(tag) = DIGITAL_NETS.iter().find(|tag| upper.contains(*tag)) {
                return Err(TopoSeqError::DigitalCircuit {
                    reason: format!("net '{}' looks like a {} signal", net, tag),
                });
            }
        }
    }
    Ok(())
}

/// Resolve a port or rail name (`VDD`, `VOUT`, `VIN3`) to a net id.
///
/// Returns `Ok(None)` for internal net names and `UnknownToken` for names
/// that look like ports but are not in the catalog.
pub fn resolve_port(name: &str) -> Result<Option<NetId>> {
    let upper = name.to_ascii_uppercase();
    let mut looks_like_port = false;

    for record in NET_CATALOG.iter().filter(|r| r.category != NetCategory::Internal) {
        let Some(rest) = upper.strip_prefix(record.prefix) else {
            continue;
        };
        looks_like_port = true;
        if rest.is_empty() {
            if let Ok(net) = NetId::new(record.category, None) {
                return Ok(Some(net));
            }
        } else if rest.bytes().all(|b| b.is_ascii_digit()) {
            if let Some(net) = rest
                .parse::<u16>()
                .ok()
                .and_then(|i| NetId::new(record.category, Some(i)).ok())
            {
                return Ok(Some(net));
            }
        }
    }

    if looks_like_port {
        Err(TopoSeqError::unknown_token(upper))
    } else {
        Ok(None)
    }
}

/// Map every net name to a catalog net. Ports and rails keep their names,
/// internal nets become `NET1`, `NET2`, ... in sorted order of their
/// original names.
fn map_nets(instances: &[&InstanceDef]) -> Result<HashMap<String, NetId>> {
    let mut mapping = HashMap::new();
    let mut internal = BTreeSet::new();

    for inst in instances {
        for net in &inst.nets {
            if mapping.contains_key(net) || internal.contains(net.as_str()) {
                continue;
            }
            match resolve_port(net)? {
                Some(id) => {
                    mapping.insert(net.clone(), id);
                }
                None => {
                    internal.insert(net.as_str());
                }
            }
        }
    }

    let capacity = NetCategory::Internal.record().capacity();
    if internal.len() > capacity {
        return Err(TopoSeqError::RangeExhausted {
            kind: NetCategory::Internal.prefix().to_string(),
            count: internal.len(),
            capacity,
        });
    }
    for (i, name) in internal.into_iter().enumerate() {
        mapping.insert(name.to_string(), NetId::internal(i as u16 + 1)?);
    }
    Ok(mapping)
}

/// Build a circuit graph from a parsed netlist.
///
/// Devices are numbered per type in order of appearance. Instances with
/// unknown models are skipped with a warning. Unless disabled in the
/// config, the result must be structurally complete.
pub fn build_graph(ast: &NetlistAst, config: &BuildConfig) -> Result<CircuitGraph> {
    if config.reject_digital {
        check_digital(ast)?;
    }

    let mut kept = Vec::new();
    for inst in &ast.instances {
        match model_pins(&inst.model) {
            Some((_, pins)) if pins.len() != inst.nets.len() => {
                return Err(TopoSeqError::invalid_instance(
                    &inst.name,
                    inst.line,
                    format!(
                        "model '{}' takes {} nets, got {}",
                        inst.model,
                        pins.len(),
                        inst.nets.len()
                    ),
                ));
            }
            Some(entry) => kept.push((inst, entry)),
            None => warn!(instance = %inst.name, model = %inst.model, line = inst.line, "skipping unsupported model"),
        }
    }
    if kept.is_empty() {
        return Err(TopoSeqError::EmptyGraph);
    }

    let instances: Vec<&InstanceDef> = kept.iter().map(|(inst, _)| *inst).collect();
    let nets = map_nets(&instances)?;

    let mut graph = match config.circuit_type {
        Some(t) => CircuitGraph::with_circuit_type(t),
        None => CircuitGraph::new(),
    };
    let mut counters: HashMap<DeviceType, u16> = HashMap::new();

    for (inst, (device_type, pins)) in kept {
        let counter = counters.entry(device_type).or_insert(0);
        *counter += 1;
        let device = DeviceId::new(device_type, *counter).map_err(|_| TopoSeqError::RangeExhausted {
            kind: device_type.prefix().to_string(),
            count: *counter as usize,
            capacity: device_type.capacity(),
        })?;

        let family = device_type.family();
        for (letter, net) in pins.chars().zip(&inst.nets) {
            let pin = PinSet::from_letters(family, &letter.to_string()).ok_or_else(|| {
                TopoSeqError::invalid_instance(&inst.name, inst.line, format!("no pin '{}'", letter))
            })?;
            let net = nets[net.as_str()];
            graph.connect(device, net, pin).map_err(|e| {
                TopoSeqError::invalid_instance(&inst.name, inst.line, e.to_string())
            })?;
        }
    }

    if config.require_complete {
        check_complete(&graph)?;
    }
    debug!(
        devices = graph.devices().len(),
        nets = graph.nets().len(),
        edges = graph.edges().len(),
        "built graph from netlist"
    );
    Ok(graph)
}
