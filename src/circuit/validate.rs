//! Structural validation of circuit graphs.

use std::collections::VecDeque;

use serde::Serialize;

use crate::error::{Result, TopoSeqError};

use super::{CircuitGraph, NodeRef};

/// Check that every device has all of its pins on some net.
///
/// Transistors and diodes need every pin letter assigned; two-terminal
/// passives need two distinct nets.
pub fn check_complete(graph: &CircuitGraph) -> Result<()> {
    for (d, device) in graph.devices().iter().enumerate() {
        let family = device.family();
        if family.is_two_terminal() {
            let nets = graph.device_edges(d).count();
            if nets < 2 {
                return Err(TopoSeqError::IncompletePin {
                    device: device.to_string(),
                    missing: format!("{} of 2 terminals", 2 - nets),
                });
            }
            continue;
        }

        let missing = family.all_pins().difference(graph.assigned_pins(d));
        if !missing.is_empty() {
            return Err(TopoSeqError::IncompletePin {
                device: device.to_string(),
                missing: missing.letters(family),
            });
        }
    }
    Ok(())
}

/// Check that every node is reachable from `start`.
pub fn check_connected(graph: &CircuitGraph, start: NodeRef) -> Result<()> {
    let incidence = graph.incidence();
    let mut seen = vec![false; graph.node_count()];
    let mut queue = VecDeque::new();

    let origin = graph.flat_index(start);
    seen[origin] = true;
    queue.push_back(start);

    while let Some(node) = queue.pop_front() {
        for &edge in &incidence[graph.flat_index(node)] {
            let next = graph.opposite(edge, node);
            let flat = graph.flat_index(next);
            if !seen[flat] {
                seen[flat] = true;
                queue.push_back(next);
            }
        }
    }

    if let Some(unreached) = seen.iter().position(|&s| !s) {
        return Err(TopoSeqError::DisconnectedGraph {
            start: graph.node_name(start),
            node: graph.node_name(graph.node_at(unreached)),
        });
    }
    Ok(())
}

/// Result of [`structural_report`].
#[derive(Debug, Clone, Serialize)]
pub struct StructuralReport {
    pub valid: bool,
    pub violations: Vec<String>,
}

/// Collect every structural problem of a graph instead of stopping at the
/// first one.
///
/// Checks:
/// - The graph has at least one pin-edge
/// - Every device pin is assigned
/// - Every node is connected
/// - Internal nets reach at least two devices
pub fn structural_report(graph: &CircuitGraph) -> StructuralReport {
    let mut violations = Vec::new();

    if graph.edges().is_empty() {
        violations.push(TopoSeqError::EmptyGraph.to_string());
    } else {
        if let Err(e) = check_complete(graph) {
            violations.push(e.to_string());
        }
        if let Err(e) = check_connected(graph, graph.node_at(0)) {
            violations.push(e.to_string());
        }
    }

    for net in graph.floating_internal_nets() {
        violations.push(format!("Internal net '{}' touches fewer than two devices", net));
    }

    StructuralReport {
        valid: violations.is_empty(),
        violations,
    }
}
