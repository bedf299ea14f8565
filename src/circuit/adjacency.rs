//! Typed-edge adjacency matrix I/O.
//!
//! The matrix is stored as CSV: a header row `,v1,v2,...`, then one row per
//! vertex whose first cell is the vertex name. A cell holds `0` when the two
//! vertices are not connected and the pin-edge label otherwise. The matrix
//! is symmetric and vertices are sorted by name.

use crate::error::{Result, TopoSeqError};
use crate::vocab::{PinLabel, Token, Vocabulary};

use super::{CircuitGraph, NodeRef};

/// Render a graph as an adjacency matrix.
pub fn to_adjacency_csv(graph: &CircuitGraph) -> Result<String> {
    let mut vertices: Vec<(String, NodeRef)> = (0..graph.node_count())
        .map(|flat| {
            let node = graph.node_at(flat);
            (graph.node_name(node), node)
        })
        .collect();
    vertices.sort_by(|a, b| a.0.cmp(&b.0));

    let n = vertices.len();
    let mut position = vec![0usize; n];
    for (row, (_, node)) in vertices.iter().enumerate() {
        position[graph.flat_index(*node)] = row;
    }

    let mut cells = vec![vec![String::from("0"); n]; n];
    for edge in graph.edges() {
        let label = graph.edge_label(edge)?.name().to_string();
        let d = position[graph.flat_index(NodeRef::Device(edge.device))];
        let m = position[graph.flat_index(NodeRef::Net(edge.net))];
        cells[d][m] = label.clone();
        cells[m][d] = label;
    }

    let mut out = String::new();
    for (name, _) in &vertices {
        out.push(',');
        out.push_str(name);
    }
    out.push('\n');
    for (row, (name, _)) in vertices.iter().enumerate() {
        out.push_str(name);
        for cell in &cells[row] {
            out.push(',');
            out.push_str(cell);
        }
        out.push('\n');
    }
    Ok(out)
}

/// Read a graph from an adjacency matrix. Vertex names are resolved through
/// the vocabulary.
pub fn from_adjacency_csv(vocab: &Vocabulary, text: &str) -> Result<CircuitGraph> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let header = lines.next().ok_or(TopoSeqError::AdjacencyFormat {
        row: 0,
        message: "missing header".to_string(),
    })?;

    let mut header_cells = header.split(',').map(str::trim);
    if header_cells.next() != Some("") {
        return Err(TopoSeqError::AdjacencyFormat {
            row: 0,
            message: "header must start with an empty cell".to_string(),
        });
    }
    let names: Vec<&str> = header_cells.collect();
    let vertices = names
        .iter()
        .map(|name| vocab.parse(name).and_then(|id| vocab.token(id)))
        .collect::<Result<Vec<Token>>>()?;

    let mut matrix: Vec<Vec<&str>> = Vec::with_capacity(names.len());
    for (i, line) in lines.enumerate() {
        let row = i + 1;
        let mut cells = line.split(',').map(str::trim);
        let name = cells.next().unwrap_or_default();
        if names.get(i) != Some(&name) {
            return Err(TopoSeqError::AdjacencyFormat {
                row,
                message: format!("row '{}' does not match header order", name),
            });
        }
        let cells: Vec<&str> = cells.collect();
        if cells.len() != names.len() {
            return Err(TopoSeqError::AdjacencyFormat {
                row,
                message: format!("expected {} cells, found {}", names.len(), cells.len()),
            });
        }
        matrix.push(cells);
    }
    if matrix.len() != names.len() {
        return Err(TopoSeqError::AdjacencyFormat {
            row: matrix.len() + 1,
            message: format!("expected {} rows, found {}", names.len(), matrix.len()),
        });
    }

    let mut graph = CircuitGraph::new();
    for token in &vertices {
        match token {
            Token::Device(d) => {
                graph.add_device(*d);
            }
            Token::Net(n) => {
                graph.add_net(*n);
            }
            other => {
                return Err(TopoSeqError::AdjacencyFormat {
                    row: 0,
                    message: format!("'{}' is not a device or net", other),
                })
            }
        }
    }

    for (i, row) in matrix.iter().enumerate() {
        for (j, &cell) in row.iter().enumerate() {
            if cell == "0" {
                continue;
            }
            if matrix[j][i] != cell {
                return Err(TopoSeqError::AdjacencyFormat {
                    row: i + 1,
                    message: format!("matrix is not symmetric at column {}", names[j]),
                });
            }
            // Each edge appears twice; handle it from the device row
            let (Token::Device(device), Token::Net(net)) = (vertices[i], vertices[j]) else {
                if matches!((vertices[i], vertices[j]), (Token::Net(_), Token::Device(_))) {
                    continue;
                }
                return Err(TopoSeqError::AdjacencyFormat {
                    row: i + 1,
                    message: format!("edge between {} and {} is not device-to-net", names[i], names[j]),
                });
            };
            let label = PinLabel::from_name(cell)
                .filter(|l| l.family() == device.family())
                .ok_or_else(|| TopoSeqError::AdjacencyFormat {
                    row: i + 1,
                    message: format!("'{}' is not a label for {}", cell, device),
                })?;
            graph.connect(device, net, label.pins())?;
        }
    }

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{DeviceFamily, DeviceId, DeviceType, NetId, PinSet};

    #[test]
    fn test_matrix_layout() {
        let nm1 = DeviceId::new(DeviceType::Nmos, 1).unwrap();
        let mut g = CircuitGraph::new();
        g.connect(nm1, NetId::VSS, PinSet::from_letters(DeviceFamily::Mosfet, "BS").unwrap())
            .unwrap();
        g.connect(nm1, NetId::VDD, PinSet::from_letters(DeviceFamily::Mosfet, "DG").unwrap())
            .unwrap();

        let csv = to_adjacency_csv(&g).unwrap();
        assert_eq!(
            csv,
            ",NM1,VDD,VSS\nNM1,0,M_DG,M_BS\nVDD,M_DG,0,0\nVSS,M_BS,0,0\n"
        );

        let vocab = Vocabulary::build();
        let back = from_adjacency_csv(&vocab, &csv).unwrap();
        assert!(back.same_topology(&g));
    }

    #[test]
    fn test_asymmetric_matrix_is_rejected() {
        let vocab = Vocabulary::build();
        let csv = ",NM1,VSS\nNM1,0,M_BDGS\nVSS,0,0\n";
        assert!(matches!(
            from_adjacency_csv(&vocab, csv),
            Err(TopoSeqError::AdjacencyFormat { row: 1, .. })
        ));
    }

    #[test]
    fn test_label_family_is_checked() {
        let vocab = Vocabulary::build();
        let csv = ",NM1,VSS\nNM1,0,B_BCE\nVSS,B_BCE,0\n";
        assert!(from_adjacency_csv(&vocab, csv).is_err());
    }
}
