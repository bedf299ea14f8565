//! Netlist, adjacency matrix and vocabulary table interchange.

use toposeq_core::circuit::{
    from_adjacency_csv, structural_report, to_adjacency_csv, CircuitType, DeviceType, NetId,
};
use toposeq_core::codec::{decode, Encoder};
use toposeq_core::netlist::{self, graph_from_netlist, BuildConfig};
use toposeq_core::vocab::{Vocabulary, VocabularyTable};
use toposeq_core::TopoSeqError;

const FOLDED_CASCODE: &str = "\
* folded cascode input stage
subckt fc VIN1 VIN2 VOUT1 VB1 VB2
MM0 (net5 VIN1 net3 VSS) nmos4 w=2u l=180n m=2
MM1 (net4 VIN2 net3 VSS) nmos4 w=2u l=180n m=2
MM2 (net3 VB1 VSS VSS) nmos4 w=1u l=1u
MM3 (net5 VB2 VDD VDD) pmos4 w=4u l=1u
MM4 (net4 VB2 VDD VDD) pmos4 w=4u l=1u
MM5 (VOUT1 VB1 net5 VDD) pmos4 w=4u l=180n
R0 (VOUT1 VSS) resistor r=20k
C0 (VOUT1 VSS) capacitor c=1p
V0 (VDD VSS) vsource dc=1.8
ends fc
";

#[test]
fn test_mm9_example() {
    let graph = graph_from_netlist("MM9 (VOUT1 net12 VSS VSS) nmos4", &BuildConfig::new()).unwrap();
    let summary = graph.summary();
    assert_eq!(summary.devices, vec!["NM1"]);
    assert_eq!(summary.nets, vec!["VOUT1", "NET1", "VSS"]);
    assert_eq!(
        summary.edges,
        vec![
            ["NM1".to_string(), "M_D".to_string(), "VOUT1".to_string()],
            ["NM1".to_string(), "M_G".to_string(), "NET1".to_string()],
            ["NM1".to_string(), "M_BS".to_string(), "VSS".to_string()],
        ]
    );
}

#[test]
fn test_folded_cascode_netlist() {
    let config = BuildConfig::new().with_circuit_type(CircuitType::Opamp);
    let graph = graph_from_netlist(FOLDED_CASCODE, &config).unwrap();

    let count = |t: DeviceType| graph.devices().iter().filter(|d| d.device_type == t).count();
    assert_eq!(count(DeviceType::Nmos), 3);
    assert_eq!(count(DeviceType::Pmos), 3);
    assert_eq!(count(DeviceType::Resistor), 1);
    assert_eq!(count(DeviceType::Capacitor), 1);
    // net3, net4, net5 in sorted order
    for i in 1..=3 {
        assert!(graph.net_index(&NetId::internal(i).unwrap()).is_some());
    }
    assert!(graph.net_index(&NetId::internal(4).unwrap()).is_none());

    let report = structural_report(&graph);
    assert!(report.valid, "{:?}", report.violations);

    let vocab = Vocabulary::build();
    let sequence = Encoder::new(&vocab).encode(&graph, 0).unwrap();
    let text = vocab.render(&sequence).unwrap();
    assert!(text.starts_with("CIRCUIT_Opamp->VSS->"));
    let decoded = decode(&vocab, &vocab.parse_sequence(&text).unwrap()).unwrap();
    assert!(decoded.same_topology(&graph));
}

#[test]
fn test_netlist_skips_non_instance_lines() {
    let ast = netlist::parse(FOLDED_CASCODE).unwrap();
    assert_eq!(ast.instances.len(), 9);
    assert_eq!(ast.skipped_lines, 2);
    assert_eq!(ast.instances[0].line, 3);
}

#[test]
fn test_netlist_errors() {
    assert!(matches!(
        graph_from_netlist("MM0 (a b c d) nmos4\nX1 (a b) PFD\n", &BuildConfig::new()),
        Err(TopoSeqError::DigitalCircuit { .. })
    ));
    // Digital rejection can be turned off; the unknown model is then skipped
    let lenient = BuildConfig::new().with_reject_digital(false);
    assert!(graph_from_netlist("MM0 (a b c d) nmos4\nX1 (a b) PFD\n", &lenient).is_ok());

    assert!(matches!(
        graph_from_netlist("MM0 (VOUT9 a VSS VSS) nmos4", &BuildConfig::new()),
        Err(TopoSeqError::UnknownToken { .. })
    ));
    assert!(matches!(
        graph_from_netlist("* nothing here\n", &BuildConfig::new()),
        Err(TopoSeqError::EmptyGraph)
    ));
    assert!(matches!(
        graph_from_netlist("MM0 (a (b) c d) nmos4", &BuildConfig::new()),
        Err(TopoSeqError::ParseError { .. })
    ));
}

#[test]
fn test_adjacency_round_trip() {
    let vocab = Vocabulary::build();
    let graph = graph_from_netlist(FOLDED_CASCODE, &BuildConfig::new()).unwrap();

    let csv = to_adjacency_csv(&graph).unwrap();
    let header: Vec<&str> = csv.lines().next().unwrap().split(',').collect();
    assert_eq!(header[0], "");
    assert_eq!(header.len(), graph.devices().len() + graph.nets().len() + 1);

    let back = from_adjacency_csv(&vocab, &csv).unwrap();
    assert!(back.same_topology(&graph));
    assert_eq!(to_adjacency_csv(&back).unwrap(), csv);
}

#[test]
fn test_vocabulary_table_round_trip() {
    let vocab = Vocabulary::build();
    assert_eq!(vocab.len(), 397);

    let json = vocab.to_json().unwrap();
    let loaded = Vocabulary::from_json(&json).unwrap();
    assert_eq!(loaded.table(), vocab.table());

    let mut table: VocabularyTable = serde_json::from_str(&json).unwrap();
    table.tokens.swap(46, 47);
    match vocab.verify_table(&table) {
        Err(TopoSeqError::VocabularyMismatch {
            position,
            expected,
            found,
        }) => {
            assert_eq!(position, 46);
            assert_eq!(expected, "NM1");
            assert_eq!(found, "NM2");
        }
        other => panic!("expected mismatch, got {:?}", other),
    }

    table.tokens.truncate(10);
    assert!(Vocabulary::from_json(&serde_json::to_string(&table).unwrap()).is_err());
}
