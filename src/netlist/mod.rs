//! Netlist front end.
//!
//! Reads SPICE-style instance lines and turns them into a [`CircuitGraph`]
//! over the catalog vocabulary. Only the topology matters: device
//! parameters after the model name are ignored.
//!
//! # Grammar Overview
//!
//! ```text
//! netlist   = { line }
//! line      = comment | instance | other | empty
//! comment   = '*' { any_char }            (first non-blank character)
//! instance  = name '(' { net } ')' model { param }
//! other     = any line not starting with `name '('`   (skipped)
//! ```
//!
//! # Models
//!
//! | Model | Device | Net order |
//! |-------|--------|-----------|
//! | `nmos4`, `nmos` | `NM` | D G S B |
//! | `pmos4`, `pmos` | `PM` | D G S B |
//! | `npn` | `NPN` | C B E |
//! | `pnp` | `PNP` | C B E |
//! | `resistor` | `R` | two terminals |
//! | `capacitor` | `C` | two terminals |
//! | `inductor` | `L` | two terminals |
//! | `diode` | `DIO` | P N |
//!
//! Other analog models are skipped with a warning; digital models and
//! clock/logic nets reject the whole netlist.
//!
//! # Example
//!
//! ```text
//! * common-source stage
//! MM0 (VOUT1 VIN1 VSS VSS) nmos4 w=1u l=180n
//! R0 (VDD VOUT1) resistor r=10k
//! ```

mod ast;
mod build;
mod lexer;
mod parser;

pub use ast::*;
pub use build::{build_graph, check_digital, resolve_port, BuildConfig, DIGITAL_MODELS, DIGITAL_NETS};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::Parser;

use crate::circuit::CircuitGraph;
use crate::error::Result;

/// Parse a netlist string into an AST.
pub fn parse(input: &str) -> Result<NetlistAst> {
    let lexer = Lexer::new(input);
    let mut parser = Parser::new(lexer)?;
    parser.parse()
}

/// Parse a netlist file.
#[cfg(feature = "cli")]
pub fn parse_file(path: &std::path::Path) -> Result<NetlistAst> {
    let content = std::fs::read_to_string(path).map_err(|e| crate::error::TopoSeqError::FileRead {
        path: path.display().to_string(),
        source: e,
    })?;
    parse(&content)
}

/// Parse a netlist and build its graph in one step.
pub fn graph_from_netlist(input: &str, config: &BuildConfig) -> Result<CircuitGraph> {
    let ast = parse(input)?;
    build_graph(&ast, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::CircuitType;

    #[test]
    fn test_graph_from_netlist() {
        let input = "\
* common-source stage
subckt cs VIN1 VOUT1
MM0 (VOUT1 VIN1 VSS VSS) nmos4 w=1u l=180n
R0 (VDD VOUT1) resistor r=10k
ends cs
";
        let config = BuildConfig::new().with_circuit_type(CircuitType::General);
        let graph = graph_from_netlist(input, &config).unwrap();
        assert_eq!(graph.devices().len(), 2);
        assert_eq!(graph.nets().len(), 4);
        assert_eq!(graph.edges().len(), 5);
        assert_eq!(graph.circuit_type(), Some(CircuitType::General));
    }
}
