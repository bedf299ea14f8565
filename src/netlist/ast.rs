//! Syntax tree for instance netlists.

/// Parsed netlist: every instance line in file order.
#[derive(Debug, Clone, Default)]
pub struct NetlistAst {
    /// All device instances
    pub instances: Vec<InstanceDef>,
    /// Lines that were not instance lines (subcircuit headers, directives)
    pub skipped_lines: usize,
}

impl NetlistAst {
    /// Create a new empty netlist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every net name referenced by an instance, in first-use order.
    pub fn net_names(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.instances
            .iter()
            .flat_map(|inst| inst.nets.iter())
            .filter(|net| seen.insert(net.as_str()))
            .map(String::as_str)
            .collect()
    }
}

/// One instance line: `NAME ( net net ... ) model [params...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceDef {
    /// Instance name as written (`MM9`)
    pub name: String,
    /// Net names in pin order
    pub nets: Vec<String>,
    /// Model name (`nmos4`, `resistor`, ...)
    pub model: String,
    /// Source line number for error reporting
    pub line: usize,
}
