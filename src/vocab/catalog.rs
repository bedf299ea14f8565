//! Declarative device, net and pin-edge catalog.
//!
//! Every component that touches tokens (vocabulary, encoder, grammar,
//! decoder, renamer, netlist builder) reads these tables; nothing else
//! enumerates devices or labels on its own.

use std::fmt;

use crate::circuit::{DeviceFamily, DeviceType, NetCategory, PinSet};

/// One device type with its index range.
#[derive(Debug, Clone, Copy)]
pub struct DeviceRecord {
    pub device_type: DeviceType,
    pub prefix: &'static str,
    pub family: DeviceFamily,
    pub min_index: u16,
    pub max_index: u16,
}

/// Device catalog, in vocabulary order.
pub const DEVICE_CATALOG: [DeviceRecord; 8] = [
    DeviceRecord { device_type: DeviceType::Nmos, prefix: "NM", family: DeviceFamily::Mosfet, min_index: 1, max_index: 35 },
    DeviceRecord { device_type: DeviceType::Pmos, prefix: "PM", family: DeviceFamily::Mosfet, min_index: 1, max_index: 35 },
    DeviceRecord { device_type: DeviceType::Npn, prefix: "NPN", family: DeviceFamily::Bjt, min_index: 1, max_index: 27 },
    DeviceRecord { device_type: DeviceType::Pnp, prefix: "PNP", family: DeviceFamily::Bjt, min_index: 1, max_index: 27 },
    DeviceRecord { device_type: DeviceType::Resistor, prefix: "R", family: DeviceFamily::Resistor, min_index: 1, max_index: 28 },
    DeviceRecord { device_type: DeviceType::Capacitor, prefix: "C", family: DeviceFamily::Capacitor, min_index: 1, max_index: 16 },
    DeviceRecord { device_type: DeviceType::Inductor, prefix: "L", family: DeviceFamily::Inductor, min_index: 1, max_index: 24 },
    DeviceRecord { device_type: DeviceType::Diode, prefix: "DIO", family: DeviceFamily::Diode, min_index: 1, max_index: 8 },
];

pub fn device_record(device_type: DeviceType) -> &'static DeviceRecord {
    // Catalog order matches enum declaration order
    &DEVICE_CATALOG[device_type as usize]
}

/// One net category. `bare` nets have an unindexed token (`VSS`, `VOUT`);
/// `indices` lists the indexed range, if any.
#[derive(Debug, Clone, Copy)]
pub struct NetRecord {
    pub category: NetCategory,
    pub prefix: &'static str,
    pub bare: bool,
    pub indices: Option<(u16, u16)>,
}

impl NetRecord {
    /// Number of indexed tokens in this category.
    pub fn capacity(&self) -> usize {
        self.indices.map(|(lo, hi)| (hi - lo + 1) as usize).unwrap_or(0)
    }
}

/// Net catalog, in vocabulary order.
pub const NET_CATALOG: [NetRecord; 17] = [
    NetRecord { category: NetCategory::Vss, prefix: "VSS", bare: true, indices: None },
    NetRecord { category: NetCategory::Vdd, prefix: "VDD", bare: true, indices: None },
    NetRecord { category: NetCategory::Internal, prefix: "NET", bare: false, indices: Some((1, 50)) },
    NetRecord { category: NetCategory::Vin, prefix: "VIN", bare: false, indices: Some((1, 20)) },
    NetRecord { category: NetCategory::Vout, prefix: "VOUT", bare: true, indices: Some((1, 7)) },
    NetRecord { category: NetCategory::Iin, prefix: "IIN", bare: false, indices: Some((1, 3)) },
    NetRecord { category: NetCategory::Iout, prefix: "IOUT", bare: false, indices: Some((1, 5)) },
    NetRecord { category: NetCategory::Vb, prefix: "VB", bare: false, indices: Some((1, 11)) },
    NetRecord { category: NetCategory::Ib, prefix: "IB", bare: false, indices: Some((1, 7)) },
    NetRecord { category: NetCategory::Vcont, prefix: "VCONT", bare: false, indices: Some((1, 21)) },
    NetRecord { category: NetCategory::Vcm, prefix: "VCM", bare: false, indices: Some((1, 3)) },
    NetRecord { category: NetCategory::Vref, prefix: "VREF", bare: false, indices: Some((1, 3)) },
    NetRecord { category: NetCategory::Iref, prefix: "IREF", bare: false, indices: Some((1, 3)) },
    NetRecord { category: NetCategory::Vrf, prefix: "VRF", bare: false, indices: Some((1, 3)) },
    NetRecord { category: NetCategory::Vif, prefix: "VIF", bare: false, indices: Some((1, 3)) },
    NetRecord { category: NetCategory::Vlo, prefix: "VLO", bare: false, indices: Some((1, 5)) },
    NetRecord { category: NetCategory::Vbb, prefix: "VBB", bare: false, indices: Some((1, 5)) },
];

pub fn net_record(category: NetCategory) -> &'static NetRecord {
    &NET_CATALOG[category as usize]
}

/// One legal pin-edge label: which family it belongs to and which pins it
/// ties to a single net.
#[derive(Debug, Clone, Copy)]
pub struct PinEdgeRecord {
    pub label: &'static str,
    pub family: DeviceFamily,
    pub pins: &'static str,
}

const fn edge(label: &'static str, family: DeviceFamily, pins: &'static str) -> PinEdgeRecord {
    PinEdgeRecord { label, family, pins }
}

/// Compound-label legality table. A label is legal exactly when it appears
/// here; the first entry for a pin set is the canonical spelling.
pub const PIN_EDGE_TABLE: [PinEdgeRecord; 29] = [
    edge("M_B", DeviceFamily::Mosfet, "B"),
    edge("M_D", DeviceFamily::Mosfet, "D"),
    edge("M_G", DeviceFamily::Mosfet, "G"),
    edge("M_S", DeviceFamily::Mosfet, "S"),
    edge("M_BD", DeviceFamily::Mosfet, "BD"),
    edge("M_BG", DeviceFamily::Mosfet, "BG"),
    edge("M_BS", DeviceFamily::Mosfet, "BS"),
    edge("M_DG", DeviceFamily::Mosfet, "DG"),
    edge("M_DS", DeviceFamily::Mosfet, "DS"),
    edge("M_GS", DeviceFamily::Mosfet, "GS"),
    edge("M_BDG", DeviceFamily::Mosfet, "BDG"),
    edge("M_BDS", DeviceFamily::Mosfet, "BDS"),
    edge("M_BGS", DeviceFamily::Mosfet, "BGS"),
    edge("M_DGS", DeviceFamily::Mosfet, "DGS"),
    edge("M_BDGS", DeviceFamily::Mosfet, "BDGS"),
    edge("B_B", DeviceFamily::Bjt, "B"),
    edge("B_C", DeviceFamily::Bjt, "C"),
    edge("B_E", DeviceFamily::Bjt, "E"),
    edge("B_BC", DeviceFamily::Bjt, "BC"),
    edge("B_BE", DeviceFamily::Bjt, "BE"),
    edge("B_CE", DeviceFamily::Bjt, "CE"),
    edge("B_BCE", DeviceFamily::Bjt, "BCE"),
    edge("R_C", DeviceFamily::Resistor, "C"),
    edge("C_C", DeviceFamily::Capacitor, "C"),
    edge("L_C", DeviceFamily::Inductor, "C"),
    edge("D_P", DeviceFamily::Diode, "P"),
    edge("D_N", DeviceFamily::Diode, "N"),
    edge("D_NP", DeviceFamily::Diode, "NP"),
    // Legacy spelling kept for corpus compatibility; decodes like D_NP
    edge("D_PN", DeviceFamily::Diode, "PN"),
];

/// A pin-edge label: an index into [`PIN_EDGE_TABLE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PinLabel(u8);

impl PinLabel {
    /// All labels in table order.
    pub fn all() -> impl Iterator<Item = PinLabel> {
        (0..PIN_EDGE_TABLE.len() as u8).map(PinLabel)
    }

    fn record(&self) -> &'static PinEdgeRecord {
        &PIN_EDGE_TABLE[self.0 as usize]
    }

    pub fn name(&self) -> &'static str {
        self.record().label
    }

    pub fn family(&self) -> DeviceFamily {
        self.record().family
    }

    /// Pins this label ties to one net.
    pub fn pins(&self) -> PinSet {
        let record = self.record();
        // Table entries are checked by the catalog tests
        PinSet::from_letters(record.family, record.pins).unwrap_or(PinSet::EMPTY)
    }

    /// Canonical label for a pin set of a family, if the table has one.
    pub fn for_pins(family: DeviceFamily, pins: PinSet) -> Option<PinLabel> {
        Self::all().find(|label| label.family() == family && label.pins() == pins)
    }

    /// Look a label up by name.
    pub fn from_name(name: &str) -> Option<PinLabel> {
        Self::all().find(|label| label.name() == name)
    }
}

impl fmt::Display for PinLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_order_matches_enums() {
        for (i, record) in DEVICE_CATALOG.iter().enumerate() {
            assert_eq!(record.device_type as usize, i);
        }
        for (i, record) in NET_CATALOG.iter().enumerate() {
            assert_eq!(record.category as usize, i);
        }
    }

    #[test]
    fn test_every_label_is_well_formed() {
        for label in PinLabel::all() {
            let family = label.family();
            assert!(!label.pins().is_empty(), "{} has no pins", label);
            assert!(label.name().starts_with(family.edge_prefix()));
        }
    }

    #[test]
    fn test_every_pin_subset_has_a_label() {
        for family in DeviceFamily::ALL {
            let full = family.all_pins().0;
            for mask in 1..=full {
                let label = PinLabel::for_pins(family, PinSet(mask)).unwrap();
                assert_eq!(label.pins(), PinSet(mask));
            }
        }
    }

    #[test]
    fn test_canonical_diode_label() {
        let both = PinSet::from_letters(DeviceFamily::Diode, "NP").unwrap();
        assert_eq!(PinLabel::for_pins(DeviceFamily::Diode, both).unwrap().name(), "D_NP");
        assert_eq!(PinLabel::from_name("D_PN").unwrap().pins(), both);
    }
}
