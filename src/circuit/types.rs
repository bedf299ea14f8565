//! Core types for circuit representation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TopoSeqError};
use crate::vocab::catalog;

/// Electrical family of a device type. The family decides which pins a
/// device has and which pin-edge labels may touch it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeviceFamily {
    /// MOS transistor (drain, gate, source, bulk)
    Mosfet,
    /// Bipolar transistor (collector, base, emitter)
    Bjt,
    /// Diode (anode P, cathode N)
    Diode,
    /// Resistor
    Resistor,
    /// Capacitor
    Capacitor,
    /// Inductor
    Inductor,
}

impl DeviceFamily {
    /// All families, in catalog order.
    pub const ALL: [DeviceFamily; 6] = [
        Self::Mosfet,
        Self::Bjt,
        Self::Diode,
        Self::Resistor,
        Self::Capacitor,
        Self::Inductor,
    ];

    /// Pin letters in alphabetical order. Bit `i` of a [`PinSet`] refers
    /// to `pins()[i]`.
    pub fn pins(&self) -> &'static [char] {
        match self {
            Self::Mosfet => &['B', 'D', 'G', 'S'],
            Self::Bjt => &['B', 'C', 'E'],
            Self::Diode => &['N', 'P'],
            // Both terminals of a passive share the label `C`
            Self::Resistor | Self::Capacitor | Self::Inductor => &['C'],
        }
    }

    /// Prefix of this family's pin-edge labels (`M` in `M_DG`).
    pub fn edge_prefix(&self) -> &'static str {
        match self {
            Self::Mosfet => "M",
            Self::Bjt => "B",
            Self::Diode => "D",
            Self::Resistor => "R",
            Self::Capacitor => "C",
            Self::Inductor => "L",
        }
    }

    /// Two-terminal passives have interchangeable terminals and must reach
    /// two distinct nets instead of naming pins.
    pub fn is_two_terminal(&self) -> bool {
        matches!(self, Self::Resistor | Self::Capacitor | Self::Inductor)
    }

    /// The set of every pin this family has.
    pub fn all_pins(&self) -> PinSet {
        PinSet((1u8 << self.pins().len()) - 1)
    }
}

impl fmt::Display for DeviceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mosfet => "MOSFET",
            Self::Bjt => "BJT",
            Self::Diode => "diode",
            Self::Resistor => "resistor",
            Self::Capacitor => "capacitor",
            Self::Inductor => "inductor",
        };
        f.write_str(name)
    }
}

/// A set of pins of one device family, stored as a bit mask over
/// [`DeviceFamily::pins`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct PinSet(pub u8);

impl PinSet {
    /// The empty pin set.
    pub const EMPTY: PinSet = PinSet(0);

    /// Parse pin letters (in any order) for the given family.
    pub fn from_letters(family: DeviceFamily, letters: &str) -> Option<Self> {
        let pins = family.pins();
        let mut mask = 0u8;
        for ch in letters.chars() {
            let bit = pins.iter().position(|&p| p == ch)?;
            mask |= 1 << bit;
        }
        if mask == 0 {
            None
        } else {
            Some(PinSet(mask))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn union(self, other: PinSet) -> PinSet {
        PinSet(self.0 | other.0)
    }

    pub fn intersection(self, other: PinSet) -> PinSet {
        PinSet(self.0 & other.0)
    }

    pub fn difference(self, other: PinSet) -> PinSet {
        PinSet(self.0 & !other.0)
    }

    pub fn is_subset(&self, other: PinSet) -> bool {
        self.0 & !other.0 == 0
    }

    /// Pin letters of this set in alphabetical order.
    pub fn letters(&self, family: DeviceFamily) -> String {
        family
            .pins()
            .iter()
            .enumerate()
            .filter(|(bit, _)| self.0 & (1 << bit) != 0)
            .map(|(_, &ch)| ch)
            .collect()
    }

    /// Iterate over single-pin subsets.
    pub fn iter(&self) -> impl Iterator<Item = PinSet> + '_ {
        (0..8u8).filter(move |bit| self.0 & (1 << bit) != 0).map(|bit| PinSet(1 << bit))
    }
}

/// Device types of the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeviceType {
    /// N-channel MOSFET (`NM`)
    Nmos,
    /// P-channel MOSFET (`PM`)
    Pmos,
    /// NPN bipolar transistor
    Npn,
    /// PNP bipolar transistor
    Pnp,
    /// Resistor (`R`)
    Resistor,
    /// Capacitor (`C`)
    Capacitor,
    /// Inductor (`L`)
    Inductor,
    /// Diode (`DIO`)
    Diode,
}

impl DeviceType {
    /// Catalog record for this type.
    pub fn record(&self) -> &'static catalog::DeviceRecord {
        catalog::device_record(*self)
    }

    /// Token prefix (`NM`, `PM`, `NPN`, ...).
    pub fn prefix(&self) -> &'static str {
        self.record().prefix
    }

    pub fn family(&self) -> DeviceFamily {
        self.record().family
    }

    /// Number of distinct indices available for this type.
    pub fn capacity(&self) -> usize {
        let record = self.record();
        (record.max_index - record.min_index + 1) as usize
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// A device node: type plus index, e.g. `NM12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId {
    pub device_type: DeviceType,
    pub index: u16,
}

impl DeviceId {
    /// Create a device id, checking the index against the catalog range.
    pub fn new(device_type: DeviceType, index: u16) -> Result<Self> {
        let record = device_type.record();
        if index < record.min_index || index > record.max_index {
            return Err(TopoSeqError::unknown_token(format!("{}{}", record.prefix, index)));
        }
        Ok(Self { device_type, index })
    }

    pub fn family(&self) -> DeviceFamily {
        self.device_type.family()
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.device_type.prefix(), self.index)
    }
}

/// Net categories of the catalog: supply rails, internal nets and ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NetCategory {
    Vss,
    Vdd,
    /// Internal net (`NET1`, `NET2`, ...)
    Internal,
    Vin,
    Vout,
    Iin,
    Iout,
    Vb,
    Ib,
    Vcont,
    Vcm,
    Vref,
    Iref,
    Vrf,
    Vif,
    Vlo,
    Vbb,
}

impl NetCategory {
    pub fn record(&self) -> &'static catalog::NetRecord {
        catalog::net_record(*self)
    }

    pub fn prefix(&self) -> &'static str {
        self.record().prefix
    }

    /// Supply rails are singletons and never renamed.
    pub fn is_rail(&self) -> bool {
        matches!(self, Self::Vss | Self::Vdd)
    }
}

/// A net node: category plus optional index, e.g. `VOUT3`, `VOUT`, `VSS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetId {
    pub category: NetCategory,
    pub index: Option<u16>,
}

impl NetId {
    pub const VSS: NetId = NetId {
        category: NetCategory::Vss,
        index: None,
    };

    pub const VDD: NetId = NetId {
        category: NetCategory::Vdd,
        index: None,
    };

    /// Create a net id, checking the index against the catalog.
    pub fn new(category: NetCategory, index: Option<u16>) -> Result<Self> {
        let record = category.record();
        let valid = match (index, record.indices) {
            (None, _) => record.bare,
            (Some(i), Some((lo, hi))) => i >= lo && i <= hi,
            (Some(_), None) => false,
        };
        if !valid {
            let name = match index {
                Some(i) => format!("{}{}", record.prefix, i),
                None => record.prefix.to_string(),
            };
            return Err(TopoSeqError::unknown_token(name));
        }
        Ok(Self { category, index })
    }

    /// Internal net `NET<index>`.
    pub fn internal(index: u16) -> Result<Self> {
        Self::new(NetCategory::Internal, Some(index))
    }

    pub fn is_internal(&self) -> bool {
        self.category == NetCategory::Internal
    }
}

impl fmt::Display for NetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(i) => write!(f, "{}{}", self.category.prefix(), i),
            None => f.write_str(self.category.prefix()),
        }
    }
}

/// Functional category of a whole circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CircuitType {
    Opamp,
    Ldo,
    BandgapRef,
    PowerConverter,
    Oscillator,
    General,
    Mirror,
    Mixer,
    PowerAmp,
    Pll,
    Filter,
    Comparator,
    VoltageRegulator,
    SwitchedCap,
    AdcDac,
}

impl CircuitType {
    /// All circuit types, in vocabulary order.
    pub const ALL: [CircuitType; 15] = [
        Self::Opamp,
        Self::Ldo,
        Self::BandgapRef,
        Self::PowerConverter,
        Self::Oscillator,
        Self::General,
        Self::Mirror,
        Self::Mixer,
        Self::PowerAmp,
        Self::Pll,
        Self::Filter,
        Self::Comparator,
        Self::VoltageRegulator,
        Self::SwitchedCap,
        Self::AdcDac,
    ];

    /// Token name, e.g. `CIRCUIT_Opamp`.
    pub fn token_name(&self) -> &'static str {
        match self {
            Self::Opamp => "CIRCUIT_Opamp",
            Self::Ldo => "CIRCUIT_LDO",
            Self::BandgapRef => "CIRCUIT_Bandgap_Ref",
            Self::PowerConverter => "CIRCUIT_Power_converter",
            Self::Oscillator => "CIRCUIT_Oscillator",
            Self::General => "CIRCUIT_General",
            Self::Mirror => "CIRCUIT_Mirror",
            Self::Mixer => "CIRCUIT_Mixer",
            Self::PowerAmp => "CIRCUIT_Power_Amp",
            Self::Pll => "CIRCUIT_PLL",
            Self::Filter => "CIRCUIT_Filter",
            Self::Comparator => "CIRCUIT_Comparator",
            Self::VoltageRegulator => "CIRCUIT_Voltage_Regulator",
            Self::SwitchedCap => "CIRCUIT_Switched_Cap",
            Self::AdcDac => "CIRCUIT_ADC_DAC",
        }
    }

    /// Parse either the token name or the bare category (`Opamp`, `LDO`).
    pub fn from_name(name: &str) -> Option<Self> {
        let bare = name.strip_prefix("CIRCUIT_").unwrap_or(name);
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.token_name()["CIRCUIT_".len()..].eq_ignore_ascii_case(bare))
    }
}

impl fmt::Display for CircuitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_set_letters_are_alphabetical() {
        let pins = PinSet::from_letters(DeviceFamily::Mosfet, "GD").unwrap();
        assert_eq!(pins.letters(DeviceFamily::Mosfet), "DG");
        assert_eq!(pins.len(), 2);
        assert!(pins.is_subset(DeviceFamily::Mosfet.all_pins()));
    }

    #[test]
    fn test_pin_set_rejects_foreign_pins() {
        assert!(PinSet::from_letters(DeviceFamily::Bjt, "G").is_none());
        assert!(PinSet::from_letters(DeviceFamily::Diode, "").is_none());
    }

    #[test]
    fn test_device_id_range() {
        assert!(DeviceId::new(DeviceType::Nmos, 35).is_ok());
        assert!(DeviceId::new(DeviceType::Nmos, 36).is_err());
        assert!(DeviceId::new(DeviceType::Diode, 0).is_err());
        assert_eq!(DeviceId::new(DeviceType::Npn, 3).unwrap().to_string(), "NPN3");
    }

    #[test]
    fn test_net_id_forms() {
        assert_eq!(NetId::VSS.to_string(), "VSS");
        assert!(NetId::new(NetCategory::Vout, None).is_ok());
        assert!(NetId::new(NetCategory::Vin, None).is_err());
        assert!(NetId::new(NetCategory::Vdd, Some(1)).is_err());
        assert_eq!(NetId::internal(7).unwrap().to_string(), "NET7");
    }

    #[test]
    fn test_circuit_type_names() {
        assert_eq!(CircuitType::from_name("CIRCUIT_LDO"), Some(CircuitType::Ldo));
        assert_eq!(CircuitType::from_name("opamp"), Some(CircuitType::Opamp));
        assert_eq!(CircuitType::from_name("Toaster"), None);
    }
}
