//! Optional gate kinds a circuit uses
//!
//! Side-loaded proofs are verified against keys that are only known at proving
//! time, so the backend has to be told up front which optional gates such
//! proofs may use. `None` means "maybe": the gate may or may not be present.

use serde::{Deserialize, Serialize};

use crate::circuit::{Gate, GateType};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFlags {
    pub range_check0: Option<bool>,
    pub range_check1: Option<bool>,
    pub foreign_field_add: Option<bool>,
    pub foreign_field_mul: Option<bool>,
    pub xor: Option<bool>,
    pub rot: Option<bool>,
    pub lookup: Option<bool>,
    pub runtime_tables: Option<bool>,
}

impl FeatureFlags {
    fn uniform(value: Option<bool>) -> Self {
        Self {
            range_check0: value,
            range_check1: value,
            foreign_field_add: value,
            foreign_field_mul: value,
            xor: value,
            rot: value,
            lookup: value,
            runtime_tables: value,
        }
    }

    /// No optional gate is used
    pub fn all_none() -> Self {
        Self::uniform(Some(false))
    }

    /// Every optional gate may be used
    pub fn all_maybe() -> Self {
        Self::uniform(None)
    }

    /// Flags enabled by the gates of one circuit
    pub fn from_gates(gates: &[Gate]) -> Self {
        let mut flags = Self::all_none();
        for gate in gates {
            let flag = match gate.gate_type {
                GateType::RangeCheck0 => &mut flags.range_check0,
                GateType::RangeCheck1 => &mut flags.range_check1,
                GateType::ForeignFieldAdd => &mut flags.foreign_field_add,
                GateType::ForeignFieldMul => &mut flags.foreign_field_mul,
                GateType::Xor16 => &mut flags.xor,
                GateType::Rot64 => &mut flags.rot,
                GateType::Lookup => &mut flags.lookup,
                GateType::Zero | GateType::Generic | GateType::Equality => continue,
            };
            *flag = Some(true);
        }
        flags
    }

    /// Canonical byte encoding (0 = false, 1 = true, 2 = maybe)
    pub fn to_bytes(&self) -> [u8; 8] {
        let encode = |flag: Option<bool>| match flag {
            Some(false) => 0u8,
            Some(true) => 1,
            None => 2,
        };
        [
            encode(self.range_check0),
            encode(self.range_check1),
            encode(self.foreign_field_add),
            encode(self.foreign_field_mul),
            encode(self.xor),
            encode(self.rot),
            encode(self.lookup),
            encode(self.runtime_tables),
        ]
    }
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self::all_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_gates() {
        let gates = vec![
            Gate::new(GateType::Generic, Vec::new()),
            Gate::new(GateType::RangeCheck0, Vec::new()),
        ];
        let flags = FeatureFlags::from_gates(&gates);
        assert_eq!(flags.range_check0, Some(true));
        assert_eq!(flags.lookup, Some(false));
    }

    #[test]
    fn test_all_maybe_differs_from_all_none() {
        assert_ne!(FeatureFlags::all_maybe(), FeatureFlags::all_none());
        assert_eq!(FeatureFlags::all_maybe().to_bytes(), [2; 8]);
        assert_eq!(FeatureFlags::default().to_bytes(), [0; 8]);
    }
}
