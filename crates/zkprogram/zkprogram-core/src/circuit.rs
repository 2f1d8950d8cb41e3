//! Circuit gadgets and constraint recording
//!
//! Gadgets check their relation on concrete values and, when a constraint log
//! is active, append the gates they would emit. In compile and analyze mode the
//! inputs are placeholders, so only the gates are recorded.

use merlin::Transcript;
use serde::{Deserialize, Serialize};

use crate::context::{Channel, ContextStack};
use crate::feature_flags::FeatureFlags;
use crate::provable::{empty_value, Provable, WitnessType, WitnessValue};
use crate::snark_context::in_compile_mode;
use crate::{Result, Scalar, ZkProgramError};

/// Gate kinds of the constraint system
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GateType {
    Zero,
    Generic,
    Equality,
    RangeCheck0,
    RangeCheck1,
    ForeignFieldAdd,
    ForeignFieldMul,
    Xor16,
    Rot64,
    Lookup,
}

impl GateType {
    fn tag(self) -> u8 {
        match self {
            GateType::Zero => 0,
            GateType::Generic => 1,
            GateType::Equality => 2,
            GateType::RangeCheck0 => 3,
            GateType::RangeCheck1 => 4,
            GateType::ForeignFieldAdd => 5,
            GateType::ForeignFieldMul => 6,
            GateType::Xor16 => 7,
            GateType::Rot64 => 8,
            GateType::Lookup => 9,
        }
    }
}

/// One row of the constraint system
#[derive(Clone, Debug, PartialEq)]
pub struct Gate {
    pub gate_type: GateType,
    pub coefficients: Vec<Scalar>,
}

impl Gate {
    pub fn new(gate_type: GateType, coefficients: Vec<Scalar>) -> Self {
        Self {
            gate_type,
            coefficients,
        }
    }
}

/// Gates and witness count collected while a circuit body runs
#[derive(Clone, Debug, Default)]
pub struct ConstraintLog {
    pub gates: Vec<Gate>,
    pub witness_count: usize,
}

thread_local! {
    static CONSTRAINT_LOG: ContextStack<ConstraintLog> = ContextStack::new("constraint-log");
}

fn constraint_log() -> Channel<ConstraintLog> {
    Channel::new(&CONSTRAINT_LOG)
}

fn record(f: impl FnOnce(&mut ConstraintLog)) {
    let log = constraint_log();
    if log.has() {
        // Only fails without a frame, which `has` just excluded
        let _ = log.update(f);
    }
}

fn has_values() -> bool {
    !in_compile_mode()
}

/// Shape of a synthesized circuit
#[derive(Clone, Debug, PartialEq)]
pub struct ConstraintSystemSummary {
    pub rows: usize,
    pub witness_count: usize,
    pub gates: Vec<Gate>,
    /// Hex digest over the gate list
    pub digest: String,
}

impl ConstraintSystemSummary {
    fn from_log(log: ConstraintLog) -> Self {
        let mut transcript = Transcript::new(b"zkprogram-constraint-system");
        transcript.append_u64(b"rows", log.gates.len() as u64);
        for gate in &log.gates {
            transcript.append_message(b"gate", &[gate.gate_type.tag()]);
            for coefficient in &gate.coefficients {
                transcript.append_message(b"coeff", &coefficient.to_bytes());
            }
        }
        let mut digest = [0u8; 32];
        transcript.challenge_bytes(b"digest", &mut digest);

        Self {
            rows: log.gates.len(),
            witness_count: log.witness_count,
            gates: log.gates,
            digest: hex::encode(digest),
        }
    }

    pub fn feature_flags(&self) -> FeatureFlags {
        FeatureFlags::from_gates(&self.gates)
    }

    /// Number of gates per kind, sorted by kind
    pub fn gate_counts(&self) -> Vec<(GateType, usize)> {
        let mut counts: Vec<(GateType, usize)> = Vec::new();
        let mut types: Vec<GateType> = self.gates.iter().map(|g| g.gate_type).collect();
        types.sort();
        for ty in types {
            match counts.last_mut() {
                Some((last, n)) if *last == ty => *n += 1,
                _ => counts.push((ty, 1)),
            }
        }
        counts
    }
}

/// Run `f` and collect the constraints it emits
pub fn constraint_system<R>(f: impl FnOnce() -> Result<R>) -> Result<(R, ConstraintSystemSummary)> {
    let (result, log) = constraint_log().run_with(ConstraintLog::default(), f)?;
    let summary = ConstraintSystemSummary::from_log(log);
    tracing::debug!(rows = summary.rows, digest = %summary.digest, "constraint system synthesized");
    Ok((result?, summary))
}

/// Introduce a witness computed by `compute`
pub fn witness<T: Provable>(compute: impl FnOnce() -> Result<T>) -> Result<T> {
    let value = compute()?;
    record(|log| log.witness_count += T::size_in_fields());
    Ok(value)
}

/// Type-erased [`witness`]: the computed value must be of type `ty`
pub fn witness_value(
    ty: &WitnessType,
    compute: impl FnOnce() -> Result<WitnessValue>,
) -> Result<WitnessValue> {
    let value = compute()?;
    ty.check(&value)?;
    record(|log| log.witness_count += ty.size_in_fields());
    Ok(value)
}

/// Introduce a witness without a value
pub fn empty_witness<T: Provable>() -> Result<T> {
    witness(empty_value::<T>)
}

/// Constrain two values to be equal field by field
pub fn assert_equals<T: Provable>(left: &T, right: &T) -> Result<()> {
    let neg_one = -Scalar::one();
    record(|log| {
        for _ in 0..T::size_in_fields() {
            log.gates
                .push(Gate::new(GateType::Equality, vec![Scalar::one(), neg_one]));
        }
    });
    if has_values() && left.to_fields() != right.to_fields() {
        return Err(ZkProgramError::Unsatisfied(format!(
            "assert_equals: {:?} != {:?}",
            left, right
        )));
    }
    Ok(())
}

/// Constrain a boolean to be true
pub fn assert_true(condition: bool, message: &str) -> Result<()> {
    record(|log| {
        log.gates
            .push(Gate::new(GateType::Generic, vec![Scalar::one(), -Scalar::one()]))
    });
    if has_values() && !condition {
        return Err(ZkProgramError::Unsatisfied(message.to_string()));
    }
    Ok(())
}

/// Constrain a field element to fit in 64 bits
pub fn range_check_64(value: &Scalar) -> Result<()> {
    record(|log| {
        log.gates.push(Gate::new(GateType::RangeCheck0, Vec::new()));
        log.gates.push(Gate::new(GateType::Zero, Vec::new()));
    });
    if has_values() && u64::from_fields(&[*value], &Vec::new()).is_err() {
        return Err(ZkProgramError::Unsatisfied(
            "range_check_64: value does not fit in 64 bits".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snark_context::{snark_context, SnarkContext};

    #[test]
    fn test_gadgets_check_concrete_values() {
        assert!(assert_equals(&Scalar::from(1u64), &Scalar::from(1u64)).is_ok());
        assert!(matches!(
            assert_equals(&Scalar::from(1u64), &Scalar::from(2u64)),
            Err(ZkProgramError::Unsatisfied(_))
        ));
        assert!(assert_true(false, "nope").is_err());
        assert!(range_check_64(&Scalar::from(u64::MAX)).is_ok());
        assert!(range_check_64(&(Scalar::from(u64::MAX) + Scalar::one())).is_err());
    }

    #[test]
    fn test_compile_mode_skips_checks() {
        let (result, _) = snark_context()
            .run_with(SnarkContext::compile(), || {
                assert_equals(&Scalar::from(1u64), &Scalar::from(2u64))
            })
            .unwrap();
        assert!(result.is_ok());
    }

    #[test]
    fn test_constraint_system_records_gates() {
        let ((), summary) = constraint_system(|| {
            let x = witness(|| Ok(Scalar::from(5u64)))?;
            assert_equals(&x, &Scalar::from(5u64))?;
            range_check_64(&x)
        })
        .unwrap();

        assert_eq!(summary.rows, 3);
        assert_eq!(summary.witness_count, 1);
        assert_eq!(summary.feature_flags().range_check0, Some(true));
        assert_eq!(
            summary.gate_counts(),
            vec![
                (GateType::Zero, 1),
                (GateType::Equality, 1),
                (GateType::RangeCheck0, 1)
            ]
        );
    }

    #[test]
    fn test_digest_depends_on_gates() {
        let (_, a) = constraint_system(|| assert_true(true, "")).unwrap();
        let (_, b) = constraint_system(|| assert_true(true, "")).unwrap();
        let (_, c) = constraint_system(|| range_check_64(&Scalar::zero())).unwrap();
        assert_eq!(a.digest, b.digest);
        assert_ne!(a.digest, c.digest);
        assert_eq!(a.digest.len(), 64);
    }

    #[test]
    fn test_witness_value_checks_type() {
        let ty = WitnessType::of::<u64>();
        let ((), summary) = constraint_system(|| {
            witness_value(&ty, || Ok(WitnessValue::new(3u64)))?;
            assert!(witness_value(&ty, || Ok(WitnessValue::new(true))).is_err());
            Ok(())
        })
        .unwrap();
        assert_eq!(summary.witness_count, 1);
    }

    #[test]
    fn test_gadgets_outside_a_log_record_nothing() {
        assert!(assert_true(true, "").is_ok());
        assert!(!constraint_log().has());
    }
}
