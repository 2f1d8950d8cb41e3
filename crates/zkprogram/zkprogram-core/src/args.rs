//! Method argument values

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::provable::{Provable, WitnessValue};
use crate::proof::Proof;
use crate::{Result, ZkProgramError};

/// An opaque argument the circuit does not constrain
#[derive(Clone, Default)]
pub struct GenericValue {
    value: Option<Rc<dyn Any>>,
}

impl GenericValue {
    pub fn new<T: Any>(value: T) -> Self {
        Self {
            value: Some(Rc::new(value)),
        }
    }

    /// Marker passed when no value is available (compile, analyze)
    pub fn empty() -> Self {
        Self { value: None }
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }

    pub fn get<T: Any>(&self) -> Option<&T> {
        self.value.as_ref().and_then(|value| value.downcast_ref::<T>())
    }
}

impl fmt::Debug for GenericValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericValue")
            .field("is_empty", &self.is_empty())
            .finish()
    }
}

/// One private input of a method call
#[derive(Clone, Debug)]
pub enum Arg {
    Witness(WitnessValue),
    Proof(Proof),
    Generic(GenericValue),
}

impl Arg {
    pub fn witness<T: Provable>(value: T) -> Self {
        Arg::Witness(WitnessValue::new(value))
    }

    pub fn generic<T: Any>(value: T) -> Self {
        Arg::Generic(GenericValue::new(value))
    }

    /// Typed witness value
    pub fn get<T: Provable>(&self) -> Result<T> {
        match self {
            Arg::Witness(value) => value.get(),
            other => Err(ZkProgramError::TypeMismatch {
                expected: std::any::type_name::<T>().to_string(),
                actual: other.kind().to_string(),
            }),
        }
    }

    pub fn as_proof(&self) -> Result<&Proof> {
        match self {
            Arg::Proof(proof) => Ok(proof),
            other => Err(kind_mismatch("proof", other)),
        }
    }

    pub fn as_proof_mut(&mut self) -> Result<&mut Proof> {
        match self {
            Arg::Proof(proof) => Ok(proof),
            other => Err(kind_mismatch("proof", other)),
        }
    }

    pub fn as_generic(&self) -> Result<&GenericValue> {
        match self {
            Arg::Generic(value) => Ok(value),
            other => Err(kind_mismatch("generic", other)),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Arg::Witness(_) => "witness",
            Arg::Proof(_) => "proof",
            Arg::Generic(_) => "generic",
        }
    }
}

fn kind_mismatch(expected: &str, actual: &Arg) -> ZkProgramError {
    ZkProgramError::TypeMismatch {
        expected: expected.to_string(),
        actual: actual.kind().to_string(),
    }
}

impl From<Proof> for Arg {
    fn from(proof: Proof) -> Self {
        Arg::Proof(proof)
    }
}

impl From<WitnessValue> for Arg {
    fn from(value: WitnessValue) -> Self {
        Arg::Witness(value)
    }
}
