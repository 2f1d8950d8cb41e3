//! Method interfaces
//!
//! Sorts a method's declared private inputs into witness, proof and generic
//! arguments while remembering where each came from, so that the original call
//! order can be rebuilt inside the circuit.

use std::any::type_name;

use zkprogram_core::{
    Arg, GenericValue, MaxProofsVerified, PreviousProof, Proof, ProofClass, Result, Scalar,
    WitnessType, ZkProgramError,
};

/// Maximum number of proof arguments a method may take
pub const MAX_PROOF_ARGUMENTS: usize = 2;

/// Declared type of one private input
#[derive(Clone, Debug, PartialEq)]
pub enum TypeDescriptor {
    Witness(WitnessType),
    Proof(ProofClass),
    /// A proof of the program the method belongs to
    SelfProof,
    Generic,
    /// A type with none of the capabilities above
    Unsupported(String),
}

impl TypeDescriptor {
    pub fn witness<T: zkprogram_core::Provable>() -> Self {
        TypeDescriptor::Witness(WitnessType::of::<T>())
    }

    pub fn proof(class: &ProofClass) -> Self {
        TypeDescriptor::Proof(class.clone())
    }

    pub fn unsupported<T>() -> Self {
        TypeDescriptor::Unsupported(type_name::<T>().to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArgKind {
    Witness,
    Proof,
    Generic,
}

/// Position of a parameter within its kind
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ArgSlot {
    pub kind: ArgKind,
    pub index: usize,
}

/// Canonical description of a method's private inputs
#[derive(Clone, Debug, PartialEq)]
pub struct MethodInterface {
    pub method_name: String,
    pub witness_args: Vec<WitnessType>,
    pub proof_args: Vec<ProofClass>,
    /// Opaque-marker descriptors of the generic arguments
    pub generic_args: Vec<TypeDescriptor>,
    /// One slot per private input, in declaration order
    pub all_args: Vec<ArgSlot>,
}

/// Classify `private_inputs` in declaration order. Proof-like types win over
/// witness types, which win over generic ones.
pub fn sort_method_arguments(
    program: &str,
    method: &str,
    private_inputs: &[TypeDescriptor],
    self_class: &ProofClass,
) -> Result<MethodInterface> {
    let mut witness_args = Vec::new();
    let mut proof_args = Vec::new();
    let mut generic_args = Vec::new();
    let mut all_args = Vec::with_capacity(private_inputs.len());

    for (i, input) in private_inputs.iter().enumerate() {
        let slot = match input {
            TypeDescriptor::Proof(class) => {
                proof_args.push(class.clone());
                ArgSlot {
                    kind: ArgKind::Proof,
                    index: proof_args.len() - 1,
                }
            }
            TypeDescriptor::SelfProof => {
                proof_args.push(self_class.clone());
                ArgSlot {
                    kind: ArgKind::Proof,
                    index: proof_args.len() - 1,
                }
            }
            TypeDescriptor::Witness(ty) => {
                witness_args.push(ty.clone());
                ArgSlot {
                    kind: ArgKind::Witness,
                    index: witness_args.len() - 1,
                }
            }
            TypeDescriptor::Generic => {
                generic_args.push(input.clone());
                ArgSlot {
                    kind: ArgKind::Generic,
                    index: generic_args.len() - 1,
                }
            }
            TypeDescriptor::Unsupported(type_name) => {
                return Err(ZkProgramError::NotProvableType {
                    method: method.to_string(),
                    position: i + 1,
                    type_name: type_name.clone(),
                });
            }
        };
        all_args.push(slot);
    }

    if proof_args.len() > MAX_PROOF_ARGUMENTS {
        return Err(ZkProgramError::TooManyProofArguments {
            program: program.to_string(),
            method: method.to_string(),
        });
    }

    Ok(MethodInterface {
        method_name: method.to_string(),
        witness_args,
        proof_args,
        generic_args,
        all_args,
    })
}

impl MethodInterface {
    pub fn max_proofs_verified(&self) -> MaxProofsVerified {
        match self.proof_args.len() {
            0 => MaxProofsVerified::Zero,
            1 => MaxProofsVerified::One,
            _ => MaxProofsVerified::Two,
        }
    }

    /// Placeholder arguments: empty witness values, proofs with an empty
    /// statement and no blob, and empty generic markers
    pub fn synthesize_arguments(&self) -> Result<Vec<Arg>> {
        let mut args = Vec::with_capacity(self.all_args.len());
        for slot in &self.all_args {
            let arg = match slot.kind {
                ArgKind::Witness => Arg::Witness(self.witness_args[slot.index].empty_value()?),
                ArgKind::Proof => {
                    let class = &self.proof_args[slot.index];
                    Arg::Proof(Proof::from_values(
                        class.clone(),
                        class.public_input_type().empty_value()?,
                        class.public_output_type().empty_value()?,
                        None,
                        class.max_proofs_verified().unwrap_or(MaxProofsVerified::Zero),
                    )?)
                }
                ArgKind::Generic => Arg::Generic(GenericValue::empty()),
            };
            args.push(arg);
        }
        Ok(args)
    }

    /// Check `args` against the interface and concatenate the field
    /// encodings of the witness arguments and proof statements
    pub fn arguments_to_fields(&self, args: &[Arg]) -> Result<Vec<Scalar>> {
        self.check_count(args)?;
        let mut fields = Vec::new();
        for (slot, arg) in self.all_args.iter().zip(args) {
            match (slot.kind, arg) {
                (ArgKind::Witness, Arg::Witness(value)) => {
                    self.witness_args[slot.index].check(value)?;
                    fields.extend_from_slice(value.to_fields());
                }
                (ArgKind::Proof, Arg::Proof(proof)) => {
                    let class = &self.proof_args[slot.index];
                    class.public_input_type().check(proof.public_input_value())?;
                    class.public_output_type().check(proof.public_output_value())?;
                    fields.extend(proof.public_fields().to_fields());
                }
                (ArgKind::Generic, Arg::Generic(_)) => {}
                (kind, other) => {
                    return Err(ZkProgramError::TypeMismatch {
                        expected: format!("{:?}", kind).to_lowercase(),
                        actual: other.kind().to_string(),
                    })
                }
            }
        }
        Ok(fields)
    }

    /// Statements and blobs of the proof arguments, in proof-argument order
    pub fn previous_proofs(&self, args: &[Arg]) -> Result<Vec<PreviousProof>> {
        self.check_count(args)?;
        let mut previous = Vec::with_capacity(self.proof_args.len());
        for (slot, arg) in self.all_args.iter().zip(args) {
            if slot.kind != ArgKind::Proof {
                continue;
            }
            let proof = arg.as_proof()?;
            let raw = proof.raw().ok_or_else(|| {
                ZkProgramError::Serialization(format!(
                    "proof argument {} of {}() carries no proof",
                    slot.index, self.method_name
                ))
            })?;
            previous.push(PreviousProof {
                statement: proof.public_fields(),
                proof: raw.clone(),
            });
        }
        Ok(previous)
    }

    fn check_count(&self, args: &[Arg]) -> Result<()> {
        if args.len() != self.all_args.len() {
            return Err(ZkProgramError::ArgumentCount {
                method: self.method_name.clone(),
                expected: self.all_args.len(),
                actual: args.len(),
            });
        }
        Ok(())
    }
}
