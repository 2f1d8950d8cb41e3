//! Property-based tests for method interfaces and proving

use std::rc::Rc;

use futures::executor::block_on;
use proptest::prelude::*;
use reference_backend::ReferenceBackend;

use crate::method_interface::{sort_method_arguments, ArgKind, TypeDescriptor};
use crate::{Arg, Proof, ProgramTag, ProofClass, Scalar, ZkProgram, ZkProgramError};

fn descriptor(code: u8) -> TypeDescriptor {
    match code % 4 {
        0 => TypeDescriptor::witness::<Scalar>(),
        1 => TypeDescriptor::witness::<u64>(),
        2 => TypeDescriptor::Generic,
        _ => TypeDescriptor::SelfProof,
    }
}

fn kind(code: u8) -> ArgKind {
    match code % 4 {
        0 | 1 => ArgKind::Witness,
        2 => ArgKind::Generic,
        _ => ArgKind::Proof,
    }
}

/// Sorting keeps declaration order and rejects more than two proofs
proptest! {
    #[test]
    fn test_sort_preserves_declaration_order(codes in prop::collection::vec(any::<u8>(), 0..8)) {
        let self_class = ProofClass::new::<Scalar, Scalar>(ProgramTag::new("Sorted"));
        let inputs: Vec<TypeDescriptor> = codes.iter().map(|c| descriptor(*c)).collect();
        let proofs = codes.iter().filter(|c| kind(**c) == ArgKind::Proof).count();

        match sort_method_arguments("Sorted", "m", &inputs, &self_class) {
            Ok(intf) => {
                prop_assert!(proofs <= 2);
                prop_assert_eq!(intf.all_args.len(), codes.len());
                for (slot, code) in intf.all_args.iter().zip(&codes) {
                    prop_assert_eq!(slot.kind, kind(*code));
                }
                prop_assert_eq!(intf.proof_args.len(), proofs);
                prop_assert_eq!(intf.max_proofs_verified().count(), proofs);
            }
            Err(err) => {
                prop_assert!(proofs > 2);
                let is_too_many = matches!(err, ZkProgramError::TooManyProofArguments { .. });
                prop_assert!(is_too_many);
            }
        }
    }
}

/// Synthesized arguments always type-check against their interface
proptest! {
    #[test]
    fn test_synthesized_arguments_fit_interface(codes in prop::collection::vec(0u8..3, 0..6)) {
        let self_class = ProofClass::new::<Scalar, Scalar>(ProgramTag::new("Synth"));
        let inputs: Vec<TypeDescriptor> = codes.iter().map(|c| descriptor(*c)).collect();
        let intf = sort_method_arguments("Synth", "m", &inputs, &self_class)?;
        let args = intf.synthesize_arguments()?;
        let fields = intf.arguments_to_fields(&args)?;
        let witnesses = codes.iter().filter(|c| kind(**c) == ArgKind::Witness).count();
        prop_assert_eq!(fields.len(), witnesses);
        prop_assert!(fields.iter().all(|f| *f == Scalar::zero()));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Proved outputs match the method and survive the JSON round trip
    #[test]
    fn test_prove_add_and_round_trip(a in any::<u32>(), b in any::<u32>()) {
        let program: ZkProgram<u64, u64, ReferenceBackend> =
            ZkProgram::new("Adder", Rc::new(ReferenceBackend::default())).method(
                "add",
                vec![TypeDescriptor::witness::<u64>()],
                |input, args| Ok(input + args[0].get::<u64>()?),
            );
        block_on(program.compile())?;

        let proof = block_on(program.prove("add", a as u64, vec![Arg::witness(b as u64)]))?;
        prop_assert_eq!(proof.public_output::<u64>()?, a as u64 + b as u64);

        let decoded = Proof::from_json(&program.self_proof_class(), &proof.to_json()?)?;
        prop_assert_eq!(decoded.public_fields(), proof.public_fields());
        prop_assert!(block_on(program.verify(&decoded))?);
    }
}
