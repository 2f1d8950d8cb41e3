//! # Side-loaded Verification
//!
//! `KeyedCheck` verifies a proof whose verification key is a private input.
//! Any program with a `Scalar -> Scalar` statement and no nested proofs can be
//! checked by the same compiled circuit.

use anyhow::{ensure, Result};
use reference_backend::ReferenceBackend;
use zkprogram::{
    Arg, FeatureFlags, MaxProofsVerified, Proof, ProofClass, Scalar, TypeDescriptor,
    VerificationKey, ZkProgram,
};

use crate::sum_of_squares::square_program;

pub type KeyedCheckProgram = ZkProgram<(), Scalar, ReferenceBackend>;

/// Class of the proofs `KeyedCheck` accepts
pub fn sideloaded_class() -> ProofClass {
    ProofClass::dynamic::<Scalar, Scalar>(MaxProofsVerified::Zero, FeatureFlags::all_maybe())
}

pub fn keyed_check_program(class: &ProofClass) -> KeyedCheckProgram {
    ZkProgram::new("KeyedCheck", crate::backend()).method(
        "check",
        vec![
            TypeDescriptor::proof(class),
            TypeDescriptor::witness::<VerificationKey>(),
        ],
        |(), args| {
            let key = args[1].get::<VerificationKey>()?;
            let proof = args[0].as_proof_mut()?;
            proof.verify_with_key(key);
            proof.public_output::<Scalar>()
        },
    )
}

pub async fn run() -> Result<()> {
    let square = square_program(crate::backend());
    let square_key = square.compile().await?;

    let class = sideloaded_class();
    let checker = keyed_check_program(&class);
    checker.compile().await?;

    let seven = Scalar::from(7u64);
    let proof = square.prove("square", seven, vec![Arg::witness(seven)]).await?;
    let dynamic = Proof::from_proof(&class, &proof)?;

    let checked = checker
        .prove("check", (), vec![Arg::Proof(dynamic), Arg::witness(square_key)])
        .await?;
    ensure!(checker.verify(&checked).await?, "checked proof does not verify");
    ensure!(
        checked.public_output::<Scalar>()? == Scalar::from(49u64),
        "unexpected output"
    );
    Ok(())
}
