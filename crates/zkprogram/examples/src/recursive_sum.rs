//! # Recursive Sum
//!
//! Accumulates a running total. Each step proves `total = previous + input`
//! on top of a proof of the previous total; the first step starts from a dummy
//! proof that is not verified. Two totals can be merged into one proof.

use std::rc::Rc;

use anyhow::{ensure, Result};
use reference_backend::ReferenceBackend;
use zkprogram::{Arg, MaxProofsVerified, Proof, Scalar, TypeDescriptor, ZkProgram};

pub type SumProgram = ZkProgram<Scalar, Scalar, ReferenceBackend>;

pub fn sum_program(backend: Rc<ReferenceBackend>) -> SumProgram {
    ZkProgram::new("RecursiveSum", backend)
        .method(
            "step",
            vec![TypeDescriptor::SelfProof, TypeDescriptor::witness::<bool>()],
            |input, args| {
                let is_first = args[1].get::<bool>()?;
                let previous = args[0].as_proof_mut()?;
                previous.verify_if(!is_first);
                let total = previous.public_output::<Scalar>()?;
                Ok(if is_first { input } else { total + input })
            },
        )
        .method(
            "merge",
            vec![TypeDescriptor::SelfProof, TypeDescriptor::SelfProof],
            |_input, args| {
                let mut total = Scalar::zero();
                for arg in args.iter_mut() {
                    let proof = arg.as_proof_mut()?;
                    proof.verify();
                    total += proof.public_output::<Scalar>()?;
                }
                Ok(total)
            },
        )
}

/// Prove the running total of `values`
pub async fn prove_sum(program: &SumProgram, values: &[u64]) -> zkprogram::Result<Proof> {
    let mut proof = program.dummy_proof(Scalar::zero(), Scalar::zero(), MaxProofsVerified::Two)?;
    for (i, value) in values.iter().enumerate() {
        proof = program
            .prove(
                "step",
                Scalar::from(*value),
                vec![Arg::Proof(proof), Arg::witness(i == 0)],
            )
            .await?;
    }
    Ok(proof)
}

pub async fn run() -> Result<()> {
    let program = sum_program(crate::backend());
    let key = program.compile().await?;
    tracing::info!(vk = %key.data, "RecursiveSum compiled");

    let left = prove_sum(&program, &[1, 2, 3]).await?;
    let right = prove_sum(&program, &[10, 20]).await?;
    let merged = program
        .prove("merge", Scalar::zero(), vec![Arg::Proof(left), Arg::Proof(right)])
        .await?;

    ensure!(program.verify(&merged).await?, "merged proof does not verify");
    ensure!(
        merged.public_output::<Scalar>()? == Scalar::from(36u64),
        "unexpected total"
    );
    tracing::info!(json = %merged.to_json()?.to_json_string()?, "merged sum proof");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn test_running_total() {
        let program = sum_program(crate::backend());
        block_on(program.compile()).unwrap();
        assert_eq!(program.max_proofs_verified().unwrap(), MaxProofsVerified::Two);

        let proof = block_on(prove_sum(&program, &[4, 5])).unwrap();
        assert_eq!(proof.public_output::<Scalar>().unwrap(), Scalar::from(9u64));
        assert_eq!(proof.public_input::<Scalar>().unwrap(), Scalar::from(5u64));
        assert!(block_on(program.verify(&proof)).unwrap());
    }

    #[test]
    fn test_run() {
        block_on(run()).unwrap();
    }
}
