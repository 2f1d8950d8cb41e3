//! # ZkProgram Benchmarks
//!
//! Fixtures for the criterion benchmarks: a program with a configurable
//! number of range-checked witnesses and a self-recursive counter.
//!
//! ## Usage
//!
//! ```bash
//! cargo bench --bench zkprogram_bench
//! ```

use std::rc::Rc;

use reference_backend::ReferenceBackend;
use zkprogram::circuit::range_check_64;
use zkprogram::{Arg, MaxProofsVerified, Proof, Scalar, TypeDescriptor, ZkProgram};

/// Benchmark configuration parameters
#[derive(Clone, Debug)]
pub struct BenchmarkConfig {
    /// Witness counts to test
    pub sizes: Vec<usize>,
    /// Recursion depths to test
    pub depths: Vec<usize>,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            sizes: vec![1, 8, 32, 128],
            depths: vec![1, 4, 16],
        }
    }
}

pub fn backend() -> Rc<ReferenceBackend> {
    Rc::new(ReferenceBackend::default())
}

/// Program summing `size` range-checked witnesses
pub fn range_sum_program(size: usize) -> ZkProgram<(), Scalar, ReferenceBackend> {
    let inputs = (0..size).map(|_| TypeDescriptor::witness::<Scalar>()).collect();
    ZkProgram::new(format!("RangeSum{}", size), backend()).method(
        "sum",
        inputs,
        |(), args| {
            let mut sum = Scalar::zero();
            for arg in args.iter() {
                let value = arg.get::<Scalar>()?;
                range_check_64(&value)?;
                sum += value;
            }
            Ok(sum)
        },
    )
}

pub fn range_sum_args(size: usize) -> Vec<Arg> {
    (0..size).map(|i| Arg::witness(Scalar::from(i as u64))).collect()
}

/// Self-recursive counter: each step adds one to the previous count
pub fn counter_program() -> ZkProgram<(), Scalar, ReferenceBackend> {
    ZkProgram::new("Counter", backend()).method(
        "increment",
        vec![TypeDescriptor::SelfProof, TypeDescriptor::witness::<bool>()],
        |(), args| {
            let is_first = args[1].get::<bool>()?;
            let previous = args[0].as_proof_mut()?;
            previous.verify_if(!is_first);
            Ok(previous.public_output::<Scalar>()? + Scalar::one())
        },
    )
}

/// Prove `depth` increments starting from a dummy proof
pub async fn prove_counter(
    program: &ZkProgram<(), Scalar, ReferenceBackend>,
    depth: usize,
) -> zkprogram::Result<Proof> {
    let mut proof = program.dummy_proof((), Scalar::zero(), MaxProofsVerified::One)?;
    for i in 0..depth {
        proof = program
            .prove("increment", (), vec![Arg::Proof(proof), Arg::witness(i == 0)])
            .await?;
    }
    Ok(proof)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn test_fixtures_prove() {
        let program = range_sum_program(4);
        block_on(program.compile()).unwrap();
        let proof = block_on(program.prove("sum", (), range_sum_args(4))).unwrap();
        assert_eq!(proof.public_output::<Scalar>().unwrap(), Scalar::from(6u64));

        let counter = counter_program();
        block_on(counter.compile()).unwrap();
        let proof = block_on(prove_counter(&counter, 3)).unwrap();
        assert_eq!(proof.public_output::<Scalar>().unwrap(), Scalar::from(3u64));
    }
}
