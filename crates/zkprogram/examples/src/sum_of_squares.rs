//! # Sum of Squares
//!
//! `Square` proves `y = x * x` for a 64-bit `x`. `SumOfSquares` takes two
//! `Square` proofs and proves the sum of their outputs, so `Square` must be
//! compiled before it.

use std::rc::Rc;

use anyhow::{ensure, Result};
use reference_backend::ReferenceBackend;
use zkprogram::circuit::{assert_equals, range_check_64};
use zkprogram::{Arg, Scalar, TypeDescriptor, ZkProgram};

pub type SquareProgram = ZkProgram<Scalar, Scalar, ReferenceBackend>;
pub type SumOfSquaresProgram = ZkProgram<(), Scalar, ReferenceBackend>;

pub fn square_program(backend: Rc<ReferenceBackend>) -> SquareProgram {
    ZkProgram::new("Square", backend).method(
        "square",
        vec![TypeDescriptor::witness::<Scalar>()],
        |x, args| {
            let root = args[0].get::<Scalar>()?;
            assert_equals(&root, &x)?;
            range_check_64(&x)?;
            Ok(x * x)
        },
    )
}

pub fn sum_of_squares_program(square: &SquareProgram) -> SumOfSquaresProgram {
    let class = square.self_proof_class();
    ZkProgram::new("SumOfSquares", Rc::clone(square.backend())).method(
        "add",
        vec![TypeDescriptor::proof(&class), TypeDescriptor::proof(&class)],
        |(), args| {
            let mut sum = Scalar::zero();
            for arg in args.iter_mut() {
                let proof = arg.as_proof_mut()?;
                proof.verify();
                sum += proof.public_output::<Scalar>()?;
            }
            Ok(sum)
        },
    )
}

pub async fn run() -> Result<()> {
    let square = square_program(crate::backend());
    let sum = sum_of_squares_program(&square);

    square.compile().await?;
    sum.compile().await?;

    let three = Scalar::from(3u64);
    let four = Scalar::from(4u64);
    let a = square.prove("square", three, vec![Arg::witness(three)]).await?;
    let b = square.prove("square", four, vec![Arg::witness(four)]).await?;
    let total = sum.prove("add", (), vec![Arg::Proof(a), Arg::Proof(b)]).await?;

    ensure!(sum.verify(&total).await?, "sum proof does not verify");
    ensure!(
        total.public_output::<Scalar>()? == Scalar::from(25u64),
        "unexpected sum"
    );

    let analysis = square.analyze_methods().await?;
    tracing::info!(
        rows = analysis[0].rows,
        digest = %square.digest().await?,
        "Square analyzed"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use zkprogram::ZkProgramError;

    #[test]
    fn test_dependency_must_compile_first() {
        let square = square_program(crate::backend());
        let sum = sum_of_squares_program(&square);
        let err = block_on(sum.compile()).unwrap_err();
        assert!(matches!(err, ZkProgramError::DependencyNotCompiled { .. }));
        assert!(err.to_string().contains("Try to run Square.compile() first"));
    }

    #[test]
    fn test_square_uses_range_check_gate() {
        let square = square_program(crate::backend());
        let analysis = block_on(square.analyze_methods()).unwrap();
        assert_eq!(analysis[0].feature_flags.range_check0, Some(true));
        assert_eq!(analysis[0].feature_flags.xor, Some(false));
    }

    #[test]
    fn test_run() {
        block_on(run()).unwrap();
    }
}
