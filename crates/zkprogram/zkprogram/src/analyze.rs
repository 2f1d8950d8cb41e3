//! Method analysis
//!
//! Runs a method body under `in_analyze` with placeholder inputs and records
//! the constraints it emits. Compilation uses the result to derive each rule's
//! feature flags; the per-method digests feed the program digest.

use std::rc::Rc;

use merlin::Transcript;
use serde::Serialize;
use zkprogram_core::circuit::{constraint_system, GateType};
use zkprogram_core::snark_context::{snark_context, SnarkContext};
use zkprogram_core::{FeatureFlags, Provable, Result, Scalar};

use crate::method_interface::MethodInterface;
use crate::rule::{execute_method, MethodBody};

/// Constraint summary of one method
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MethodAnalysis {
    pub method: String,
    pub rows: usize,
    pub witness_count: usize,
    pub gate_counts: Vec<(GateType, usize)>,
    pub digest: String,
    /// Tags of the classes of the proofs the method declared, in declaration
    /// order
    pub proofs: Vec<String>,
    pub feature_flags: FeatureFlags,
}

pub fn analyze_method<I: Provable, O: Provable>(
    interface: &Rc<MethodInterface>,
    body: &MethodBody<I, O>,
) -> Result<MethodAnalysis> {
    let public_input = vec![Scalar::zero(); I::size_in_fields()];
    let previous_statements: Vec<Vec<Scalar>> = interface
        .proof_args
        .iter()
        .map(|class| {
            let (input, output) = class.statement_size();
            vec![Scalar::zero(); input + output]
        })
        .collect();

    let (result, _) = snark_context().run_with(SnarkContext::analyze(), || {
        constraint_system(|| execute_method(interface, body, &public_input, &previous_statements))
    })?;
    let ((_, declared), summary) = result?;

    tracing::debug!(
        method = %interface.method_name,
        rows = summary.rows,
        "method analyzed"
    );
    Ok(MethodAnalysis {
        method: interface.method_name.clone(),
        rows: summary.rows,
        witness_count: summary.witness_count,
        gate_counts: summary.gate_counts(),
        digest: summary.digest.clone(),
        proofs: declared
            .iter()
            .map(|proof| proof.class.tag().name().to_string())
            .collect(),
        feature_flags: summary.feature_flags(),
    })
}

/// Hex digest over the method digests, in declaration order
pub fn program_digest(analyses: &[MethodAnalysis]) -> String {
    let mut transcript = Transcript::new(b"zkprogram-digest");
    transcript.append_u64(b"methods", analyses.len() as u64);
    for analysis in analyses {
        transcript.append_message(b"method", analysis.digest.as_bytes());
    }
    let mut digest = [0u8; 32];
    transcript.challenge_bytes(b"digest", &mut digest);
    hex::encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method_interface::{sort_method_arguments, TypeDescriptor};
    use zkprogram_core::circuit::{assert_equals, range_check_64};
    use zkprogram_core::{snark_context as modes, ProgramTag, ProofClass};

    fn interface(inputs: &[TypeDescriptor]) -> Rc<MethodInterface> {
        let class = ProofClass::new::<Scalar, Scalar>(ProgramTag::new("Analyzed"));
        Rc::new(sort_method_arguments("Analyzed", "m", inputs, &class).unwrap())
    }

    #[test]
    fn test_analysis_runs_in_analyze_mode() {
        let intf = interface(&[TypeDescriptor::witness::<Scalar>()]);
        let body: MethodBody<Scalar, Scalar> = Rc::new(|input, args| {
            assert!(modes::in_analyze());
            let x = args[0].get::<Scalar>()?;
            assert_equals(&x, &input)?;
            range_check_64(&x)?;
            Ok(x)
        });
        let analysis = analyze_method(&intf, &body).unwrap();
        assert_eq!(analysis.rows, 3);
        assert_eq!(analysis.witness_count, 1);
        assert_eq!(analysis.feature_flags.range_check0, Some(true));
        assert!(!modes::in_analyze());
    }

    #[test]
    fn test_declared_proof_classes_are_reported() {
        let dependency = ProofClass::new::<u64, ()>(ProgramTag::new("Dependency"));
        let intf = interface(&[TypeDescriptor::proof(&dependency), TypeDescriptor::SelfProof]);
        let body: MethodBody<Scalar, Scalar> = Rc::new(|input, args| {
            args[0].as_proof_mut()?.verify();
            Ok(input)
        });
        let analysis = analyze_method(&intf, &body).unwrap();
        assert_eq!(analysis.proofs, vec!["Dependency".to_string(), "Analyzed".to_string()]);

        let none = interface(&[]);
        let analysis = analyze_method(&none, &body_without_proofs()).unwrap();
        assert!(analysis.proofs.is_empty());
    }

    fn body_without_proofs() -> MethodBody<Scalar, Scalar> {
        Rc::new(|input, _| Ok(input))
    }

    #[test]
    fn test_checks_are_skipped_on_placeholders() {
        let intf = interface(&[]);
        let body: MethodBody<Scalar, Scalar> = Rc::new(|input, _| {
            assert_equals(&input, &Scalar::from(99u64))?;
            Ok(input)
        });
        assert!(analyze_method(&intf, &body).is_ok());
    }

    #[test]
    fn test_program_digest_is_order_sensitive() {
        let intf = interface(&[]);
        let small: MethodBody<Scalar, Scalar> = Rc::new(|input, _| Ok(input));
        let large: MethodBody<Scalar, Scalar> = Rc::new(|input, _| {
            range_check_64(&input)?;
            Ok(input)
        });
        let a = analyze_method(&intf, &small).unwrap();
        let b = analyze_method(&intf, &large).unwrap();

        let forward = program_digest(&[a.clone(), b.clone()]);
        assert_eq!(forward, program_digest(&[a.clone(), b.clone()]));
        assert_ne!(forward, program_digest(&[b, a]));
        assert_eq!(forward.len(), 64);
    }
}
