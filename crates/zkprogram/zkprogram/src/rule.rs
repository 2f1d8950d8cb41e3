//! Turning a method into a backend rule
//!
//! The rule's main function rebuilds the method's arguments in declaration
//! order, from the prover's witnesses when proving and from placeholders when
//! compiling or analyzing, runs the user function, and reports the public
//! output together with what the backend needs to verify nested proofs.

use std::rc::Rc;

use zkprogram_core::circuit;
use zkprogram_core::snark_context;
use zkprogram_core::zkprogram_context::{self, DeclaredProof};
use zkprogram_core::{
    Arg, FeatureFlags, MaxProofsVerified, ProgramTag, Proof, ProofClass, ProofToVerify, Provable,
    Result, Rule, RuleMain, RuleOutput, Scalar, ZkProgramError,
};

use crate::method_interface::{ArgKind, MethodInterface};
use crate::registry;

/// User function of a method: decoded public input plus the private inputs in
/// declaration order
pub type MethodBody<I, O> = Rc<dyn Fn(I, &mut [Arg]) -> Result<O>>;

/// Build the circuit body of a method
pub fn rule_main<I: Provable, O: Provable>(
    interface: Rc<MethodInterface>,
    body: MethodBody<I, O>,
) -> RuleMain {
    Box::new(move |public_input: &[Scalar], previous_statements: &[Vec<Scalar>]| {
        run_method(&interface, &body, public_input, previous_statements)
    })
}

/// Build the backend rule of a method. Proof arguments of other programs
/// require those programs to be compiled first.
pub fn rule_from_function<I: Provable, O: Provable>(
    program: &str,
    self_tag: &ProgramTag,
    interface: Rc<MethodInterface>,
    body: MethodBody<I, O>,
    feature_flags: FeatureFlags,
) -> Result<Rule> {
    let mut proofs_to_verify = Vec::with_capacity(interface.proof_args.len());
    for class in &interface.proof_args {
        let target = if class.tag() == self_tag {
            ProofToVerify::SelfProof
        } else if let Some(sideloaded) = registry::sideloaded_tag(class) {
            ProofToVerify::Sideloaded(sideloaded)
        } else {
            let compiled = registry::compiled_tag(class.tag()).ok_or_else(|| {
                ZkProgramError::DependencyNotCompiled {
                    program: program.to_string(),
                    dependency: class.tag().name().to_string(),
                }
            })?;
            ProofToVerify::Compiled(compiled)
        };
        proofs_to_verify.push(target);
    }

    Ok(Rule {
        identifier: interface.method_name.clone(),
        main: rule_main(interface, body),
        proofs_to_verify,
        feature_flags,
    })
}

fn run_method<I: Provable, O: Provable>(
    interface: &MethodInterface,
    body: &MethodBody<I, O>,
    public_input: &[Scalar],
    previous_statements: &[Vec<Scalar>],
) -> Result<RuleOutput> {
    execute_method(interface, body, public_input, previous_statements).map(|(output, _)| output)
}

/// Run a method the way its rule does, also returning the proofs the method
/// declared
pub(crate) fn execute_method<I: Provable, O: Provable>(
    interface: &MethodInterface,
    body: &MethodBody<I, O>,
    public_input: &[Scalar],
    previous_statements: &[Vec<Scalar>],
) -> Result<(RuleOutput, Vec<DeclaredProof>)> {
    let witnesses = snark_context::witnesses();
    if snark_context::in_prover() && witnesses.is_none() {
        return Err(ZkProgramError::Backend(format!(
            "{}() is proved without witnesses",
            interface.method_name
        )));
    }
    if previous_statements.len() != interface.proof_args.len() {
        return Err(ZkProgramError::ArgumentCount {
            method: interface.method_name.clone(),
            expected: interface.proof_args.len(),
            actual: previous_statements.len(),
        });
    }

    let mut args = match &witnesses {
        Some(witnesses) => witnesses.as_ref().clone(),
        None => interface.synthesize_arguments()?,
    };
    if args.len() != interface.all_args.len() {
        return Err(ZkProgramError::ArgumentCount {
            method: interface.method_name.clone(),
            expected: interface.all_args.len(),
            actual: args.len(),
        });
    }
    let with_values = witnesses.is_some();

    let (result, declared) = zkprogram_context::run(|| -> Result<O> {
        for (i, (slot, arg)) in interface.all_args.iter().zip(args.iter_mut()).enumerate() {
            match slot.kind {
                ArgKind::Witness => {
                    let ty = &interface.witness_args[slot.index];
                    let value = match arg {
                        Arg::Witness(value) => value.clone(),
                        other => {
                            return Err(ZkProgramError::TypeMismatch {
                                expected: ty.name().to_string(),
                                actual: other.kind().to_string(),
                            })
                        }
                    };
                    let value = circuit::witness_value(ty, || Ok(value)).map_err(|e| {
                        ZkProgramError::TypeMismatch {
                            expected: ty.name().to_string(),
                            actual: format!(
                                "{} (when witnessing in {}, argument {})",
                                e, interface.method_name, i
                            ),
                        }
                    })?;
                    *arg = Arg::Witness(value);
                }
                ArgKind::Proof => {
                    let class = &interface.proof_args[slot.index];
                    let fields = &previous_statements[slot.index];
                    let (input_size, output_size) = class.statement_size();
                    if fields.len() != input_size + output_size {
                        return Err(ZkProgramError::InvalidFieldLength {
                            type_name: format!("statement of {}", class.tag().name()),
                            expected: input_size + output_size,
                            actual: fields.len(),
                        });
                    }
                    let (input_fields, output_fields) = fields.split_at(input_size);
                    let input = circuit::witness_value(class.public_input_type(), || {
                        class.public_input_type().from_fields_default(input_fields)
                    })?;
                    let output = circuit::witness_value(class.public_output_type(), || {
                        class.public_output_type().from_fields_default(output_fields)
                    })?;
                    let source = arg.as_proof()?;
                    check_recursion_bound(class, source.max_proofs_verified())?;
                    let raw = if with_values { source.raw().cloned() } else { None };
                    let proof = Proof::from_values(
                        class.clone(),
                        input,
                        output,
                        raw,
                        source.max_proofs_verified(),
                    )?;
                    proof.declare();
                    *arg = Arg::Proof(proof);
                }
                ArgKind::Generic => {
                    arg.as_generic()?;
                }
            }
        }

        let input = I::from_fields(public_input, &I::empty_auxiliary())?;
        body(input, &mut args)
    })?;
    let output = result?;

    if declared.len() != interface.proof_args.len() {
        return Err(ZkProgramError::ProofCountMismatch {
            expected: interface.proof_args.len(),
            actual: declared.len(),
        });
    }

    let mut rule_output = RuleOutput {
        public_output: output.to_fields(),
        ..RuleOutput::default()
    };
    for (slot, arg) in interface.all_args.iter().zip(&args) {
        if slot.kind != ArgKind::Proof {
            continue;
        }
        let proof = arg.as_proof()?;
        if proof.class().is_dynamic() && proof.used_verification_key().is_none() {
            return Err(ZkProgramError::MissingVerificationKey);
        }
        rule_output.previous_statements.push(proof.public_fields());
        rule_output.previous_proofs.push(proof.raw().cloned());
        rule_output.should_verify.push(proof.should_verify());
        rule_output
            .verification_keys
            .push(proof.used_verification_key().cloned());
    }
    Ok((rule_output, declared))
}

fn check_recursion_bound(class: &ProofClass, actual: MaxProofsVerified) -> Result<()> {
    match class.max_proofs_verified() {
        Some(bound) if actual > bound => Err(ZkProgramError::RecursionBoundExceeded {
            class: class.tag().name().to_string(),
            bound: bound.count(),
            actual: actual.count(),
        }),
        _ => Ok(()),
    }
}
