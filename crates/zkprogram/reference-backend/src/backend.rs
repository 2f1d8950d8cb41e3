//! Compiling rules into provers
//!
//! Compilation synthesizes every rule once with placeholder inputs to fix its
//! constraint shape and derives the program key from those shapes. A prover
//! re-runs its rule on the real inputs, checks the shape is unchanged, checks
//! the nested proofs the rule marked for verification and issues a proof of
//! the resulting statement.

use std::rc::Rc;

use zkprogram_core::circuit::constraint_system;
use zkprogram_core::{
    BackendProver, CompileConfig, PreviousProof, ProofToVerify, Rule, RuleMain, RuleOutput,
    Scalar, Statement, VerificationKey,
};

use crate::errors::{BackendError, Result};
use crate::key::{decode_key, RuleShape};
use crate::proof::{create_proof, verify_proof};

/// Statement sizes of the proofs a rule verifies
pub fn nested_statement_sizes(rule: &Rule, config: &CompileConfig) -> Vec<usize> {
    rule.proofs_to_verify
        .iter()
        .map(|target| match target {
            ProofToVerify::SelfProof => config.public_input_size + config.public_output_size,
            ProofToVerify::Compiled(tag) => tag.public_input_size + tag.public_output_size,
            ProofToVerify::Sideloaded(tag) => tag.public_input_size + tag.public_output_size,
        })
        .collect()
}

/// Synthesize a rule with zero inputs and record its shape
pub fn synthesize(rule: &Rule, config: &CompileConfig) -> zkprogram_core::Result<RuleShape> {
    let public_input = vec![Scalar::zero(); config.public_input_size];
    let statements: Vec<Vec<Scalar>> = nested_statement_sizes(rule, config)
        .into_iter()
        .map(|size| vec![Scalar::zero(); size])
        .collect();
    let (_, summary) = constraint_system(|| (rule.main)(&public_input, &statements))?;
    tracing::debug!(
        rule = %rule.identifier,
        rows = summary.rows,
        "rule synthesized"
    );
    Ok(RuleShape {
        identifier: rule.identifier.clone(),
        rows: summary.rows,
        digest: summary.digest,
    })
}

/// Everything a prover of one rule needs
pub struct RuleProver {
    pub identifier: String,
    pub main: RuleMain,
    pub proofs_to_verify: Vec<ProofToVerify>,
    pub shape: RuleShape,
    pub key: VerificationKey,
}

impl RuleProver {
    pub fn new(rule: Rule, shape: RuleShape, key: VerificationKey) -> Self {
        Self {
            identifier: rule.identifier,
            main: rule.main,
            proofs_to_verify: rule.proofs_to_verify,
            shape,
            key,
        }
    }

    pub fn prove(
        &self,
        public_input: &[Scalar],
        previous: &[PreviousProof],
    ) -> zkprogram_core::Result<(Vec<Scalar>, zkprogram_core::RawProof)> {
        if previous.len() != self.proofs_to_verify.len() {
            return Err(BackendError::ProofCount {
                rule: self.identifier.clone(),
                expected: self.proofs_to_verify.len(),
                actual: previous.len(),
            }
            .into());
        }

        let statements: Vec<Vec<Scalar>> =
            previous.iter().map(|p| p.statement.to_fields()).collect();
        let (output, summary) = constraint_system(|| (self.main)(public_input, &statements))?;
        if summary.digest != self.shape.digest {
            return Err(BackendError::ShapeChanged {
                rule: self.identifier.clone(),
            }
            .into());
        }
        self.check_nested(&output, previous)?;

        let statement = Statement {
            input: public_input.to_vec(),
            output: output.public_output,
        };
        let proof = create_proof(&self.key, &statement)?;
        tracing::debug!(rule = %self.identifier, rows = summary.rows, "rule proved");
        Ok((statement.output, proof))
    }

    fn check_nested(&self, output: &RuleOutput, previous: &[PreviousProof]) -> Result<()> {
        for (index, (target, given)) in self.proofs_to_verify.iter().zip(previous).enumerate() {
            let declared = output.previous_statements.get(index);
            if declared != Some(&given.statement) {
                return Err(BackendError::StatementMismatch {
                    rule: self.identifier.clone(),
                    index,
                });
            }
            if !output.should_verify.get(index).copied().unwrap_or(false) {
                continue;
            }

            let key = match target {
                ProofToVerify::SelfProof => self.key.clone(),
                ProofToVerify::Compiled(tag) => tag.verification_key.clone(),
                ProofToVerify::Sideloaded(tag) => {
                    let key = output
                        .verification_keys
                        .get(index)
                        .cloned()
                        .flatten()
                        .ok_or_else(|| BackendError::MissingVerificationKey {
                            rule: self.identifier.clone(),
                            index,
                        })?;
                    let params = decode_key(&key)?;
                    if params.max_proofs_verified > tag.max_proofs_verified {
                        return Err(BackendError::RecursionBound {
                            rule: self.identifier.clone(),
                            index,
                            key: params.max_proofs_verified.count(),
                            bound: tag.max_proofs_verified.count(),
                        });
                    }
                    key
                }
            };
            if !verify_proof(&key, &given.statement, &given.proof)? {
                return Err(BackendError::NestedProofRejected {
                    rule: self.identifier.clone(),
                    index,
                });
            }
        }
        Ok(())
    }
}

/// Box a rule prover as a backend prover
pub fn into_backend_prover(prover: RuleProver) -> BackendProver {
    let prover = Rc::new(prover);
    Box::new(move |public_input: &[Scalar], previous: &[PreviousProof]| {
        prover.prove(public_input, previous)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::derive_key;
    use crate::proof::dummy_proof;
    use zkprogram_core::{CompiledTag, FeatureFlags, MaxProofsVerified, RawProof, SideloadedTag};

    fn config(max: MaxProofsVerified) -> CompileConfig {
        CompileConfig {
            program: "Rules".to_string(),
            public_input_size: 1,
            public_output_size: 1,
            max_proofs_verified: max,
            wrap_domain: 1,
        }
    }

    /// Rule that outputs its input plus one and verifies its single nested
    /// proof when the input is non-zero
    fn increment_rule(target: ProofToVerify) -> Rule {
        Rule {
            identifier: "increment".to_string(),
            main: Box::new(|input, statements| {
                let previous = statements
                    .iter()
                    .map(|fields| Statement {
                        input: fields[..1].to_vec(),
                        output: fields[1..].to_vec(),
                    })
                    .collect::<Vec<_>>();
                Ok(RuleOutput {
                    public_output: vec![input[0] + Scalar::one()],
                    previous_proofs: vec![None; previous.len()],
                    should_verify: vec![input[0] != Scalar::zero(); previous.len()],
                    verification_keys: vec![None; previous.len()],
                    previous_statements: previous,
                })
            }),
            proofs_to_verify: vec![target],
            feature_flags: FeatureFlags::all_none(),
        }
    }

    fn compile(rule: Rule) -> RuleProver {
        compile_with(rule, MaxProofsVerified::One)
    }

    fn compile_with(rule: Rule, max: MaxProofsVerified) -> RuleProver {
        let config = config(max);
        let shape = synthesize(&rule, &config).unwrap();
        let key = derive_key(&config, std::slice::from_ref(&rule), &[shape.clone()]);
        RuleProver::new(rule, shape, key)
    }

    fn previous(statement: Statement, proof: RawProof) -> PreviousProof {
        PreviousProof { statement, proof }
    }

    #[test]
    fn test_self_recursion_chain() {
        let prover = compile(increment_rule(ProofToVerify::SelfProof));
        let base_statement = Statement {
            input: vec![Scalar::zero()],
            output: vec![Scalar::zero()],
        };
        let dummy = dummy_proof(MaxProofsVerified::One, 14);

        let zero = [Scalar::zero()];
        let (output, proof) = prover
            .prove(&zero, &[previous(base_statement.clone(), dummy.clone())])
            .unwrap();
        assert_eq!(output, vec![Scalar::one()]);

        let step = Statement {
            input: zero.to_vec(),
            output,
        };
        let one = [Scalar::one()];
        assert!(prover.prove(&one, &[previous(step, proof)]).is_ok());

        // verification is on for non-zero inputs, so the dummy is rejected
        let err = prover
            .prove(&one, &[previous(base_statement, dummy)])
            .unwrap_err();
        assert!(err.to_string().contains("does not verify"));
    }

    #[test]
    fn test_compiled_dependency_key_is_used() {
        let dependency = compile(increment_rule(ProofToVerify::SelfProof));
        let zero = [Scalar::zero()];
        let base = Statement {
            input: zero.to_vec(),
            output: zero.to_vec(),
        };
        let (output, proof) = dependency
            .prove(&zero, &[previous(base, dummy_proof(MaxProofsVerified::One, 14))])
            .unwrap();
        let dependency_statement = Statement {
            input: zero.to_vec(),
            output,
        };

        let tag = CompiledTag {
            program: "Dependency".to_string(),
            verification_key: dependency.key.clone(),
            public_input_size: 1,
            public_output_size: 1,
        };
        let prover = compile(increment_rule(ProofToVerify::Compiled(tag.clone())));
        assert_ne!(prover.key, dependency.key);
        let one = [Scalar::one()];
        assert!(prover
            .prove(&one, &[previous(dependency_statement.clone(), proof.clone())])
            .is_ok());

        // the same proof under another program's key is rejected
        let wrong_tag = CompiledTag {
            verification_key: prover.key.clone(),
            ..tag
        };
        let wrong = compile(increment_rule(ProofToVerify::Compiled(wrong_tag)));
        assert!(wrong
            .prove(&one, &[previous(dependency_statement, proof)])
            .is_err());
    }

    /// Rule verifying one side-loaded proof against `key`
    fn sideloaded_rule(bound: MaxProofsVerified, key: VerificationKey) -> Rule {
        Rule {
            identifier: "sideloaded".to_string(),
            main: Box::new(move |input, statements| {
                let previous = statements
                    .iter()
                    .map(|fields| Statement {
                        input: fields[..1].to_vec(),
                        output: fields[1..].to_vec(),
                    })
                    .collect::<Vec<_>>();
                Ok(RuleOutput {
                    public_output: vec![input[0]],
                    previous_proofs: vec![None; previous.len()],
                    should_verify: vec![true; previous.len()],
                    verification_keys: vec![Some(key.clone()); previous.len()],
                    previous_statements: previous,
                })
            }),
            proofs_to_verify: vec![ProofToVerify::Sideloaded(SideloadedTag {
                name: "sideloaded-test".to_string(),
                max_proofs_verified: bound,
                public_input_size: 1,
                public_output_size: 1,
                feature_flags: FeatureFlags::all_maybe(),
            })],
            feature_flags: FeatureFlags::all_none(),
        }
    }

    #[test]
    fn test_sideloaded_key_bound_is_checked() {
        // a leaf program whose key verifies no proofs
        let leaf = compile_with(
            Rule {
                identifier: "leaf".to_string(),
                main: Box::new(|input, _| {
                    Ok(RuleOutput {
                        public_output: vec![input[0]],
                        ..RuleOutput::default()
                    })
                }),
                proofs_to_verify: Vec::new(),
                feature_flags: FeatureFlags::all_none(),
            },
            MaxProofsVerified::Zero,
        );
        let one = [Scalar::one()];
        let (output, proof) = leaf.prove(&one, &[]).unwrap();
        let statement = Statement {
            input: one.to_vec(),
            output,
        };

        let accepting = compile(sideloaded_rule(MaxProofsVerified::Zero, leaf.key.clone()));
        assert!(accepting
            .prove(&one, &[previous(statement.clone(), proof.clone())])
            .is_ok());

        // a key verifying one proof exceeds a class that accepts none
        let recursive = compile(increment_rule(ProofToVerify::SelfProof));
        let strict = compile(sideloaded_rule(MaxProofsVerified::Zero, recursive.key.clone()));
        let err = strict
            .prove(&one, &[previous(statement, proof)])
            .unwrap_err();
        assert!(err.to_string().contains("the class accepts 0"));
    }

    #[test]
    fn test_proof_count_is_checked() {
        let prover = compile(increment_rule(ProofToVerify::SelfProof));
        let err = prover.prove(&[Scalar::zero()], &[]).unwrap_err();
        assert!(err.to_string().contains("verifies 1 proofs, got 0"));
    }
}
