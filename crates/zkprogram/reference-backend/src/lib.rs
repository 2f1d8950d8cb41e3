//! # Reference Backend
//!
//! A transcript-based proving backend for zkprogram. Keys commit to the
//! constraint shape of every rule, and proofs bind a statement to a key
//! through a Fiat-Shamir challenge on BLS12-381. Nested proofs are checked
//! natively while proving. The proofs carry no zero-knowledge or succinctness
//! guarantees; the backend exists to exercise the compile and prove pipeline
//! end to end.
//!
//! ## Components
//!
//! - [`ReferenceBackend`]: the [`Backend`] implementation
//! - [`key`]: verification key derivation
//! - [`proof`]: proof encoding and checking
//! - [`transcript`]: Fiat-Shamir transcript utilities

pub mod backend;
pub mod errors;
pub mod key;
pub mod proof;
pub mod transcript;

use zkprogram_core::{
    Backend, CompileConfig, CompileOutput, CompiledTag, MaxProofsVerified, RawProof, Rule,
    Statement, VerificationKey, ZkProgramError,
};

// Re-export key types
pub use errors::{BackendError, Result};
pub use key::{derive_key, RuleShape};
pub use proof::{create_proof, verify_proof};
pub use transcript::{Transcript, TranscriptRead, TranscriptWrite};

/// Largest dummy proof domain accepted by default
pub const DEFAULT_MAX_DOMAIN_LOG2: u32 = 20;

/// Configuration of the reference backend
#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceBackendConfig {
    /// Largest domain size (log2) of dummy proofs
    pub max_domain_log2: u32,
}

impl Default for ReferenceBackendConfig {
    fn default() -> Self {
        Self {
            max_domain_log2: DEFAULT_MAX_DOMAIN_LOG2,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ReferenceBackend {
    config: ReferenceBackendConfig,
}

impl ReferenceBackend {
    pub fn new(config: ReferenceBackendConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReferenceBackendConfig {
        &self.config
    }
}

impl Backend for ReferenceBackend {
    fn name(&self) -> &str {
        "reference"
    }

    fn compile(&self, rules: Vec<Rule>, config: &CompileConfig) -> zkprogram_core::Result<CompileOutput> {
        let shapes = rules
            .iter()
            .map(|rule| backend::synthesize(rule, config))
            .collect::<zkprogram_core::Result<Vec<_>>>()?;
        let verification_key = derive_key(config, &rules, &shapes);
        tracing::info!(
            program = %config.program,
            rules = rules.len(),
            rows = shapes.iter().map(|s| s.rows).sum::<usize>(),
            wrap_domain = config.wrap_domain,
            "reference backend compiled program"
        );

        let provers = rules
            .into_iter()
            .zip(shapes)
            .map(|(rule, shape)| {
                backend::into_backend_prover(backend::RuleProver::new(
                    rule,
                    shape,
                    verification_key.clone(),
                ))
            })
            .collect();
        let verify = {
            let key = verification_key.clone();
            Box::new(move |statement: &Statement, proof: &RawProof| {
                verify_proof(&key, statement, proof).map_err(ZkProgramError::from)
            }) as zkprogram_core::BackendVerifier
        };

        Ok(CompileOutput {
            tag: CompiledTag {
                program: config.program.clone(),
                verification_key: verification_key.clone(),
                public_input_size: config.public_input_size,
                public_output_size: config.public_output_size,
            },
            verification_key,
            provers,
            verify,
        })
    }

    fn verify(
        &self,
        statement: &Statement,
        proof: &RawProof,
        key: &VerificationKey,
    ) -> zkprogram_core::Result<bool> {
        Ok(verify_proof(key, statement, proof)?)
    }

    fn dummy_proof(
        &self,
        max_proofs_verified: MaxProofsVerified,
        domain_log2: u32,
    ) -> zkprogram_core::Result<RawProof> {
        if domain_log2 > self.config.max_domain_log2 {
            return Err(BackendError::DomainTooLarge {
                requested: domain_log2,
                max: self.config.max_domain_log2,
            }
            .into());
        }
        Ok(proof::dummy_proof(max_proofs_verified, domain_log2))
    }

    fn with_thread_pool<R>(&self, f: impl FnOnce() -> R) -> R {
        let _span = tracing::debug_span!("reference_backend").entered();
        f()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zkprogram_core::{FeatureFlags, ProofToVerify, RuleOutput, Scalar};

    fn square_rule() -> Rule {
        Rule {
            identifier: "square".to_string(),
            main: Box::new(|input, _| {
                Ok(RuleOutput {
                    public_output: vec![input[0] * input[0]],
                    ..RuleOutput::default()
                })
            }),
            proofs_to_verify: Vec::<ProofToVerify>::new(),
            feature_flags: FeatureFlags::all_none(),
        }
    }

    fn config() -> CompileConfig {
        CompileConfig {
            program: "Square".to_string(),
            public_input_size: 1,
            public_output_size: 1,
            max_proofs_verified: MaxProofsVerified::Zero,
            wrap_domain: 0,
        }
    }

    #[test]
    fn test_compile_prove_verify() {
        let backend = ReferenceBackend::default();
        let output = backend.compile(vec![square_rule()], &config()).unwrap();
        assert_eq!(output.provers.len(), 1);
        assert_eq!(output.tag.verification_key, output.verification_key);

        let three = [Scalar::from(3u64)];
        let (public_output, proof) = (output.provers[0])(&three, &[]).unwrap();
        assert_eq!(public_output, vec![Scalar::from(9u64)]);

        let statement = Statement {
            input: three.to_vec(),
            output: public_output,
        };
        assert!((output.verify)(&statement, &proof).unwrap());
        assert!(backend
            .verify(&statement, &proof, &output.verification_key)
            .unwrap());

        let forged = Statement {
            output: vec![Scalar::from(10u64)],
            ..statement
        };
        assert!(!(output.verify)(&forged, &proof).unwrap());
    }

    #[test]
    fn test_compile_is_deterministic() {
        let backend = ReferenceBackend::default();
        let first = backend.compile(vec![square_rule()], &config()).unwrap();
        let second = backend.compile(vec![square_rule()], &config()).unwrap();
        assert_eq!(first.verification_key, second.verification_key);
    }

    #[test]
    fn test_dummy_domain_limit() {
        let backend = ReferenceBackend::new(ReferenceBackendConfig { max_domain_log2: 15 });
        assert!(backend.dummy_proof(MaxProofsVerified::Two, 15).is_ok());
        assert!(matches!(
            backend.dummy_proof(MaxProofsVerified::Two, 16),
            Err(zkprogram_core::ZkProgramError::Backend(_))
        ));
    }
}
