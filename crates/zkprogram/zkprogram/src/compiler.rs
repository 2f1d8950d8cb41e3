//! Program compilation
//!
//! Hands the rules of a program to the backend inside an `in_compile` frame,
//! publishes the resulting tag and keeps the provers and verifier, each wrapped
//! so that it runs inside the backend's thread pool scope.

use std::rc::Rc;

use zkprogram_core::field::to_decimal;
use zkprogram_core::snark_context::{snark_context, SnarkContext};
use zkprogram_core::{
    Backend, BackendProver, BackendVerifier, CompileConfig, PreviousProof, ProgramTag, RawProof,
    Result, Rule, Scalar, Statement, VerificationKey,
};

use crate::registry;

/// Provers and verifier of a compiled program
pub struct CompiledProgram {
    pub verification_key: VerificationKey,
    provers: Vec<BackendProver>,
    verify: BackendVerifier,
}

impl CompiledProgram {
    pub fn prover_count(&self) -> usize {
        self.provers.len()
    }

    pub fn prover(&self, index: usize) -> Option<&BackendProver> {
        self.provers.get(index)
    }

    pub fn prove(
        &self,
        index: usize,
        public_input: &[Scalar],
        previous_proofs: &[PreviousProof],
    ) -> Option<Result<(Vec<Scalar>, RawProof)>> {
        self.prover(index)
            .map(|prover| prover(public_input, previous_proofs))
    }

    pub fn verify(&self, statement: &Statement, proof: &RawProof) -> Result<bool> {
        (self.verify)(statement, proof)
    }
}

impl std::fmt::Debug for CompiledProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledProgram")
            .field("verification_key", &self.verification_key)
            .field("provers", &self.provers.len())
            .finish()
    }
}

/// Compile `rules` and register the result under `tag`
pub fn compile_program<B: Backend + 'static>(
    backend: &Rc<B>,
    tag: &ProgramTag,
    rules: Vec<Rule>,
    config: &CompileConfig,
) -> Result<CompiledProgram> {
    tracing::info!(
        program = %config.program,
        methods = rules.len(),
        backend = backend.name(),
        "compiling program"
    );

    let output = backend.with_thread_pool(|| {
        let (result, _) =
            snark_context().run_with(SnarkContext::compile(), || backend.compile(rules, config))?;
        result
    })?;
    registry::store_compiled_tag(tag, output.tag.clone());

    let provers = output
        .provers
        .into_iter()
        .map(|prover| {
            let backend = Rc::clone(backend);
            Box::new(move |public_input: &[Scalar], previous: &[PreviousProof]| {
                backend.with_thread_pool(|| prover(public_input, previous))
            }) as BackendProver
        })
        .collect();
    let verify = {
        let backend = Rc::clone(backend);
        let inner = output.verify;
        Box::new(move |statement: &Statement, proof: &RawProof| {
            backend.with_thread_pool(|| inner(statement, proof))
        }) as BackendVerifier
    };

    tracing::info!(
        program = %config.program,
        vk_hash = %to_decimal(&output.verification_key.hash),
        "program compiled"
    );
    Ok(CompiledProgram {
        verification_key: output.verification_key,
        provers,
        verify,
    })
}
