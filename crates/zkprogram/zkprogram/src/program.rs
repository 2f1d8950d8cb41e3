//! Proof programs
//!
//! A [`ZkProgram`] is a named set of methods sharing a public input and a
//! public output type. Compiling it turns every method into a backend rule;
//! afterwards each method can be proved and the resulting proofs verified, or
//! passed as arguments to methods of this or other programs.

use std::cell::RefCell;
use std::rc::Rc;

use once_cell::unsync::OnceCell;
use zkprogram_core::{
    Arg, Backend, CompileConfig, MaxProofsVerified, ProgramTag, Proof, ProofClass, Provable,
    Result, VerificationKey, ZkProgramError,
};

use crate::analyze::{analyze_method, program_digest, MethodAnalysis};
use crate::compiler::{compile_program, CompiledProgram};
use crate::config::ProgramConfig;
use crate::method_interface::{sort_method_arguments, MethodInterface, TypeDescriptor};
use crate::prover::prove_method;
use crate::rule::{rule_from_function, MethodBody};

struct Method<I, O> {
    name: String,
    private_inputs: Vec<TypeDescriptor>,
    body: MethodBody<I, O>,
}

/// A program of methods proving statements `I -> O`
pub struct ZkProgram<I: Provable, O: Provable, B: Backend> {
    name: String,
    tag: ProgramTag,
    backend: Rc<B>,
    config: ProgramConfig,
    methods: Vec<Method<I, O>>,
    interfaces: OnceCell<Vec<Rc<MethodInterface>>>,
    compiled: RefCell<Option<Rc<CompiledProgram>>>,
}

impl<I: Provable, O: Provable, B: Backend + 'static> ZkProgram<I, O, B> {
    pub fn new(name: impl Into<String>, backend: Rc<B>) -> Self {
        let name = name.into();
        Self {
            tag: ProgramTag::new(name.clone()),
            name,
            backend,
            config: ProgramConfig::default(),
            methods: Vec::new(),
            interfaces: OnceCell::new(),
            compiled: RefCell::new(None),
        }
    }

    pub fn with_config(mut self, config: ProgramConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a method. Methods keep their declaration order.
    pub fn method<F>(mut self, name: impl Into<String>, private_inputs: Vec<TypeDescriptor>, body: F) -> Self
    where
        F: Fn(I, &mut [Arg]) -> Result<O> + 'static,
    {
        self.methods.push(Method {
            name: name.into(),
            private_inputs,
            body: Rc::new(body),
        });
        self.interfaces = OnceCell::new();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> &ProgramTag {
        &self.tag
    }

    pub fn config(&self) -> &ProgramConfig {
        &self.config
    }

    pub fn backend(&self) -> &Rc<B> {
        &self.backend
    }

    pub fn method_names(&self) -> Vec<&str> {
        self.methods.iter().map(|m| m.name.as_str()).collect()
    }

    /// Class of the proofs this program produces
    pub fn self_proof_class(&self) -> ProofClass {
        ProofClass::new::<I, O>(self.tag.clone())
    }

    /// Method interfaces in declaration order, built once
    pub fn method_interfaces(&self) -> Result<&[Rc<MethodInterface>]> {
        let interfaces = self.interfaces.get_or_try_init(|| {
            let self_class = self.self_proof_class();
            self.methods
                .iter()
                .map(|method| {
                    sort_method_arguments(
                        &self.name,
                        &method.name,
                        &method.private_inputs,
                        &self_class,
                    )
                    .map(Rc::new)
                })
                .collect::<Result<Vec<_>>>()
        })?;
        Ok(interfaces.as_slice())
    }

    /// Largest number of proof arguments over all methods
    pub fn max_proofs_verified(&self) -> Result<MaxProofsVerified> {
        let max = self
            .method_interfaces()?
            .iter()
            .map(|intf| intf.max_proofs_verified())
            .max()
            .unwrap_or(MaxProofsVerified::Zero);
        Ok(max)
    }

    /// Constraint summary of every method, in declaration order
    pub async fn analyze_methods(&self) -> Result<Vec<MethodAnalysis>> {
        self.analyze()
    }

    fn analyze(&self) -> Result<Vec<MethodAnalysis>> {
        self.method_interfaces()?
            .iter()
            .zip(&self.methods)
            .map(|(intf, method)| analyze_method(intf, &method.body))
            .collect()
    }

    /// Hex digest of the program's constraint systems
    pub async fn digest(&self) -> Result<String> {
        Ok(program_digest(&self.analyze()?))
    }

    /// Compile every method and cache provers and verifier. Recompiling
    /// replaces them.
    pub async fn compile(&self) -> Result<VerificationKey> {
        if self.methods.is_empty() {
            return Err(ZkProgramError::NoMethods(self.name.clone()));
        }
        let interfaces = self.method_interfaces()?;
        let max_proofs_verified = self.max_proofs_verified()?;

        let mut rules = Vec::with_capacity(self.methods.len());
        for (intf, method) in interfaces.iter().zip(&self.methods) {
            let analysis = analyze_method(intf, &method.body)?;
            rules.push(rule_from_function(
                &self.name,
                &self.tag,
                Rc::clone(intf),
                Rc::clone(&method.body),
                analysis.feature_flags,
            )?);
        }

        let config = CompileConfig {
            program: self.name.clone(),
            public_input_size: I::size_in_fields(),
            public_output_size: O::size_in_fields(),
            max_proofs_verified,
            wrap_domain: self.config.wrap_domain(max_proofs_verified),
        };
        let compiled = compile_program(&self.backend, &self.tag, rules, &config)?;
        let verification_key = compiled.verification_key.clone();
        *self.compiled.borrow_mut() = Some(Rc::new(compiled));
        Ok(verification_key)
    }

    pub fn verification_key(&self) -> Option<VerificationKey> {
        self.compiled
            .borrow()
            .as_ref()
            .map(|compiled| compiled.verification_key.clone())
    }

    fn compiled(&self, method: &str) -> Result<Rc<CompiledProgram>> {
        self.compiled
            .borrow()
            .clone()
            .ok_or_else(|| ZkProgramError::NotCompiled {
                program: self.name.clone(),
                method: method.to_string(),
            })
    }

    /// Prove one execution of `method`
    pub async fn prove(&self, method: &str, public_input: I, args: Vec<Arg>) -> Result<Proof> {
        let index = self
            .methods
            .iter()
            .position(|m| m.name == method)
            .ok_or_else(|| ZkProgramError::UnknownMethod {
                program: self.name.clone(),
                method: method.to_string(),
            })?;
        let compiled = self.compiled(method)?;
        let prover = compiled
            .prover(index)
            .ok_or_else(|| ZkProgramError::NotCompiled {
                program: self.name.clone(),
                method: method.to_string(),
            })?;
        let interface = &self.method_interfaces()?[index];

        prove_method::<I, O>(
            &self.name,
            &self.self_proof_class(),
            interface,
            prover,
            self.max_proofs_verified()?,
            public_input,
            args,
        )
        .await
    }

    /// Verify a proof of this program with the cached verifier
    pub async fn verify(&self, proof: &Proof) -> Result<bool> {
        let compiled = self.compiled("verify")?;
        let raw = proof.raw().ok_or_else(|| {
            ZkProgramError::Serialization("proof carries no proof blob".to_string())
        })?;
        compiled.verify(&proof.public_fields(), raw)
    }

    /// Placeholder proof of this program for base cases of recursion
    pub fn dummy_proof(
        &self,
        public_input: I,
        public_output: O,
        max_proofs_verified: MaxProofsVerified,
    ) -> Result<Proof> {
        Proof::dummy(
            &self.self_proof_class(),
            public_input,
            public_output,
            max_proofs_verified,
            self.config.dummy_domain_log2,
            self.backend.as_ref(),
        )
    }
}
