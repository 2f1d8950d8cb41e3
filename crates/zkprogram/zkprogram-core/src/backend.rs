//! Contract with the native proving backend
//!
//! The backend compiles a list of rules into provers and a verifier. Rules are
//! handed over in method declaration order and provers come back in the same
//! order. Backend failures travel as [`ZkProgramError::Backend`] and are not
//! interpreted by this layer.
//!
//! [`ZkProgramError::Backend`]: crate::ZkProgramError::Backend

use crate::feature_flags::FeatureFlags;
use crate::proof::{MaxProofsVerified, RawProof, Statement, VerificationKey};
use crate::{Result, Scalar};

/// Compilation output of a program, as referenced by programs depending on it
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledTag {
    pub program: String,
    pub verification_key: VerificationKey,
    pub public_input_size: usize,
    pub public_output_size: usize,
}

/// Shape of side-loaded proofs, whose key is bound at proving time
#[derive(Clone, Debug, PartialEq)]
pub struct SideloadedTag {
    pub name: String,
    pub max_proofs_verified: MaxProofsVerified,
    pub public_input_size: usize,
    pub public_output_size: usize,
    pub feature_flags: FeatureFlags,
}

/// Where the key for a nested proof of a rule comes from
#[derive(Clone, Debug, PartialEq)]
pub enum ProofToVerify {
    /// A proof of the program being compiled
    SelfProof,
    /// A proof of another, already compiled program
    Compiled(CompiledTag),
    /// A proof verified against a key supplied by the method body
    Sideloaded(SideloadedTag),
}

/// What a rule's main function reports back to the backend
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RuleOutput {
    pub public_output: Vec<Scalar>,
    /// Statements of the nested proofs, in proof-argument order
    pub previous_statements: Vec<Statement>,
    /// Blobs of the nested proofs, present only when proving
    pub previous_proofs: Vec<Option<RawProof>>,
    pub should_verify: Vec<bool>,
    /// Keys bound by dynamic proofs, `None` for static ones
    pub verification_keys: Vec<Option<VerificationKey>>,
}

/// Circuit body of a rule: public input fields plus one statement field
/// vector per nested proof
pub type RuleMain = Box<dyn Fn(&[Scalar], &[Vec<Scalar>]) -> Result<RuleOutput>>;

/// One method as seen by the backend
pub struct Rule {
    pub identifier: String,
    pub main: RuleMain,
    pub proofs_to_verify: Vec<ProofToVerify>,
    pub feature_flags: FeatureFlags,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("identifier", &self.identifier)
            .field("proofs_to_verify", &self.proofs_to_verify)
            .field("feature_flags", &self.feature_flags)
            .finish()
    }
}

/// Program-wide compile parameters
#[derive(Clone, Debug, PartialEq)]
pub struct CompileConfig {
    pub program: String,
    pub public_input_size: usize,
    pub public_output_size: usize,
    pub max_proofs_verified: MaxProofsVerified,
    /// Domain size of the wrapping circuit
    pub wrap_domain: u8,
}

/// A nested proof handed to a prover
#[derive(Clone, Debug, PartialEq)]
pub struct PreviousProof {
    pub statement: Statement,
    pub proof: RawProof,
}

/// Prover of one rule: public input fields and nested proofs in, public
/// output fields and proof blob out
pub type BackendProver = Box<dyn Fn(&[Scalar], &[PreviousProof]) -> Result<(Vec<Scalar>, RawProof)>>;

/// Verifier of the compiled program
pub type BackendVerifier = Box<dyn Fn(&Statement, &RawProof) -> Result<bool>>;

pub struct CompileOutput {
    pub verification_key: VerificationKey,
    pub provers: Vec<BackendProver>,
    pub verify: BackendVerifier,
    pub tag: CompiledTag,
}

/// Native proving backend
pub trait Backend {
    fn name(&self) -> &str;

    /// Compile `rules` into one prover per rule and a verifier
    fn compile(&self, rules: Vec<Rule>, config: &CompileConfig) -> Result<CompileOutput>;

    /// Verify `proof` for `statement` against an explicit key
    fn verify(&self, statement: &Statement, proof: &RawProof, key: &VerificationKey) -> Result<bool>;

    /// Placeholder proof for base cases of recursive methods
    fn dummy_proof(&self, max_proofs_verified: MaxProofsVerified, domain_log2: u32) -> Result<RawProof>;

    /// Execution scope every compile, prove and verify call runs in
    fn with_thread_pool<R>(&self, f: impl FnOnce() -> R) -> R
    where
        Self: Sized,
    {
        f()
    }
}
