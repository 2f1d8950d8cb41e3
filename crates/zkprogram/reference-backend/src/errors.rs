//! Error types for the reference backend

use thiserror::Error;
use zkprogram_core::ZkProgramError;

/// Result type for backend operations
pub type Result<T> = std::result::Result<T, BackendError>;

/// Errors raised while compiling, proving or verifying
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    /// Proof bytes could not be decoded
    #[error("Malformed proof: {0}")]
    MalformedProof(String),

    /// Verification key data could not be decoded or does not match its hash
    #[error("Malformed verification key: {0}")]
    MalformedKey(String),

    /// Prover got a different number of nested proofs than the rule verifies
    #[error("Rule {rule} verifies {expected} proofs, got {actual}")]
    ProofCount {
        rule: String,
        expected: usize,
        actual: usize,
    },

    /// Statement passed to the prover differs from the one the rule declared
    #[error("Statement of nested proof {index} in rule {rule} does not match the proof argument")]
    StatementMismatch { rule: String, index: usize },

    /// A nested proof marked for verification did not verify
    #[error("Nested proof {index} in rule {rule} does not verify")]
    NestedProofRejected { rule: String, index: usize },

    /// Side-loaded proof without a key to verify it against
    #[error("Nested proof {index} in rule {rule} has no verification key")]
    MissingVerificationKey { rule: String, index: usize },

    /// A side-loaded key verifies more proofs than the proof's class accepts
    #[error("Key of nested proof {index} in rule {rule} verifies up to {key} proofs, the class accepts {bound}")]
    RecursionBound {
        rule: String,
        index: usize,
        key: usize,
        bound: usize,
    },

    /// The circuit emitted different constraints when proving than when compiled
    #[error("Constraint system of rule {rule} changed between compile and prove")]
    ShapeChanged { rule: String },

    /// Requested domain exceeds the configured maximum
    #[error("Domain size 2^{requested} exceeds the maximum 2^{max}")]
    DomainTooLarge { requested: u32, max: u32 },
}

impl From<BackendError> for ZkProgramError {
    fn from(err: BackendError) -> Self {
        ZkProgramError::Backend(err.to_string())
    }
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::MalformedProof(err.to_string())
    }
}
