//! # ZkProgram Core
//!
//! Building blocks for compiling methods into recursive proof programs: the
//! context stacks that track compile/prove mode, provable value encodings,
//! circuit gadgets, proof values and the contract with the native backend.

pub mod args;
pub mod backend;
pub mod circuit;
pub mod context;
pub mod errors;
pub mod feature_flags;
pub mod field;
pub mod proof;
pub mod provable;
pub mod snark_context;
pub mod zkprogram_context;

// Re-export key types
pub use args::{Arg, GenericValue};
pub use backend::{
    Backend, BackendProver, BackendVerifier, CompileConfig, CompileOutput, CompiledTag,
    PreviousProof, ProofToVerify, Rule, RuleMain, RuleOutput, SideloadedTag,
};
pub use circuit::{ConstraintSystemSummary, Gate, GateType};
pub use context::{Channel, ContextId, ContextStack};
pub use errors::{CallSite, ContextError, Result, ZkProgramError};
pub use feature_flags::FeatureFlags;
pub use proof::{
    JsonProof, KeySource, MaxProofsVerified, ProgramTag, Proof, ProofClass, RawProof, Statement,
    VerificationKey, DEFAULT_DUMMY_DOMAIN_LOG2,
};
pub use provable::{Auxiliary, Provable, WitnessType, WitnessValue};
pub use snark_context::{ProverScope, SnarkContext};

/// BLS12-381 scalar field
pub type Scalar = bls12_381::Scalar;
