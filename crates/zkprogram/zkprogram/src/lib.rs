//! # ZkProgram
//!
//! Method compilation and recursive proof composition. A [`ZkProgram`] is a
//! set of methods over a shared public input and output. Compiling it turns
//! each method into a backend rule; proving a method yields a [`Proof`] that
//! can be verified on its own or passed as an argument to another method,
//! which then verifies it inside its own circuit.

pub mod analyze;
pub mod compiler;
pub mod config;
pub mod method_interface;
pub mod program;
pub mod prover;
pub mod registry;
pub mod rule;

#[cfg(test)]
mod property_tests;

// Re-export key types
pub use analyze::MethodAnalysis;
pub use compiler::CompiledProgram;
pub use config::{ProgramConfig, DUMMY_DOMAIN_LOG2_ENV, WRAP_DOMAIN_ENV};
pub use method_interface::{MethodInterface, TypeDescriptor, MAX_PROOF_ARGUMENTS};
pub use program::ZkProgram;
pub use prover::{verify, VerifiableProof};
pub use rule::MethodBody;

/// Re-export core types
pub use zkprogram_core::{
    circuit, snark_context, Arg, Backend, FeatureFlags, GenericValue, JsonProof,
    MaxProofsVerified, ProgramTag, Proof, ProofClass, Provable, RawProof, Result, Scalar,
    Statement, VerificationKey, ZkProgramError,
};
