//! Error types for zkprogram core

use std::panic::Location;
use thiserror::Error;

/// Result type for zkprogram operations
pub type Result<T> = std::result::Result<T, ZkProgramError>;

/// Errors raised by the context stacks
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContextError {
    /// `get` or `leave` on a channel without any active frame
    #[error("Empty context: no frame is active on the `{channel}` channel")]
    EmptyContext { channel: &'static str },

    /// Stack discipline violated
    #[error(
        "Context conflict on the `{channel}` channel: {reason}\n\
         frame entered at {entered_at}, current top entered at {top_at}\n\
         This usually means an operation was not awaited, or two proving/compiling \
         operations were run concurrently."
    )]
    ContextConflict {
        channel: &'static str,
        reason: &'static str,
        entered_at: CallSite,
        top_at: CallSite,
    },
}

/// Source location captured when a frame is entered. Diagnostic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite(Option<&'static Location<'static>>);

impl CallSite {
    #[track_caller]
    pub fn caller() -> Self {
        Self(Some(Location::caller()))
    }

    pub fn unknown() -> Self {
        Self(None)
    }
}

impl std::fmt::Display for CallSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(location) => write!(f, "{}:{}", location.file(), location.line()),
            None => write!(f, "<unknown>"),
        }
    }
}

/// Errors that can occur while building, compiling or proving programs
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ZkProgramError {
    /// Context stack error
    #[error(transparent)]
    Context(#[from] ContextError),

    /// A method parameter has no provable capability
    #[error("Argument {position} of method {method} is not a provable type: {type_name}")]
    NotProvableType {
        method: String,
        position: usize,
        type_name: String,
    },

    /// Recursion fan-in limit of the backend
    #[error(
        "{program}.{method}() has more than two proof arguments, which is not supported.\n\
         Suggestion: You can merge more than two proofs by merging two at a time in a binary tree."
    )]
    TooManyProofArguments { program: String, method: String },

    /// A proof argument belongs to a program that was never compiled
    #[error(
        "{program}.compile() depends on {dependency}, but we cannot find compilation output for {dependency}.\n\
         Try to run {dependency}.compile() first."
    )]
    DependencyNotCompiled { program: String, dependency: String },

    /// Prove or verify requested before compile
    #[error(
        "Cannot run {program}.{method}(), no prover found. \
         Try calling `program.compile()` first, this will cache provers in the background."
    )]
    NotCompiled { program: String, method: String },

    /// Compile requested for a program without methods
    #[error("The program {0} you are trying to compile has no methods. Try adding a method to it.")]
    NoMethods(String),

    /// Unknown method name
    #[error("Program {program} has no method named {method}")]
    UnknownMethod { program: String, method: String },

    /// Wrong number of arguments passed to a method
    #[error("{method}() expects {expected} arguments, got {actual}")]
    ArgumentCount {
        method: String,
        expected: usize,
        actual: usize,
    },

    /// A value does not have the type its descriptor promises
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Field vector of the wrong width
    #[error("Invalid field length for {type_name}: expected {expected}, got {actual}")]
    InvalidFieldLength {
        type_name: String,
        expected: usize,
        actual: usize,
    },

    /// Field element could not be parsed or decoded
    #[error("Invalid field element: {0}")]
    InvalidField(String),

    /// A circuit assertion failed on concrete values
    #[error("Constraint unsatisfied: {0}")]
    Unsatisfied(String),

    /// Number of declared proofs differs from the method's proof arguments
    #[error("Expected {expected} proofs, but got {actual}")]
    ProofCountMismatch { expected: usize, actual: usize },

    /// A side-loaded proof verified more proofs than its class accepts
    #[error("Proof of {class} verifies up to {actual} proofs, but the class accepts at most {bound}")]
    RecursionBoundExceeded {
        class: String,
        bound: usize,
        actual: usize,
    },

    /// Dynamic proof declared without a verification key
    #[error("proof.verify_with_key() not called, call it at least once in your circuit")]
    MissingVerificationKey,

    /// Proof interchange failure
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failure inside the proving backend, passed through unmodified
    #[error("Backend error: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for ZkProgramError {
    fn from(err: serde_json::Error) -> Self {
        ZkProgramError::Serialization(err.to_string())
    }
}
