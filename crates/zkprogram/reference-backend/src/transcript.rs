//! Transcript utilities for Fiat-Shamir transformation
//!
//! Wraps a Merlin transcript with helpers for the values the backend binds:
//! field elements, statements and verification keys.

use ff::PrimeField;
use merlin::Transcript as MerlinTranscript;
use zkprogram_core::{Scalar, Statement, VerificationKey};

/// Trait for writing to a transcript
pub trait TranscriptWrite {
    /// Append a label and message to the transcript
    fn append_message(&mut self, label: &'static [u8], message: &[u8]);

    fn append_u64(&mut self, label: &'static [u8], value: u64) {
        self.append_message(label, &value.to_le_bytes());
    }

    /// Append a scalar field element to the transcript
    fn append_scalar(&mut self, label: &'static [u8], scalar: &Scalar) {
        self.append_message(label, &scalar.to_repr());
    }

    /// Append multiple scalars, prefixed with their count
    fn append_scalars(&mut self, label: &'static [u8], scalars: &[Scalar]) {
        self.append_message(label, &(scalars.len() as u32).to_le_bytes());
        for scalar in scalars {
            self.append_scalar(b"scalar-item", scalar);
        }
    }

    /// Append both halves of a statement
    fn append_statement(&mut self, statement: &Statement) {
        self.append_scalars(b"public-input", &statement.input);
        self.append_scalars(b"public-output", &statement.output);
    }

    fn append_key(&mut self, key: &VerificationKey) {
        self.append_scalar(b"vk-hash", &key.hash);
    }
}

/// Trait for reading from a transcript
pub trait TranscriptRead: TranscriptWrite {
    /// Challenge a scalar from the transcript
    fn challenge_scalar(&mut self, label: &'static [u8]) -> Scalar;
}

/// Backend transcript wrapper around Merlin
#[derive(Clone)]
pub struct Transcript {
    transcript: MerlinTranscript,
}

impl Transcript {
    /// Create a new transcript with the given label
    pub fn new(label: &'static [u8]) -> Self {
        Self {
            transcript: MerlinTranscript::new(label),
        }
    }
}

impl TranscriptWrite for Transcript {
    fn append_message(&mut self, label: &'static [u8], message: &[u8]) {
        self.transcript.append_message(label, message);
    }
}

impl TranscriptRead for Transcript {
    fn challenge_scalar(&mut self, label: &'static [u8]) -> Scalar {
        let mut buf = [0u8; 64];
        self.transcript.challenge_bytes(label, &mut buf);

        // Reduce the 64-byte challenge modulo the scalar field order
        Scalar::from_bytes_wide(&buf)
    }
}
