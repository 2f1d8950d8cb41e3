//! Proof encoding
//!
//! A proof is a header followed by a compressed G1 point. The header holds the
//! proof kind, the recursion bound and the domain (wrap domain for real
//! proofs, log2 domain size for dummies). A real proof's point is the generator
//! scaled by a challenge over the key, the statement and the header, so it
//! verifies only for the statement and key it was made for.

use std::io::{Cursor, Read};

use bls12_381::{G1Affine, G1Projective};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use group::Curve;
use subtle::ConstantTimeEq;
use zkprogram_core::{MaxProofsVerified, RawProof, Scalar, Statement, VerificationKey};

use crate::errors::{BackendError, Result};
use crate::key::decode_key;
use crate::transcript::{Transcript, TranscriptRead, TranscriptWrite};

const POINT_LEN: usize = 48;

/// Kind byte of a proof
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProofKind {
    Real = 0,
    Dummy = 1,
}

/// Decoded proof header and body
#[derive(Clone, Debug, PartialEq)]
pub struct ProofParts {
    pub kind: ProofKind,
    pub max_proofs_verified: MaxProofsVerified,
    pub domain: u32,
    pub point: G1Affine,
}

impl ProofParts {
    pub fn encode(&self) -> RawProof {
        let mut bytes = Vec::with_capacity(6 + POINT_LEN);
        // Writes into a Vec cannot fail
        let _ = bytes.write_u8(self.kind as u8);
        let _ = bytes.write_u8(u8::from(self.max_proofs_verified));
        let _ = bytes.write_u32::<BigEndian>(self.domain);
        bytes.extend_from_slice(&self.point.to_compressed());
        RawProof::new(bytes)
    }

    pub fn decode(proof: &RawProof) -> Result<Self> {
        let mut cursor = Cursor::new(proof.as_bytes());
        let kind = match cursor.read_u8()? {
            0 => ProofKind::Real,
            1 => ProofKind::Dummy,
            other => {
                return Err(BackendError::MalformedProof(format!(
                    "unknown proof kind {}",
                    other
                )))
            }
        };
        let max_proofs_verified = MaxProofsVerified::from_count(cursor.read_u8()? as usize)
            .map_err(|e| BackendError::MalformedProof(e.to_string()))?;
        let domain = cursor.read_u32::<BigEndian>()?;

        let mut compressed = [0u8; POINT_LEN];
        cursor.read_exact(&mut compressed)?;
        if (cursor.position() as usize) != proof.as_bytes().len() {
            return Err(BackendError::MalformedProof("trailing bytes".to_string()));
        }
        let point = Option::<G1Affine>::from(G1Affine::from_compressed(&compressed))
            .ok_or_else(|| BackendError::MalformedProof("invalid curve point".to_string()))?;

        Ok(Self {
            kind,
            max_proofs_verified,
            domain,
            point,
        })
    }
}

fn proof_challenge(
    key: &VerificationKey,
    statement: &Statement,
    max_proofs_verified: MaxProofsVerified,
    domain: u32,
) -> Scalar {
    let mut transcript = Transcript::new(b"zkprogram-reference-proof");
    transcript.append_key(key);
    transcript.append_statement(statement);
    transcript.append_u64(b"max-proofs-verified", max_proofs_verified.count() as u64);
    transcript.append_u64(b"domain", domain as u64);
    transcript.challenge_scalar(b"proof")
}

fn proof_point(challenge: Scalar) -> G1Affine {
    (G1Projective::generator() * challenge).to_affine()
}

/// Create a proof of `statement` under `key`
pub fn create_proof(key: &VerificationKey, statement: &Statement) -> Result<RawProof> {
    let params = decode_key(key)?;
    let domain = params.wrap_domain as u32;
    let challenge = proof_challenge(key, statement, params.max_proofs_verified, domain);
    Ok(ProofParts {
        kind: ProofKind::Real,
        max_proofs_verified: params.max_proofs_verified,
        domain,
        point: proof_point(challenge),
    }
    .encode())
}

/// A placeholder proof. It decodes like a real one but never verifies.
pub fn dummy_proof(max_proofs_verified: MaxProofsVerified, domain_log2: u32) -> RawProof {
    ProofParts {
        kind: ProofKind::Dummy,
        max_proofs_verified,
        domain: domain_log2,
        point: G1Affine::identity(),
    }
    .encode()
}

/// Check `proof` against `statement` and `key`. Malformed proofs and keys are
/// errors; dummies and proofs for another statement or key are rejected.
pub fn verify_proof(key: &VerificationKey, statement: &Statement, proof: &RawProof) -> Result<bool> {
    let params = decode_key(key)?;
    let parts = ProofParts::decode(proof)?;
    if parts.kind == ProofKind::Dummy {
        return Ok(false);
    }
    if parts.max_proofs_verified != params.max_proofs_verified
        || parts.domain != params.wrap_domain as u32
    {
        return Ok(false);
    }
    let expected = proof_point(proof_challenge(
        key,
        statement,
        parts.max_proofs_verified,
        parts.domain,
    ));
    Ok(bool::from(expected.ct_eq(&parts.point)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{derive_key, RuleShape};
    use zkprogram_core::{CompileConfig, FeatureFlags, Rule};

    fn key() -> VerificationKey {
        let config = CompileConfig {
            program: "Proofs".to_string(),
            public_input_size: 1,
            public_output_size: 1,
            max_proofs_verified: MaxProofsVerified::Zero,
            wrap_domain: 0,
        };
        let rule = Rule {
            identifier: "m".to_string(),
            main: Box::new(|_, _| Ok(Default::default())),
            proofs_to_verify: Vec::new(),
            feature_flags: FeatureFlags::all_none(),
        };
        let shape = RuleShape {
            identifier: "m".to_string(),
            rows: 0,
            digest: String::new(),
        };
        derive_key(&config, &[rule], &[shape])
    }

    fn statement(input: u64) -> Statement {
        Statement {
            input: vec![Scalar::from(input)],
            output: vec![Scalar::from(input + 1)],
        }
    }

    #[test]
    fn test_proof_verifies_only_its_statement() {
        let key = key();
        let proof = create_proof(&key, &statement(1)).unwrap();
        assert!(verify_proof(&key, &statement(1), &proof).unwrap());
        assert!(!verify_proof(&key, &statement(2), &proof).unwrap());
    }

    #[test]
    fn test_dummy_never_verifies() {
        let proof = dummy_proof(MaxProofsVerified::Zero, 14);
        let parts = ProofParts::decode(&proof).unwrap();
        assert_eq!(parts.kind, ProofKind::Dummy);
        assert_eq!(parts.domain, 14);
        assert!(!verify_proof(&key(), &statement(1), &proof).unwrap());
    }

    #[test]
    fn test_malformed_proofs() {
        let key = key();
        assert!(verify_proof(&key, &statement(1), &RawProof::new(vec![])).is_err());
        assert!(verify_proof(&key, &statement(1), &RawProof::new(vec![7; 54])).is_err());

        let mut bytes = create_proof(&key, &statement(1)).unwrap().into_bytes();
        bytes.push(0);
        assert!(matches!(
            verify_proof(&key, &statement(1), &RawProof::new(bytes)),
            Err(BackendError::MalformedProof(_))
        ));
    }
}
