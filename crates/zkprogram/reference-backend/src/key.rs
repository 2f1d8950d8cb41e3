//! Verification keys
//!
//! A key commits to the program shape: statement sizes, recursion bound, wrap
//! domain and, per rule, the constraint digest, feature flags and the keys of
//! the proofs it verifies. Key data is the hex of the hash bytes followed by
//! the recursion bound and wrap domain.

use zkprogram_core::{CompileConfig, MaxProofsVerified, ProofToVerify, Rule, Scalar, VerificationKey};

use crate::errors::{BackendError, Result};
use crate::transcript::{Transcript, TranscriptRead, TranscriptWrite};

const KEY_DATA_LEN: usize = 34;

/// Shape of one compiled rule
#[derive(Clone, Debug, PartialEq)]
pub struct RuleShape {
    pub identifier: String,
    pub rows: usize,
    pub digest: String,
}

/// Derive the verification key of a program from its rules
pub fn derive_key(config: &CompileConfig, rules: &[Rule], shapes: &[RuleShape]) -> VerificationKey {
    let mut transcript = Transcript::new(b"zkprogram-reference-vk");
    transcript.append_u64(b"public-input-size", config.public_input_size as u64);
    transcript.append_u64(b"public-output-size", config.public_output_size as u64);
    transcript.append_u64(b"max-proofs-verified", config.max_proofs_verified.count() as u64);
    transcript.append_u64(b"wrap-domain", config.wrap_domain as u64);
    transcript.append_u64(b"rules", rules.len() as u64);

    for (rule, shape) in rules.iter().zip(shapes) {
        transcript.append_message(b"rule", rule.identifier.as_bytes());
        transcript.append_message(b"constraints", shape.digest.as_bytes());
        transcript.append_message(b"feature-flags", &rule.feature_flags.to_bytes());
        for target in &rule.proofs_to_verify {
            match target {
                ProofToVerify::SelfProof => transcript.append_message(b"verifies", b"self"),
                ProofToVerify::Compiled(tag) => {
                    transcript.append_message(b"verifies", b"compiled");
                    transcript.append_key(&tag.verification_key);
                }
                ProofToVerify::Sideloaded(tag) => {
                    transcript.append_message(b"verifies", b"sideloaded");
                    transcript.append_message(b"tag", tag.name.as_bytes());
                    transcript.append_message(b"feature-flags", &tag.feature_flags.to_bytes());
                }
            }
        }
    }

    let hash = transcript.challenge_scalar(b"vk-hash");
    let mut data = Vec::with_capacity(KEY_DATA_LEN);
    data.extend_from_slice(&hash.to_bytes());
    data.push(u8::from(config.max_proofs_verified));
    data.push(config.wrap_domain);
    VerificationKey {
        data: hex::encode(data),
        hash,
    }
}

/// Parameters encoded in a key's data
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KeyParams {
    pub max_proofs_verified: MaxProofsVerified,
    pub wrap_domain: u8,
}

/// Decode a key's data and check it against the key's hash
pub fn decode_key(key: &VerificationKey) -> Result<KeyParams> {
    let bytes = hex::decode(&key.data).map_err(|e| BackendError::MalformedKey(e.to_string()))?;
    if bytes.len() != KEY_DATA_LEN {
        return Err(BackendError::MalformedKey(format!(
            "expected {} bytes, got {}",
            KEY_DATA_LEN,
            bytes.len()
        )));
    }
    let mut repr = [0u8; 32];
    repr.copy_from_slice(&bytes[..32]);
    let hash = Option::<Scalar>::from(Scalar::from_bytes(&repr))
        .ok_or_else(|| BackendError::MalformedKey("hash is not a field element".to_string()))?;
    if hash != key.hash {
        return Err(BackendError::MalformedKey(
            "key data does not match its hash".to_string(),
        ));
    }
    let max_proofs_verified = MaxProofsVerified::from_count(bytes[32] as usize)
        .map_err(|e| BackendError::MalformedKey(e.to_string()))?;
    Ok(KeyParams {
        max_proofs_verified,
        wrap_domain: bytes[33],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use zkprogram_core::FeatureFlags;

    fn config(wrap_domain: u8) -> CompileConfig {
        CompileConfig {
            program: "Keyed".to_string(),
            public_input_size: 1,
            public_output_size: 0,
            max_proofs_verified: MaxProofsVerified::One,
            wrap_domain,
        }
    }

    fn rule(identifier: &str) -> (Rule, RuleShape) {
        let rule = Rule {
            identifier: identifier.to_string(),
            main: Box::new(|_, _| Ok(Default::default())),
            proofs_to_verify: vec![ProofToVerify::SelfProof],
            feature_flags: FeatureFlags::all_none(),
        };
        let shape = RuleShape {
            identifier: identifier.to_string(),
            rows: 0,
            digest: "00".to_string(),
        };
        (rule, shape)
    }

    #[test]
    fn test_key_round_trip() {
        let (rule, shape) = rule("step");
        let key = derive_key(&config(1), &[rule], &[shape]);
        let params = decode_key(&key).unwrap();
        assert_eq!(params.max_proofs_verified, MaxProofsVerified::One);
        assert_eq!(params.wrap_domain, 1);
    }

    #[test]
    fn test_key_binds_shape() {
        let (a, shape_a) = rule("step");
        let (b, shape_b) = rule("other");
        let key_a = derive_key(&config(1), &[a], &[shape_a.clone()]);
        let key_b = derive_key(&config(1), &[b], &[shape_b]);
        assert_ne!(key_a.hash, key_b.hash);

        let (a, _) = rule("step");
        assert_ne!(key_a, derive_key(&config(0), &[a], &[shape_a]));
    }

    #[test]
    fn test_tampered_key_is_rejected() {
        let (rule, shape) = rule("step");
        let mut key = derive_key(&config(1), &[rule], &[shape]);
        key.hash += Scalar::one();
        assert!(matches!(decode_key(&key), Err(BackendError::MalformedKey(_))));

        key.data = "zz".to_string();
        assert!(decode_key(&key).is_err());
    }
}
