//! Proof values
//!
//! A [`Proof`] couples the public statement of a method call with the opaque
//! blob issued by the backend. Its [`ProofClass`] says how the verification key
//! is bound: statically, through the tag of a compiled program, or dynamically,
//! through a key supplied inside the circuit that verifies the proof.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::backend::Backend;
use crate::feature_flags::FeatureFlags;
use crate::field::{fields_from_strings, fields_to_strings, from_decimal, to_decimal};
use crate::provable::{Auxiliary, Provable, WitnessType, WitnessValue};
use crate::zkprogram_context::{self, DeclaredProof};
use crate::{Result, Scalar, ZkProgramError};

/// Default domain size of dummy proofs
pub const DEFAULT_DUMMY_DOMAIN_LOG2: u32 = 14;

/// Recursion depth bound of a proof: how many proofs its circuit verified
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum MaxProofsVerified {
    Zero,
    One,
    Two,
}

impl MaxProofsVerified {
    pub fn from_count(count: usize) -> Result<Self> {
        match count {
            0 => Ok(Self::Zero),
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            n => Err(ZkProgramError::Serialization(format!(
                "max proofs verified must be 0, 1 or 2, got {}",
                n
            ))),
        }
    }

    pub fn count(self) -> usize {
        match self {
            Self::Zero => 0,
            Self::One => 1,
            Self::Two => 2,
        }
    }
}

impl TryFrom<u8> for MaxProofsVerified {
    type Error = ZkProgramError;

    fn try_from(value: u8) -> Result<Self> {
        Self::from_count(value as usize)
    }
}

impl From<MaxProofsVerified> for u8 {
    fn from(value: MaxProofsVerified) -> u8 {
        value.count() as u8
    }
}

/// Opaque proof bytes issued by a backend
#[derive(Clone, PartialEq, Eq)]
pub struct RawProof(Vec<u8>);

impl RawProof {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl fmt::Debug for RawProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawProof({} bytes)", self.0.len())
    }
}

/// Encode a proof blob, prefixed with its recursion bound
pub fn proof_to_base64(max_proofs_verified: MaxProofsVerified, proof: &RawProof) -> String {
    let mut bytes = Vec::with_capacity(proof.0.len() + 1);
    bytes.push(u8::from(max_proofs_verified));
    bytes.extend_from_slice(&proof.0);
    STANDARD.encode(bytes)
}

/// Decode a proof blob produced by [`proof_to_base64`]
pub fn proof_of_base64(encoded: &str, max_proofs_verified: MaxProofsVerified) -> Result<RawProof> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| ZkProgramError::Serialization(format!("invalid base64 proof: {}", e)))?;
    match bytes.split_first() {
        Some((&prefix, rest)) if prefix == u8::from(max_proofs_verified) => {
            Ok(RawProof(rest.to_vec()))
        }
        Some((&prefix, _)) => Err(ZkProgramError::Serialization(format!(
            "proof encodes max proofs verified {}, expected {}",
            prefix,
            max_proofs_verified.count()
        ))),
        None => Err(ZkProgramError::Serialization("empty proof".to_string())),
    }
}

/// Public statement of a proof as field vectors
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Statement {
    pub input: Vec<Scalar>,
    pub output: Vec<Scalar>,
}

impl Statement {
    pub fn to_fields(&self) -> Vec<Scalar> {
        let mut fields = self.input.clone();
        fields.extend_from_slice(&self.output);
        fields
    }
}

/// Backend-issued verification key
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationKey {
    /// Hex encoding of the key
    pub data: String,
    #[serde(with = "decimal_scalar")]
    pub hash: Scalar,
}

/// A verification key passed into a circuit: the hash is the field part, the
/// key data travels as auxiliary bytes.
impl Provable for VerificationKey {
    fn size_in_fields() -> usize {
        1
    }

    fn to_fields(&self) -> Vec<Scalar> {
        vec![self.hash]
    }

    fn from_fields(fields: &[Scalar], aux: &Auxiliary) -> Result<Self> {
        let hash = Scalar::from_fields(fields, aux)?;
        let data = String::from_utf8(aux.clone())
            .map_err(|e| ZkProgramError::Serialization(e.to_string()))?;
        Ok(Self { data, hash })
    }

    fn to_auxiliary(&self) -> Auxiliary {
        self.data.as_bytes().to_vec()
    }
}

mod decimal_scalar {
    use super::{from_decimal, to_decimal, Scalar};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Scalar, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&to_decimal(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Scalar, D::Error> {
        let text = String::deserialize(deserializer)?;
        from_decimal(&text).map_err(serde::de::Error::custom)
    }
}

static NEXT_TAG_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_SIDELOADED_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_PROOF_ID: AtomicU64 = AtomicU64::new(1);

struct TagInner {
    id: u64,
    name: String,
}

/// Process-wide identity of a program. Clones share the identity.
#[derive(Clone)]
pub struct ProgramTag(Arc<TagInner>);

impl ProgramTag {
    pub fn new(name: impl Into<String>) -> Self {
        Self(Arc::new(TagInner {
            id: NEXT_TAG_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
        }))
    }

    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }
}

impl PartialEq for ProgramTag {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for ProgramTag {}

impl std::hash::Hash for ProgramTag {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for ProgramTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProgramTag({}#{})", self.0.name, self.0.id)
    }
}

/// How a proof class binds its verification key
#[derive(Clone, Debug, PartialEq)]
pub enum KeySource {
    /// Key fixed when the tagged program is compiled
    Static(ProgramTag),
    /// Key supplied inside the verifying circuit
    Dynamic {
        tag: ProgramTag,
        feature_flags: FeatureFlags,
        max_proofs_verified: MaxProofsVerified,
    },
}

/// Public input/output layout of a family of proofs, plus its key binding
#[derive(Clone, Debug, PartialEq)]
pub struct ProofClass {
    input: WitnessType,
    output: WitnessType,
    key_source: KeySource,
}

impl ProofClass {
    /// Class of proofs produced by the program behind `tag`
    pub fn new<I: Provable, O: Provable>(tag: ProgramTag) -> Self {
        Self {
            input: WitnessType::of::<I>(),
            output: WitnessType::of::<O>(),
            key_source: KeySource::Static(tag),
        }
    }

    /// Class of side-loaded proofs, each class with its own synthetic tag
    pub fn dynamic<I: Provable, O: Provable>(
        max_proofs_verified: MaxProofsVerified,
        feature_flags: FeatureFlags,
    ) -> Self {
        let counter = NEXT_SIDELOADED_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            input: WitnessType::of::<I>(),
            output: WitnessType::of::<O>(),
            key_source: KeySource::Dynamic {
                tag: ProgramTag::new(format!("sideloaded-{}", counter)),
                feature_flags,
                max_proofs_verified,
            },
        }
    }

    pub fn tag(&self) -> &ProgramTag {
        match &self.key_source {
            KeySource::Static(tag) => tag,
            KeySource::Dynamic { tag, .. } => tag,
        }
    }

    pub fn key_source(&self) -> &KeySource {
        &self.key_source
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self.key_source, KeySource::Dynamic { .. })
    }

    /// Recursion bound a dynamic class accepts; static classes take theirs
    /// from the compiled program
    pub fn max_proofs_verified(&self) -> Option<MaxProofsVerified> {
        match &self.key_source {
            KeySource::Static(_) => None,
            KeySource::Dynamic {
                max_proofs_verified,
                ..
            } => Some(*max_proofs_verified),
        }
    }

    pub fn public_input_type(&self) -> &WitnessType {
        &self.input
    }

    pub fn public_output_type(&self) -> &WitnessType {
        &self.output
    }

    /// Field widths of the public input and output
    pub fn statement_size(&self) -> (usize, usize) {
        (self.input.size_in_fields(), self.output.size_in_fields())
    }

    fn check_statement(&self, input: &WitnessValue, output: &WitnessValue) -> Result<()> {
        self.input.check(input)?;
        self.output.check(output)
    }
}

/// JSON interchange form of a proof
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonProof {
    pub public_input: Vec<String>,
    pub public_output: Vec<String>,
    pub max_proofs_verified: MaxProofsVerified,
    pub proof: String,
}

impl JsonProof {
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// A proof together with its public statement
#[derive(Clone, Debug)]
pub struct Proof {
    class: ProofClass,
    public_input: WitnessValue,
    public_output: WitnessValue,
    proof: Option<RawProof>,
    max_proofs_verified: MaxProofsVerified,
    should_verify: bool,
    used_verification_key: Option<VerificationKey>,
    // shared by clones; a declaration frame records each instance once
    instance: u64,
}

impl Proof {
    pub fn new<I: Provable, O: Provable>(
        class: ProofClass,
        public_input: I,
        public_output: O,
        proof: Option<RawProof>,
        max_proofs_verified: MaxProofsVerified,
    ) -> Result<Self> {
        Self::from_values(
            class,
            WitnessValue::new(public_input),
            WitnessValue::new(public_output),
            proof,
            max_proofs_verified,
        )
    }

    /// Build a proof from type-erased statement values
    pub fn from_values(
        class: ProofClass,
        public_input: WitnessValue,
        public_output: WitnessValue,
        proof: Option<RawProof>,
        max_proofs_verified: MaxProofsVerified,
    ) -> Result<Self> {
        class.check_statement(&public_input, &public_output)?;
        Ok(Self {
            class,
            public_input,
            public_output,
            proof,
            max_proofs_verified,
            should_verify: false,
            used_verification_key: None,
            instance: NEXT_PROOF_ID.fetch_add(1, Ordering::Relaxed),
        })
    }

    /// Placeholder proof for base cases of recursive methods. It never
    /// verifies, so it may only be passed where verification is switched off.
    pub fn dummy<I: Provable, O: Provable, B: Backend + ?Sized>(
        class: &ProofClass,
        public_input: I,
        public_output: O,
        max_proofs_verified: MaxProofsVerified,
        domain_log2: u32,
        backend: &B,
    ) -> Result<Self> {
        let raw = backend.dummy_proof(max_proofs_verified, domain_log2)?;
        Self::new(
            class.clone(),
            public_input,
            public_output,
            Some(raw),
            max_proofs_verified,
        )
    }

    /// Re-wrap a proof into a dynamic class with the same statement layout
    pub fn from_proof(class: &ProofClass, proof: &Proof) -> Result<Self> {
        if !class.is_dynamic() {
            return Err(ZkProgramError::TypeMismatch {
                expected: "dynamic proof class".to_string(),
                actual: format!("{:?}", class.tag()),
            });
        }
        Self::from_values(
            class.clone(),
            proof.public_input.clone(),
            proof.public_output.clone(),
            proof.proof.clone(),
            proof.max_proofs_verified,
        )
    }

    pub fn class(&self) -> &ProofClass {
        &self.class
    }

    pub fn public_input<T: Provable>(&self) -> Result<T> {
        self.public_input.get()
    }

    pub fn public_output<T: Provable>(&self) -> Result<T> {
        self.public_output.get()
    }

    pub fn public_input_value(&self) -> &WitnessValue {
        &self.public_input
    }

    pub fn public_output_value(&self) -> &WitnessValue {
        &self.public_output
    }

    /// The backend blob; absent while a circuit is compiled or analyzed
    pub fn raw(&self) -> Option<&RawProof> {
        self.proof.as_ref()
    }

    pub fn max_proofs_verified(&self) -> MaxProofsVerified {
        self.max_proofs_verified
    }

    pub fn should_verify(&self) -> bool {
        self.should_verify
    }

    pub fn used_verification_key(&self) -> Option<&VerificationKey> {
        self.used_verification_key.as_ref()
    }

    /// Identity of this proof value, kept by its clones
    pub fn instance_id(&self) -> u64 {
        self.instance
    }

    /// Verify this proof inside the enclosing circuit
    pub fn verify(&mut self) {
        self.should_verify = true;
    }

    pub fn verify_if(&mut self, condition: bool) {
        self.should_verify = condition;
    }

    /// Verify a dynamic proof against `key` inside the enclosing circuit
    pub fn verify_with_key(&mut self, key: VerificationKey) {
        self.verify_with_key_if(key, true);
    }

    pub fn verify_with_key_if(&mut self, key: VerificationKey, condition: bool) {
        self.used_verification_key = Some(key);
        self.should_verify = condition;
    }

    /// Register this proof with the enclosing method for recursive
    /// verification. Returns `false` outside of a method body. Declaring the
    /// same proof again is a no-op that still returns `true`.
    pub fn declare(&self) -> bool {
        if !zkprogram_context::has() {
            return false;
        }
        zkprogram_context::declare_proof(DeclaredProof {
            class: self.class.clone(),
            proof: self.clone(),
        })
        .is_ok()
    }

    /// Public input and output as field vectors
    pub fn public_fields(&self) -> Statement {
        Statement {
            input: self.public_input.to_fields().to_vec(),
            output: self.public_output.to_fields().to_vec(),
        }
    }

    pub fn to_json(&self) -> Result<JsonProof> {
        let raw = self.proof.as_ref().ok_or_else(|| {
            ZkProgramError::Serialization(
                "proof carries no blob; only proofs returned by a prover can be serialized"
                    .to_string(),
            )
        })?;
        let statement = self.public_fields();
        Ok(JsonProof {
            public_input: fields_to_strings(&statement.input),
            public_output: fields_to_strings(&statement.output),
            max_proofs_verified: self.max_proofs_verified,
            proof: proof_to_base64(self.max_proofs_verified, raw),
        })
    }

    /// Decode a proof of `class` from its JSON form
    pub fn from_json(class: &ProofClass, json: &JsonProof) -> Result<Self> {
        let input = class
            .public_input_type()
            .from_fields_default(&fields_from_strings(&json.public_input)?)?;
        let output = class
            .public_output_type()
            .from_fields_default(&fields_from_strings(&json.public_output)?)?;
        let raw = proof_of_base64(&json.proof, json.max_proofs_verified)?;
        Self::from_values(
            class.clone(),
            input,
            output,
            Some(raw),
            json.max_proofs_verified,
        )
    }
}
