//! Proving and verifying compiled programs

use zkprogram_core::field::fields_from_strings;
use zkprogram_core::proof::proof_of_base64;
use zkprogram_core::snark_context::{snark_context, SnarkContext};
use zkprogram_core::{
    Arg, Backend, BackendProver, JsonProof, MaxProofsVerified, Proof, ProofClass, Provable,
    RawProof, Result, Statement, VerificationKey, ZkProgramError,
};

use crate::method_interface::MethodInterface;

/// Run a compiled prover for one method and wrap its output as a [`Proof`]
/// of `class`
pub async fn prove_method<I: Provable, O: Provable>(
    program: &str,
    class: &ProofClass,
    interface: &MethodInterface,
    prover: &BackendProver,
    max_proofs_verified: MaxProofsVerified,
    public_input: I,
    args: Vec<Arg>,
) -> Result<Proof> {
    let private_fields = interface.arguments_to_fields(&args)?;
    let previous_proofs = interface.previous_proofs(&args)?;
    let public_input_fields = public_input.to_fields();

    tracing::info!(
        program,
        method = %interface.method_name,
        private_fields = private_fields.len(),
        previous_proofs = previous_proofs.len(),
        "proving"
    );

    let (result, _) = snark_context()
        .run_with_async(SnarkContext::prover(args), move || async move {
            prover(&public_input_fields, &previous_proofs)
        })
        .await?;
    let (public_output_fields, raw) = result?;
    let public_output = O::from_fields(&public_output_fields, &O::empty_auxiliary())?;

    tracing::info!(program, method = %interface.method_name, "proof created");
    Proof::new(
        class.clone(),
        public_input,
        public_output,
        Some(raw),
        max_proofs_verified,
    )
}

/// A proof as accepted by [`verify`]: typed, or in its JSON form
#[derive(Clone, Debug)]
pub enum VerifiableProof {
    Typed {
        statement: Statement,
        proof: Option<RawProof>,
    },
    Json(JsonProof),
}

impl VerifiableProof {
    fn into_parts(self) -> Result<(Statement, RawProof)> {
        match self {
            VerifiableProof::Typed { statement, proof } => {
                let proof = proof.ok_or_else(|| {
                    ZkProgramError::Serialization("proof carries no proof blob".to_string())
                })?;
                Ok((statement, proof))
            }
            VerifiableProof::Json(json) => {
                let statement = Statement {
                    input: fields_from_strings(&json.public_input)?,
                    output: fields_from_strings(&json.public_output)?,
                };
                let proof = proof_of_base64(&json.proof, json.max_proofs_verified)?;
                Ok((statement, proof))
            }
        }
    }
}

impl From<&Proof> for VerifiableProof {
    fn from(proof: &Proof) -> Self {
        VerifiableProof::Typed {
            statement: proof.public_fields(),
            proof: proof.raw().cloned(),
        }
    }
}

impl From<Proof> for VerifiableProof {
    fn from(proof: Proof) -> Self {
        VerifiableProof::from(&proof)
    }
}

impl From<JsonProof> for VerifiableProof {
    fn from(json: JsonProof) -> Self {
        VerifiableProof::Json(json)
    }
}

impl From<&JsonProof> for VerifiableProof {
    fn from(json: &JsonProof) -> Self {
        VerifiableProof::Json(json.clone())
    }
}

/// Verify a proof against an explicit verification key
pub async fn verify<B: Backend>(
    proof: impl Into<VerifiableProof>,
    verification_key: &VerificationKey,
    backend: &B,
) -> Result<bool> {
    let (statement, raw) = proof.into().into_parts()?;
    let valid = backend.with_thread_pool(|| backend.verify(&statement, &raw, verification_key))?;
    tracing::debug!(valid, backend = backend.name(), "proof verified");
    Ok(valid)
}
