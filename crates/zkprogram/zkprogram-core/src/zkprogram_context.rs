//! Registry of proofs declared while a method body runs
//!
//! The rule constructor opens a frame before calling the user function; every
//! proof argument that will be recursively verified records itself here so the
//! rule can compare the declared count with the method's proof arguments.

use crate::context::{Channel, ContextId, ContextStack};
use crate::proof::{Proof, ProofClass};
use crate::Result;

/// A proof registered for recursive verification
#[derive(Clone, Debug)]
pub struct DeclaredProof {
    pub class: ProofClass,
    pub proof: Proof,
}

#[derive(Clone, Debug, Default)]
pub struct ProofDeclarations {
    pub proofs: Vec<DeclaredProof>,
}

thread_local! {
    static ZKPROGRAM_CONTEXT: ContextStack<ProofDeclarations> = ContextStack::new("zkprogram");
}

fn channel() -> Channel<ProofDeclarations> {
    Channel::new(&ZKPROGRAM_CONTEXT)
}

/// Open a fresh, empty declaration frame
#[track_caller]
pub fn enter() -> Result<ContextId> {
    Ok(channel().enter(ProofDeclarations::default())?)
}

/// Close a frame, returning what was declared in it
pub fn leave(id: ContextId) -> Result<Vec<DeclaredProof>> {
    Ok(channel().leave(id)?.proofs)
}

/// Run `f` inside a fresh declaration frame; the frame is closed on every
/// exit path and its declarations are returned with the result
#[track_caller]
pub fn run<R>(f: impl FnOnce() -> R) -> Result<(R, Vec<DeclaredProof>)> {
    let (result, frame) = channel().run_with(ProofDeclarations::default(), f)?;
    Ok((result, frame.proofs))
}

pub fn has() -> bool {
    channel().has()
}

/// Record a proof in the innermost frame. A proof instance already recorded
/// there is not recorded twice; returns whether it was newly added.
pub fn declare_proof(declared: DeclaredProof) -> Result<bool> {
    let added = channel().update(|frame| {
        let instance = declared.proof.instance_id();
        if frame
            .proofs
            .iter()
            .any(|existing| existing.proof.instance_id() == instance)
        {
            return false;
        }
        frame.proofs.push(declared);
        true
    })?;
    Ok(added)
}

/// Proofs declared so far in the innermost frame
pub fn get_declared_proofs() -> Result<Vec<DeclaredProof>> {
    Ok(channel().get()?.proofs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proof::{MaxProofsVerified, ProgramTag};
    use crate::{Scalar, ZkProgramError};

    fn sample_proof() -> Proof {
        let class = ProofClass::new::<Scalar, ()>(ProgramTag::new("Sample"));
        Proof::new(class, Scalar::one(), (), None, MaxProofsVerified::Zero).unwrap()
    }

    #[test]
    fn test_declare_outside_frame_fails() {
        assert!(!has());
        let proof = sample_proof();
        let err = declare_proof(DeclaredProof {
            class: proof.class().clone(),
            proof,
        })
        .unwrap_err();
        assert!(matches!(err, ZkProgramError::Context(_)));
    }

    #[test]
    fn test_frames_collect_declarations() {
        let outer = enter().unwrap();
        let proof = sample_proof();
        declare_proof(DeclaredProof {
            class: proof.class().clone(),
            proof: proof.clone(),
        })
        .unwrap();

        assert!(!declare_proof(DeclaredProof {
            class: proof.class().clone(),
            proof: proof.clone(),
        })
        .unwrap());

        let inner = enter().unwrap();
        assert!(get_declared_proofs().unwrap().is_empty());
        assert!(leave(inner).unwrap().is_empty());

        assert_eq!(get_declared_proofs().unwrap().len(), 1);
        let declared = leave(outer).unwrap();
        assert_eq!(declared.len(), 1);
        assert!(!has());
    }

    #[test]
    fn test_run_returns_declarations() {
        let (seen, declared) = run(|| {
            let proof = sample_proof();
            assert!(proof.declare());
            get_declared_proofs().unwrap().len()
        })
        .unwrap();
        assert_eq!(seen, 1);
        assert_eq!(declared.len(), 1);
        assert!(!has());
    }
}
