//! Process-wide tag registries
//!
//! Compiled programs publish their compile output under their tag so that
//! programs taking their proofs as arguments can be compiled afterwards.
//! Side-loaded proof classes get one backend tag per class, created on first
//! use.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use zkprogram_core::{CompiledTag, KeySource, ProgramTag, ProofClass, SideloadedTag};

static COMPILED_TAGS: Lazy<RwLock<HashMap<u64, CompiledTag>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

static SIDELOADED_TAGS: Lazy<RwLock<HashMap<String, SideloadedTag>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Record the compile output of the program behind `tag`, replacing any
/// earlier one
pub fn store_compiled_tag(tag: &ProgramTag, compiled: CompiledTag) {
    tracing::debug!(program = tag.name(), "storing compiled tag");
    COMPILED_TAGS.write().insert(tag.id(), compiled);
}

pub fn compiled_tag(tag: &ProgramTag) -> Option<CompiledTag> {
    COMPILED_TAGS.read().get(&tag.id()).cloned()
}

/// Backend tag of a side-loaded proof class, `None` for static classes
pub fn sideloaded_tag(class: &ProofClass) -> Option<SideloadedTag> {
    let (tag, feature_flags, max_proofs_verified) = match class.key_source() {
        KeySource::Dynamic {
            tag,
            feature_flags,
            max_proofs_verified,
        } => (tag, *feature_flags, *max_proofs_verified),
        KeySource::Static(_) => return None,
    };

    if let Some(existing) = SIDELOADED_TAGS.read().get(tag.name()) {
        return Some(existing.clone());
    }

    let (public_input_size, public_output_size) = class.statement_size();
    let created = SIDELOADED_TAGS
        .write()
        .entry(tag.name().to_string())
        .or_insert_with(|| SideloadedTag {
            name: tag.name().to_string(),
            max_proofs_verified,
            public_input_size,
            public_output_size,
            feature_flags,
        })
        .clone();
    Some(created)
}
