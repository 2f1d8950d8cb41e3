//! # ZkProgram Examples
//!
//! Recursive proof programs built on the reference backend:
//!
//! - [`recursive_sum`]: a program that verifies its own proofs
//! - [`sum_of_squares`]: a program verifying proofs of another program
//! - [`sideloaded`]: verifying proofs against a key supplied at proving time

pub mod recursive_sum;
pub mod sideloaded;
pub mod sum_of_squares;

use std::rc::Rc;

use reference_backend::ReferenceBackend;
use tracing_subscriber::EnvFilter;

// Re-export for convenience
pub use reference_backend;
pub use zkprogram;

/// Install a fmt subscriber honouring `RUST_LOG`, defaulting to `info`.
/// Later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub fn backend() -> Rc<ReferenceBackend> {
    Rc::new(ReferenceBackend::default())
}

/// Run every example
pub fn run_all_examples() -> anyhow::Result<()> {
    futures::executor::block_on(async {
        recursive_sum::run().await?;
        sum_of_squares::run().await?;
        sideloaded::run().await?;
        Ok(())
    })
}
