//! # Recursive Proof Demonstration
//!
//! Compiles and proves every example program: a self-recursive running sum,
//! a program verifying proofs of another program, and side-loaded
//! verification with a key passed as a private input.
//!
//! Run with: `cargo run --example recursion_demo`
//! Set `RUST_LOG=debug` to see compile and prove details.

use std::time::Instant;

use zkprogram_examples::{init_tracing, run_all_examples};

fn main() -> anyhow::Result<()> {
    init_tracing();

    let start = Instant::now();
    run_all_examples()?;
    tracing::info!(elapsed_ms = start.elapsed().as_millis() as u64, "all examples passed");
    Ok(())
}
