//! Global snark mode flags
//!
//! A single thread-local [`ContextStack`] records whether code is currently
//! compiling, proving or analyzing a circuit, together with the witness values
//! of a genuine proving pass. The query functions read the top frame only.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::args::Arg;
use crate::context::{Channel, ContextStack};
use crate::Result;

/// Payload of the snark context
#[derive(Clone, Default)]
pub struct SnarkContext {
    /// Private inputs of the method being proved
    pub witnesses: Option<Rc<Vec<Arg>>>,
    /// Out-of-band data supplied by the caller of a proving pass
    pub prover_data: Option<Rc<dyn Any>>,
    pub in_prover: bool,
    pub in_compile: bool,
    pub in_checked_computation: bool,
    pub in_analyze: bool,
    pub in_run_and_check: bool,
    pub in_witness_block: bool,
}

impl SnarkContext {
    pub fn compile() -> Self {
        Self {
            in_compile: true,
            ..Self::default()
        }
    }

    pub fn analyze() -> Self {
        Self {
            in_analyze: true,
            ..Self::default()
        }
    }

    pub fn prover(witnesses: Vec<Arg>) -> Self {
        Self {
            witnesses: Some(Rc::new(witnesses)),
            in_prover: true,
            ..Self::default()
        }
    }
}

impl fmt::Debug for SnarkContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnarkContext")
            .field("witnesses", &self.witnesses.as_ref().map(|w| w.len()))
            .field("has_prover_data", &self.prover_data.is_some())
            .field("in_prover", &self.in_prover)
            .field("in_compile", &self.in_compile)
            .field("in_checked_computation", &self.in_checked_computation)
            .field("in_analyze", &self.in_analyze)
            .field("in_run_and_check", &self.in_run_and_check)
            .field("in_witness_block", &self.in_witness_block)
            .finish()
    }
}

thread_local! {
    static SNARK_CONTEXT: ContextStack<SnarkContext> =
        ContextStack::with_default("snark", SnarkContext::default());
}

/// Handle to the snark context channel
pub fn snark_context() -> Channel<SnarkContext> {
    Channel::new(&SNARK_CONTEXT)
}

fn current() -> SnarkContext {
    snark_context().get().unwrap_or_default()
}

pub fn in_prover() -> bool {
    current().in_prover
}

pub fn in_compile() -> bool {
    current().in_compile
}

pub fn in_analyze() -> bool {
    current().in_analyze
}

pub fn in_witness_block() -> bool {
    current().in_witness_block
}

/// Compiling, proving, or explicitly flagged as checked
pub fn in_checked_computation() -> bool {
    let ctx = current();
    ctx.in_compile || ctx.in_prover || ctx.in_checked_computation
}

/// Compiling or analyzing: witness values are placeholders
pub fn in_compile_mode() -> bool {
    let ctx = current();
    ctx.in_compile || ctx.in_analyze
}

/// Witnesses of the current proving pass, if any
pub fn witnesses() -> Option<Rc<Vec<Arg>>> {
    current().witnesses
}

/// Lets a method body running inside a proving pass recover data supplied
/// by the caller without threading it through every signature.
pub struct ProverScope<D>(PhantomData<D>);

impl<D: Clone + 'static> ProverScope<D> {
    /// Run `callback` inside a prover frame carrying `witnesses` and `data`
    pub async fn run<R, Fut>(witnesses: Vec<Arg>, data: D, callback: impl FnOnce() -> Fut) -> Result<R>
    where
        Fut: Future<Output = R>,
    {
        let payload = SnarkContext {
            prover_data: Some(Rc::new(data)),
            ..SnarkContext::prover(witnesses)
        };
        let (result, _) = snark_context().run_with_async(payload, callback).await?;
        Ok(result)
    }

    /// The current frame's prover data, if it has the expected type
    pub fn get_data() -> Option<D> {
        current()
            .prover_data
            .and_then(|data| data.downcast_ref::<D>().cloned())
    }
}
