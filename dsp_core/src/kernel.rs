//! The contract between the engine and a processing node.
//!
//! A kernel owns all of its mutable state (filter integrators, delay
//! buffers, resampler cursors) and is driven by the engine once per block
//! on the audio thread. Parameters arrive as whole snapshots; a kernel never
//! observes a half-updated parameter set.

use crate::{Result, SampleBlock};

/// Parameter snapshot published from the control plane to a kernel.
///
/// Validation runs once, when the snapshot is published, never per block.
pub trait KernelParameters: Copy + Default + Send + 'static {
    /// Reject values the kernel cannot process at `sample_rate`
    fn validate(&self, _sample_rate: u32) -> Result<()> {
        Ok(())
    }
}

/// Outcome of one block of processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelStatus {
    /// Keep scheduling the node
    Continue,
    /// The node's stream ended; it now produces silence
    Finished,
}

/// Everything a kernel sees for one block
pub struct ExecuteContext<'a, P> {
    /// Newest parameter snapshot
    pub parameters: &'a P,
    /// Block produced by the previous node in the chain (or the host input)
    pub input: &'a SampleBlock,
    /// Block to fill; same shape as the engine's block
    pub output: &'a mut SampleBlock,
    /// Engine sample rate in Hz
    pub sample_rate: u32,
}

/// A real-time processing node.
///
/// `execute` must not allocate, block or panic. Errors are returned and make
/// the engine deactivate the node.
pub trait AudioKernel: Send + 'static {
    type Parameters: KernelParameters;

    fn execute(&mut self, context: &mut ExecuteContext<'_, Self::Parameters>)
        -> Result<KernelStatus>;
}
