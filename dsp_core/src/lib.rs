//! Shared types for the earshot DSP crates.
//!
//! Holds the error type, the sample block I/O contract, node identifiers,
//! node events and the kernel trait every processing node implements.

use thiserror::Error;

pub mod block;
pub mod events;
pub mod interp;
pub mod kernel;

pub use block::SampleBlock;
pub use events::{Fault, NodeEvent};
pub use kernel::{AudioKernel, ExecuteContext, KernelParameters, KernelStatus};

/// Default engine sample rate in Hz.
pub const SAMPLE_RATE: u32 = 48000;
/// Default number of frames in one processing quantum.
pub const BLOCK_SIZE: usize = 1024;
/// Output is always stereo (left, right).
pub const CHANNELS: usize = 2;

/// Arena slot of a processing node.
///
/// Slots are reused once a node is removed, so an id is only meaningful
/// while the node it was issued for is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Index of the slot in the node arena
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Unified error type for the DSP crates.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid filter type: {0}")]
    InvalidFilterType(u8),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Buffer overflow: {requested} samples requested with {available} of {capacity} free")]
    BufferOverflow {
        requested: usize,
        available: usize,
        capacity: usize,
    },

    #[error("Index out of range: {offset}+{count} exceeds length {length}")]
    IndexOutOfRange {
        offset: usize,
        count: usize,
        length: usize,
    },

    #[error("Queue full: {0}")]
    QueueFull(String),

    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error), // Catch-all for other errors
}

pub type Result<T> = std::result::Result<T, Error>;
