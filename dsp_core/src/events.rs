use crate::{Error, NodeId};

/// Reason a node was stopped by the engine.
///
/// Kept `Copy` so it can travel through the lock-free event queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// A delay buffer was asked to hold more than its capacity
    BufferOverflow,
    /// A read or shift went past the resident samples
    IndexOutOfRange,
    /// Any other kernel error
    Kernel,
}

impl From<&Error> for Fault {
    fn from(error: &Error) -> Self {
        match error {
            Error::BufferOverflow { .. } => Fault::BufferOverflow,
            Error::IndexOutOfRange { .. } => Fault::IndexOutOfRange,
            _ => Fault::Kernel,
        }
    }
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Fault::BufferOverflow => write!(f, "buffer overflow"),
            Fault::IndexOutOfRange => write!(f, "index out of range"),
            Fault::Kernel => write!(f, "kernel error"),
        }
    }
}

/// Events raised on the audio thread for the control plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeEvent {
    /// A streaming node ran out of source samples and went silent
    StreamFinished {
        /// Node whose source is exhausted
        node: NodeId,
    },

    /// A node hit a fatal error and was deactivated
    Faulted {
        /// Node that failed
        node: NodeId,
        /// What went wrong
        fault: Fault,
    },
}

impl NodeEvent {
    /// Node the event refers to
    pub fn node(&self) -> NodeId {
        match self {
            NodeEvent::StreamFinished { node } => *node,
            NodeEvent::Faulted { node, .. } => *node,
        }
    }
}
