//! Block execution engine for earshot
//!
//! The [`Engine`] owns every node and runs on the audio thread. Parameters
//! travel to it through lock-free single-producer queues held by
//! [`NodeHandle`]s; events travel back through [`EngineEvents`]. The
//! [`control`] module drives both ends from tokio tasks.

pub mod control;
pub mod engine;
pub mod node;

pub use control::{forward_events, spawn_kernel_update, KernelUpdateTask};
pub use engine::{Engine, EngineConfig, EngineEvents};
pub use node::NodeHandle;
