//! earshot: interaural spatialization on a block-based audio engine.
//!
//! Re-exports the workspace crates under one roof:
//!
//! - [`dsp_core`]: block I/O contract, errors, kernel trait
//! - [`filter`]: state-variable filter design and execution
//! - [`spatial`]: delay lines, ear filters, the spatializer
//! - [`playback`]: sample sources and the resampling clip player
//! - [`audio`]: node arena, parameter queues, control tasks
//! - [`settings_manager`]: persisted settings

pub use audio;
pub use dsp_core;
pub use filter;
pub use playback;
pub use settings_manager;
pub use spatial;

pub use audio::{Engine, EngineConfig, EngineEvents, NodeHandle};
pub use dsp_core::{Error, NodeEvent, NodeId, Result, SampleBlock};
