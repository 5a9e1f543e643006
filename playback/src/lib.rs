//! Streaming playback for earshot.
//!
//! A [`SampleSource`] is pulled through a [`LinearResampler`] at a
//! per-sample rate; [`ClipPlayerKernel`] runs that inside the engine.

pub mod clip_player;
pub mod resampler;
pub mod source;

pub use clip_player::{ClipPlayerKernel, ClipPlayerParameters};
pub use resampler::LinearResampler;
pub use source::{ClipSource, NoiseSource, SampleSource};
