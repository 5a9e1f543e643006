//! Spatial audio processing for earshot
//!
//! Turns a mono or stereo stream into an interaural time and timbre
//! difference: a per-ear [`DelayLine`] followed by a per-ear directional
//! filter. [`positioning`] derives the per-ear parameters from geometry.

pub mod attenuation;
pub mod config;
pub mod delay;
pub mod ear;
pub mod positioning;
pub mod spatializer;

pub use attenuation::{distance_gain, sound_level_db};
pub use config::{CombineMode, SpatializerConfig};
pub use delay::{DelayLine, RingDelayBuffer};
pub use ear::{EarFilter, EarParameters};
pub use positioning::{spatialize, EarPose, Listener};
pub use spatializer::{Spatializer, SpatializerKernel, SpatializerParameters};
