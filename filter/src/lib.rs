//! State-variable filters for earshot.
//!
//! [`designer`] turns (type, cutoff, Q, gain) into coefficients, [`biquad`]
//! runs them over a channel, and [`equalizer`] packages both as an engine
//! node.

pub mod biquad;
pub mod designer;
pub mod equalizer;

pub use biquad::ChannelFilterState;
pub use designer::{design, design_normalized, FilterCoefficients, FilterType};
pub use equalizer::{EqualizerKernel, EqualizerParameters};
