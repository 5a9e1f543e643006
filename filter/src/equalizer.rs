//! Multichannel filter node.
//!
//! Usage:
//! ```ignore
//! let handle = engine.add_node(EqualizerKernel::new(2));
//! handle.publish(EqualizerParameters {
//!     filter_type: FilterType::Lowpass,
//!     cutoff: 500.0,
//!     ..Default::default()
//! })?;
//! ```
//!
//! Ranges: cutoff 10 - 22050 Hz, Q 1 - 100, gain -80 - 0 dB.

use crate::biquad::ChannelFilterState;
use crate::designer::{self, FilterCoefficients, FilterType};
use dsp_core::{AudioKernel, Error, ExecuteContext, KernelParameters, KernelStatus, Result};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

pub const CUTOFF_RANGE: RangeInclusive<f32> = 10.0..=22050.0;
pub const Q_RANGE: RangeInclusive<f32> = 1.0..=100.0;
pub const GAIN_DB_RANGE: RangeInclusive<f32> = -80.0..=0.0;

/// Highest cutoff handed to the designer, as a fraction of the sample rate
const MAX_NORMALIZED_CUTOFF: f32 = 0.49;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EqualizerParameters {
    pub filter_type: FilterType,
    /// Cutoff (or center) frequency in Hz
    pub cutoff: f32,
    /// Resonance; high values whistle
    pub q: f32,
    pub gain_db: f32,
}

impl Default for EqualizerParameters {
    fn default() -> Self {
        Self {
            filter_type: FilterType::Lowpass,
            cutoff: 5000.0,
            q: 1.0,
            gain_db: 0.0,
        }
    }
}

impl EqualizerParameters {
    /// Clamp every field into its declared range and the cutoff below Nyquist
    pub fn clamped(&self, sample_rate: u32) -> Self {
        let nyquist_limit = sample_rate as f32 * MAX_NORMALIZED_CUTOFF;
        let cutoff = self
            .cutoff
            .clamp(*CUTOFF_RANGE.start(), *CUTOFF_RANGE.end())
            .min(nyquist_limit);
        Self {
            filter_type: self.filter_type,
            cutoff,
            q: self.q.clamp(*Q_RANGE.start(), *Q_RANGE.end()),
            gain_db: self.gain_db.clamp(*GAIN_DB_RANGE.start(), *GAIN_DB_RANGE.end()),
        }
    }

    pub fn coefficients(&self, sample_rate: u32) -> FilterCoefficients {
        designer::design_normalized(
            self.filter_type,
            self.cutoff / sample_rate as f32,
            self.q,
            designer::db_to_linear(self.gain_db),
        )
    }
}

fn check_range(name: &str, value: f32, range: &RangeInclusive<f32>) -> Result<()> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!(
            "{} {} outside {}..={}",
            name,
            value,
            range.start(),
            range.end()
        )))
    }
}

impl KernelParameters for EqualizerParameters {
    fn validate(&self, sample_rate: u32) -> Result<()> {
        check_range("cutoff", self.cutoff, &CUTOFF_RANGE)?;
        check_range("Q", self.q, &Q_RANGE)?;
        check_range("gain (dB)", self.gain_db, &GAIN_DB_RANGE)?;
        designer::validate(self.cutoff, self.q, sample_rate as f32)?;
        designer::validate_gain(self.gain_db)
    }
}

/// Filters every channel of its input with one shared design
pub struct EqualizerKernel {
    channels: Vec<ChannelFilterState>,
    designed_for: Option<EqualizerParameters>,
    coefficients: FilterCoefficients,
}

impl EqualizerKernel {
    pub fn new(channel_count: usize) -> Self {
        Self {
            channels: vec![ChannelFilterState::new(); channel_count],
            designed_for: None,
            coefficients: FilterCoefficients::IDENTITY,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn channel_state(&self, channel: usize) -> Option<&ChannelFilterState> {
        self.channels.get(channel)
    }

    pub fn coefficients(&self) -> &FilterCoefficients {
        &self.coefficients
    }
}

impl AudioKernel for EqualizerKernel {
    type Parameters = EqualizerParameters;

    fn execute(&mut self, context: &mut ExecuteContext<'_, Self::Parameters>) -> Result<KernelStatus> {
        if self.channels.is_empty() {
            context.output.clear();
            return Ok(KernelStatus::Continue);
        }

        // Redesign only when a new snapshot arrived. The initial defaults are
        // never validated, so keep them below Nyquist here.
        if self.designed_for.as_ref() != Some(context.parameters) {
            self.coefficients = context
                .parameters
                .clamped(context.sample_rate)
                .coefficients(context.sample_rate);
            self.designed_for = Some(*context.parameters);
        }

        let channels = context.output.channels();
        for channel in 0..channels {
            let output = context.output.channel_mut(channel);
            match (self.channels.get_mut(channel), channel < context.input.channels()) {
                (Some(state), true) => {
                    state.execute(&self.coefficients, context.input.channel(channel), output)
                }
                _ => output.fill(0.0),
            }
        }

        Ok(KernelStatus::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsp_core::SampleBlock;

    fn run(kernel: &mut EqualizerKernel, parameters: &EqualizerParameters, input: &SampleBlock) -> SampleBlock {
        let mut output = SampleBlock::new(input.channels(), input.frames());
        let mut context = ExecuteContext {
            parameters,
            input,
            output: &mut output,
            sample_rate: 48000,
        };
        assert_eq!(kernel.execute(&mut context).unwrap(), KernelStatus::Continue);
        output
    }

    #[test]
    fn defaults_match_declared_ranges() {
        let p = EqualizerParameters::default();
        assert_eq!(p.filter_type, FilterType::Lowpass);
        assert!(CUTOFF_RANGE.contains(&p.cutoff));
        assert!(Q_RANGE.contains(&p.q));
        assert!(GAIN_DB_RANGE.contains(&p.gain_db));
        assert!(p.validate(48000).is_ok());
    }

    #[test]
    fn validation_rejects_unusable_values() {
        let bad_q = EqualizerParameters {
            q: 0.0,
            ..Default::default()
        };
        assert!(bad_q.validate(48000).is_err());

        let above_nyquist = EqualizerParameters {
            cutoff: 30000.0,
            ..Default::default()
        };
        assert!(above_nyquist.validate(48000).is_err());
        assert!(above_nyquist.clamped(48000).validate(48000).is_ok());
    }

    #[test]
    fn validation_rejects_unusable_gain() {
        for filter_type in [FilterType::Bell, FilterType::Lowshelf, FilterType::Highshelf] {
            for gain_db in [f32::NAN, -1000.0, 6.0] {
                let parameters = EqualizerParameters {
                    filter_type,
                    cutoff: 1000.0,
                    q: 1.0,
                    gain_db,
                };
                assert!(parameters.validate(48000).is_err(), "{:?} {}", filter_type, gain_db);
            }
        }

        let low_q = EqualizerParameters {
            q: 0.5,
            ..Default::default()
        };
        assert!(low_q.validate(48000).is_err());
        let low_cutoff = EqualizerParameters {
            cutoff: 5.0,
            ..Default::default()
        };
        assert!(low_cutoff.validate(48000).is_err());
    }

    #[test]
    fn quietest_shelf_stays_finite() {
        let parameters = EqualizerParameters {
            filter_type: FilterType::Lowshelf,
            cutoff: 1000.0,
            q: 1.0,
            gain_db: -80.0,
        };
        assert!(parameters.validate(48000).is_ok());

        let mut kernel = EqualizerKernel::new(1);
        let input = SampleBlock::from_channels(&[&[1.0; 16]]).unwrap();
        let output = run(&mut kernel, &parameters, &input);
        assert!(output.channel(0).iter().all(|s| s.is_finite()));
        let state = kernel.channel_state(0).unwrap();
        assert!(state.z1.is_finite() && state.z2.is_finite());
    }

    #[test]
    fn defaults_are_kept_below_nyquist_at_low_rates() {
        let mut kernel = EqualizerKernel::new(1);
        let parameters = EqualizerParameters::default();
        assert!(parameters.validate(8000).is_err());

        let input = SampleBlock::from_channels(&[&[1.0; 64]]).unwrap();
        let mut output = SampleBlock::new(1, 64);
        let mut context = ExecuteContext {
            parameters: &parameters,
            input: &input,
            output: &mut output,
            sample_rate: 8000,
        };
        kernel.execute(&mut context).unwrap();

        let expected = parameters.clamped(8000).coefficients(8000);
        assert_eq!(kernel.coefficients(), &expected);
        assert!(kernel.coefficients().g.is_finite() && kernel.coefficients().g > 0.0);
        assert!(output.channel(0).iter().all(|s| s.is_finite()));
    }

    #[test]
    fn clamping_respects_ranges() {
        let wild = EqualizerParameters {
            filter_type: FilterType::Bell,
            cutoff: 1.0,
            q: 500.0,
            gain_db: 12.0,
        };
        let clamped = wild.clamped(44100);
        assert_eq!(clamped.cutoff, 10.0);
        assert_eq!(clamped.q, 100.0);
        assert_eq!(clamped.gain_db, 0.0);

        let high = EqualizerParameters {
            cutoff: 22050.0,
            ..Default::default()
        };
        assert!(high.clamped(44100).cutoff < 22050.0);
    }

    #[test]
    fn zero_channels_output_silence() {
        let mut kernel = EqualizerKernel::new(0);
        let input = SampleBlock::from_channels(&[&[1.0; 8], &[1.0; 8]]).unwrap();
        let output = run(&mut kernel, &EqualizerParameters::default(), &input);
        assert!(output.channel(0).iter().all(|&s| s == 0.0));
        assert!(output.channel(1).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn channels_keep_independent_state() {
        let mut kernel = EqualizerKernel::new(2);
        let parameters = EqualizerParameters {
            cutoff: 1000.0,
            ..Default::default()
        };
        let input = SampleBlock::from_channels(&[&[1.0; 32], &[0.0; 32]]).unwrap();
        let output = run(&mut kernel, &parameters, &input);

        assert!(output.channel(0)[31] > 0.5);
        assert!(output.channel(1).iter().all(|&s| s == 0.0));
        assert_eq!(kernel.channel_state(1), Some(&ChannelFilterState::default()));
        assert_ne!(kernel.channel_state(0), Some(&ChannelFilterState::default()));
    }

    #[test]
    fn matches_single_channel_filter() {
        let parameters = EqualizerParameters {
            filter_type: FilterType::Highpass,
            cutoff: 2000.0,
            q: 2.0,
            gain_db: -3.0,
        };
        let samples: Vec<f32> = (0..64).map(|i| (i as f32 * 0.7).sin()).collect();
        let input = SampleBlock::from_channels(&[&samples]).unwrap();

        let mut kernel = EqualizerKernel::new(1);
        let output = run(&mut kernel, &parameters, &input);

        let coefficients =
            designer::design(FilterType::Highpass, 2000.0, 2.0, -3.0, 48000.0).unwrap();
        let mut expected = vec![0.0; 64];
        ChannelFilterState::new().execute(&coefficients, &samples, &mut expected);

        for (a, b) in output.channel(0).iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }
}
