use crate::resampler::{LinearResampler, MAX_RATE};
use crate::source::SampleSource;
use dsp_core::interp::lerp;
use dsp_core::kernel::{AudioKernel, ExecuteContext, KernelParameters, KernelStatus};
use dsp_core::{Error, Result};
use log::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipPlayerParameters {
    /// Source frames per output frame
    pub rate: f32,
}

impl Default for ClipPlayerParameters {
    fn default() -> Self {
        Self { rate: 1.0 }
    }
}

impl KernelParameters for ClipPlayerParameters {
    fn validate(&self, _sample_rate: u32) -> Result<()> {
        if !self.rate.is_finite() || self.rate < 0.0 || self.rate as f64 > MAX_RATE {
            return Err(Error::InvalidArgument(format!(
                "playback rate must be within 0..={}, got {}",
                MAX_RATE, self.rate
            )));
        }
        Ok(())
    }
}

/// Plays a [`SampleSource`] through a [`LinearResampler`].
///
/// Rate changes are ramped across one block. Once the source is exhausted the
/// kernel reports [`KernelStatus::Finished`] and stays silent. Frames of the
/// last pull that were not yet played when the source came up short are
/// dropped, so up to one pull buffer of the clip's end is never heard.
pub struct ClipPlayerKernel {
    source: Box<dyn SampleSource>,
    resampler: LinearResampler,
    rates: Box<[f32]>,
    scratch: Box<[f32]>,
    previous_rate: Option<f32>,
    playing: bool,
}

impl ClipPlayerKernel {
    pub fn new(source: Box<dyn SampleSource>, pull_frames: usize, block_size: usize) -> Self {
        Self {
            source,
            resampler: LinearResampler::new(pull_frames),
            rates: vec![1.0; block_size].into_boxed_slice(),
            scratch: vec![0.0; block_size].into_boxed_slice(),
            previous_rate: None,
            playing: true,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Start over from the beginning of the resampler state; the source is not rewound
    pub fn restart(&mut self) {
        self.resampler.reset();
        self.previous_rate = None;
        self.playing = true;
    }

    fn ramp_rates(&mut self, target: f32, frames: usize) {
        let start = self.previous_rate.unwrap_or(target);
        for (i, rate) in self.rates[..frames].iter_mut().enumerate() {
            *rate = lerp(start, target, (i + 1) as f32 / frames as f32);
        }
        self.previous_rate = Some(target);
    }
}

impl AudioKernel for ClipPlayerKernel {
    type Parameters = ClipPlayerParameters;

    fn execute(&mut self, context: &mut ExecuteContext<'_, Self::Parameters>) -> Result<KernelStatus> {
        if !self.playing || context.output.channels() == 0 {
            context.output.clear();
            return Ok(KernelStatus::Continue);
        }

        let frames = context.output.frames();
        if frames > self.rates.len() {
            return Err(Error::InvalidArgument(format!(
                "block of {} frames exceeds the player's {} frame rate buffer",
                frames,
                self.rates.len()
            )));
        }

        self.ramp_rates(context.parameters.rate, frames);

        for channel in 2..context.output.channels() {
            context.output.channel_mut(channel).fill(0.0);
        }

        let rates = &self.rates[..frames];
        let finished = if context.output.channels() == 1 {
            let scratch = &mut self.scratch[..frames];
            self.resampler.resample_lerp_read(
                &mut self.source,
                context.output.channel_mut(0),
                scratch,
                rates,
            )
        } else {
            let (left, right) = context.output.stereo_mut();
            self.resampler
                .resample_lerp_read(&mut self.source, left, right, rates)
        };

        if finished {
            debug!("clip source exhausted");
            self.playing = false;
            return Ok(KernelStatus::Finished);
        }
        Ok(KernelStatus::Continue)
    }
}
