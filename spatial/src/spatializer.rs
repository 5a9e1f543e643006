use crate::config::SpatializerConfig;
use crate::delay::DelayLine;
use crate::ear::{EarFilter, EarParameters};
use dsp_core::kernel::{AudioKernel, ExecuteContext, KernelParameters, KernelStatus};
use dsp_core::{Error, Result};

/// Parameters for both ears, published as one snapshot
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpatializerParameters {
    pub left: EarParameters,
    pub right: EarParameters,
}

impl SpatializerParameters {
    /// Delay of the left ear minus delay of the right ear, in samples
    pub fn interaural_delay(&self) -> f32 {
        self.left.delay_samples - self.right.delay_samples
    }
}

fn check_ear(name: &str, ear: &EarParameters) -> Result<()> {
    let values = [
        ear.delay_samples,
        ear.distance,
        ear.transverse,
        ear.sagittal,
        ear.coronal,
    ];
    if values.iter().any(|v| !v.is_finite()) {
        return Err(Error::InvalidArgument(format!(
            "{} ear parameters must be finite: {:?}",
            name, ear
        )));
    }
    if ear.delay_samples < 0.0 || ear.distance < 0.0 {
        return Err(Error::InvalidArgument(format!(
            "{} ear delay and distance must not be negative",
            name
        )));
    }
    Ok(())
}

impl KernelParameters for SpatializerParameters {
    fn validate(&self, _sample_rate: u32) -> Result<()> {
        check_ear("left", &self.left)?;
        check_ear("right", &self.right)
    }
}

/// Delay line and filter of one ear
#[derive(Debug, Clone)]
struct Ear {
    delay: DelayLine,
    filter: EarFilter,
}

impl Ear {
    fn new(config: &SpatializerConfig, max_delay_samples: usize) -> Self {
        Self {
            delay: DelayLine::new(max_delay_samples),
            filter: EarFilter::new(config.combine_mode),
        }
    }

    fn process(
        &mut self,
        params: &EarParameters,
        input: &[f32],
        output: &mut [f32],
        sample_rate: u32,
        config: &SpatializerConfig,
    ) -> Result<()> {
        self.delay.process(input, params.delay(), output)?;
        self.filter.process(params, output, sample_rate, config);
        Ok(())
    }

    fn reset(&mut self) {
        self.delay.reset();
        self.filter.reset();
    }
}

/// Interaural time and timbre difference for a stereo pair.
///
/// Each ear lags its input by its own delay, then runs it through the ear's
/// directional filter.
#[derive(Debug, Clone)]
pub struct Spatializer {
    config: SpatializerConfig,
    sample_rate: u32,
    left: Ear,
    right: Ear,
}

impl Spatializer {
    /// `max_delay_samples` is the delay line capacity per ear; the usable
    /// delay is that minus one block.
    pub fn new(config: SpatializerConfig, sample_rate: u32, max_delay_samples: usize) -> Self {
        let left = Ear::new(&config, max_delay_samples);
        let right = Ear::new(&config, max_delay_samples);
        Self {
            config,
            sample_rate,
            left,
            right,
        }
    }

    pub fn config(&self) -> &SpatializerConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
    }

    /// Drop delayed samples and filter history of both ears
    pub fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }

    pub fn process(
        &mut self,
        left: &EarParameters,
        right: &EarParameters,
        input_l: &[f32],
        input_r: &[f32],
        output_l: &mut [f32],
        output_r: &mut [f32],
    ) -> Result<()> {
        self.left
            .process(left, input_l, output_l, self.sample_rate, &self.config)?;
        self.right
            .process(right, input_r, output_r, self.sample_rate, &self.config)
    }
}

/// Engine node around a [`Spatializer`]: stereo out, mono input feeds both ears
pub struct SpatializerKernel {
    spatializer: Spatializer,
}

impl SpatializerKernel {
    pub fn new(spatializer: Spatializer) -> Self {
        Self { spatializer }
    }

    pub fn spatializer(&self) -> &Spatializer {
        &self.spatializer
    }
}

impl AudioKernel for SpatializerKernel {
    type Parameters = SpatializerParameters;

    fn execute(&mut self, context: &mut ExecuteContext<'_, Self::Parameters>) -> Result<KernelStatus> {
        if context.output.channels() < 2 {
            return Err(Error::InvalidArgument(format!(
                "spatializer needs a stereo output, got {} channel(s)",
                context.output.channels()
            )));
        }

        if context.input.channels() == 0 {
            context.output.clear();
            return Ok(KernelStatus::Continue);
        }

        if self.spatializer.sample_rate() != context.sample_rate {
            self.spatializer.set_sample_rate(context.sample_rate);
        }

        let input = context.input;
        let input_l = input.channel(0);
        let input_r = if input.channels() > 1 {
            input.channel(1)
        } else {
            input_l
        };

        for channel in 2..context.output.channels() {
            context.output.channel_mut(channel).fill(0.0);
        }

        let params = *context.parameters;
        let (output_l, output_r) = context.output.stereo_mut();
        self.spatializer
            .process(&params.left, &params.right, input_l, input_r, output_l, output_r)?;

        Ok(KernelStatus::Continue)
    }
}
