//! Upstream sample providers pulled by the resampler.

use dsp_core::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seed of every fresh [`NoiseSource`]
pub const NOISE_SEED: u64 = 2747636419;

/// A stream of planar samples.
///
/// `read` fills `buffer` with `buffer.len() / channel_count()` frames laid
/// out channel after channel, and returns how many frames were produced.
/// Fewer frames than requested means the stream has ended.
pub trait SampleSource: Send {
    fn channel_count(&self) -> usize;

    /// A source that cannot be read from (no data, unsupported layout)
    fn is_valid(&self) -> bool;

    fn read(&mut self, buffer: &mut [f32]) -> usize;
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn channel_count(&self) -> usize {
        (**self).channel_count()
    }

    fn is_valid(&self) -> bool {
        (**self).is_valid()
    }

    fn read(&mut self, buffer: &mut [f32]) -> usize {
        (**self).read(buffer)
    }
}

/// A finite in-memory clip with one or two channels
#[derive(Debug, Clone)]
pub struct ClipSource {
    channels: Vec<Vec<f32>>,
    cursor: usize,
}

impl ClipSource {
    pub fn new(channels: Vec<Vec<f32>>) -> Result<Self> {
        if channels.is_empty() || channels.len() > 2 {
            return Err(Error::InvalidArgument(format!(
                "clips have one or two channels, got {}",
                channels.len()
            )));
        }
        if channels.iter().any(|c| c.len() != channels[0].len()) {
            return Err(Error::InvalidArgument(
                "clip channels differ in length".to_string(),
            ));
        }

        Ok(Self { channels, cursor: 0 })
    }

    pub fn mono(samples: Vec<f32>) -> Self {
        Self {
            channels: vec![samples],
            cursor: 0,
        }
    }

    /// `seconds` of a sine at `frequency` Hz
    pub fn tone(frequency: f32, amplitude: f32, seconds: f32, sample_rate: u32) -> Self {
        let frames = (seconds.max(0.0) * sample_rate as f32) as usize;
        let step = 2.0 * std::f32::consts::PI * frequency / sample_rate as f32;
        Self::mono((0..frames).map(|i| (i as f32 * step).sin() * amplitude).collect())
    }

    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, |c| c.len())
    }

    pub fn remaining(&self) -> usize {
        self.frames() - self.cursor
    }

    pub fn rewind(&mut self) {
        self.cursor = 0;
    }
}

impl SampleSource for ClipSource {
    fn channel_count(&self) -> usize {
        self.channels.len()
    }

    fn is_valid(&self) -> bool {
        self.frames() > 0
    }

    fn read(&mut self, buffer: &mut [f32]) -> usize {
        let channels = self.channels.len();
        let requested = buffer.len() / channels;
        if requested == 0 {
            return 0;
        }
        let count = requested.min(self.remaining());

        for (channel, run) in buffer.chunks_exact_mut(requested).take(channels).enumerate() {
            run[..count].copy_from_slice(&self.channels[channel][self.cursor..self.cursor + count]);
        }

        self.cursor += count;
        count
    }
}

/// Endless uniform white noise in [-1, 1) plus a DC offset
#[derive(Debug, Clone)]
pub struct NoiseSource {
    rng: StdRng,
    channels: usize,
    offset: f32,
}

impl NoiseSource {
    pub fn new(channels: usize, offset: f32) -> Self {
        Self::with_seed(channels, offset, NOISE_SEED)
    }

    pub fn with_seed(channels: usize, offset: f32, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            channels,
            offset: offset.clamp(-1.0, 1.0),
        }
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }
}

impl SampleSource for NoiseSource {
    fn channel_count(&self) -> usize {
        self.channels
    }

    fn is_valid(&self) -> bool {
        self.channels > 0
    }

    fn read(&mut self, buffer: &mut [f32]) -> usize {
        if self.channels == 0 {
            return 0;
        }
        for sample in buffer.iter_mut() {
            *sample = self.rng.gen_range(-1.0f32..1.0) + self.offset;
        }
        buffer.len() / self.channels
    }
}
