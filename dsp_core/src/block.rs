/// One processing quantum: `channels` planar runs of `frames` samples.
///
/// The shape is fixed at construction; processing never reallocates.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBlock {
    channels: usize,
    frames: usize,
    data: Vec<f32>,
}

impl SampleBlock {
    /// Create a silent block
    pub fn new(channels: usize, frames: usize) -> Self {
        Self {
            channels,
            frames,
            data: vec![0.0; channels * frames],
        }
    }

    /// Create a block from per-channel sample runs. All runs must have equal length.
    pub fn from_channels(channels: &[&[f32]]) -> crate::Result<Self> {
        let frames = channels.first().map(|c| c.len()).unwrap_or(0);
        if channels.iter().any(|c| c.len() != frames) {
            return Err(crate::Error::InvalidArgument(
                "channel runs differ in length".to_string(),
            ));
        }

        let mut block = Self::new(channels.len(), frames);
        for (index, samples) in channels.iter().enumerate() {
            block.channel_mut(index).copy_from_slice(samples);
        }
        Ok(block)
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    #[inline]
    pub fn channel(&self, channel: usize) -> &[f32] {
        let start = channel * self.frames;
        &self.data[start..start + self.frames]
    }

    #[inline]
    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        let start = channel * self.frames;
        &mut self.data[start..start + self.frames]
    }

    /// Mutable views of the first two channels at once.
    ///
    /// A mono block yields its only channel as left and an empty right.
    pub fn stereo_mut(&mut self) -> (&mut [f32], &mut [f32]) {
        let frames = self.frames;
        let len = self.data.len();
        let (left, rest) = self.data.split_at_mut(frames.min(len));
        let right_len = frames.min(rest.len());
        (left, &mut rest[..right_len])
    }

    /// Zero every sample
    #[inline]
    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }

    /// Copy another block of the same shape into this one
    pub fn copy_from(&mut self, other: &SampleBlock) {
        if self.channels == other.channels && self.frames == other.frames {
            self.data.copy_from_slice(&other.data);
            return;
        }

        // Shapes differ: copy the overlapping region and silence the rest
        self.clear();
        let frames = self.frames.min(other.frames);
        for channel in 0..self.channels.min(other.channels) {
            self.channel_mut(channel)[..frames].copy_from_slice(&other.channel(channel)[..frames]);
        }
    }

    /// Interleave into `out` (frame by frame), returning the written sample count
    pub fn interleave_into(&self, out: &mut Vec<f32>) -> usize {
        out.reserve(self.data.len());
        for frame in 0..self.frames {
            for channel in 0..self.channels {
                out.push(self.data[channel * self.frames + frame]);
            }
        }
        self.data.len()
    }
}
