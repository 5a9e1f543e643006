//! Fractional-rate playback of a [`SampleSource`] onto stereo output.

use crate::source::SampleSource;

/// Highest playback rate honored; faster requests are clamped
pub const MAX_RATE: f64 = 16.0;
/// Smallest usable pull buffer
pub const MIN_PULL_FRAMES: usize = 2;

/// Linear-interpolating resampler with its own planar stereo pull buffer.
///
/// `position` indexes the pull buffer. Whenever it reaches the last frame the
/// buffer is refilled from the source and the previous last frame is kept to
/// interpolate across the seam.
#[derive(Debug, Clone)]
pub struct LinearResampler {
    position: f64,
    last_left: f32,
    last_right: f32,
    frames: usize,
    pull: Box<[f32]>,
}

impl LinearResampler {
    pub fn new(pull_frames: usize) -> Self {
        let frames = pull_frames.max(MIN_PULL_FRAMES);
        Self {
            // One step at rate 1.0 lands on the first freshly pulled frame
            position: (frames - 1) as f64,
            last_left: 0.0,
            last_right: 0.0,
            frames,
            pull: vec![0.0; frames * 2].into_boxed_slice(),
        }
    }

    pub fn pull_frames(&self) -> usize {
        self.frames
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn reset(&mut self) {
        self.position = (self.frames - 1) as f64;
        self.last_left = 0.0;
        self.last_right = 0.0;
        self.pull.fill(0.0);
    }

    /// Refill the pull buffer. Returns true when the source is exhausted.
    fn refill<S: SampleSource + ?Sized>(&mut self, source: &mut S) -> bool {
        let frames = self.frames;
        if !source.is_valid() {
            self.pull.fill(0.0);
            return true;
        }

        let read = match source.channel_count() {
            1 => source.read(&mut self.pull[..frames]).min(frames),
            2 => source.read(&mut self.pull).min(frames),
            _ => 0,
        };

        let (left, right) = self.pull.split_at_mut(frames);
        left[read..].fill(0.0);
        if source.channel_count() == 1 {
            right.copy_from_slice(left);
        } else {
            right[read..].fill(0.0);
        }

        read < frames
    }

    /// Fill both outputs, advancing by `rates[i]` source frames per output
    /// sample (missing rates count as 1.0).
    ///
    /// Returns true if the source ran out during this call; the output past
    /// the end of the source is silent.
    pub fn resample_lerp_read<S: SampleSource + ?Sized>(
        &mut self,
        source: &mut S,
        output_left: &mut [f32],
        output_right: &mut [f32],
        rates: &[f32],
    ) -> bool {
        let frames = self.frames;
        let seam = (frames - 1) as f64;
        let mut finished = false;

        for (i, (out_l, out_r)) in output_left
            .iter_mut()
            .zip(output_right.iter_mut())
            .enumerate()
        {
            let rate = rates.get(i).copied().unwrap_or(1.0) as f64;
            self.position += if rate.is_finite() {
                rate.clamp(0.0, MAX_RATE)
            } else {
                0.0
            };

            while self.position >= seam {
                self.last_left = self.pull[frames - 1];
                self.last_right = self.pull[2 * frames - 1];
                finished |= self.refill(source);
                self.position -= frames as f64;
            }

            let floor = self.position.floor();
            let t = (self.position - floor) as f32;
            let index = floor as isize;

            let (left0, right0) = if index < 0 {
                (self.last_left, self.last_right)
            } else {
                let index = index as usize;
                (self.pull[index], self.pull[frames + index])
            };
            let next = (index + 1) as usize;
            let (left1, right1) = (self.pull[next], self.pull[frames + next]);

            *out_l = left0 + (left1 - left0) * t;
            *out_r = right0 + (right1 - right0) * t;
        }

        finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;

    mock! {
        Source {}
        impl SampleSource for Source {
            fn channel_count(&self) -> usize;
            fn is_valid(&self) -> bool;
            fn read(&mut self, buffer: &mut [f32]) -> usize;
        }
    }

    /// Mono source producing 1, 2, 3, ... `len`
    fn ramp_source(len: usize) -> MockSource {
        let mut source = MockSource::new();
        let mut next = 0usize;
        source.expect_channel_count().return_const(1usize);
        source.expect_is_valid().return_const(true);
        source.expect_read().returning(move |buffer| {
            let count = buffer.len().min(len - next);
            for (i, sample) in buffer.iter_mut().take(count).enumerate() {
                *sample = (next + i + 1) as f32;
            }
            next += count;
            count
        });
        source
    }

    #[test]
    fn unit_rate_reproduces_the_source() {
        let mut source = ramp_source(1000);
        let mut resampler = LinearResampler::new(64);
        let rates = [1.0; 100];
        let mut left = [0.0; 100];
        let mut right = [0.0; 100];

        let mut produced = Vec::new();
        for _ in 0..3 {
            assert!(!resampler.resample_lerp_read(&mut source, &mut left, &mut right, &rates));
            assert_eq!(left, right);
            produced.extend_from_slice(&left);
        }

        let expected: Vec<f32> = (1..=300).map(|v| v as f32).collect();
        assert_eq!(produced, expected);
    }

    #[test]
    fn finishes_on_the_exhausting_call() {
        let mut source = ramp_source(20);
        let mut resampler = LinearResampler::new(16);
        let rates = [1.0; 8];
        let mut left = [0.0; 8];
        let mut right = [0.0; 8];

        assert!(!resampler.resample_lerp_read(&mut source, &mut left, &mut right, &rates));
        assert_eq!(left, [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);

        assert!(resampler.resample_lerp_read(&mut source, &mut left, &mut right, &rates));
        assert_eq!(left, [9.0, 10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0]);

        resampler.resample_lerp_read(&mut source, &mut left, &mut right, &rates);
        assert_eq!(left, [17.0, 18.0, 19.0, 20.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn half_rate_interpolates() {
        let mut source = ramp_source(1000);
        let mut resampler = LinearResampler::new(32);
        let rates = [0.5; 8];
        let mut left = [0.0; 8];
        let mut right = [0.0; 8];

        resampler.resample_lerp_read(&mut source, &mut left, &mut right, &rates);
        // Starts half a frame before the first pulled frame
        assert_eq!(left, [0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0]);
    }

    #[test]
    fn stereo_sources_keep_their_channels() {
        let mut source = MockSource::new();
        source.expect_channel_count().return_const(2usize);
        source.expect_is_valid().return_const(true);
        source.expect_read().returning(|buffer| {
            let frames = buffer.len() / 2;
            let (left, right) = buffer.split_at_mut(frames);
            left.fill(0.25);
            right.fill(-0.25);
            frames
        });

        let mut resampler = LinearResampler::new(8);
        let mut left = [0.0; 20];
        let mut right = [0.0; 20];
        assert!(!resampler.resample_lerp_read(&mut source, &mut left, &mut right, &[1.0; 20]));
        assert!(left.iter().all(|&s| s == 0.25));
        assert!(right.iter().all(|&s| s == -0.25));
    }

    #[test]
    fn invalid_source_is_silent_and_finished() {
        let mut source = MockSource::new();
        source.expect_is_valid().return_const(false);
        source.expect_read().never();

        let mut resampler = LinearResampler::new(16);
        let mut left = [1.0; 4];
        let mut right = [1.0; 4];
        assert!(resampler.resample_lerp_read(&mut source, &mut left, &mut right, &[1.0; 4]));
        assert_eq!(left, [0.0; 4]);
        assert_eq!(right, [0.0; 4]);
    }

    #[test]
    fn stalled_rate_holds_position() {
        let mut source = ramp_source(1000);
        let mut resampler = LinearResampler::new(16);
        let mut left = [0.0; 4];
        let mut right = [0.0; 4];

        resampler.resample_lerp_read(&mut source, &mut left, &mut right, &[1.0; 4]);
        let position = resampler.position();
        resampler.resample_lerp_read(&mut source, &mut left, &mut right, &[0.0, -2.0, f32::NAN, 0.0]);
        assert_eq!(resampler.position(), position);
        assert_eq!(left, [4.0; 4]);
    }
}
