//! Fixed-capacity sample buffers used to delay one ear against the other.

use dsp_core::interp::stretch_into;
use dsp_core::{Error, Result};

/// Append-and-shift sample buffer with a fixed capacity.
///
/// ```text
/// write:  1234|oooo   + 56   -> 123456|oo
/// read:   123456|oo   (1, 3) -> 234
/// shift:  123456|oo   (4)    -> 56|oooooo
/// ```
///
/// Misuse is reported, never clamped: dropping or padding samples here
/// would silently move the delay.
#[derive(Debug, Clone)]
pub struct RingDelayBuffer {
    buffer: Box<[f32]>,
    len: usize,
}

impl RingDelayBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity].into_boxed_slice(),
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Number of resident samples
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Free space left
    pub fn headroom(&self) -> usize {
        self.capacity() - self.len
    }

    /// Append `samples` after the resident ones
    pub fn write(&mut self, samples: &[f32]) -> Result<()> {
        let n = samples.len();
        if n > self.headroom() {
            return Err(Error::BufferOverflow {
                requested: n,
                available: self.headroom(),
                capacity: self.capacity(),
            });
        }

        self.buffer[self.len..self.len + n].copy_from_slice(samples);
        self.len += n;
        Ok(())
    }

    /// Copy `dest.len()` resident samples starting at `offset` into `dest`.
    /// Call [`shift`](Self::shift) afterwards to drop what was delivered.
    pub fn read(&self, offset: usize, dest: &mut [f32]) -> Result<()> {
        let n = dest.len();
        if offset.checked_add(n).map_or(true, |end| end > self.len) {
            return Err(Error::IndexOutOfRange {
                offset,
                count: n,
                length: self.len,
            });
        }

        dest.copy_from_slice(&self.buffer[offset..offset + n]);
        Ok(())
    }

    /// Drop the first `count` samples, moving the rest to the front
    pub fn shift(&mut self, count: usize) -> Result<()> {
        if count > self.len {
            return Err(Error::IndexOutOfRange {
                offset: 0,
                count,
                length: self.len,
            });
        }

        self.buffer.copy_within(count..self.len, 0);
        self.len -= count;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}

/// A [`RingDelayBuffer`] driven block by block to lag its input by a
/// requested number of samples.
///
/// Per block: write the input, read everything older than the requested
/// delay, shift it out. Until enough history exists the missing frames
/// at the start are silent. When the delay changes later on, the delivered
/// window no longer matches the block and is time-stretched onto it.
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: RingDelayBuffer,
    window: Box<[f32]>,
    primed: bool,
}

impl DelayLine {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: RingDelayBuffer::new(capacity),
            window: vec![0.0; capacity].into_boxed_slice(),
            primed: false,
        }
    }

    /// Largest delay usable with blocks of `block_len` frames
    pub fn max_delay(&self, block_len: usize) -> usize {
        self.buffer.capacity().saturating_sub(block_len)
    }

    /// Samples currently held back
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_primed(&self) -> bool {
        self.primed
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.primed = false;
    }

    /// Delay `input` by `delay` samples into `output` (same length as `input`).
    ///
    /// The delay is clamped to [`max_delay`](Self::max_delay) so a
    /// well-sized line never overflows.
    pub fn process(&mut self, input: &[f32], delay: usize, output: &mut [f32]) -> Result<()> {
        let n = input.len();
        if output.len() != n {
            return Err(Error::InvalidArgument(format!(
                "delay line output has {} frames, input has {}",
                output.len(),
                n
            )));
        }

        let delay = delay.min(self.max_delay(n));
        self.buffer.write(input)?;

        let to_read = self.buffer.len().saturating_sub(delay);
        let window = &mut self.window[..to_read];
        self.buffer.read(0, window)?;
        self.buffer.shift(to_read)?;

        if to_read == n {
            output.copy_from_slice(window);
        } else if to_read == 0 {
            output.fill(0.0);
        } else if !self.primed && to_read < n {
            // 1234 -> 00001234
            let silent = n - to_read;
            output[..silent].fill(0.0);
            output[silent..].copy_from_slice(window);
        } else {
            stretch_into(window, output);
        }

        if to_read >= n {
            self.primed = true;
        }
        Ok(())
    }
}
