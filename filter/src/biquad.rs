use crate::designer::FilterCoefficients;

/// Integrator state of one channel of a state-variable filter.
///
/// Owned by exactly one channel; it carries the filter's memory from one
/// block to the next and is only reset when the channel is (re)initialized.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChannelFilterState {
    pub z1: f32,
    pub z2: f32,
}

impl ChannelFilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }

    /// Filter one sample
    #[inline(always)]
    pub fn tick(&mut self, c: &FilterCoefficients, x: f32) -> f32 {
        let v3 = x - self.z2;
        let v1 = c.a1 * self.z1 + c.a2 * v3;
        let v2 = self.z2 + c.a2 * self.z1 + c.a3 * v3;
        self.z1 = 2.0 * v1 - self.z1;
        self.z2 = 2.0 * v2 - self.z2;
        c.a_gain * (c.m0 * x + c.m1 * v1 + c.m2 * v2)
    }

    /// Filter `input` into `output`. Processes `min(input.len(), output.len())`
    /// samples; any extra output samples are silenced.
    pub fn execute(&mut self, coefficients: &FilterCoefficients, input: &[f32], output: &mut [f32]) {
        let n = input.len().min(output.len());
        // Work on locals so the integrators stay in registers
        let mut state = *self;
        for (y, &x) in output[..n].iter_mut().zip(&input[..n]) {
            *y = state.tick(coefficients, x);
        }
        *self = state;
        output[n..].fill(0.0);
    }

    /// Filter `buffer` in place
    pub fn process_in_place(&mut self, coefficients: &FilterCoefficients, buffer: &mut [f32]) {
        let mut state = *self;
        for sample in buffer.iter_mut() {
            *sample = state.tick(coefficients, *sample);
        }
        *self = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::designer::{design, design_normalized, FilterType};

    const SAMPLE_RATE: f32 = 48000.0;

    /// Steady-state peak amplitude of the response to `input`, measured over
    /// the last quarter of the run.
    fn settled_peak(coefficients: &FilterCoefficients, input: &[f32]) -> f32 {
        let mut state = ChannelFilterState::new();
        let mut output = vec![0.0; input.len()];
        state.execute(coefficients, input, &mut output);
        output[input.len() * 3 / 4..]
            .iter()
            .fold(0.0f32, |peak, y| peak.max(y.abs()))
    }

    fn dc(len: usize) -> Vec<f32> {
        vec![1.0; len]
    }

    fn nyquist(len: usize) -> Vec<f32> {
        (0..len).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect()
    }

    #[test]
    fn lowpass_passes_dc_and_rejects_nyquist() {
        for &(cutoff, q, gain_db) in &[(1000.0, 0.707, 0.0), (4000.0, 1.0, -6.0), (200.0, 2.0, -20.0)] {
            let c = design(FilterType::Lowpass, cutoff, q, gain_db, SAMPLE_RATE).unwrap();
            let dc_gain = settled_peak(&c, &dc(9600));
            assert!((dc_gain - c.a_gain).abs() < 1e-3, "dc gain {} vs {}", dc_gain, c.a_gain);
            assert!(settled_peak(&c, &nyquist(9600)) < 1e-3);
        }
    }

    #[test]
    fn highpass_mirrors_lowpass() {
        for &(cutoff, q, gain_db) in &[(1000.0, 0.707, 0.0), (4000.0, 1.0, -6.0)] {
            let c = design(FilterType::Highpass, cutoff, q, gain_db, SAMPLE_RATE).unwrap();
            assert!(settled_peak(&c, &dc(9600)) < 1e-3);
            let nyquist_gain = settled_peak(&c, &nyquist(9600));
            assert!((nyquist_gain - c.a_gain).abs() < 1e-3);
        }
    }

    #[test]
    fn impulse_response_decays_without_blowing_up() {
        let c = design(FilterType::Lowpass, SAMPLE_RATE / 8.0, 1.0, 0.0, SAMPLE_RATE).unwrap();
        let mut input = vec![0.0; 10_000];
        input[0] = 1.0;
        let mut output = vec![0.0; input.len()];

        let mut state = ChannelFilterState::new();
        state.execute(&c, &input, &mut output);

        assert!(output.iter().all(|y| y.is_finite()));
        assert!(output[..8].iter().any(|y| y.abs() > 1e-3));
        assert!(output[9_000..].iter().all(|y| y.abs() < 1e-6));
    }

    #[test]
    fn step_response_settles_near_unity() {
        let c = design(FilterType::Lowpass, 1000.0, 1.0, 0.0, SAMPLE_RATE).unwrap();
        let input = dc(48);
        let mut output = vec![0.0; 48];

        let mut state = ChannelFilterState::new();
        state.execute(&c, &input, &mut output);

        // Rises monotonically towards the first (resonant) peak
        for pair in output[..24].windows(2) {
            assert!(pair[1] > pair[0]);
        }
        // Q = 1 overshoot is bounded by 1 + exp(-pi / sqrt(3)) ~ 1.163
        let peak = output.iter().fold(0.0f32, |p, y| p.max(*y));
        assert!(peak < 1.2, "peak {}", peak);
        assert!((output[47] - 1.0).abs() < 0.05, "last {}", output[47]);
    }

    #[test]
    fn state_persists_across_blocks() {
        let c = design_normalized(FilterType::Lowpass, 0.05, 0.707, 1.0);
        let input: Vec<f32> = (0..256).map(|i| (i as f32 * 0.3).sin()).collect();

        let mut whole = vec![0.0; 256];
        ChannelFilterState::new().execute(&c, &input, &mut whole);

        let mut split = vec![0.0; 256];
        let mut state = ChannelFilterState::new();
        state.execute(&c, &input[..100], &mut split[..100]);
        state.execute(&c, &input[100..], &mut split[100..]);

        assert_eq!(whole, split);
    }

    #[test]
    fn in_place_matches_execute() {
        let c = design_normalized(FilterType::Bell, 0.1, 2.0, 2.0);
        let input: Vec<f32> = (0..64).map(|i| ((i * 7) % 5) as f32 - 2.0).collect();

        let mut expected = vec![0.0; 64];
        ChannelFilterState::new().execute(&c, &input, &mut expected);

        let mut buffer = input.clone();
        ChannelFilterState::new().process_in_place(&c, &mut buffer);
        assert_eq!(buffer, expected);
    }

    #[test]
    fn identity_passes_through() {
        let mut buffer = vec![0.25, -0.5, 1.0];
        let mut state = ChannelFilterState::new();
        state.process_in_place(&FilterCoefficients::IDENTITY, &mut buffer);
        assert_eq!(buffer, vec![0.25, -0.5, 1.0]);
    }

    #[test]
    fn reset_clears_integrators() {
        let c = design_normalized(FilterType::Lowpass, 0.1, 1.0, 1.0);
        let mut state = ChannelFilterState::new();
        state.process_in_place(&c, &mut [1.0; 8]);
        assert_ne!(state, ChannelFilterState::default());
        state.reset();
        assert_eq!(state, ChannelFilterState::default());
    }
}
