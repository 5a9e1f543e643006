/// Linear interpolation between `a` and `b`
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Linearly stretch (or squeeze) `input` so that it exactly covers `output`.
///
/// The first and last output samples land on the first and last input
/// samples. An empty input produces silence, a single sample is held.
pub fn stretch_into(input: &[f32], output: &mut [f32]) {
    match (input.len(), output.len()) {
        (_, 0) => {}
        (0, _) => output.fill(0.0),
        (1, _) => output.fill(input[0]),
        (_, 1) => output[0] = input[0],
        (in_len, out_len) => {
            let ratio = (in_len - 1) as f32 / (out_len - 1) as f32;
            let last = in_len - 1;
            for (i, sample) in output.iter_mut().enumerate() {
                let position = ratio * i as f32;
                let lower = (position.floor() as usize).min(last);
                let upper = (lower + 1).min(last);
                let fraction = position - lower as f32;
                *sample = lerp(input[lower], input[upper], fraction);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_endpoints() {
        assert_eq!(lerp(2.0, 4.0, 0.0), 2.0);
        assert_eq!(lerp(2.0, 4.0, 1.0), 4.0);
        assert_eq!(lerp(2.0, 4.0, 0.5), 3.0);
    }

    #[test]
    fn stretch_same_length_is_copy() {
        let input = [0.1, 0.2, 0.3, 0.4];
        let mut output = [0.0; 4];
        stretch_into(&input, &mut output);
        for (a, b) in input.iter().zip(output.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn stretch_doubles_ramp() {
        let input = [0.0, 1.0, 2.0];
        let mut output = [0.0; 5];
        stretch_into(&input, &mut output);
        let expected = [0.0, 0.5, 1.0, 1.5, 2.0];
        for (a, b) in expected.iter().zip(output.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn stretch_degenerate_inputs() {
        let mut output = [1.0; 3];
        stretch_into(&[], &mut output);
        assert_eq!(output, [0.0; 3]);

        stretch_into(&[0.7], &mut output);
        assert_eq!(output, [0.7; 3]);
    }
}
