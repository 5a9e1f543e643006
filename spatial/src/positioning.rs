//! Emitter geometry to per-ear spatializer parameters.
//!
//! Vectors are plain `[x, y, z]` arrays; orientation is given per ear as an
//! orthonormal basis (up, right, forward) in world space.

use crate::config::SpatializerConfig;
use crate::ear::EarParameters;
use crate::spatializer::SpatializerParameters;

pub type Vec3 = [f32; 3];

fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn add(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

fn scale(a: Vec3, s: f32) -> Vec3 {
    [a[0] * s, a[1] * s, a[2] * s]
}

fn dot(a: Vec3, b: Vec3) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn length(a: Vec3) -> f32 {
    dot(a, a).sqrt()
}

/// Position and orientation of one ear.
///
/// `right` points away from the head on this ear's side, so a positive
/// sagittal factor always means "on my side".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EarPose {
    pub position: Vec3,
    pub up: Vec3,
    pub right: Vec3,
    pub forward: Vec3,
}

/// Both ears of a listener
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Listener {
    pub left: EarPose,
    pub right: EarPose,
}

impl Listener {
    /// Ears `ear_distance / 2` either side of `center` along `right`
    pub fn from_head(center: Vec3, up: Vec3, right: Vec3, forward: Vec3, ear_distance: f32) -> Self {
        let offset = scale(right, ear_distance / 2.0);
        Self {
            left: EarPose {
                position: sub(center, offset),
                up,
                right: scale(right, -1.0),
                forward,
            },
            right: EarPose {
                position: add(center, offset),
                up,
                right,
                forward,
            },
        }
    }
}

/// Distance and directional factors of `emitter` as heard by `ear`.
/// The delay is left at zero.
pub fn ear_geometry(ear: &EarPose, emitter: Vec3) -> EarParameters {
    let relative = sub(emitter, ear.position);
    let distance = length(relative);
    if distance <= f32::EPSILON || !distance.is_finite() {
        return EarParameters::default();
    }

    let direction = scale(relative, 1.0 / distance);
    EarParameters {
        delay_samples: 0.0,
        distance,
        transverse: dot(ear.up, direction).clamp(-1.0, 1.0),
        sagittal: dot(ear.right, direction).clamp(-1.0, 1.0),
        coronal: dot(ear.forward, direction).clamp(-1.0, 1.0),
    }
}

/// Parameters of both ears for an emitter at `emitter`.
///
/// Delays are the travel time in samples; unless
/// [`propagation_delay`](SpatializerConfig::propagation_delay) is set, the
/// nearer ear gets no delay and the farther one the difference.
pub fn spatialize(
    listener: &Listener,
    emitter: Vec3,
    sample_rate: u32,
    config: &SpatializerConfig,
) -> SpatializerParameters {
    let mut left = ear_geometry(&listener.left, emitter);
    let mut right = ear_geometry(&listener.right, emitter);

    let left_delay = config.distance_to_samples(left.distance, sample_rate);
    let right_delay = config.distance_to_samples(right.distance, sample_rate);
    let base = if config.propagation_delay {
        0.0
    } else {
        left_delay.min(right_delay)
    };
    left.delay_samples = (left_delay - base).max(0.0);
    right.delay_samples = (right_delay - base).max(0.0);

    SpatializerParameters { left, right }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UP: Vec3 = [0.0, 1.0, 0.0];
    const RIGHT: Vec3 = [1.0, 0.0, 0.0];
    const FORWARD: Vec3 = [0.0, 0.0, 1.0];

    fn head() -> Listener {
        Listener::from_head([0.0; 3], UP, RIGHT, FORWARD, 0.2)
    }

    #[test]
    fn emitter_straight_ahead_is_symmetric() {
        let params = spatialize(&head(), [0.0, 0.0, 5.0], 48000, &SpatializerConfig::default());
        assert_eq!(params.left.delay_samples, 0.0);
        assert_eq!(params.right.delay_samples, 0.0);
        assert!((params.left.distance - params.right.distance).abs() < 1e-6);
        assert!((params.left.sagittal - params.right.sagittal).abs() < 1e-6);
        assert!(params.left.coronal > 0.99);
    }

    #[test]
    fn emitter_on_the_right_delays_the_left_ear() {
        let params = spatialize(&head(), [3.0, 0.0, 0.0], 48000, &SpatializerConfig::default());
        assert_eq!(params.right.delay_samples, 0.0);
        // 0.2 m further at 343 m/s
        assert!((params.left.delay_samples - 27.99).abs() < 0.05);
        assert!((params.right.sagittal - 1.0).abs() < 1e-6);
        assert!((params.left.sagittal + 1.0).abs() < 1e-6);
    }

    #[test]
    fn propagation_delay_keeps_travel_time() {
        let config = SpatializerConfig {
            propagation_delay: true,
            ..Default::default()
        };
        let params = spatialize(&head(), [0.0, 0.0, 343.0], 48000, &config);
        assert!((params.left.delay_samples - 48000.0).abs() < 1.0);
    }

    #[test]
    fn emitter_at_the_ear_is_neutral() {
        let listener = head();
        let at_ear = ear_geometry(&listener.left, listener.left.position);
        assert_eq!(at_ear, EarParameters::default());
    }

    #[test]
    fn above_and_behind() {
        let ear = head().right;
        let above = ear_geometry(&ear, add(ear.position, [0.0, 2.0, 0.0]));
        assert!((above.transverse - 1.0).abs() < 1e-6);
        let behind = ear_geometry(&ear, add(ear.position, [0.0, 0.0, -2.0]));
        assert!((behind.coronal + 1.0).abs() < 1e-6);
        assert!((behind.distance - 2.0).abs() < 1e-6);
    }
}
