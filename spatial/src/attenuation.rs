//! Distance attenuation in air.

/// Closest distance used in level calculations, in meters
const MIN_DISTANCE: f32 = 1e-3;
/// Quietest level handed to the filters, in dB
pub const MIN_LEVEL_DB: f32 = -80.0;

/// Sound pressure level change (dB) when moving from `reference` meters to
/// `distance` meters away from a point source (inverse distance law).
pub fn sound_level_db(distance: f32, reference: f32) -> f32 {
    20.0 * (reference.max(MIN_DISTANCE) / distance.max(MIN_DISTANCE)).log10()
}

/// Linear gain at `distance`: unity inside `reference`, inverse distance beyond.
pub fn distance_gain(distance: f32, reference: f32) -> f32 {
    let level = sound_level_db(distance, reference).clamp(MIN_LEVEL_DB, 0.0);
    10f32.powf(level / 20.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_halves_every_doubling() {
        assert!(sound_level_db(10.0, 10.0).abs() < 1e-5);
        assert!((sound_level_db(20.0, 10.0) + 6.0206).abs() < 1e-3);
        assert!((sound_level_db(1.0, 10.0) - 20.0).abs() < 1e-3);
    }

    #[test]
    fn gain_never_amplifies() {
        assert_eq!(distance_gain(0.5, 10.0), 1.0);
        assert!((distance_gain(20.0, 10.0) - 0.5).abs() < 1e-4);
        assert!(distance_gain(0.0, 10.0) <= 1.0);
    }

    #[test]
    fn gain_has_a_floor() {
        let far = distance_gain(1.0e9, 1.0);
        assert!((far - 1e-4).abs() < 1e-6);
    }
}
