use serde::{Deserialize, Serialize};

/// How the directional filter designs of one ear are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombineMode {
    /// Average the coefficient sets and run one filter.
    ///
    /// Cheap, but averaged coefficients of unrelated designs are only an
    /// approximation of the individual responses.
    #[default]
    Average,
    /// Run every directional stage in series, each with its own state
    Cascade,
}

/// Tuning of the spatializer and of the positioning helpers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatializerConfig {
    /// Meters per second
    pub speed_of_sound: f32,
    /// Distance (m) at which an emitter plays at full level
    pub reference_distance: f32,
    /// Distance (m) over which air absorption halves the distance cutoff
    pub absorption_distance: f32,
    /// Upper bound of every directional filter frequency, in Hz.
    /// Further limited to 45% of the sample rate.
    pub max_filter_frequency: f32,
    pub combine_mode: CombineMode,
    /// Shelf gain of the up/down stage in cascade mode, in dB
    pub cascade_shelf_gain_db: f32,
    /// Delay both ears by the full travel time instead of only the
    /// difference between them
    pub propagation_delay: bool,
}

impl Default for SpatializerConfig {
    fn default() -> Self {
        Self {
            speed_of_sound: 343.0,
            reference_distance: 10.0,
            absorption_distance: 100.0,
            max_filter_frequency: 22000.0,
            combine_mode: CombineMode::Average,
            cascade_shelf_gain_db: -6.0,
            propagation_delay: false,
        }
    }
}

impl SpatializerConfig {
    /// Highest filter frequency usable at `sample_rate`
    pub fn max_frequency(&self, sample_rate: u32) -> f32 {
        self.max_filter_frequency.min(sample_rate as f32 * 0.45)
    }

    /// Convert a travel distance to a delay in (fractional) samples
    pub fn distance_to_samples(&self, distance: f32, sample_rate: u32) -> f32 {
        distance * sample_rate as f32 / self.speed_of_sound
    }
}
