//! Directional coloration of the signal reaching one ear.
//!
//! Four designs are derived per block from the ear parameters:
//!
//! | stage | response | driven by |
//! |---|---|---|
//! | distance | lowpass, cutoff falls with distance | distance, coronal (Q) |
//! | transverse (down/up) | lowshelf -> highshelf | transverse |
//! | sagittal (left/right) | lowpass with gain tilt | sagittal |
//! | coronal (back/front) | lowpass -> notch | coronal |
//!
//! Each directional factor in [-1, 1] is mapped to `t = (f + 1) / 2` and
//! lerps between the two designs of its stage.

use crate::attenuation::distance_gain;
use crate::config::{CombineMode, SpatializerConfig};
use dsp_core::interp::lerp;
use filter::designer::{db_to_linear, design_normalized};
use filter::{ChannelFilterState, FilterCoefficients, FilterType};

/// Lowest frequency any stage is designed at
const MIN_FREQUENCY: f32 = 20.0;
/// Lowest cutoff of the distance stage
const MIN_DISTANCE_CUTOFF: f32 = 200.0;
/// Back/front lowpass cutoff when the emitter is straight behind
const CORONAL_BACK_FREQUENCY: f32 = 2000.0;
/// Level drop of a fully side-on ear (~3 dB)
const SAGITTAL_DIVISOR: f32 = 1.41;
/// Level drop of an emitter straight behind
const CORONAL_DIVISOR: f32 = 1.04;

/// Per-frame inputs for one ear, derived from geometry by the control plane
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EarParameters {
    /// Delay of this ear, in samples
    pub delay_samples: f32,
    /// Distance from the emitter to this ear, in meters
    pub distance: f32,
    /// Up (+1) / down (-1)
    pub transverse: f32,
    /// Toward this ear's side (+1) / away (-1)
    pub sagittal: f32,
    /// Front (+1) / back (-1)
    pub coronal: f32,
}

impl EarParameters {
    /// Whole-sample delay, never negative
    pub fn delay(&self) -> usize {
        if self.delay_samples.is_finite() && self.delay_samples > 0.0 {
            self.delay_samples as usize
        } else {
            0
        }
    }
}

#[inline]
fn unit(factor: f32) -> f32 {
    ((factor + 1.0) / 2.0).clamp(0.0, 1.0)
}

/// The four stage designs of one ear: distance, transverse, sagittal, coronal.
///
/// With `relative_gain` the distance gain is carried by the distance stage
/// only, so the stages can be run in series.
pub fn stage_coefficients(
    params: &EarParameters,
    sample_rate: u32,
    config: &SpatializerConfig,
    relative_gain: bool,
) -> [FilterCoefficients; 4] {
    let sr = sample_rate as f32;
    let max_frequency = config.max_frequency(sample_rate).max(MIN_FREQUENCY);
    let normalized = |hz: f32| hz.clamp(MIN_FREQUENCY, max_frequency) / sr;

    let transverse_t = unit(params.transverse);
    let sagittal_t = unit(params.sagittal);
    let coronal_t = unit(params.coronal);

    let distance = if params.distance.is_finite() {
        params.distance.max(0.0)
    } else {
        0.0
    };
    let linear = distance_gain(distance, config.reference_distance);
    // Stage gains other than the distance stage scale this base
    let base = if relative_gain { 1.0 } else { linear };

    // Air absorption: the distance cutoff halves every `absorption_distance`
    let absorption = config.absorption_distance.max(f32::EPSILON);
    let distance_frequency =
        (max_frequency / (1.0 + distance / absorption)).max(MIN_DISTANCE_CUTOFF);
    let distance_q = lerp(10.0, 1.0, coronal_t).floor();
    let distance_stage = design_normalized(
        FilterType::Lowpass,
        normalized(distance_frequency),
        distance_q,
        linear,
    );

    let transverse_frequency = lerp(max_frequency / 128.0, max_frequency, transverse_t).floor();
    let transverse_q = lerp(64.0, 1.0, transverse_t);
    let transverse_gain = if relative_gain {
        db_to_linear(config.cascade_shelf_gain_db)
    } else {
        linear
    };
    let transverse_stage = FilterCoefficients::lerp(
        &design_normalized(
            FilterType::Lowshelf,
            normalized(transverse_frequency),
            transverse_q,
            transverse_gain,
        ),
        &design_normalized(
            FilterType::Highshelf,
            normalized(transverse_frequency),
            transverse_q,
            transverse_gain,
        ),
        transverse_t,
    );

    let sagittal_gain = lerp(base / SAGITTAL_DIVISOR, base, sagittal_t);
    let sagittal_stage = design_normalized(
        FilterType::Lowpass,
        normalized(max_frequency),
        1.0,
        sagittal_gain,
    );

    let coronal_frequency = lerp(CORONAL_BACK_FREQUENCY, max_frequency, coronal_t).floor();
    let coronal_q = lerp(1.0, 32.0, coronal_t);
    let coronal_gain = lerp(base / CORONAL_DIVISOR, base, coronal_t);
    let coronal_stage = FilterCoefficients::lerp(
        &design_normalized(
            FilterType::Lowpass,
            normalized(coronal_frequency),
            coronal_q,
            coronal_gain,
        ),
        &design_normalized(
            FilterType::Notch,
            normalized(coronal_frequency),
            coronal_q,
            coronal_gain,
        ),
        coronal_t,
    );

    [distance_stage, transverse_stage, sagittal_stage, coronal_stage]
}

/// Filter state of one ear
#[derive(Debug, Clone)]
pub struct EarFilter {
    mode: CombineMode,
    averaged: ChannelFilterState,
    stages: [ChannelFilterState; 4],
}

impl EarFilter {
    pub fn new(mode: CombineMode) -> Self {
        Self {
            mode,
            averaged: ChannelFilterState::new(),
            stages: [ChannelFilterState::new(); 4],
        }
    }

    pub fn mode(&self) -> CombineMode {
        self.mode
    }

    pub fn reset(&mut self) {
        self.averaged.reset();
        for stage in self.stages.iter_mut() {
            stage.reset();
        }
    }

    /// Color `buffer` in place for the given ear parameters
    pub fn process(
        &mut self,
        params: &EarParameters,
        buffer: &mut [f32],
        sample_rate: u32,
        config: &SpatializerConfig,
    ) {
        match self.mode {
            CombineMode::Average => {
                let stages = stage_coefficients(params, sample_rate, config, false);
                let combined = FilterCoefficients::mean(&stages);
                self.averaged.process_in_place(&combined, buffer);
            }
            CombineMode::Cascade => {
                let stages = stage_coefficients(params, sample_rate, config, true);
                for (state, coefficients) in self.stages.iter_mut().zip(stages.iter()) {
                    state.process_in_place(coefficients, buffer);
                }
            }
        }
    }
}
