//! State-variable filter design (topology-preserving transform form).
//!
//! Every filter type shares the same recurrence; only the pole placement
//! (`g`, `k`) and the output mix (`m0`, `m1`, `m2`) differ.

use dsp_core::interp::lerp;
use dsp_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Filter response selected by the designer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    #[default]
    Lowpass,
    Highpass,
    Bandpass,
    Bell,
    Notch,
    Lowshelf,
    Highshelf,
}

impl FilterType {
    pub const ALL: [FilterType; 7] = [
        FilterType::Lowpass,
        FilterType::Highpass,
        FilterType::Bandpass,
        FilterType::Bell,
        FilterType::Notch,
        FilterType::Lowshelf,
        FilterType::Highshelf,
    ];

    /// Decode a float control value (as carried by a generic parameter slot)
    pub fn from_parameter(value: f32) -> Result<Self> {
        if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > u8::MAX as f32 {
            return Err(Error::InvalidArgument(format!(
                "filter type parameter {} is not an integer code",
                value
            )));
        }
        Self::try_from(value as u8)
    }
}

impl TryFrom<u8> for FilterType {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or(Error::InvalidFilterType(code))
    }
}

impl From<FilterType> for u8 {
    fn from(filter_type: FilterType) -> Self {
        filter_type as u8
    }
}

/// Coefficients of one state-variable filter design.
///
/// `a_gain` is the linear gain `A`; `g` and `k` are kept for inspection,
/// only `a1..a3` and `m0..m2` drive the recurrence.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FilterCoefficients {
    pub a_gain: f32,
    pub g: f32,
    pub k: f32,
    pub a1: f32,
    pub a2: f32,
    pub a3: f32,
    pub m0: f32,
    pub m1: f32,
    pub m2: f32,
}

impl FilterCoefficients {
    /// Pass-through: `y = x`
    pub const IDENTITY: FilterCoefficients = FilterCoefficients {
        a_gain: 1.0,
        g: 0.0,
        k: 0.0,
        a1: 1.0,
        a2: 0.0,
        a3: 0.0,
        m0: 1.0,
        m1: 0.0,
        m2: 0.0,
    };

    /// Field-wise linear interpolation from `a` (t = 0) to `b` (t = 1)
    pub fn lerp(a: &FilterCoefficients, b: &FilterCoefficients, t: f32) -> FilterCoefficients {
        FilterCoefficients {
            a_gain: lerp(a.a_gain, b.a_gain, t),
            g: lerp(a.g, b.g, t),
            k: lerp(a.k, b.k, t),
            a1: lerp(a.a1, b.a1, t),
            a2: lerp(a.a2, b.a2, t),
            a3: lerp(a.a3, b.a3, t),
            m0: lerp(a.m0, b.m0, t),
            m1: lerp(a.m1, b.m1, t),
            m2: lerp(a.m2, b.m2, t),
        }
    }

    /// Field-wise arithmetic mean. This does not describe the response of the
    /// designs run in series; it is an approximation of their combination.
    pub fn mean(designs: &[FilterCoefficients]) -> FilterCoefficients {
        if designs.is_empty() {
            return FilterCoefficients::IDENTITY;
        }

        let mut sum = FilterCoefficients::default();
        for c in designs {
            sum.a_gain += c.a_gain;
            sum.g += c.g;
            sum.k += c.k;
            sum.a1 += c.a1;
            sum.a2 += c.a2;
            sum.a3 += c.a3;
            sum.m0 += c.m0;
            sum.m1 += c.m1;
            sum.m2 += c.m2;
        }

        let n = designs.len() as f32;
        FilterCoefficients {
            a_gain: sum.a_gain / n,
            g: sum.g / n,
            k: sum.k / n,
            a1: sum.a1 / n,
            a2: sum.a2 / n,
            a3: sum.a3 / n,
            m0: sum.m0 / n,
            m1: sum.m1 / n,
            m2: sum.m2 / n,
        }
    }
}

/// Convert a gain in decibels to a linear amplitude factor
#[inline]
pub fn db_to_linear(gain_db: f32) -> f32 {
    10f32.powf(gain_db / 20.0)
}

/// Check the arguments of [`design`] without designing anything
pub fn validate(cutoff_hz: f32, q: f32, sample_rate: f32) -> Result<()> {
    if !(sample_rate > 0.0) || !sample_rate.is_finite() {
        return Err(Error::InvalidArgument(format!(
            "sample rate must be positive, got {}",
            sample_rate
        )));
    }
    if !(q > 0.0) || !q.is_finite() {
        return Err(Error::InvalidArgument(format!(
            "Q must be positive, got {}",
            q
        )));
    }
    let nyquist = sample_rate / 2.0;
    if !(cutoff_hz > 0.0) || cutoff_hz >= nyquist {
        return Err(Error::InvalidArgument(format!(
            "cutoff {} Hz outside (0, {}) Hz",
            cutoff_hz, nyquist
        )));
    }
    Ok(())
}

/// Check that `gain_db` maps to a positive, finite linear gain
pub fn validate_gain(gain_db: f32) -> Result<()> {
    let linear = db_to_linear(gain_db);
    if !gain_db.is_finite() || !(linear > 0.0) || !linear.is_finite() {
        return Err(Error::InvalidArgument(format!(
            "gain {} dB has no usable linear gain",
            gain_db
        )));
    }
    Ok(())
}

/// Design a filter from user-facing units.
///
/// `cutoff_hz` must lie strictly between 0 and Nyquist, `q` must be
/// positive and `gain_db` must give a positive linear gain; callers clamp
/// before publishing.
pub fn design(
    filter_type: FilterType,
    cutoff_hz: f32,
    q: f32,
    gain_db: f32,
    sample_rate: f32,
) -> Result<FilterCoefficients> {
    validate(cutoff_hz, q, sample_rate)?;
    validate_gain(gain_db)?;
    Ok(design_normalized(
        filter_type,
        cutoff_hz / sample_rate,
        q,
        db_to_linear(gain_db),
    ))
}

/// Design from a normalized frequency `fc` in (0, 0.5) and a linear gain.
///
/// Total over validated input; used on the audio thread.
pub fn design_normalized(
    filter_type: FilterType,
    fc: f32,
    q: f32,
    linear_gain: f32,
) -> FilterCoefficients {
    match filter_type {
        FilterType::Lowpass => lowpass(fc, q, linear_gain),
        FilterType::Highpass => {
            let base = lowpass(fc, q, linear_gain);
            FilterCoefficients {
                m0: 1.0,
                m1: -base.k,
                m2: -1.0,
                ..base
            }
        }
        FilterType::Bandpass => FilterCoefficients {
            m0: 0.0,
            m1: 1.0,
            m2: 0.0,
            ..lowpass(fc, q, linear_gain)
        },
        FilterType::Notch => {
            let base = lowpass(fc, q, linear_gain);
            FilterCoefficients {
                m0: 1.0,
                m1: -base.k,
                m2: 0.0,
                ..base
            }
        }
        FilterType::Bell => bell(fc, q, linear_gain),
        FilterType::Lowshelf => shelf(fc, q, linear_gain, false),
        FilterType::Highshelf => shelf(fc, q, linear_gain, true),
    }
}

fn poles(g: f32, k: f32) -> (f32, f32, f32) {
    let a1 = 1.0 / (1.0 + g * (g + k));
    let a2 = g * a1;
    let a3 = g * a2;
    (a1, a2, a3)
}

fn lowpass(fc: f32, q: f32, linear_gain: f32) -> FilterCoefficients {
    let g = (PI * fc).tan();
    let k = 1.0 / q;
    let (a1, a2, a3) = poles(g, k);
    FilterCoefficients {
        a_gain: linear_gain,
        g,
        k,
        a1,
        a2,
        a3,
        m0: 0.0,
        m1: 0.0,
        m2: 1.0,
    }
}

fn bell(fc: f32, q: f32, linear_gain: f32) -> FilterCoefficients {
    let a = linear_gain;
    let g = (PI * fc).tan();
    let k = 1.0 / (q * a);
    let (a1, a2, a3) = poles(g, k);
    FilterCoefficients {
        a_gain: a,
        g,
        k,
        a1,
        a2,
        a3,
        m0: 1.0,
        m1: k * (a * a - 1.0),
        m2: 0.0,
    }
}

fn shelf(fc: f32, q: f32, linear_gain: f32, high: bool) -> FilterCoefficients {
    let a = linear_gain;
    let g = (PI * fc).tan() / a.sqrt();
    let k = 1.0 / q;
    let (a1, a2, a3) = poles(g, k);
    let (m0, m1, m2) = if high {
        (a * a, k * (1.0 - a) * a, 1.0 - a * a)
    } else {
        (1.0, k * (a - 1.0), a * a - 1.0)
    };
    FilterCoefficients {
        a_gain: a,
        g,
        k,
        a1,
        a2,
        a3,
        m0,
        m1,
        m2,
    }
}
