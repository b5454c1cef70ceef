//! Waveshaping and amplitude quantization.
//!
//! Both stages are memoryless: each output sample depends only on the input
//! sample and the stage's parameters.
//!
//! # Waveshaping
//!
//! A waveshaper applies a transfer function to the driven input:
//!   output = f(input * drive)
//!
//! With drive near 1.0 the signal stays in the linear part of f() and passes
//! through mostly unchanged. Pushing drive up moves it into the curved region
//! and adds harmonics.
//!
//!   soft      f(x) = x / (1 + |x|)          warm, gradual
//!   hard      f(x) = clamp(x, -t, t)         buzzy, odd harmonics
//!   foldback  reflect at ±t until in range   metallic
//!
//! # Bitcrushing
//!
//! The bitcrusher snaps every sample onto a grid of `steps` levels per unit
//! of amplitude:
//!   output = round(input * steps) / steps
//!
//! Four steps sounds like a broken toy, thirty-two is a gentle grain.

use serde::{Deserialize, Serialize};

/// Transfer function used by the waveshaper stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShaperCurve {
    Soft,
    Hard,
    Foldback,
}

#[inline]
pub fn soft_clip(sample: f32, drive: f32) -> f32 {
    let driven = sample * drive;
    driven / (1.0 + driven.abs())
}

#[inline]
pub fn hard_clip(sample: f32, drive: f32, threshold: f32) -> f32 {
    (sample * drive).clamp(-threshold, threshold)
}

/// Reflect the driven sample back into `[-threshold, threshold]`.
///
/// Folding is periodic with period `4·threshold`, so it is computed in one
/// step however hard the input is driven. A non-positive threshold folds
/// everything to silence.
#[inline]
pub fn foldback(sample: f32, drive: f32, threshold: f32) -> f32 {
    if threshold <= 0.0 {
        return 0.0;
    }
    let phase = (sample * drive + threshold).rem_euclid(4.0 * threshold);
    if phase < 2.0 * threshold {
        phase - threshold
    } else {
        3.0 * threshold - phase
    }
}

/// Quantize a sample to `steps` levels per unit amplitude.
///
/// A step count of zero leaves the sample untouched.
#[inline]
pub fn bitcrush(sample: f32, steps: u32) -> f32 {
    if steps == 0 {
        return sample;
    }
    let steps = steps as f32;
    (sample * steps).round() / steps
}

pub fn shape_buffer(buffer: &mut [f32], curve: ShaperCurve, drive: f32, threshold: f32) {
    for sample in buffer.iter_mut() {
        *sample = match curve {
            ShaperCurve::Soft => soft_clip(*sample, drive),
            ShaperCurve::Hard => hard_clip(*sample, drive, threshold),
            ShaperCurve::Foldback => foldback(*sample, drive, threshold),
        };
    }
}

pub fn bitcrush_buffer(buffer: &mut [f32], steps: u32) {
    for sample in buffer.iter_mut() {
        *sample = bitcrush(*sample, steps);
    }
}
