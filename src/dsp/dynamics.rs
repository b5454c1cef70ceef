//! Feed-forward compressor.

/*
Dynamics Compression
====================

A compressor turns the signal down when it gets loud. It follows the level of
the input with an envelope detector, asks a gain computer how much the level
exceeds the threshold, and applies the resulting reduction.

Vocabulary
----------

  threshold     Level (dB) above which gain reduction begins.

  ratio         How strongly level above the threshold is squashed.
                  ratio 2   →  10 dB over threshold comes out 5 dB over
                  ratio 20  →  10 dB over threshold comes out 0.5 dB over
                A very high ratio behaves like a limiter.

  attack        Time (seconds) for the detector to rise toward a louder level.

  release       Time (seconds) for the detector to fall back after the peak.


Gain Computer (hard knee)
-------------------------

    level_db <= threshold   →  gain_db = 0
    level_db >  threshold   →  gain_db = (threshold - level_db) × (1 - 1/ratio)


Detector Smoothing
------------------

    coeff = exp(-1 / (time × sample_rate))
    env   = coeff × env + (1 - coeff) × |x|

Separate coefficients for rising (attack) and falling (release) input.
*/

const MIN_LEVEL_DB: f32 = -120.0;

#[inline]
pub fn amplitude_to_db(amplitude: f32) -> f32 {
    if amplitude <= 0.0 {
        MIN_LEVEL_DB
    } else {
        (20.0 * amplitude.log10()).max(MIN_LEVEL_DB)
    }
}

#[inline]
pub fn db_to_amplitude(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

#[inline]
fn time_coeff(seconds: f32, sample_rate: f32) -> f32 {
    if seconds <= 0.0 {
        0.0
    } else {
        (-1.0 / (seconds * sample_rate)).exp()
    }
}

pub struct Compressor {
    pub threshold_db: f32,
    pub ratio: f32,
    pub attack_s: f32,
    pub release_s: f32,
    envelope: f32,
}

impl Compressor {
    pub fn new(threshold_db: f32, ratio: f32, attack_s: f32, release_s: f32) -> Self {
        Self {
            threshold_db: threshold_db.min(0.0),
            ratio: ratio.max(1.0),
            attack_s: attack_s.max(0.0),
            release_s: release_s.max(0.0),
            envelope: 0.0,
        }
    }

    /// Gain reduction (dB, <= 0) for a detector level.
    #[inline]
    pub fn gain_db(&self, level_db: f32) -> f32 {
        if level_db <= self.threshold_db {
            0.0
        } else {
            (self.threshold_db - level_db) * (1.0 - 1.0 / self.ratio)
        }
    }

    pub fn render(&mut self, buffer: &mut [f32], sample_rate: f32) {
        let attack = time_coeff(self.attack_s, sample_rate);
        let release = time_coeff(self.release_s, sample_rate);

        for sample in buffer.iter_mut() {
            let level = sample.abs();
            let coeff = if level > self.envelope { attack } else { release };
            self.envelope = coeff * self.envelope + (1.0 - coeff) * level;

            let gain = db_to_amplitude(self.gain_db(amplitude_to_db(self.envelope)));
            *sample *= gain;
        }
    }
}
