//! Declarative description of the randomized effects chain.

use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::dsp::distortion::ShaperCurve;
use crate::error::RecipeError;

/*
Recipes
=======

A recipe is an ordered list of optional stages. Every time playback starts the
builder walks the list once:

  for each stage, in order:
      roll = uniform [0, 1)
      include the stage iff roll < probability
      if included, draw its parameters

Order is fixed, inclusion is random. A low-pass listed before the bitcrusher
always precedes it in any chain that contains both, so degradation stays
musical (dark-then-crushed), while the dice decide which stages show up.
Parameter draws add small variation even when the same stages repeat.

Two styles share the same stage list:

  chain        entry → stages → exit

  dry_fx_mix   entry ─→ dry gain ──────────────┐
                 └──→ stages → fx gain (1-dry) ─┴→ limiter → exit

The limiter in the mixed style uses fixed settings and bounds whatever level
the random chain adds.
*/

pub const LIMITER_THRESHOLD_DB: f32 = -6.0;
pub const LIMITER_RATIO: f32 = 20.0;
pub const LIMITER_ATTACK_S: f32 = 0.003;
pub const LIMITER_RELEASE_S: f32 = 0.25;

/// Inclusive range a continuous parameter is drawn from.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
}

impl ParamRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub const fn fixed(value: f32) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    /// Uniform draw from the range. Bounds given in the wrong order are
    /// swapped; callers are expected to have validated the recipe.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        let (lo, hi) = if self.min <= self.max {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        };
        if lo == hi || !(lo.is_finite() && hi.is_finite()) {
            lo
        } else {
            rng.gen_range(lo..=hi)
        }
    }

    pub fn contains(&self, value: f32) -> bool {
        (self.min..=self.max).contains(&value)
    }

    fn check(&self, index: usize) -> Result<(), RecipeError> {
        if self.min.is_finite() && self.max.is_finite() && self.min <= self.max {
            Ok(())
        } else {
            Err(RecipeError::Range {
                index,
                min: self.min,
                max: self.max,
            })
        }
    }
}

/// Stage kinds and their parameter spaces.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageKind {
    LowPass {
        cutoff_hz: ParamRange,
        resonance: ParamRange,
    },
    HighPass {
        cutoff_hz: ParamRange,
        resonance: ParamRange,
    },
    Waveshaper {
        curve: ShaperCurve,
        drive: ParamRange,
    },
    Bitcrusher {
        steps: Vec<u32>,
    },
    AllPass {
        frequency_hz: ParamRange,
        detune_semitones: Vec<i32>,
    },
    Compressor {
        threshold_db: ParamRange,
        ratio: ParamRange,
        attack_s: f32,
        release_s: f32,
    },
    Gain {
        level: ParamRange,
    },
}

impl StageKind {
    /// Draw concrete parameters for one instantiation.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> StageParams {
        match self {
            StageKind::LowPass {
                cutoff_hz,
                resonance,
            } => StageParams::LowPass {
                cutoff_hz: cutoff_hz.sample(rng),
                resonance: resonance.sample(rng),
            },
            StageKind::HighPass {
                cutoff_hz,
                resonance,
            } => StageParams::HighPass {
                cutoff_hz: cutoff_hz.sample(rng),
                resonance: resonance.sample(rng),
            },
            StageKind::Waveshaper { curve, drive } => StageParams::Waveshaper {
                curve: *curve,
                drive: drive.sample(rng),
            },
            StageKind::Bitcrusher { steps } => StageParams::Bitcrusher {
                steps: steps.choose(rng).copied().unwrap_or(16),
            },
            StageKind::AllPass {
                frequency_hz,
                detune_semitones,
            } => StageParams::AllPass {
                frequency_hz: frequency_hz.sample(rng),
                detune_semitones: detune_semitones.choose(rng).copied().unwrap_or(0),
            },
            StageKind::Compressor {
                threshold_db,
                ratio,
                attack_s,
                release_s,
            } => StageParams::Compressor {
                threshold_db: threshold_db.sample(rng),
                ratio: ratio.sample(rng),
                attack_s: *attack_s,
                release_s: *release_s,
            },
            StageKind::Gain { level } => StageParams::Gain {
                level: level.sample(rng),
            },
        }
    }

    fn check(&self, index: usize) -> Result<(), RecipeError> {
        match self {
            StageKind::LowPass {
                cutoff_hz,
                resonance,
            }
            | StageKind::HighPass {
                cutoff_hz,
                resonance,
            } => {
                cutoff_hz.check(index)?;
                resonance.check(index)
            }
            StageKind::Waveshaper { drive, .. } => drive.check(index),
            StageKind::Bitcrusher { steps } if steps.is_empty() => {
                Err(RecipeError::EmptyChoices { index })
            }
            StageKind::Bitcrusher { .. } => Ok(()),
            StageKind::AllPass {
                detune_semitones, ..
            } if detune_semitones.is_empty() => Err(RecipeError::EmptyChoices { index }),
            StageKind::AllPass { frequency_hz, .. } => frequency_hz.check(index),
            StageKind::Compressor {
                threshold_db,
                ratio,
                ..
            } => {
                threshold_db.check(index)?;
                ratio.check(index)
            }
            StageKind::Gain { level } => level.check(index),
        }
    }
}

/// Parameters drawn for one realized stage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StageParams {
    LowPass { cutoff_hz: f32, resonance: f32 },
    HighPass { cutoff_hz: f32, resonance: f32 },
    Waveshaper { curve: ShaperCurve, drive: f32 },
    Bitcrusher { steps: u32 },
    AllPass { frequency_hz: f32, detune_semitones: i32 },
    Compressor { threshold_db: f32, ratio: f32, attack_s: f32, release_s: f32 },
    Gain { level: f32 },
}

impl fmt::Display for StageParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageParams::LowPass { cutoff_hz, .. } => write!(f, "lowpass {:.0} Hz", cutoff_hz),
            StageParams::HighPass { cutoff_hz, .. } => write!(f, "highpass {:.0} Hz", cutoff_hz),
            StageParams::Waveshaper { curve, drive } => {
                write!(f, "shaper {:?} x{:.1}", curve, drive)
            }
            StageParams::Bitcrusher { steps } => write!(f, "crush {} steps", steps),
            StageParams::AllPass {
                frequency_hz,
                detune_semitones,
            } => write!(f, "allpass {:.0} Hz {:+} st", frequency_hz, detune_semitones),
            StageParams::Compressor {
                threshold_db,
                ratio,
                ..
            } => write!(f, "comp {:.0} dB {:.1}:1", threshold_db, ratio),
            StageParams::Gain { level } => write!(f, "gain {:.2}", level),
        }
    }
}

/// One optional stage of a recipe.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EffectStageSpec {
    pub probability: f32,
    #[serde(flatten)]
    pub kind: StageKind,
}

impl EffectStageSpec {
    pub fn new(probability: f32, kind: StageKind) -> Self {
        Self { probability, kind }
    }
}

/// How included stages are routed.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipeStyle {
    #[default]
    Chain,
    /// Dry path at `dry_gain`, fx path at `1 - dry_gain`, then a limiter.
    DryFxMix { dry_gain: f32 },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChainRecipe {
    #[serde(default)]
    pub style: RecipeStyle,
    pub stages: Vec<EffectStageSpec>,
}

impl ChainRecipe {
    pub fn new(style: RecipeStyle, stages: Vec<EffectStageSpec>) -> Self {
        Self { style, stages }
    }

    /// The everyday chain: filters first, then degradation, then dynamics.
    pub fn default_chain() -> Self {
        Self::new(RecipeStyle::Chain, default_stages())
    }

    /// Same stages behind a dry/fx split and a limiter.
    pub fn dry_fx_mix() -> Self {
        Self::new(RecipeStyle::DryFxMix { dry_gain: 0.4 }, default_stages())
    }

    pub fn with_style(mut self, style: RecipeStyle) -> Self {
        self.style = style;
        self
    }

    /// Force every stage's inclusion probability.
    pub fn with_probability(mut self, probability: f32) -> Self {
        for stage in &mut self.stages {
            stage.probability = probability;
        }
        self
    }

    pub fn validate(&self) -> Result<(), RecipeError> {
        if let RecipeStyle::DryFxMix { dry_gain } = self.style {
            if !(0.0..=1.0).contains(&dry_gain) {
                return Err(RecipeError::DryGain(dry_gain));
            }
        }
        for (index, stage) in self.stages.iter().enumerate() {
            if !(0.0..=1.0).contains(&stage.probability) {
                return Err(RecipeError::Probability {
                    index,
                    value: stage.probability,
                });
            }
            stage.kind.check(index)?;
        }
        Ok(())
    }
}

impl Default for ChainRecipe {
    fn default() -> Self {
        Self::default_chain()
    }
}

fn default_stages() -> Vec<EffectStageSpec> {
    vec![
        EffectStageSpec::new(
            0.7,
            StageKind::LowPass {
                cutoff_hz: ParamRange::new(600.0, 16_000.0),
                resonance: ParamRange::new(0.0, 0.5),
            },
        ),
        EffectStageSpec::new(
            0.35,
            StageKind::HighPass {
                cutoff_hz: ParamRange::new(20.0, 500.0),
                resonance: ParamRange::new(0.0, 0.3),
            },
        ),
        EffectStageSpec::new(
            0.3,
            StageKind::Waveshaper {
                curve: ShaperCurve::Soft,
                drive: ParamRange::new(1.5, 6.0),
            },
        ),
        EffectStageSpec::new(
            0.35,
            StageKind::Bitcrusher {
                steps: vec![4, 8, 16, 32],
            },
        ),
        EffectStageSpec::new(
            0.3,
            StageKind::AllPass {
                frequency_hz: ParamRange::new(300.0, 3_000.0),
                detune_semitones: vec![-12, -7, -5, 5, 7, 12],
            },
        ),
        EffectStageSpec::new(
            0.5,
            StageKind::Compressor {
                threshold_db: ParamRange::new(-40.0, -12.0),
                ratio: ParamRange::new(2.0, 12.0),
                attack_s: 0.01,
                release_s: 0.2,
            },
        ),
        EffectStageSpec::new(
            0.25,
            StageKind::Gain {
                level: ParamRange::new(0.6, 1.2),
            },
        ),
    ]
}
