use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

use crate::graph::node::RenderCtx;

/*
State-Variable Filter
=====================

Trapezoidal (zero-delay feedback) SVF. One structure gives all three
responses a chain stage needs; they differ only in how the integrator
outputs are mixed:

  g  = tan(π · fc / fs)
  k  = 2 - 2·resonance            (k = 2: no peak, k → 0: self-oscillation)

  per sample, with band = v1 and low = v2:
    low-pass   →  v2
    high-pass  →  x - k·v1 - v2
    all-pass   →  x - 2·k·v1

| response  | passes       | rejects      | phase at cutoff |
| --------- | ------------ | ------------ | --------------- |
| low-pass  | below cutoff | above cutoff | -90°            |
| high-pass | above cutoff | below cutoff | +90°            |
| all-pass  | everything   | nothing      | 180°            |

Coefficients depend on the device rate, so they are computed lazily on the
first block and again only when cutoff, resonance or rate change.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    LowPass,
    HighPass,
    AllPass,
}

#[derive(Clone, Copy, Debug)]
struct Coefficients {
    sample_rate: f32,
    g: f32,
    k: f32,
    h: f32,
}

pub struct SVFilter {
    s1: f32,
    s2: f32,
    cutoff_hz: f32,
    resonance: f32,
    response: FilterType,
    coefficients: Option<Coefficients>,
}

impl SVFilter {
    pub fn new(response: FilterType, cutoff_hz: f32) -> Self {
        Self {
            s1: 0.0,
            s2: 0.0,
            cutoff_hz,
            resonance: 0.0,
            response,
            coefficients: None,
        }
    }

    pub fn lowpass(cutoff_hz: f32) -> Self {
        Self::new(FilterType::LowPass, cutoff_hz)
    }

    pub fn highpass(cutoff_hz: f32) -> Self {
        Self::new(FilterType::HighPass, cutoff_hz)
    }

    pub fn allpass(cutoff_hz: f32) -> Self {
        Self::new(FilterType::AllPass, cutoff_hz)
    }

    pub fn filter_type(&self) -> FilterType {
        self.response
    }

    pub fn cutoff(&self) -> f32 {
        self.cutoff_hz
    }

    pub fn resonance(&self) -> f32 {
        self.resonance
    }

    pub fn set_cutoff(&mut self, cutoff_hz: f32) {
        self.cutoff_hz = cutoff_hz;
        self.coefficients = None;
    }

    pub fn set_resonance(&mut self, resonance: f32) {
        self.resonance = resonance;
        self.coefficients = None;
    }

    fn coefficients(&mut self, sample_rate: f32) -> Coefficients {
        match self.coefficients {
            Some(c) if c.sample_rate == sample_rate => c,
            _ => {
                // tan() diverges at Nyquist
                let fc = self.cutoff_hz.clamp(10.0, sample_rate * 0.49);
                let g = (PI * fc / sample_rate).tan();
                let k = 2.0 - 2.0 * self.resonance;
                let c = Coefficients {
                    sample_rate,
                    g,
                    k,
                    h: 1.0 / (1.0 + g * (g + k)),
                };
                self.coefficients = Some(c);
                c
            }
        }
    }

    pub fn render(&mut self, buffer: &mut [f32], ctx: &RenderCtx) {
        let Coefficients { g, k, h, .. } = self.coefficients(ctx.sample_rate);

        for sample in buffer.iter_mut() {
            let x = *sample;
            let v1 = h * (self.s1 + g * (x - self.s2));
            let v2 = self.s2 + g * v1;
            self.s1 = 2.0 * v1 - self.s1;
            self.s2 = 2.0 * v2 - self.s2;

            *sample = match self.response {
                FilterType::LowPass => v2,
                FilterType::HighPass => x - k * v1 - v2,
                FilterType::AllPass => x - 2.0 * k * v1,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: f32 = 48_000.0;

    fn tone(freq: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f32 / RATE).sin())
            .collect()
    }

    /// Peak of the second half, once the filter has settled.
    fn settled_peak(buffer: &[f32]) -> f32 {
        buffer[buffer.len() / 2..]
            .iter()
            .fold(0.0f32, |acc, &x| acc.max(x.abs()))
    }

    fn run(filter: &mut SVFilter, mut buffer: Vec<f32>) -> Vec<f32> {
        filter.render(&mut buffer, &RenderCtx::new(RATE));
        buffer
    }

    #[test]
    fn lowpass_settles_on_dc_and_highpass_removes_it() {
        let low = run(&mut SVFilter::lowpass(500.0), vec![1.0; 256]);
        let high = run(&mut SVFilter::highpass(500.0), vec![1.0; 256]);

        assert!(low[255] > 0.99);
        assert!(high[255].abs() < 1e-3);
    }

    #[test]
    fn lowpass_attenuates_a_decade_above_cutoff() {
        let out = run(&mut SVFilter::lowpass(500.0), tone(5_000.0, 1024));
        let peak = settled_peak(&out);
        assert!(peak < 0.05, "5 kHz through a 500 Hz lowpass peaked at {peak}");
    }

    #[test]
    fn highpass_passes_a_decade_above_cutoff() {
        let out = run(&mut SVFilter::highpass(100.0), tone(1_000.0, 2048));
        assert!(settled_peak(&out) > 0.95);
    }

    #[test]
    fn allpass_keeps_level_and_inverts_at_cutoff() {
        let input = tone(1_000.0, 4096);
        let out = run(&mut SVFilter::allpass(1_000.0), input.clone());

        assert!((settled_peak(&out) - 1.0).abs() < 0.05);
        let correlation: f32 = input[2048..].iter().zip(&out[2048..]).map(|(a, b)| a * b).sum();
        assert!(correlation < 0.0, "expected inverted phase, got {correlation}");
    }

    #[test]
    fn cutoff_past_nyquist_stays_finite() {
        let out = run(&mut SVFilter::lowpass(40_000.0), tone(440.0, 512));
        assert!(out.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn parameter_changes_take_effect_on_next_block() {
        let mut filter = SVFilter::lowpass(200.0);
        let dark = settled_peak(&run(&mut filter, tone(1_000.0, 1024)));

        filter.set_cutoff(5_000.0);
        let open = settled_peak(&run(&mut filter, tone(1_000.0, 1024)));

        assert!(open > dark * 2.0, "open={open} dark={dark}");
    }

    #[test]
    fn resonance_raises_the_cutoff_peak() {
        let mut filter = SVFilter::lowpass(1_000.0);
        filter.set_resonance(0.1);
        let flat = settled_peak(&run(&mut filter, tone(1_000.0, 2048)));

        filter.set_resonance(0.8);
        let peaked = settled_peak(&run(&mut filter, tone(1_000.0, 2048)));

        assert!(peaked > flat * 1.2, "peaked={peaked} flat={flat}");
    }
}
