use crate::{
    dsp::filter::{FilterType, SVFilter},
    graph::node::{GraphNode, NodeKind, RenderCtx},
};

/*
Filter Stage
============

Wraps the state-variable filter for use inside a randomized chain.

Low-pass:  darkens the track. A random cutoff between a muffled 600 Hz and a
           barely-there 16 kHz gives anything from "through the wall" to
           "almost clean".

High-pass: thins the track by removing low end.

All-pass:  leaves the spectrum alone but rotates phase around the cutoff.
           The detune offset (in semitones) moves that cutoff musically:

             effective_cutoff = cutoff × 2^(semitones / 12)

           so +12 doubles it, -12 halves it, +7 lands a fifth above.

Example usage:

  let dark = FilterNode::lowpass(800.0).with_resonance(0.3);
  let phasey = FilterNode::allpass(1_000.0).with_detune(7);
*/

pub struct FilterNode {
    filter: SVFilter,
    base_cutoff: f32,
    detune_semitones: i32,
}

impl FilterNode {
    pub fn new(filter_type: FilterType, cutoff_hz: f32) -> Self {
        FilterNode {
            filter: SVFilter::new(filter_type, cutoff_hz),
            base_cutoff: cutoff_hz,
            detune_semitones: 0,
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

    pub fn with_resonance(mut self, resonance: f32) -> Self {
        self.filter.set_resonance(resonance.clamp(0.0, 0.95));
        self
    }

    pub fn with_detune(mut self, semitones: i32) -> Self {
        self.detune_semitones = semitones;
        self.filter.set_cutoff(Self::detuned(self.base_cutoff, semitones));
        self
    }

    #[inline]
    fn detuned(cutoff_hz: f32, semitones: i32) -> f32 {
        cutoff_hz * 2.0_f32.powf(semitones as f32 / 12.0)
    }

    pub fn effective_cutoff(&self) -> f32 {
        self.filter.cutoff()
    }
}

impl GraphNode for FilterNode {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        self.filter.render(out, ctx);
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Filter(self.filter.filter_type())
    }
}
