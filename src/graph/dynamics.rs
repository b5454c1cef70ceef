use crate::dsp::dynamics::Compressor;
use crate::dsp::mix::apply_gain;
use crate::graph::node::{GraphNode, NodeKind, RenderCtx};

/// Compressor stage. With a high ratio and fast attack it doubles as the
/// limiter closing the parallel dry/fx recipe.
pub struct CompressorNode {
    compressor: Compressor,
}

impl CompressorNode {
    pub fn new(threshold_db: f32, ratio: f32, attack_s: f32, release_s: f32) -> Self {
        Self {
            compressor: Compressor::new(threshold_db, ratio, attack_s, release_s),
        }
    }

    pub fn threshold_db(&self) -> f32 {
        self.compressor.threshold_db
    }

    pub fn ratio(&self) -> f32 {
        self.compressor.ratio
    }
}

impl GraphNode for CompressorNode {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        self.compressor.render(out, ctx.sample_rate);
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Compressor
    }
}

/// Constant gain. Also used as the entry/exit placeholders of a chain.
pub struct GainNode {
    gain: f32,
}

impl GainNode {
    pub fn new(gain: f32) -> Self {
        Self { gain: gain.max(0.0) }
    }

    pub fn unity() -> Self {
        Self::new(1.0)
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }
}

impl GraphNode for GainNode {
    fn render_block(&mut self, out: &mut [f32], _ctx: &RenderCtx) {
        apply_gain(out, self.gain);
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Gain
    }
}
