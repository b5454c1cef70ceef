use crate::dsp::distortion::{bitcrush_buffer, shape_buffer, ShaperCurve};
use crate::graph::node::{GraphNode, NodeKind, RenderCtx};

/*
Waveshaper and Bitcrusher Stages
================================

Both stages degrade the signal on purpose. They sit after the filters in the
default recipe so a darkened track gets crushed, rather than a crushed track
getting darkened (which would smooth away the grit).

Waveshaper
----------

Drive (1.0 - 10.0+):
  1.0 = clean, 3-4 = warm, 5-10 = heavy

Threshold (hard/foldback only):
  Lower threshold = more extreme at the same drive.

Bitcrusher
----------

Steps per unit amplitude. The recipe picks from a small fixed set:
  4   → toy-like, loud quantization noise
  8   → crunchy
  16  → grainy
  32  → subtle

Example usage:

  let warm = WaveshaperNode::new(ShaperCurve::Soft, 3.0);
  let crushed = BitcrusherNode::new(8);
*/

pub struct WaveshaperNode {
    curve: ShaperCurve,
    drive: f32,
    threshold: f32,
}

impl WaveshaperNode {
    pub fn new(curve: ShaperCurve, drive: f32) -> Self {
        Self {
            curve,
            drive: drive.max(1.0),
            threshold: 1.0,
        }
    }

    /// Values below 0.01 are clamped for numerical stability.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold.max(0.01);
        self
    }

    pub fn drive(&self) -> f32 {
        self.drive
    }
}

impl GraphNode for WaveshaperNode {
    fn render_block(&mut self, out: &mut [f32], _ctx: &RenderCtx) {
        shape_buffer(out, self.curve, self.drive, self.threshold);
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Waveshaper
    }
}

pub struct BitcrusherNode {
    steps: u32,
}

impl BitcrusherNode {
    pub fn new(steps: u32) -> Self {
        Self { steps: steps.max(1) }
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }
}

impl GraphNode for BitcrusherNode {
    fn render_block(&mut self, out: &mut [f32], _ctx: &RenderCtx) {
        bitcrush_buffer(out, self.steps);
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Bitcrusher
    }
}
