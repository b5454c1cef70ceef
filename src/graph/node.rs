use std::fmt;

use crate::dsp::filter::FilterType;

/// Context passed to graph nodes during rendering
///
/// - sample_rate: output device rate (e.g., 48000.0)
/// - time: seconds of audio rendered by the graph so far
#[derive(Clone, Copy, Debug)]
pub struct RenderCtx {
    pub sample_rate: f32,
    pub time: f64,
}

impl RenderCtx {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            time: 0.0,
        }
    }

    pub fn at(sample_rate: f32, time: f64) -> Self {
        Self { sample_rate, time }
    }
}

/// Stable identity of a node inside an [`AudioGraph`](super::AudioGraph).
///
/// Ids are never reused, so a stale id held after teardown can only miss.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a node does, used for inspection and logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Source,
    Gain,
    Filter(FilterType),
    Waveshaper,
    Bitcrusher,
    Compressor,
    Analyser,
    Destination,
}

/// Core trait for audio processing graph nodes
///
/// The graph sums every upstream connection into `out` before calling
/// `render_block`, so processors work in place. Sources ignore the incoming
/// silence and overwrite it.
pub trait GraphNode: Send {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx);

    fn kind(&self) -> NodeKind;
}

/// Allow boxed graph nodes to be used as graph nodes (for dynamic dispatch)
impl GraphNode for Box<dyn GraphNode> {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        (**self).render_block(out, ctx)
    }

    fn kind(&self) -> NodeKind {
        (**self).kind()
    }
}

/// Pass-through node marking the device output.
pub struct DestinationNode;

impl GraphNode for DestinationNode {
    fn render_block(&mut self, _out: &mut [f32], _ctx: &RenderCtx) {}

    fn kind(&self) -> NodeKind {
        NodeKind::Destination
    }
}
