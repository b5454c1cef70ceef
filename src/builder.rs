//! Realizes a [`ChainRecipe`] into connected nodes of an [`AudioGraph`].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

use crate::error::{GraphError, PlaybackError};
use crate::graph::distortion::{BitcrusherNode, WaveshaperNode};
use crate::graph::dynamics::{CompressorNode, GainNode};
use crate::graph::filter::FilterNode;
use crate::graph::{AnalysisTap, AudioGraph, NodeId};
use crate::recipe::{
    ChainRecipe, RecipeStyle, StageParams, LIMITER_ATTACK_S, LIMITER_RATIO, LIMITER_RELEASE_S,
    LIMITER_THRESHOLD_DB,
};

/// A stage that made it into an instance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RealizedStage {
    pub params: StageParams,
    pub node: NodeId,
}

/// The nodes one playback session owns. Single use: build, play, tear down.
#[derive(Debug)]
pub struct GraphInstance {
    entry: NodeId,
    exit: NodeId,
    style: RecipeStyle,
    stages: Vec<RealizedStage>,
    nodes: Vec<NodeId>,
}

impl GraphInstance {
    /// Where the session attaches its source.
    pub fn entry(&self) -> NodeId {
        self.entry
    }

    /// Feeds the analysis tap.
    pub fn exit(&self) -> NodeId {
        self.exit
    }

    pub fn style(&self) -> RecipeStyle {
        self.style
    }

    /// Included stages in recipe order.
    pub fn stages(&self) -> &[RealizedStage] {
        &self.stages
    }

    /// Every node this instance created, entry and exit included.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// One line naming the realized stages, for logs and the status bar.
    pub fn describe(&self) -> String {
        if self.stages.is_empty() {
            return "dry".to_string();
        }
        self.stages
            .iter()
            .map(|stage| stage.params.to_string())
            .collect::<Vec<_>>()
            .join(" → ")
    }

    /// Disconnect and remove every node of the instance.
    ///
    /// Best effort: nodes that are already disconnected or gone are skipped.
    /// Returns how many nodes were actually removed.
    pub fn teardown(self, graph: &mut AudioGraph) -> usize {
        release_nodes(graph, &self.nodes)
    }
}

/// Disconnect then remove `nodes`, ignoring the ones already unplugged.
pub(crate) fn release_nodes(graph: &mut AudioGraph, nodes: &[NodeId]) -> usize {
    for &id in nodes {
        match graph.disconnect(id) {
            Ok(_) => {}
            Err(GraphError::NotConnected(_)) => trace!(node = %id, "already disconnected"),
            Err(e) => trace!(node = %id, error = %e, "skipping disconnect"),
        }
    }

    let mut removed = 0;
    for &id in nodes {
        match graph.remove_node(id) {
            Ok(()) => removed += 1,
            Err(e) => trace!(node = %id, error = %e, "node already gone"),
        }
    }
    removed
}

/// Builds graph instances with an injectable random source.
pub struct GraphBuilder<R = StdRng> {
    rng: R,
}

impl GraphBuilder<StdRng> {
    /// Deterministic builder for a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Seeded when `seed` is given, from OS entropy otherwise.
    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }
}

impl<R: Rng> GraphBuilder<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }

    /// Roll the recipe and wire the result into `graph`, ending at `output`.
    ///
    /// Fails with [`PlaybackError::SinkNotReady`] when there is no tap yet;
    /// creating output state is the session's job. A recipe that does not
    /// validate is rejected before anything is drawn or created. On any
    /// wiring failure the nodes created so far are removed again.
    pub fn build(
        &mut self,
        graph: &mut AudioGraph,
        recipe: &ChainRecipe,
        output: Option<&AnalysisTap>,
    ) -> Result<GraphInstance, PlaybackError> {
        recipe.validate()?;
        let tap = output.ok_or(PlaybackError::SinkNotReady)?;
        if !graph.contains(tap.node()) {
            return Err(PlaybackError::SinkNotReady);
        }

        // One inclusion roll per stage, params only for included stages
        let mut drawn = Vec::new();
        for spec in &recipe.stages {
            let roll: f32 = self.rng.gen();
            if roll < spec.probability {
                drawn.push(spec.kind.draw(&mut self.rng));
            }
        }

        let mut nodes = Vec::with_capacity(drawn.len() + 5);
        match wire(graph, recipe.style, &drawn, tap.node(), &mut nodes) {
            Ok((entry, exit, stages)) => {
                let instance = GraphInstance {
                    entry,
                    exit,
                    style: recipe.style,
                    stages,
                    nodes,
                };
                debug!(
                    style = ?instance.style,
                    nodes = instance.nodes.len(),
                    chain = %instance.describe(),
                    "built graph instance"
                );
                Ok(instance)
            }
            Err(e) => {
                release_nodes(graph, &nodes);
                Err(e.into())
            }
        }
    }
}

type Wired = (NodeId, NodeId, Vec<RealizedStage>);

fn wire(
    graph: &mut AudioGraph,
    style: RecipeStyle,
    drawn: &[StageParams],
    tap: NodeId,
    nodes: &mut Vec<NodeId>,
) -> Result<Wired, GraphError> {
    let mut track = |id: NodeId| {
        nodes.push(id);
        id
    };

    let entry = track(graph.add_node(GainNode::unity()));

    let mut stages = Vec::with_capacity(drawn.len());
    let mut tail = entry;
    for params in drawn {
        let node = track(instantiate(graph, params));
        graph.connect(tail, node)?;
        stages.push(RealizedStage {
            params: *params,
            node,
        });
        tail = node;
    }

    let exit = match style {
        RecipeStyle::Chain => {
            let exit = track(graph.add_node(GainNode::unity()));
            graph.connect(tail, exit)?;
            exit
        }
        RecipeStyle::DryFxMix { dry_gain } => {
            let dry = track(graph.add_node(GainNode::new(dry_gain)));
            let fx = track(graph.add_node(GainNode::new(1.0 - dry_gain)));
            let merge = track(graph.add_node(GainNode::unity()));
            let limiter = track(graph.add_node(CompressorNode::new(
                LIMITER_THRESHOLD_DB,
                LIMITER_RATIO,
                LIMITER_ATTACK_S,
                LIMITER_RELEASE_S,
            )));
            let exit = track(graph.add_node(GainNode::unity()));

            graph.connect(entry, dry)?;
            graph.connect(dry, merge)?;
            graph.connect(tail, fx)?;
            graph.connect(fx, merge)?;
            graph.connect(merge, limiter)?;
            graph.connect(limiter, exit)?;
            exit
        }
    };

    graph.connect(exit, tap)?;
    Ok((entry, exit, stages))
}

fn instantiate(graph: &mut AudioGraph, params: &StageParams) -> NodeId {
    match *params {
        StageParams::LowPass {
            cutoff_hz,
            resonance,
        } => graph.add_node(FilterNode::lowpass(cutoff_hz).with_resonance(resonance)),
        StageParams::HighPass {
            cutoff_hz,
            resonance,
        } => graph.add_node(FilterNode::highpass(cutoff_hz).with_resonance(resonance)),
        StageParams::Waveshaper { curve, drive } => graph.add_node(WaveshaperNode::new(curve, drive)),
        StageParams::Bitcrusher { steps } => graph.add_node(BitcrusherNode::new(steps)),
        StageParams::AllPass {
            frequency_hz,
            detune_semitones,
        } => graph.add_node(FilterNode::allpass(frequency_hz).with_detune(detune_semitones)),
        StageParams::Compressor {
            threshold_db,
            ratio,
            attack_s,
            release_s,
        } => graph.add_node(CompressorNode::new(threshold_db, ratio, attack_s, release_s)),
        StageParams::Gain { level } => graph.add_node(GainNode::new(level)),
    }
}
