//! Node arena with explicit connections.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::dsp::mix::sum_in_place;
use crate::error::GraphError;
use crate::graph::node::{DestinationNode, GraphNode, NodeId, NodeKind, RenderCtx};
use crate::MAX_BLOCK_SIZE;

/*
Audio Graph
===========

The combinator nodes of a synth voice are wired at compile time. A playback
session cannot work that way: its chain is decided by dice rolls at start,
and every node it created must be found again and unplugged at stop. So the
graph here is an arena:

  nodes   NodeId → processor + scratch buffer
  edges   set of (from, to) pairs, acyclic

Rendering walks the nodes in topological order. Each node's buffer is the sum
of its inputs' buffers for the block, then the node processes it in place.
Whatever reaches the destination node is the device output.

  [source] → [entry] → [lowpass] → [crusher] → [exit] → [analyser] → [destination]

Connection rules:
  - connecting an existing edge again is a no-op
  - an edge that would close a cycle is rejected
  - disconnecting a node with no outgoing edges reports `NotConnected`,
    which teardown code treats as "already done"

The render order is recomputed on every topology change, on the control
side, so the audio callback never sorts or allocates.
*/

struct NodeSlot {
    node: Box<dyn GraphNode>,
    buffer: Vec<f32>,
}

/// Graph shared between the control side and the audio callback.
pub type SharedGraph = Arc<Mutex<AudioGraph>>;

/// Lock a shared graph, recovering the data if a panicking holder poisoned it.
pub fn lock_graph(graph: &SharedGraph) -> MutexGuard<'_, AudioGraph> {
    graph.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct AudioGraph {
    nodes: BTreeMap<NodeId, NodeSlot>,
    edges: BTreeSet<(NodeId, NodeId)>,
    order: Vec<NodeId>,
    destination: Option<NodeId>,
    next_id: u64,
    frames_rendered: u64,
}

impl AudioGraph {
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            edges: BTreeSet::new(),
            order: Vec::new(),
            destination: None,
            next_id: 0,
            frames_rendered: 0,
        }
    }

    pub fn into_shared(self) -> SharedGraph {
        Arc::new(Mutex::new(self))
    }

    pub fn add_node<N: GraphNode + 'static>(&mut self, node: N) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            NodeSlot {
                node: Box::new(node),
                buffer: vec![0.0; MAX_BLOCK_SIZE],
            },
        );
        self.rebuild_order();
        id
    }

    /// The node whose input is the device output. Created on first call.
    pub fn destination(&mut self) -> NodeId {
        match self.destination {
            Some(id) => id,
            None => {
                let id = self.add_node(DestinationNode);
                self.destination = Some(id);
                id
            }
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.nodes.get(&id).map(|slot| slot.node.kind())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), GraphError> {
        self.require(from)?;
        self.require(to)?;
        if self.edges.contains(&(from, to)) {
            return Ok(());
        }
        if from == to || self.reaches(to, from) {
            return Err(GraphError::Cycle { from, to });
        }
        self.edges.insert((from, to));
        self.rebuild_order();
        Ok(())
    }

    /// Remove every outgoing connection of `id`, returning how many there were.
    pub fn disconnect(&mut self, id: NodeId) -> Result<usize, GraphError> {
        self.require(id)?;
        let outgoing = self.outputs(id);
        if outgoing.is_empty() {
            return Err(GraphError::NotConnected(id));
        }
        for to in &outgoing {
            self.edges.remove(&(id, *to));
        }
        self.rebuild_order();
        Ok(outgoing.len())
    }

    /// Drop a node together with every edge touching it.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(), GraphError> {
        self.require(id)?;
        self.edges.retain(|&(from, to)| from != id && to != id);
        self.nodes.remove(&id);
        if self.destination == Some(id) {
            self.destination = None;
        }
        self.rebuild_order();
        Ok(())
    }

    pub fn outputs(&self, id: NodeId) -> Vec<NodeId> {
        self.edges
            .iter()
            .filter(|(from, _)| *from == id)
            .map(|&(_, to)| to)
            .collect()
    }

    pub fn inputs(&self, id: NodeId) -> Vec<NodeId> {
        self.edges
            .iter()
            .filter(|(_, to)| *to == id)
            .map(|&(from, _)| from)
            .collect()
    }

    /// True if any edge starts or ends at `id`.
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.edges.iter().any(|&(from, to)| from == id || to == id)
    }

    /// True if a directed path leads from `from` to `to`.
    pub fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([from]);
        while let Some(current) = queue.pop_front() {
            for next in self.outputs(current) {
                if next == to {
                    return true;
                }
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        false
    }

    fn require(&self, id: NodeId) -> Result<(), GraphError> {
        if self.nodes.contains_key(&id) {
            Ok(())
        } else {
            Err(GraphError::UnknownNode(id))
        }
    }

    fn rebuild_order(&mut self) {
        let mut indegree: BTreeMap<NodeId, usize> =
            self.nodes.keys().map(|&id| (id, 0)).collect();
        for (_, to) in &self.edges {
            if let Some(count) = indegree.get_mut(to) {
                *count += 1;
            }
        }

        let mut ready: VecDeque<NodeId> = indegree
            .iter()
            .filter(|(_, &count)| count == 0)
            .map(|(&id, _)| id)
            .collect();
        self.order.clear();
        while let Some(id) = ready.pop_front() {
            self.order.push(id);
            for (_, to) in self.edges.range((id, NodeId(0))..=(id, NodeId(u64::MAX))) {
                if let Some(count) = indegree.get_mut(to) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push_back(*to);
                    }
                }
            }
        }
    }

    /// Render `out.len()` frames of mono output.
    pub fn render(&mut self, out: &mut [f32], sample_rate: f32) {
        for chunk in out.chunks_mut(MAX_BLOCK_SIZE) {
            self.render_block(chunk, sample_rate);
        }
    }

    fn render_block(&mut self, out: &mut [f32], sample_rate: f32) {
        let frames = out.len();
        let ctx = RenderCtx::at(sample_rate, self.frames_rendered as f64 / sample_rate as f64);

        for index in 0..self.order.len() {
            let id = self.order[index];
            let Some(mut buffer) = self.nodes.get_mut(&id).map(|slot| std::mem::take(&mut slot.buffer))
            else {
                continue;
            };

            let block = &mut buffer[..frames];
            block.fill(0.0);
            for (from, _) in self.edges.iter().filter(|(_, to)| *to == id) {
                if let Some(input) = self.nodes.get(from) {
                    sum_in_place(block, &input.buffer[..frames]);
                }
            }

            if let Some(slot) = self.nodes.get_mut(&id) {
                slot.node.render_block(block, &ctx);
                slot.buffer = buffer;
            }
        }

        match self.destination.and_then(|id| self.nodes.get(&id)) {
            Some(slot) => out.copy_from_slice(&slot.buffer[..frames]),
            None => out.fill(0.0),
        }
        self.frames_rendered += frames as u64;
    }
}

impl Default for AudioGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::dynamics::GainNode;
    use crate::graph::source::{MediaSource, SourceNode};

    fn playing(samples: Vec<f32>) -> MediaSource {
        let media = MediaSource::new(samples, 48_000.0);
        media.play();
        media
    }

    #[test]
    fn connect_rejects_cycles() {
        let mut graph = AudioGraph::new();
        let a = graph.add_node(GainNode::unity());
        let b = graph.add_node(GainNode::unity());
        let c = graph.add_node(GainNode::unity());

        graph.connect(a, b).unwrap();
        graph.connect(b, c).unwrap();

        assert!(matches!(graph.connect(c, a), Err(GraphError::Cycle { .. })));
        assert!(matches!(graph.connect(a, a), Err(GraphError::Cycle { .. })));
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn connect_twice_is_noop() {
        let mut graph = AudioGraph::new();
        let a = graph.add_node(GainNode::unity());
        let b = graph.add_node(GainNode::unity());

        graph.connect(a, b).unwrap();
        graph.connect(a, b).unwrap();

        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn connect_unknown_node_fails() {
        let mut graph = AudioGraph::new();
        let a = graph.add_node(GainNode::unity());
        let ghost = NodeId(99);

        assert!(matches!(graph.connect(a, ghost), Err(GraphError::UnknownNode(id)) if id == ghost));
    }

    #[test]
    fn disconnect_reports_already_disconnected() {
        let mut graph = AudioGraph::new();
        let a = graph.add_node(GainNode::unity());
        let b = graph.add_node(GainNode::unity());
        graph.connect(a, b).unwrap();

        assert_eq!(graph.disconnect(a).unwrap(), 1);
        assert!(matches!(graph.disconnect(a), Err(GraphError::NotConnected(id)) if id == a));
        assert!(!graph.is_connected(a));
        assert!(!graph.is_connected(b));
    }

    #[test]
    fn remove_node_drops_its_edges() {
        let mut graph = AudioGraph::new();
        let a = graph.add_node(GainNode::unity());
        let b = graph.add_node(GainNode::unity());
        let c = graph.add_node(GainNode::unity());
        graph.connect(a, b).unwrap();
        graph.connect(b, c).unwrap();

        graph.remove_node(b).unwrap();

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 0);
        assert!(!graph.contains(b));
        assert!(graph.remove_node(b).is_err());
    }

    #[test]
    fn reaches_follows_transitive_paths() {
        let mut graph = AudioGraph::new();
        let a = graph.add_node(GainNode::unity());
        let b = graph.add_node(GainNode::unity());
        let c = graph.add_node(GainNode::unity());
        graph.connect(a, b).unwrap();
        graph.connect(b, c).unwrap();

        assert!(graph.reaches(a, c));
        assert!(!graph.reaches(c, a));
    }

    #[test]
    fn renders_source_through_chain_to_destination() {
        let mut graph = AudioGraph::new();
        let out = graph.destination();
        let source = graph.add_node(SourceNode::new(playing(vec![1.0; 64])));
        let half = graph.add_node(GainNode::new(0.5));
        graph.connect(source, half).unwrap();
        graph.connect(half, out).unwrap();

        let mut buffer = vec![0.0; 32];
        graph.render(&mut buffer, 48_000.0);

        assert!(buffer.iter().all(|&s| (s - 0.5).abs() < 1e-6));
    }

    #[test]
    fn render_order_ignores_insertion_order() {
        // Destination first, source last: topological order still holds
        let mut graph = AudioGraph::new();
        let out = graph.destination();
        let gain = graph.add_node(GainNode::new(2.0));
        let source = graph.add_node(SourceNode::new(playing(vec![0.25; 64])));
        graph.connect(gain, out).unwrap();
        graph.connect(source, gain).unwrap();

        let mut buffer = vec![0.0; 16];
        graph.render(&mut buffer, 48_000.0);

        assert!(buffer.iter().all(|&s| (s - 0.5).abs() < 1e-6));
    }

    #[test]
    fn parallel_paths_sum_at_junction() {
        let mut graph = AudioGraph::new();
        let out = graph.destination();
        let source = graph.add_node(SourceNode::new(playing(vec![1.0; 64])));
        let dry = graph.add_node(GainNode::new(0.25));
        let wet = graph.add_node(GainNode::new(0.5));
        graph.connect(source, dry).unwrap();
        graph.connect(source, wet).unwrap();
        graph.connect(dry, out).unwrap();
        graph.connect(wet, out).unwrap();

        let mut buffer = vec![0.0; 8];
        graph.render(&mut buffer, 48_000.0);

        assert!(buffer.iter().all(|&s| (s - 0.75).abs() < 1e-6));
    }

    #[test]
    fn renders_silence_without_destination() {
        let mut graph = AudioGraph::new();
        graph.add_node(SourceNode::new(playing(vec![1.0; 64])));

        let mut buffer = vec![1.0; 8];
        graph.render(&mut buffer, 48_000.0);

        assert!(buffer.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn long_renders_are_chunked() {
        let mut graph = AudioGraph::new();
        let out = graph.destination();
        let media = playing(vec![1.0; MAX_BLOCK_SIZE * 4]);
        let source = graph.add_node(SourceNode::new(media.clone()));
        graph.connect(source, out).unwrap();

        let mut buffer = vec![0.0; MAX_BLOCK_SIZE * 2 + 7];
        graph.render(&mut buffer, 48_000.0);

        assert!(buffer.iter().all(|&s| s == 1.0));
        let expected = (MAX_BLOCK_SIZE * 2 + 7) as f64 / 48_000.0;
        assert!((media.position_seconds() - expected).abs() < 1e-9);
    }
}
