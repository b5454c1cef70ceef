//! Runtime audio graph: node arena, connections, and the nodes a playback
//! chain is assembled from.
//!
//! Unlike compile-time combinators, nodes here have identities. A chain can
//! be decided at runtime, wired by id, and unplugged again node by node.

/// Analyser pass-through node and the spectrum-reading tap.
pub mod analyser;
/// Arena of nodes and connections; block rendering in topological order.
pub mod context;
/// Waveshaper and bitcrusher stages.
pub mod distortion;
/// Compressor/limiter and constant gain.
pub mod dynamics;
/// Low-pass, high-pass and detunable all-pass stages.
pub mod filter;
/// Core traits shared by all graph nodes.
pub mod node;
/// Decoded media handle and the node that plays it.
pub mod source;

pub use analyser::AnalysisTap;
pub use context::{lock_graph, AudioGraph, SharedGraph};
pub use node::{GraphNode, NodeId, NodeKind, RenderCtx};
pub use source::{MediaSource, SourceNode};
