//! Whole-graph benchmarks.
//!
//! These render the graph the way the output stream does: a looping source
//! through a realized chain into the analyser and destination.

mod chain;

pub use chain::bench_chain;
