//! Benchmarks for the per-stage DSP primitives.

mod distortion;
mod dynamics;
mod filter;

pub use distortion::bench_distortion;
pub use dynamics::bench_dynamics;
pub use filter::bench_filter;
