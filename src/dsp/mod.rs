//! Low-level DSP primitives used by the graph nodes.
//!
//! These components are allocation-free and realtime-safe. They stay focused
//! on the signal-processing math; the graph layer adds node identity,
//! routing and lifecycle.

/// Waveshaper curves and the bitcrusher quantizer.
pub mod distortion;
/// Feed-forward compressor and decibel helpers.
pub mod dynamics;
/// State-variable filter with low/high/band/notch/all-pass responses.
pub mod filter;
/// Summing junctions and constant gain.
pub mod mix;
