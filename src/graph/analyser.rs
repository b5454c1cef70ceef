//! Analysis tap: a pass-through node on the audio thread and the spectrum
//! reader on the UI side.

use std::f32::consts::PI;
use std::sync::Arc;

use rtrb::{Consumer, Producer, RingBuffer};
use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::error::GraphError;
use crate::graph::node::{GraphNode, NodeId, NodeKind, RenderCtx};
use crate::graph::AudioGraph;

/*
Byte Frequency Data
===================

The tap reproduces the conventional analyser pipeline so the visualizer sees
the same numbers a browser analyser would give it:

1. Keep the most recent `fft_size` samples.
2. Apply a Blackman window:
     w[n] = 0.42 - 0.5·cos(2πn/N) + 0.08·cos(4πn/N)
3. Forward FFT, magnitude of the first N/2 bins, scaled by 1/N.
4. Smooth over time:
     m[k] = τ·m_prev[k] + (1 - τ)·|X[k]|      (τ = 0.8)
5. Convert to decibels and map [-100 dB, -30 dB] onto [0, 255]:
     byte = floor(255 · (dB + 100) / 70), clamped

The bin count is fixed at fft_size / 2 for the lifetime of the tap.
*/

pub const SMOOTHING_TIME_CONSTANT: f32 = 0.8;
pub const MIN_DECIBELS: f32 = -100.0;
pub const MAX_DECIBELS: f32 = -30.0;

/// Samples buffered between the audio thread and the reader. Several display
/// frames of headroom at common device rates.
const FEED_CAPACITY: usize = 16_384;

/// Pass-through node copying every sample into the tap's feed.
pub struct AnalyserNode {
    feed: Producer<f32>,
}

impl GraphNode for AnalyserNode {
    fn render_block(&mut self, out: &mut [f32], _ctx: &RenderCtx) {
        // A full feed drops this block; the reader drains every display
        // frame and `clear` discards a backlog before it is read
        for &sample in out.iter() {
            if self.feed.push(sample).is_err() {
                break;
            }
        }
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Analyser
    }
}

/// Reader side of the analysis tap.
pub struct AnalysisTap {
    node: NodeId,
    feed: Consumer<f32>,
    history: Vec<f32>,
    write_pos: usize,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
    bytes: Vec<u8>,
}

impl AnalysisTap {
    /// Add an analyser node to `graph` and return the tap reading it.
    ///
    /// `fft_size` must be a power of two between 32 and 32768.
    pub fn install(graph: &mut AudioGraph, fft_size: usize) -> Result<Self, GraphError> {
        if !fft_size.is_power_of_two() || !(32..=32_768).contains(&fft_size) {
            return Err(GraphError::InvalidFftSize(fft_size));
        }

        let (producer, consumer) = RingBuffer::new(FEED_CAPACITY);
        let node = graph.add_node(AnalyserNode { feed: producer });

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        let window = (0..fft_size)
            .map(|n| {
                let x = n as f32 / fft_size as f32;
                0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
            })
            .collect();

        Ok(Self {
            node,
            feed: consumer,
            history: vec![0.0; fft_size],
            write_pos: 0,
            window,
            fft,
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
            smoothed: vec![0.0; fft_size / 2],
            bytes: vec![0; fft_size / 2],
        })
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn fft_size(&self) -> usize {
        self.history.len()
    }

    pub fn bin_count(&self) -> usize {
        self.bytes.len()
    }

    fn drain_feed(&mut self) {
        let len = self.history.len();
        while let Ok(sample) = self.feed.pop() {
            self.history[self.write_pos] = sample;
            self.write_pos = (self.write_pos + 1) % len;
        }
    }

    /// Discard pending samples and forget the analysed history, so the next
    /// read reflects only what is rendered from now on.
    pub fn clear(&mut self) {
        while self.feed.pop().is_ok() {}
        self.history.fill(0.0);
        self.write_pos = 0;
        self.smoothed.fill(0.0);
        self.bytes.fill(0);
    }

    /// Pull pending samples and compute the current byte magnitudes.
    pub fn byte_frequency_data(&mut self) -> &[u8] {
        self.drain_feed();

        let n = self.history.len();
        for i in 0..n {
            // Oldest sample first
            let sample = self.history[(self.write_pos + i) % n];
            self.scratch[i] = Complex::new(sample * self.window[i], 0.0);
        }
        self.fft.process(&mut self.scratch);

        let range = MAX_DECIBELS - MIN_DECIBELS;
        for (k, byte) in self.bytes.iter_mut().enumerate() {
            let magnitude = self.scratch[k].norm() / n as f32;
            let smoothed = SMOOTHING_TIME_CONSTANT * self.smoothed[k]
                + (1.0 - SMOOTHING_TIME_CONSTANT) * magnitude;
            self.smoothed[k] = if smoothed.is_finite() { smoothed } else { 0.0 };

            let db = if self.smoothed[k] > 0.0 {
                20.0 * self.smoothed[k].log10()
            } else {
                f32::NEG_INFINITY
            };
            let scaled = (255.0 / range) * (db - MIN_DECIBELS);
            *byte = scaled.floor().clamp(0.0, 255.0) as u8;
        }

        &self.bytes
    }

    /// Most recent `fft_size` samples, oldest first.
    #[cfg(test)]
    pub(crate) fn time_domain(&mut self) -> Vec<f32> {
        self.drain_feed();
        let n = self.history.len();
        (0..n).map(|i| self.history[(self.write_pos + i) % n]).collect()
    }
}
