//! Decoded media and the node that plays it into the graph.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::graph::node::{GraphNode, NodeKind, RenderCtx};

/*
Media Source
============

A `MediaSource` is the handle the session holds for the track it is playing:
decoded mono samples plus a playhead. The audio thread advances the playhead
while rendering; the control side pauses, rewinds and toggles looping.

Playhead state lives in atomics so neither side ever blocks the other:

  position   f64 bits, in source frames
  paused     true until playback starts, and again after stop or end
  looping    wrap at the end instead of stopping

Sample-rate conversion is linear interpolation. It is not pretty, but a
hold-to-play toy does not need a polyphase resampler.
*/

struct MediaShared {
    samples: Vec<f32>,
    sample_rate: f32,
    position: AtomicU64,
    paused: AtomicBool,
    looping: AtomicBool,
}

/// Cheaply cloneable handle to one decoded track.
#[derive(Clone)]
pub struct MediaSource {
    shared: Arc<MediaShared>,
}

impl MediaSource {
    /// New sources start paused at position zero.
    pub fn new(samples: Vec<f32>, sample_rate: f32) -> Self {
        Self {
            shared: Arc::new(MediaShared {
                samples,
                sample_rate: sample_rate.max(1.0),
                position: AtomicU64::new(0.0f64.to_bits()),
                paused: AtomicBool::new(true),
                looping: AtomicBool::new(false),
            }),
        }
    }

    /// Resume from the current position; a source that ran off its end
    /// starts over.
    pub fn play(&self) {
        if self.ended() {
            self.set_position_frames(0.0);
        }
        self.shared.paused.store(false, Ordering::Release);
    }

    pub fn pause(&self) {
        self.shared.paused.store(true, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::Acquire)
    }

    pub fn set_looping(&self, looping: bool) {
        self.shared.looping.store(looping, Ordering::Release);
    }

    pub fn is_looping(&self) -> bool {
        self.shared.looping.load(Ordering::Acquire)
    }

    pub fn seek(&self, seconds: f64) {
        let frames = (seconds.max(0.0) * self.shared.sample_rate as f64)
            .min(self.shared.samples.len() as f64);
        self.set_position_frames(frames);
    }

    pub fn position_seconds(&self) -> f64 {
        self.position_frames() / self.shared.sample_rate as f64
    }

    pub fn duration_seconds(&self) -> f64 {
        self.shared.samples.len() as f64 / self.shared.sample_rate as f64
    }

    pub fn ended(&self) -> bool {
        self.position_frames() >= self.shared.samples.len() as f64
    }

    fn position_frames(&self) -> f64 {
        f64::from_bits(self.shared.position.load(Ordering::Acquire))
    }

    fn set_position_frames(&self, frames: f64) {
        self.shared.position.store(frames.to_bits(), Ordering::Release);
    }

    /// Render the next block at `output_rate`, advancing the playhead.
    pub(crate) fn fill(&self, out: &mut [f32], output_rate: f32) {
        let samples = &self.shared.samples;
        if self.is_paused() || samples.is_empty() {
            out.fill(0.0);
            return;
        }

        let start_bits = self.shared.position.load(Ordering::Acquire);
        let mut pos = f64::from_bits(start_bits);
        let step = self.shared.sample_rate as f64 / output_rate.max(1.0) as f64;
        let len = samples.len();
        let looping = self.is_looping();
        let mut reached_end = false;

        for sample in out.iter_mut() {
            if pos >= len as f64 {
                if looping {
                    pos %= len as f64;
                } else {
                    reached_end = true;
                    *sample = 0.0;
                    continue;
                }
            }

            let index = pos as usize;
            let frac = (pos - index as f64) as f32;
            let current = samples[index];
            let next = match samples.get(index + 1) {
                Some(&s) => s,
                None if looping => samples[0],
                None => 0.0,
            };
            *sample = current + (next - current) * frac;
            pos += step;
        }

        let end_pos = if reached_end { len as f64 } else { pos };
        // A seek from the control side wins over our advance
        let _ = self.shared.position.compare_exchange(
            start_bits,
            end_pos.to_bits(),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        if reached_end {
            self.pause();
        }
    }
}

/// Graph node playing a [`MediaSource`].
pub struct SourceNode {
    media: MediaSource,
}

impl SourceNode {
    pub fn new(media: MediaSource) -> Self {
        Self { media }
    }
}

impl GraphNode for SourceNode {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        self.media.fill(out, ctx.sample_rate);
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Source
    }
}
