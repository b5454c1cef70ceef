//! Spectrum bars driven by the analysis tap.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::graph::AnalysisTap;
use crate::io::AudioBackend;
use crate::session::{PlaybackSession, SessionState};

/// Byte magnitudes of every bin at one instant.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrequencyFrame {
    bins: Vec<u8>,
}

impl FrequencyFrame {
    pub fn new(bins: Vec<u8>) -> Self {
        Self { bins }
    }

    pub fn bins(&self) -> &[u8] {
        &self.bins
    }

    pub fn bin_count(&self) -> usize {
        self.bins.len()
    }

    /// Value for display bar `index`; bars wrap around the bins.
    pub fn value_for_bar(&self, index: usize) -> u8 {
        if self.bins.is_empty() {
            0
        } else {
            self.bins[index % self.bins.len()]
        }
    }
}

/// Snapshot the tap's current byte spectrum.
pub fn tick(tap: &mut AnalysisTap) -> FrequencyFrame {
    FrequencyFrame::new(tap.byte_frequency_data().to_vec())
}

/// Height and opacity of one bar.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BarStyle {
    pub height: f32,
    pub opacity: f32,
}

/// Mapping from bin values to bar styles.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarPolicy {
    pub base: f32,
    pub scale: f32,
}

impl Default for BarPolicy {
    fn default() -> Self {
        Self {
            base: 3.0,
            scale: 30.0,
        }
    }
}

impl BarPolicy {
    pub fn style(&self, value: u8) -> BarStyle {
        let level = value as f32 / 255.0;
        BarStyle {
            height: self.base + level * self.scale,
            opacity: 0.25 + level * 0.75,
        }
    }

    /// Tallest bar this policy can produce.
    pub fn max_height(&self) -> f32 {
        self.base + self.scale
    }

    pub fn bars(&self, frame: &FrequencyFrame, count: usize) -> Vec<BarStyle> {
        (0..count)
            .map(|i| self.style(frame.value_for_bar(i)))
            .collect()
    }

    /// Resting bars shown while nothing plays: random heights in
    /// `[base, base + scale / 2)` at the quietest opacity.
    pub fn idle_bars<R: Rng + ?Sized>(&self, rng: &mut R, count: usize) -> Vec<BarStyle> {
        let spread = (self.scale / 2.0).max(f32::EPSILON);
        (0..count)
            .map(|_| BarStyle {
                height: self.base + rng.gen_range(0.0..spread),
                opacity: 0.25,
            })
            .collect()
    }
}

/// Per-display-frame driver tying a session to a rendering callback.
///
/// The session requests a frame when it enters Playing; each rendered frame
/// requests the next one. Once the session leaves Playing nothing is
/// requested, so the loop ends without a trailing frame.
pub struct VisualizerFeed {
    policy: BarPolicy,
    bar_count: usize,
    last: Option<FrequencyFrame>,
}

impl VisualizerFeed {
    pub fn new(policy: BarPolicy, bar_count: usize) -> Self {
        Self {
            policy,
            bar_count,
            last: None,
        }
    }

    pub fn policy(&self) -> BarPolicy {
        self.policy
    }

    pub fn bar_count(&self) -> usize {
        self.bar_count
    }

    /// Most recent frame rendered, if any.
    pub fn last_frame(&self) -> Option<&FrequencyFrame> {
        self.last.as_ref()
    }

    /// Call once per display frame. Returns true if `render` was invoked.
    /// Outside Playing it only discards what the tap has collected.
    pub fn on_display_frame<B, F>(&mut self, session: &PlaybackSession<B>, render: F) -> bool
    where
        B: AudioBackend + 'static,
        F: FnOnce(&[BarStyle]),
    {
        let requested = session.take_frame_request();
        if session.state() != SessionState::Playing {
            // Keep the tap current while the device renders silence
            session.with_tap(AnalysisTap::clear);
            return false;
        }
        if !requested {
            return false;
        }
        let Some(frame) = session.with_tap(tick) else {
            return false;
        };

        let bars = self.policy.bars(&frame, self.bar_count);
        render(&bars);
        self.last = Some(frame);
        session.request_frame();
        true
    }
}
