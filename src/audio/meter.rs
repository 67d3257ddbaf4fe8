//! Loudness estimation for the live capture loop.
//!
//! Each tick the session computes a frame RMS, folds it into a smoothed
//! display value, and appends it to a bounded history used for the
//! whole-session average at stop time.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Gain applied to raw RMS before clamping, tuned for speech at arm's length.
pub const LEVEL_GAIN: f32 = 8.0;

/// Exponential smoothing factor for the display level.
pub const LEVEL_SMOOTHING: f32 = 0.22;

/// Maximum retained RMS samples (~12 s at the default 100 ms tick).
pub const RMS_HISTORY_CAP: usize = 120;

/// Lock-free view of the latest meter values, shared with the UI thread.
#[derive(Clone, Debug)]
pub struct LiveMeter {
    rms_bits: Arc<AtomicU32>,
    smoothed_bits: Arc<AtomicU32>,
}

impl LiveMeter {
    pub fn new() -> Self {
        Self {
            rms_bits: Arc::new(AtomicU32::new(0f32.to_bits())),
            smoothed_bits: Arc::new(AtomicU32::new(0f32.to_bits())),
        }
    }

    pub fn publish(&self, rms: f32, smoothed: f32) {
        self.rms_bits.store(rms.to_bits(), Ordering::Relaxed);
        self.smoothed_bits.store(smoothed.to_bits(), Ordering::Relaxed);
    }

    pub fn rms(&self) -> f32 {
        f32::from_bits(self.rms_bits.load(Ordering::Relaxed))
    }

    pub fn smoothed(&self) -> f32 {
        f32::from_bits(self.smoothed_bits.load(Ordering::Relaxed))
    }

    /// Zero both values once the session releases the stream.
    pub fn reset(&self) {
        self.publish(0.0, 0.0);
    }
}

impl Default for LiveMeter {
    fn default() -> Self {
        Self::new()
    }
}

/// Root-mean-square of a frame of [-1, 1] samples; 0 for an empty frame.
pub fn frame_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let energy: f32 = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    energy.sqrt()
}

/// Per-session smoothing state and RMS history.
#[derive(Debug, Default)]
pub struct LevelTracker {
    smoothed: f32,
    history: VecDeque<f32>,
}

impl LevelTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one tick's RMS into the smoothed level and history; returns the
    /// new smoothed value.
    pub fn on_frame(&mut self, rms: f32) -> f32 {
        let norm = (rms * LEVEL_GAIN).min(1.0);
        self.smoothed = LEVEL_SMOOTHING * norm + (1.0 - LEVEL_SMOOTHING) * self.smoothed;
        self.history.push_back(rms);
        while self.history.len() > RMS_HISTORY_CAP {
            self.history.pop_front();
        }
        self.smoothed
    }

    pub fn smoothed(&self) -> f32 {
        self.smoothed
    }

    /// Mean RMS over the retained history, 0 when nothing was captured.
    pub fn avg_rms(&self) -> f32 {
        if self.history.is_empty() {
            return 0.0;
        }
        self.history.iter().sum::<f32>() / self.history.len() as f32
    }

    pub fn reset(&mut self) {
        self.smoothed = 0.0;
        self.history.clear();
    }
}
