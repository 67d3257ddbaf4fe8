//! Trailing-silence auto-stop.
//!
//! The session feeds per-tick RMS values into a [`SilenceWatch`]; once the
//! level stays below the threshold for the whole window the watch fires
//! exactly once. A fresh watch is built for every recording session.

use std::time::{Duration, Instant};

/// Linear RMS below which a tick counts as silent.
pub const DEFAULT_SILENCE_THRESHOLD: f32 = 0.01;

/// Continuous silence required before auto-stop.
pub const DEFAULT_SILENCE_WINDOW: Duration = Duration::from_millis(3000);

#[derive(Debug)]
pub struct SilenceWatch {
    threshold: f32,
    window: Duration,
    silence_start: Option<Instant>,
    fired: bool,
}

impl SilenceWatch {
    pub fn new(threshold: f32, window: Duration) -> Self {
        Self {
            threshold,
            window,
            silence_start: None,
            fired: false,
        }
    }

    /// Feed one tick's RMS. Returns `true` exactly once, on the first tick
    /// where the level has stayed below the threshold for the full window.
    pub fn observe(&mut self, rms: f32, now: Instant) -> bool {
        if rms >= self.threshold {
            self.silence_start = None;
            return false;
        }
        let start = *self.silence_start.get_or_insert(now);
        if !self.fired && now.duration_since(start) >= self.window {
            self.fired = true;
            return true;
        }
        false
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }
}

impl Default for SilenceWatch {
    fn default() -> Self {
        Self::new(DEFAULT_SILENCE_THRESHOLD, DEFAULT_SILENCE_WINDOW)
    }
}
