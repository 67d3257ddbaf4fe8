use super::defaults::{
    EMPTY_RECORDING_GRACE_MS, MAX_CAPTURE_HARD_LIMIT_MS, MAX_TICK_MS, MIN_TICK_MS,
};
use super::AppConfig;
use crate::audio::SessionOptions;
use anyhow::{bail, Result};
use clap::Parser;
use std::time::Duration;

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let mut config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values and fill derived defaults.
    pub fn validate(&mut self) -> Result<()> {
        if !(MIN_TICK_MS..=MAX_TICK_MS).contains(&self.tick_ms) {
            bail!(
                "--tick-ms must be between {MIN_TICK_MS} and {MAX_TICK_MS}, got {}",
                self.tick_ms
            );
        }
        if self.max_capture_ms == 0 || self.max_capture_ms > MAX_CAPTURE_HARD_LIMIT_MS {
            bail!(
                "--max-capture-ms must be between 1 and {MAX_CAPTURE_HARD_LIMIT_MS} ms, got {}",
                self.max_capture_ms
            );
        }
        if self.silence_duration_ms < 200 || self.silence_duration_ms > self.max_capture_ms {
            bail!(
                "--silence-duration-ms must be >=200 and <= --max-capture-ms ({})",
                self.max_capture_ms
            );
        }
        if !(0.0..=1.0).contains(&self.rms_silence_threshold) || self.rms_silence_threshold == 0.0 {
            bail!(
                "--rms-silence-threshold must be in (0.0, 1.0], got {}",
                self.rms_silence_threshold
            );
        }
        if !(0.0..1.0).contains(&self.avg_rms_quiet_threshold) {
            bail!(
                "--avg-rms-quiet-threshold must be in [0.0, 1.0), got {}",
                self.avg_rms_quiet_threshold
            );
        }

        // The empty-recording cutoff tracks the silence window unless pinned.
        let max_empty = self
            .max_empty_recording_ms
            .get_or_insert(self.silence_duration_ms + EMPTY_RECORDING_GRACE_MS);
        if *max_empty > self.max_capture_ms {
            bail!(
                "--max-empty-recording-ms ({max_empty}) cannot exceed --max-capture-ms ({})",
                self.max_capture_ms
            );
        }

        if self.openai_model.trim().is_empty() {
            bail!("--openai-model must not be empty");
        }
        if !self
            .openai_model
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | ':'))
        {
            bail!(
                "--openai-model must be a plain model identifier, got '{}'",
                self.openai_model
            );
        }

        if let Some(device) = &self.input_device {
            if device.trim().is_empty() {
                bail!("--input-device must not be empty");
            }
        }

        if self.store_path.is_none() {
            self.store_path = Some(super::default_store_path());
        }

        Ok(())
    }

    /// Snapshot the CLI-controlled capture settings for the session.
    pub fn session_options(&self) -> SessionOptions {
        let max_empty_ms = self
            .max_empty_recording_ms
            .unwrap_or(self.silence_duration_ms + EMPTY_RECORDING_GRACE_MS);
        SessionOptions {
            input_device: self.input_device.clone(),
            tick: Duration::from_millis(self.tick_ms),
            silence_threshold: self.rms_silence_threshold,
            silence_window: Duration::from_millis(self.silence_duration_ms),
            max_empty_recording: Duration::from_millis(max_empty_ms),
            avg_rms_quiet_threshold: self.avg_rms_quiet_threshold,
            max_capture: Duration::from_millis(self.max_capture_ms),
        }
    }
}
