//! Command-line parsing and validation helpers.

mod defaults;
mod validation;

use clap::Parser;
use std::path::PathBuf;

pub use defaults::{
    default_store_path, CRASH_LOG_MAX_BYTES, DEBUG_LOG_MAX_BYTES,
    DEFAULT_AVG_RMS_QUIET_THRESHOLD, DEFAULT_MAX_CAPTURE_MS, DEFAULT_RMS_SILENCE_THRESHOLD,
    DEFAULT_SILENCE_DURATION_MS, DEFAULT_TICK_MS, EMPTY_RECORDING_GRACE_MS,
    MAX_CAPTURE_HARD_LIMIT_MS,
};

/// CLI options for the memoterm TUI. Validated values keep the capture loop
/// and network clients inside sane bounds.
#[derive(Debug, Parser, Clone)]
#[command(about = "memoterm: voice memos as structured memory cards", author, version)]
pub struct AppConfig {
    /// Preferred audio input device name
    #[arg(long)]
    pub input_device: Option<String>,

    /// Print detected audio input devices and exit
    #[arg(long = "list-input-devices", default_value_t = false)]
    pub list_input_devices: bool,

    /// Card store location (defaults to ~/.memoterm/cards.json)
    #[arg(long = "store-path", env = "MEMOTERM_STORE")]
    pub store_path: Option<PathBuf>,

    /// Deepgram API key for transcription
    #[arg(long = "deepgram-api-key", env = "DEEPGRAM_API_KEY", hide_env_values = true)]
    pub deepgram_api_key: Option<String>,

    /// OpenAI API key for card generation
    #[arg(long = "openai-api-key", env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// OpenAI model used for card generation
    #[arg(
        long = "openai-model",
        env = "MEMOTERM_OPENAI_MODEL",
        default_value = crate::llm::DEFAULT_OPENAI_MODEL
    )]
    pub openai_model: String,

    /// Level-meter tick interval (milliseconds)
    #[arg(long = "tick-ms", default_value_t = DEFAULT_TICK_MS)]
    pub tick_ms: u64,

    /// Per-tick RMS below which audio counts as silence
    #[arg(
        long = "rms-silence-threshold",
        allow_negative_numbers = true,
        default_value_t = DEFAULT_RMS_SILENCE_THRESHOLD
    )]
    pub rms_silence_threshold: f32,

    /// Trailing silence required before auto-stop (milliseconds)
    #[arg(long = "silence-duration-ms", default_value_t = DEFAULT_SILENCE_DURATION_MS)]
    pub silence_duration_ms: u64,

    /// Whole-session average RMS below which the capture is discarded
    #[arg(
        long = "avg-rms-quiet-threshold",
        allow_negative_numbers = true,
        default_value_t = DEFAULT_AVG_RMS_QUIET_THRESHOLD
    )]
    pub avg_rms_quiet_threshold: f32,

    /// Recordings no longer than this are discarded as empty
    /// (defaults to --silence-duration-ms + 750)
    #[arg(long = "max-empty-recording-ms")]
    pub max_empty_recording_ms: Option<u64>,

    /// Maximum capture duration before a hard stop (milliseconds)
    #[arg(long = "max-capture-ms", default_value_t = DEFAULT_MAX_CAPTURE_MS)]
    pub max_capture_ms: u64,

    /// Skip the network pipeline entirely; recordings are discarded after the
    /// stop summary
    #[arg(long = "offline", default_value_t = false)]
    pub offline: bool,

    /// Enable file logging (debug)
    #[arg(long = "logs", env = "MEMOTERM_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs and log env vars)
    #[arg(long = "no-logs", env = "MEMOTERM_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Allow logging transcript/content snippets (debug log only)
    #[arg(
        long = "log-content",
        env = "MEMOTERM_LOG_CONTENT",
        default_value_t = false
    )]
    pub log_content: bool,

    /// Enable verbose timing logs
    #[arg(long)]
    pub log_timings: bool,
}
