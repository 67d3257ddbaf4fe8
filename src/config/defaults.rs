use std::path::PathBuf;

/// How often the capture worker samples loudness (milliseconds).
pub const DEFAULT_TICK_MS: u64 = 100;

/// Per-tick RMS below this counts as silence.
pub const DEFAULT_RMS_SILENCE_THRESHOLD: f32 = 0.01;

/// Continuous silence before auto-stop (milliseconds).
pub const DEFAULT_SILENCE_DURATION_MS: u64 = 3000;

/// Whole-session average RMS below this marks the capture too quiet.
pub const DEFAULT_AVG_RMS_QUIET_THRESHOLD: f32 = 0.002;

/// Grace added to the silence window when deriving the empty-recording cutoff.
pub const EMPTY_RECORDING_GRACE_MS: u64 = 750;

/// Hard cap on a single capture (milliseconds).
pub const DEFAULT_MAX_CAPTURE_MS: u64 = 120_000;

/// Absolute ceiling for --max-capture-ms.
pub const MAX_CAPTURE_HARD_LIMIT_MS: u64 = 600_000;

pub const MIN_TICK_MS: u64 = 10;
pub const MAX_TICK_MS: u64 = 1_000;

/// Debug log file is truncated once it would grow past this.
pub const DEBUG_LOG_MAX_BYTES: u64 = 5 * 1024 * 1024;

/// Crash log cap; small because entries are metadata-only.
pub const CRASH_LOG_MAX_BYTES: u64 = 256 * 1024;

/// Store location when --store-path is not given: a dotfile directory under
/// the user's home, falling back to the working directory.
pub fn default_store_path() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home).join(".memoterm").join("cards.json"),
        _ => PathBuf::from("memoterm-cards.json"),
    }
}
