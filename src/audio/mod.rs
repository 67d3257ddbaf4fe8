//! Microphone capture pipeline.
//!
//! Audio comes in via CPAL, is downmixed to mono f32 on the callback thread,
//! and is drained once per tick by the session worker, which meters loudness,
//! watches for trailing silence, and encodes the finished capture as WAV for
//! upload.

mod dispatch;
mod meter;
mod session;
mod silence;
#[cfg(test)]
mod tests;
mod wav;

pub use meter::{frame_rms, LevelTracker, LiveMeter, LEVEL_GAIN, LEVEL_SMOOTHING, RMS_HISTORY_CAP};
pub use session::{
    input_device_names, RecordingSession, SessionOptions, StopListeners, StopResult,
    StopSubscription,
};
pub use silence::{SilenceWatch, DEFAULT_SILENCE_THRESHOLD, DEFAULT_SILENCE_WINDOW};
pub use wav::{encode_wav, WAV_MIME};
