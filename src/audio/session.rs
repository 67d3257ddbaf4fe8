//! Microphone recording session.
//!
//! A session owns a CPAL input stream on a dedicated worker thread. Each tick
//! the worker drains the downmixed sample chunks that arrived since the last
//! tick, updates the live meter, and consults the silence watch. Stopping is
//! idempotent; the worker finalizes exactly one [`StopResult`] and delivers it
//! to the required stop handler plus every broadcast subscriber, each on its
//! own thread.

use super::dispatch::ChunkDispatcher;
use super::meter::{frame_rms, LevelTracker, LiveMeter};
use super::silence::SilenceWatch;
use super::wav::{encode_wav, WAV_MIME};
use crate::log_debug;
use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Callback-to-tick channel capacity; a full channel drops chunks instead of
/// blocking the audio callback.
const CHUNK_CHANNEL_CAPACITY: usize = 64;

/// Tunables for one recording session.
#[derive(Clone, Debug)]
pub struct SessionOptions {
    pub input_device: Option<String>,
    pub tick: Duration,
    pub silence_threshold: f32,
    pub silence_window: Duration,
    /// Sessions no longer than this are treated as empty or too short.
    pub max_empty_recording: Duration,
    /// Whole-session average RMS below this marks the capture too quiet.
    pub avg_rms_quiet_threshold: f32,
    /// Hard cap on capture length; hitting it counts as a manual stop.
    pub max_capture: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        let silence_window = super::silence::DEFAULT_SILENCE_WINDOW;
        Self {
            input_device: None,
            tick: Duration::from_millis(100),
            silence_threshold: super::silence::DEFAULT_SILENCE_THRESHOLD,
            silence_window,
            max_empty_recording: silence_window + Duration::from_millis(750),
            avg_rms_quiet_threshold: 0.002,
            max_capture: Duration::from_secs(120),
        }
    }
}

/// Everything a finished session hands to its stop handlers.
#[derive(Clone, Debug)]
pub struct StopResult {
    pub wav_bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub elapsed_ms: u64,
    pub avg_rms: f32,
    pub is_too_quiet: bool,
    pub is_empty_or_too_short: bool,
    pub did_auto_stop: bool,
}

type StopHandler = dyn Fn(Arc<StopResult>) + Send + Sync;

type ListenerMap = Mutex<HashMap<u64, Arc<StopHandler>>>;

/// Broadcast set of stop subscribers, shared across sessions. Subscribing
/// yields a guard; dropping the guard unsubscribes.
#[derive(Clone, Default)]
pub struct StopListeners {
    inner: Arc<ListenerMap>,
    next_id: Arc<AtomicU64>,
}

impl StopListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &self,
        listener: impl Fn(Arc<StopResult>) + Send + Sync + 'static,
    ) -> StopSubscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut map) = self.inner.lock() {
            map.insert(id, Arc::new(listener));
        }
        StopSubscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Vec<Arc<StopHandler>> {
        self.inner
            .lock()
            .map(|map| map.values().cloned().collect())
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub(super) fn snapshot_for_tests(&self) -> Vec<Arc<StopHandler>> {
        self.snapshot()
    }
}

/// Unsubscribes its listener when dropped.
pub struct StopSubscription {
    id: u64,
    registry: Weak<ListenerMap>,
}

impl Drop for StopSubscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            if let Ok(mut map) = registry.lock() {
                map.remove(&self.id);
            }
        }
    }
}

/// A live recording session. Dropping it stops the capture and releases the
/// microphone.
pub struct RecordingSession {
    stop_flag: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl RecordingSession {
    /// Acquire the microphone and start capturing. Device and stream failures
    /// are reported here synchronously; when this returns `Ok` the stream is
    /// playing and the worker owns it.
    pub fn start(
        options: SessionOptions,
        meter: LiveMeter,
        listeners: StopListeners,
        on_stop: impl Fn(Arc<StopResult>) + Send + Sync + 'static,
    ) -> Result<Self> {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let worker_flag = stop_flag.clone();
        // The CPAL stream is not Send, so the worker builds and owns it;
        // this channel carries the acquisition outcome back to the caller.
        let (ready_tx, ready_rx) = bounded::<Result<()>>(1);

        let worker = std::thread::Builder::new()
            .name("memoterm-capture".to_string())
            .spawn(move || {
                run_capture(options, meter, listeners, on_stop, worker_flag, ready_tx);
            })
            .context("failed to spawn capture thread")?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                stop_flag,
                worker: Some(worker),
            }),
            Ok(Err(err)) => {
                let _ = worker.join();
                Err(err)
            }
            Err(_) => {
                let _ = worker.join();
                Err(anyhow!("capture thread exited before reporting readiness"))
            }
        }
    }

    /// Request the session to stop. Idempotent and safe from any thread; the
    /// worker finalizes and delivers the stop result asynchronously.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::Relaxed);
    }

    /// Stop and wait for finalization to complete.
    pub fn stop_and_join(mut self) {
        self.stop();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        self.stop();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_capture(
    options: SessionOptions,
    meter: LiveMeter,
    listeners: StopListeners,
    on_stop: impl Fn(Arc<StopResult>) + Send + Sync + 'static,
    stop_flag: Arc<AtomicBool>,
    ready_tx: crossbeam_channel::Sender<Result<()>>,
) {
    let (receiver, sample_rate, stream, dropped) = match open_stream(&options) {
        Ok(parts) => parts,
        Err(err) => {
            let _ = ready_tx.send(Err(err));
            return;
        }
    };
    if stream.play().is_err() {
        let _ = ready_tx.send(Err(anyhow!(
            "failed to start audio stream. {}",
            mic_permission_hint()
        )));
        return;
    }
    let _ = ready_tx.send(Ok(()));

    let started = Instant::now();
    let mut tracker = LevelTracker::new();
    let mut watch = SilenceWatch::new(options.silence_threshold, options.silence_window);
    let mut capture: Vec<f32> = Vec::new();
    let mut tick_samples: Vec<f32> = Vec::new();
    let mut did_auto_stop = false;

    loop {
        if stop_flag.load(Ordering::Relaxed) {
            break;
        }
        if started.elapsed() >= options.max_capture {
            log_debug("capture hit the hard duration cap");
            break;
        }

        tick_samples.clear();
        let deadline = Instant::now() + options.tick;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match receiver.recv_timeout(remaining) {
                Ok(chunk) => tick_samples.extend_from_slice(&chunk),
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    log_debug("audio stream disconnected mid-capture");
                    stop_flag.store(true, Ordering::Relaxed);
                    break;
                }
            }
        }

        let rms = frame_rms(&tick_samples);
        let smoothed = tracker.on_frame(rms);
        meter.publish(rms, smoothed);
        capture.extend_from_slice(&tick_samples);

        if watch.observe(rms, Instant::now()) {
            did_auto_stop = true;
            break;
        }
    }

    // Pick up anything the callback delivered between the last tick and stop.
    while let Ok(chunk) = receiver.try_recv() {
        capture.extend_from_slice(&chunk);
    }

    if let Err(err) = stream.pause() {
        log_debug(&format!("failed to pause audio stream: {err}"));
    }
    drop(stream);
    meter.reset();

    let dropped_chunks = dropped.load(Ordering::Relaxed);
    if dropped_chunks > 0 {
        log_debug(&format!("capture dropped {dropped_chunks} chunks"));
    }

    let wav_bytes = encode_wav(&capture, sample_rate).unwrap_or_else(|err| {
        log_debug(&format!("wav_encode_error: {err}"));
        Vec::new()
    });
    let result = Arc::new(evaluate_stop(
        started.elapsed(),
        tracker.avg_rms(),
        did_auto_stop,
        wav_bytes,
        &options,
    ));

    // The required handler and every subscriber run concurrently, each on its
    // own thread, so a slow listener cannot delay the others.
    let mut handlers: Vec<Arc<StopHandler>> = listeners.snapshot();
    handlers.push(Arc::new(on_stop));
    let mut joins = Vec::with_capacity(handlers.len());
    for handler in handlers {
        let result = result.clone();
        joins.push(std::thread::spawn(move || handler(result)));
    }
    for join in joins {
        let _ = join.join();
    }
}

type StreamParts = (
    Receiver<Vec<f32>>,
    u32,
    cpal::Stream,
    Arc<AtomicUsize>,
);

fn open_stream(options: &SessionOptions) -> Result<StreamParts> {
    let device = resolve_device(options.input_device.as_deref())?;
    let default_config = device
        .default_input_config()
        .with_context(|| format!("no input config for device. {}", mic_permission_hint()))?;
    let format = default_config.sample_format();
    let device_config: StreamConfig = default_config.into();
    let sample_rate = device_config.sample_rate.0;
    let channels = usize::from(device_config.channels.max(1));
    log_debug(&format!(
        "capture config: format={format:?} sample_rate={sample_rate}Hz channels={channels}"
    ));

    let (sender, receiver) = bounded::<Vec<f32>>(CHUNK_CHANNEL_CAPACITY);
    let dropped = Arc::new(AtomicUsize::new(0));
    let err_fn = |err| log_debug(&format!("audio_stream_error: {err}"));

    let stream = match format {
        SampleFormat::F32 => {
            let mut pump = ChunkDispatcher::new(sender, dropped.clone());
            device.build_input_stream(
                &device_config,
                move |data: &[f32], _| pump.push(data, channels, |sample| sample),
                err_fn,
                None,
            )
        }
        SampleFormat::I16 => {
            let mut pump = ChunkDispatcher::new(sender, dropped.clone());
            device.build_input_stream(
                &device_config,
                move |data: &[i16], _| {
                    pump.push(data, channels, |sample| sample as f32 / 32_768.0)
                },
                err_fn,
                None,
            )
        }
        SampleFormat::U16 => {
            let mut pump = ChunkDispatcher::new(sender, dropped.clone());
            device.build_input_stream(
                &device_config,
                move |data: &[u16], _| {
                    pump.push(data, channels, |sample| {
                        (sample as f32 - 32_768.0) / 32_768.0
                    })
                },
                err_fn,
                None,
            )
        }
        other => return Err(anyhow!("unsupported sample format: {other:?}")),
    }
    .with_context(|| format!("failed to open audio stream. {}", mic_permission_hint()))?;

    Ok((receiver, sample_rate, stream, dropped))
}

fn resolve_device(preferred: Option<&str>) -> Result<cpal::Device> {
    let host = cpal::default_host();
    match preferred {
        Some(name) => {
            let mut devices = host.input_devices().context("no input devices available")?;
            devices
                .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| anyhow!("input device '{name}' not found"))
        }
        None => host
            .default_input_device()
            .with_context(|| format!("no default input device. {}", mic_permission_hint())),
    }
}

/// List microphone names for the CLI selector.
pub fn input_device_names() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host.input_devices().context("no input devices available")?;
    let mut names = Vec::new();
    for device in devices {
        if let Ok(name) = device.name() {
            names.push(name);
        }
    }
    Ok(names)
}

fn mic_permission_hint() -> &'static str {
    #[cfg(target_os = "macos")]
    {
        "macOS: System Settings > Privacy & Security > Microphone (enable your terminal)."
    }
    #[cfg(target_os = "linux")]
    {
        "Linux: check PipeWire/PulseAudio permissions and ensure the device is not muted."
    }
    #[cfg(target_os = "windows")]
    {
        "Windows: Settings > Privacy & Security > Microphone (allow access for your terminal)."
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        "Check OS microphone permissions."
    }
}

/// Build the one-shot stop summary for a finished capture.
pub(super) fn evaluate_stop(
    elapsed: Duration,
    avg_rms: f32,
    did_auto_stop: bool,
    wav_bytes: Vec<u8>,
    options: &SessionOptions,
) -> StopResult {
    let elapsed_ms = elapsed.as_millis() as u64;
    let max_empty_ms = options.max_empty_recording.as_millis() as u64;
    StopResult {
        wav_bytes,
        mime_type: WAV_MIME,
        elapsed_ms,
        avg_rms,
        is_too_quiet: avg_rms < options.avg_rms_quiet_threshold,
        is_empty_or_too_short: elapsed_ms > 0 && elapsed_ms <= max_empty_ms,
        did_auto_stop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A session whose worker just waits on the stop flag, so lifecycle
    // behavior can be checked without a microphone.
    fn session_with_dummy_worker() -> RecordingSession {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let worker_flag = stop_flag.clone();
        let worker = std::thread::spawn(move || {
            while !worker_flag.load(Ordering::Relaxed) {
                std::thread::sleep(Duration::from_millis(1));
            }
        });
        RecordingSession {
            stop_flag,
            worker: Some(worker),
        }
    }

    #[test]
    fn stop_twice_is_a_no_op_the_second_time() {
        let session = session_with_dummy_worker();
        session.stop();
        assert!(session.stop_flag.load(Ordering::Relaxed));
        session.stop();
        assert!(session.stop_flag.load(Ordering::Relaxed));
        session.stop_and_join();
    }

    #[test]
    fn drop_after_explicit_stop_joins_cleanly() {
        let session = session_with_dummy_worker();
        session.stop();
        session.stop();
        drop(session);
    }
}
