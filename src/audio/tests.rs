use super::dispatch::{append_downmixed_samples, ChunkDispatcher};
use super::session::evaluate_stop;
use super::{SessionOptions, StopListeners, WAV_MIME};
use crossbeam_channel::bounded;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[test]
fn downmixes_multi_channel_audio() {
    let mut buf = Vec::new();
    let samples = [1.0f32, -1.0, 0.5, 0.5];
    append_downmixed_samples(&mut buf, &samples, 2, |sample| sample);
    assert_eq!(buf, vec![0.0, 0.5]);
}

#[test]
fn preserves_single_channel_audio() {
    let mut buf = Vec::new();
    let samples = [0.1f32, 0.2, 0.3];
    append_downmixed_samples(&mut buf, &samples, 1, |sample| sample);
    assert_eq!(buf, samples);
}

#[test]
fn downmix_handles_trailing_partial_frame() {
    let mut buf = Vec::new();
    let samples = [0.2f32, 0.4, 0.6];
    append_downmixed_samples(&mut buf, &samples, 2, |sample| sample);
    assert_eq!(buf.len(), 2);
    assert!((buf[0] - 0.3).abs() < 1e-6);
    assert!((buf[1] - 0.6).abs() < 1e-6);
}

#[test]
fn downmix_applies_converter() {
    let mut buf = Vec::new();
    let samples = [i16::MAX, i16::MIN];
    append_downmixed_samples(&mut buf, &samples, 1, |sample| sample as f32 / 32_768.0);
    assert!(buf[0] > 0.99);
    assert!(buf[1] < -0.99);
}

#[test]
fn dispatcher_ships_downmixed_chunks() {
    let (sender, receiver) = bounded::<Vec<f32>>(4);
    let dropped = Arc::new(AtomicUsize::new(0));
    let mut pump = ChunkDispatcher::new(sender, dropped.clone());
    pump.push(&[0.5f32, -0.5, 1.0, 0.0], 2, |sample| sample);
    let chunk = receiver.try_recv().unwrap();
    assert_eq!(chunk, vec![0.0, 0.5]);
    assert_eq!(dropped.load(Ordering::Relaxed), 0);
}

#[test]
fn dispatcher_drops_when_channel_is_full() {
    let (sender, receiver) = bounded::<Vec<f32>>(1);
    let dropped = Arc::new(AtomicUsize::new(0));
    let mut pump = ChunkDispatcher::new(sender, dropped.clone());
    pump.push(&[0.1f32], 1, |sample| sample);
    pump.push(&[0.2f32], 1, |sample| sample);
    assert_eq!(dropped.load(Ordering::Relaxed), 1);
    assert_eq!(receiver.try_recv().unwrap(), vec![0.1]);
}

#[test]
fn dispatcher_ignores_empty_callbacks() {
    let (sender, receiver) = bounded::<Vec<f32>>(4);
    let dropped = Arc::new(AtomicUsize::new(0));
    let mut pump = ChunkDispatcher::new(sender, dropped);
    pump.push::<f32, _>(&[], 2, |sample| sample);
    assert!(receiver.try_recv().is_err());
}

fn options() -> SessionOptions {
    SessionOptions::default()
}

#[test]
fn stop_result_carries_wav_mime() {
    let result = evaluate_stop(Duration::from_secs(5), 0.05, false, vec![1, 2, 3], &options());
    assert_eq!(result.mime_type, WAV_MIME);
    assert_eq!(result.wav_bytes, vec![1, 2, 3]);
    assert_eq!(result.elapsed_ms, 5000);
}

#[test]
fn zero_elapsed_is_not_empty_or_too_short() {
    let result = evaluate_stop(Duration::ZERO, 0.0, false, Vec::new(), &options());
    assert!(!result.is_empty_or_too_short);
    assert!(result.is_too_quiet);
}

#[test]
fn empty_or_too_short_boundary_at_silence_window_plus_750() {
    let at_boundary = evaluate_stop(Duration::from_millis(3750), 0.05, true, Vec::new(), &options());
    assert!(at_boundary.is_empty_or_too_short);
    let past_boundary =
        evaluate_stop(Duration::from_millis(3751), 0.05, true, Vec::new(), &options());
    assert!(!past_boundary.is_empty_or_too_short);
}

#[test]
fn too_quiet_threshold_is_exclusive() {
    let quiet = evaluate_stop(Duration::from_secs(10), 0.0019, false, Vec::new(), &options());
    assert!(quiet.is_too_quiet);
    let at_threshold = evaluate_stop(Duration::from_secs(10), 0.002, false, Vec::new(), &options());
    assert!(!at_threshold.is_too_quiet);
}

#[test]
fn auto_stop_flag_is_carried_through() {
    let auto = evaluate_stop(Duration::from_secs(10), 0.05, true, Vec::new(), &options());
    assert!(auto.did_auto_stop);
    let manual = evaluate_stop(Duration::from_secs(10), 0.05, false, Vec::new(), &options());
    assert!(!manual.did_auto_stop);
}

#[test]
fn subscribers_unregister_when_guard_drops() {
    let listeners = StopListeners::new();
    assert!(listeners.is_empty());
    let sub_a = listeners.subscribe(|_| {});
    let sub_b = listeners.subscribe(|_| {});
    assert_eq!(listeners.len(), 2);
    drop(sub_a);
    assert_eq!(listeners.len(), 1);
    drop(sub_b);
    assert!(listeners.is_empty());
}

#[test]
fn subscribers_observe_shared_stop_results() {
    let listeners = StopListeners::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let _sub = listeners.subscribe(move |result| {
        seen_clone.lock().unwrap().push(result.elapsed_ms);
    });
    let result = Arc::new(evaluate_stop(
        Duration::from_secs(4),
        0.05,
        true,
        Vec::new(),
        &options(),
    ));
    for handler in listeners.snapshot_for_tests() {
        handler(result.clone());
    }
    assert_eq!(*seen.lock().unwrap(), vec![4000]);
}
