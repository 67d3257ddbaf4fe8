//! The memo pipeline: guardrails, transcription, card generation, and
//! persistence, plus the worker job the UI polls.

use crate::audio::StopResult;
use crate::card::MemoryCard;
use crate::llm::{generate_memory_card, CardModel, GenerateError};
use crate::log_debug;
use crate::store::{CardStore, StoreError};
use crate::stt::{is_transcript_too_short, SpeechToText, SttError};
use regex::Regex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, OnceLock};
use std::thread;
use thiserror::Error;

/// Friendly message for every "we heard nothing usable" failure.
pub const COULDNT_HEAR: &str = "Couldn't hear audio. Please try again and speak clearly.";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("capture produced no audio bytes")]
    EmptyAudio,
    #[error(transparent)]
    Transcription(#[from] SttError),
    #[error("transcript too short to be speech")]
    TranscriptTooShort,
    #[error(transparent)]
    Generation(#[from] GenerateError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PipelineError {
    /// The one string shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::EmptyAudio
            | PipelineError::Transcription(_)
            | PipelineError::TranscriptTooShort => COULDNT_HEAR.to_string(),
            PipelineError::Generation(err) => err.to_string(),
            PipelineError::Store(_) => "Couldn't save your memory card. Please try again.".to_string(),
        }
    }
}

/// Guardrail applied before any network call: empty/too-short or too-quiet
/// captures are silently discarded.
pub fn should_upload(stop: &StopResult) -> bool {
    !stop.is_empty_or_too_short && !stop.is_too_quiet
}

/// Collapse non-speech markers and stray whitespace out of a transcript.
pub fn sanitize_transcript(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    static NON_SPEECH_RE: OnceLock<Regex> = OnceLock::new();
    let re = NON_SPEECH_RE.get_or_init(|| {
        Regex::new(
            r"(?i)\[\s*\]|\(\s*\)|\[(?:\s*(?:silence|noise|inaudible|blank_audio|blank audio|music|laughter|applause|cough|breath(?:ing)?|wind|background)\s*)\]|\((?:\s*(?:silence|noise|inaudible|blank audio|music|laughter|applause|cough|breath(?:ing)?|wind|background|wind blowing)\s*)\)",
        )
        .expect("non-speech regex should compile")
    });
    let without_markers = re.replace_all(trimmed, " ");
    without_markers
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Transcribe, generate, and persist one finished capture.
pub fn create_card_from_audio(
    stop: &StopResult,
    stt: &dyn SpeechToText,
    model: &dyn CardModel,
    store: &dyn CardStore,
) -> Result<MemoryCard, PipelineError> {
    if stop.wav_bytes.is_empty() {
        return Err(PipelineError::EmptyAudio);
    }

    let transcribe_started = std::time::Instant::now();
    let raw = stt.transcribe(&stop.wav_bytes, stop.mime_type)?;
    let transcript = sanitize_transcript(&raw);
    crate::log_debug_content(&format!("transcript: {transcript}"));
    if is_transcript_too_short(&transcript) {
        return Err(PipelineError::TranscriptTooShort);
    }

    let generate_started = std::time::Instant::now();
    let content = generate_memory_card(model, &transcript)?;
    // Measured before the store write so persistence time is not attributed
    // to the model.
    let generate_ms = generate_started.elapsed().as_millis() as u64;
    let card = store.insert(transcript, content)?;
    tracing::info!(
        transcribe_ms = generate_started.duration_since(transcribe_started).as_millis() as u64,
        generate_ms,
        capture_ms = stop.elapsed_ms,
        "memo pipeline complete"
    );
    Ok(card)
}

/// Outcome of one memo job, delivered once.
#[derive(Debug)]
pub enum MemoJobMessage {
    Saved(MemoryCard),
    Failed(String),
}

/// Handle for a memo job running on its own thread. The UI polls `receiver`.
pub struct MemoJob {
    pub receiver: mpsc::Receiver<MemoJobMessage>,
    pub handle: Option<thread::JoinHandle<()>>,
    pub cancel_flag: Arc<AtomicBool>,
}

impl MemoJob {
    /// Ask the job to discard its result; the network call itself is not
    /// interrupted.
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::Relaxed);
    }
}

/// Run the pipeline for one capture on a worker thread.
pub fn start_memo_job(
    stop: Arc<StopResult>,
    stt: Arc<dyn SpeechToText + Send + Sync>,
    model: Arc<dyn CardModel + Send + Sync>,
    store: Arc<dyn CardStore>,
) -> MemoJob {
    let (tx, rx) = mpsc::sync_channel(1);
    let cancel_flag = Arc::new(AtomicBool::new(false));
    let cancel_clone = cancel_flag.clone();

    let handle = thread::spawn(move || {
        let message = match create_card_from_audio(&stop, stt.as_ref(), model.as_ref(), store.as_ref())
        {
            Ok(card) => MemoJobMessage::Saved(card),
            Err(err) => {
                log_debug(&format!("memo_job_error: {err}"));
                MemoJobMessage::Failed(err.user_message())
            }
        };
        if cancel_clone.load(Ordering::Relaxed) {
            return;
        }
        let _ = tx.send(message);
    });

    MemoJob {
        receiver: rx,
        handle: Some(handle),
        cancel_flag,
    }
}
