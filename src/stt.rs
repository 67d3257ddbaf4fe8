//! Speech-to-text over Deepgram.
//!
//! The trait seam keeps the pipeline testable with canned transcribers; the
//! real client posts raw capture bytes over a blocking HTTP connection since
//! all network work happens on the memo-job worker thread.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const DEEPGRAM_BASE: &str = "https://api.deepgram.com/v1/listen";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Transcripts shorter than this are treated as silence.
pub const MIN_TRANSCRIPT_LENGTH: usize = 2;

#[derive(Debug, Error)]
pub enum SttError {
    #[error("DEEPGRAM_API_KEY is not set")]
    MissingApiKey,
    #[error("transcription request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("transcription request failed: {status} {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("transcription response was not valid JSON: {0}")]
    BadResponse(#[source] serde_json::Error),
}

/// Seam between the pipeline and the transcription backend.
pub trait SpeechToText {
    fn transcribe(&self, audio: &[u8], mime_type: &str) -> Result<String, SttError>;
}

/// Deepgram prerecorded-audio client.
pub struct DeepgramTranscriber {
    client: reqwest::blocking::Client,
    api_key: String,
    base_url: String,
}

#[derive(Deserialize)]
struct ListenResponse {
    #[serde(default)]
    results: Option<ListenResults>,
}

#[derive(Deserialize)]
struct ListenResults {
    #[serde(default)]
    channels: Vec<ListenChannel>,
}

#[derive(Deserialize)]
struct ListenChannel {
    #[serde(default)]
    alternatives: Vec<ListenAlternative>,
}

#[derive(Deserialize)]
struct ListenAlternative {
    #[serde(default)]
    transcript: String,
}

impl DeepgramTranscriber {
    pub fn new(api_key: Option<String>) -> Result<Self, SttError> {
        let api_key = api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or(SttError::MissingApiKey)?;
        Ok(Self {
            client: reqwest::blocking::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()?,
            api_key,
            base_url: DEEPGRAM_BASE.to_string(),
        })
    }

    /// Point the client at a different listen endpoint, used by tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl SpeechToText for DeepgramTranscriber {
    fn transcribe(&self, audio: &[u8], mime_type: &str) -> Result<String, SttError> {
        let url = format!("{}?model=nova-2&smart_format=true", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", mime_type)
            .body(audio.to_vec())
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SttError::Status { status, body });
        }

        let body = response.text()?;
        let parsed: ListenResponse =
            serde_json::from_str(&body).map_err(SttError::BadResponse)?;
        let transcript = parsed
            .results
            .and_then(|results| results.channels.into_iter().next())
            .and_then(|channel| channel.alternatives.into_iter().next())
            .map(|alternative| alternative.transcript.trim().to_string())
            .unwrap_or_default();
        Ok(transcript)
    }
}

/// True when the transcript is too short to be real speech.
pub fn is_transcript_too_short(transcript: &str) -> bool {
    transcript.chars().count() < MIN_TRANSCRIPT_LENGTH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_is_rejected_up_front() {
        assert!(matches!(
            DeepgramTranscriber::new(None),
            Err(SttError::MissingApiKey)
        ));
        assert!(matches!(
            DeepgramTranscriber::new(Some("   ".to_string())),
            Err(SttError::MissingApiKey)
        ));
    }

    #[test]
    fn transcript_length_gate() {
        assert!(is_transcript_too_short(""));
        assert!(is_transcript_too_short("a"));
        assert!(!is_transcript_too_short("ok"));
        assert!(!is_transcript_too_short("hello there"));
    }

    #[test]
    fn listen_response_digs_first_alternative() {
        let body = r#"{
            "results": {
                "channels": [
                    { "alternatives": [ { "transcript": "  hello world  " } ] }
                ]
            }
        }"#;
        let parsed: ListenResponse = serde_json::from_str(body).unwrap();
        let transcript = parsed
            .results
            .and_then(|results| results.channels.into_iter().next())
            .and_then(|channel| channel.alternatives.into_iter().next())
            .map(|alternative| alternative.transcript.trim().to_string())
            .unwrap_or_default();
        assert_eq!(transcript, "hello world");
    }

    #[test]
    fn empty_listen_response_yields_empty_transcript() {
        let parsed: ListenResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.results.is_none());
    }
}
