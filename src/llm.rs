//! Structured card generation via OpenAI chat completions.
//!
//! [`CardModel`] is the seam the pipeline depends on; [`generate_memory_card`]
//! applies the retry policy on top of any model so the policy is testable
//! with mocks.

use crate::card::{validate_card_json, CardContent, CardValidationError};
use crate::prompts::{
    MEMORY_CARD_RETRY_PROMPT_APPEND, MEMORY_CARD_SYSTEM_PROMPT, MEMORY_CARD_USER_MESSAGE_PREFIX,
};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

const OPENAI_BASE: &str = "https://api.openai.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,
    #[error("card generation request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("card generation request failed: {status} {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("model returned no content")]
    NoContent,
    #[error("model output failed validation: {0}")]
    Invalid(#[from] CardValidationError),
}

/// Seam between the retry policy and the model backend.
pub trait CardModel {
    /// Produce validated card content for a transcript; `extra_instruction`
    /// is appended to the user message on the retry attempt.
    fn complete(
        &self,
        transcript: &str,
        extra_instruction: Option<&str>,
    ) -> Result<CardContent, GenerateError>;
}

/// Try once; on any failure retry exactly once with the stricter instruction
/// appended. A failed retry surfaces the FIRST attempt's error.
pub fn generate_memory_card(
    model: &dyn CardModel,
    transcript: &str,
) -> Result<CardContent, GenerateError> {
    match model.complete(transcript, None) {
        Ok(content) => Ok(content),
        Err(first) => model
            .complete(transcript, Some(MEMORY_CARD_RETRY_PROMPT_APPEND))
            .map_err(|_| first),
    }
}

/// OpenAI chat-completions client constrained to JSON-object output.
pub struct OpenAiGenerator {
    client: reqwest::blocking::Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiGenerator {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Result<Self, GenerateError> {
        let api_key = api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or(GenerateError::MissingApiKey)?;
        Ok(Self {
            client: reqwest::blocking::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()?,
            api_key,
            model: model.into(),
            base_url: OPENAI_BASE.to_string(),
        })
    }

    /// Point the client at a different API root, used by tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl CardModel for OpenAiGenerator {
    fn complete(
        &self,
        transcript: &str,
        extra_instruction: Option<&str>,
    ) -> Result<CardContent, GenerateError> {
        let mut user_content = format!("{MEMORY_CARD_USER_MESSAGE_PREFIX}{transcript}");
        if let Some(extra) = extra_instruction {
            user_content.push_str("\n\n");
            user_content.push_str(extra);
        }

        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": MEMORY_CARD_SYSTEM_PROMPT },
                { "role": "user", "content": user_content },
            ],
            "response_format": { "type": "json_object" },
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GenerateError::Status { status, body });
        }

        let parsed: ChatResponse = response.json()?;
        let raw = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or(GenerateError::NoContent)?;

        Ok(validate_card_json(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::Mood;
    use std::cell::RefCell;

    struct ScriptedModel {
        responses: RefCell<Vec<Result<CardContent, GenerateError>>>,
        calls: RefCell<Vec<Option<String>>>,
    }

    impl ScriptedModel {
        fn new(responses: Vec<Result<CardContent, GenerateError>>) -> Self {
            Self {
                responses: RefCell::new(responses),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl CardModel for ScriptedModel {
        fn complete(
            &self,
            _transcript: &str,
            extra_instruction: Option<&str>,
        ) -> Result<CardContent, GenerateError> {
            self.calls
                .borrow_mut()
                .push(extra_instruction.map(str::to_string));
            self.responses.borrow_mut().remove(0)
        }
    }

    fn content(title: &str) -> CardContent {
        CardContent {
            title: title.to_string(),
            mood: Mood::Reflective,
            categories: vec![],
            action_items: vec![],
        }
    }

    #[test]
    fn first_attempt_success_skips_retry() {
        let model = ScriptedModel::new(vec![Ok(content("first"))]);
        let result = generate_memory_card(&model, "hello").unwrap();
        assert_eq!(result.title, "first");
        assert_eq!(model.calls.borrow().len(), 1);
        assert_eq!(model.calls.borrow()[0], None);
    }

    #[test]
    fn retry_success_returns_retried_value() {
        let model = ScriptedModel::new(vec![
            Err(GenerateError::NoContent),
            Ok(content("second")),
        ]);
        let result = generate_memory_card(&model, "hello").unwrap();
        assert_eq!(result.title, "second");
        let calls = model.calls.borrow();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[1].as_deref(),
            Some(MEMORY_CARD_RETRY_PROMPT_APPEND)
        );
    }

    #[test]
    fn double_failure_surfaces_the_first_error() {
        let model = ScriptedModel::new(vec![
            Err(GenerateError::NoContent),
            Err(GenerateError::MissingApiKey),
        ]);
        let err = generate_memory_card(&model, "hello").unwrap_err();
        assert!(matches!(err, GenerateError::NoContent));
        assert_eq!(model.calls.borrow().len(), 2);
    }

    #[test]
    fn generator_requires_an_api_key() {
        assert!(matches!(
            OpenAiGenerator::new(None, DEFAULT_OPENAI_MODEL),
            Err(GenerateError::MissingApiKey)
        ));
        assert!(matches!(
            OpenAiGenerator::new(Some(String::new()), DEFAULT_OPENAI_MODEL),
            Err(GenerateError::MissingApiKey)
        ));
    }

    #[test]
    fn chat_response_digs_first_choice_content() {
        let body = r#"{"choices":[{"message":{"content":"{\"a\":1}"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        let raw = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content);
        assert_eq!(raw.as_deref(), Some("{\"a\":1}"));
    }
}
