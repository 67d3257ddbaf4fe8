//! Memory card records and model-output validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Closed set of moods a card may carry. Serialized lowercase on the wire and
/// in the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Relaxed,
    Excited,
    Content,
    Grateful,
    Hopeful,
    Inspired,
    Pensive,
    Reflective,
    Mixed,
    Anxious,
    Frustrated,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Relaxed => "relaxed",
            Mood::Excited => "excited",
            Mood::Content => "content",
            Mood::Grateful => "grateful",
            Mood::Hopeful => "hopeful",
            Mood::Inspired => "inspired",
            Mood::Pensive => "pensive",
            Mood::Reflective => "reflective",
            Mood::Mixed => "mixed",
            Mood::Anxious => "anxious",
            Mood::Frustrated => "frustrated",
        }
    }
}

impl std::str::FromStr for Mood {
    type Err = CardValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(value.to_string()))
            .map_err(|_| CardValidationError::InvalidMood(value.to_string()))
    }
}

/// The structured content the language model produces for one transcript.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CardContent {
    pub title: String,
    pub mood: Mood,
    pub categories: Vec<String>,
    #[serde(alias = "actionItems")]
    pub action_items: Vec<String>,
}

/// A persisted voice memo card.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoryCard {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub transcript: String,
    pub title: String,
    pub mood: Mood,
    pub categories: Vec<String>,
    pub action_items: Vec<String>,
}

impl MemoryCard {
    /// Assemble a card from validated model output, minting id and timestamp.
    pub fn from_content(transcript: String, content: CardContent) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            transcript,
            title: content.title,
            mood: content.mood,
            categories: content.categories,
            action_items: content.action_items,
        }
    }
}

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_CATEGORIES: usize = 3;
pub const MAX_ACTION_ITEMS: usize = 5;

#[derive(Debug, Error)]
pub enum CardValidationError {
    #[error("model output is not the expected JSON object: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("title must be 1 to {MAX_TITLE_CHARS} characters, got {0}")]
    TitleLength(usize),
    #[error("unknown mood '{0}'")]
    InvalidMood(String),
    #[error("too many categories: {0} (max {MAX_CATEGORIES})")]
    TooManyCategories(usize),
    #[error("too many action items: {0} (max {MAX_ACTION_ITEMS})")]
    TooManyActionItems(usize),
}

/// Parse and validate the model's JSON output. Over-long lists are rejected
/// outright; surviving entries are trimmed and empties dropped.
pub fn validate_card_json(json: &str) -> Result<CardContent, CardValidationError> {
    let mut content: CardContent = serde_json::from_str(json)?;

    content.title = content.title.trim().to_string();
    let title_chars = content.title.chars().count();
    if title_chars == 0 || title_chars > MAX_TITLE_CHARS {
        return Err(CardValidationError::TitleLength(title_chars));
    }

    if content.categories.len() > MAX_CATEGORIES {
        return Err(CardValidationError::TooManyCategories(
            content.categories.len(),
        ));
    }
    if content.action_items.len() > MAX_ACTION_ITEMS {
        return Err(CardValidationError::TooManyActionItems(
            content.action_items.len(),
        ));
    }

    content.categories = trim_and_filter(content.categories);
    content.action_items = trim_and_filter(content.action_items);
    Ok(content)
}

fn trim_and_filter(entries: Vec<String>) -> Vec<String> {
    entries
        .into_iter()
        .map(|entry| entry.trim().to_string())
        .filter(|entry| !entry.is_empty())
        .collect()
}
