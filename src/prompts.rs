//! Prompt copy for the card-generation model, kept in one place so edits stay
//! consistent across the normal and retry paths.

pub const MOOD_LIST: &str =
    "relaxed, excited, content, grateful, hopeful, inspired, pensive, reflective, mixed, anxious, frustrated";

pub const MEMORY_CARD_SYSTEM_PROMPT: &str = "You are a helpful assistant that turns a spoken transcript into a structured memory card.\n\nRules:\n- Mood: Infer the speaker's mood from the transcript (tone, content, word choice). Valid moods: relaxed, excited, content, grateful, hopeful, inspired, pensive, reflective, mixed, anxious, frustrated. Pick the one that best fits—do not default to \"reflective\". Use \"reflective\" only when the speaker is genuinely contemplative or looking back; use \"pensive\" for thoughtful/uncertain; use \"content\", \"grateful\", \"hopeful\", etc. when the tone is clearly positive.\n- Produce a high-quality, concise title that captures the essence of the conversation.\n- Categories: up to 3 short tags/labels (e.g. \"work\", \"personal\", \"ideas\")—generate whatever fits the transcript.\n- Extract only actionable items (imperative, things the person could do): e.g. \"Book restaurant\", \"Send status update\". Do not include vague or non-actionable notes.\n- Use at most 3 categories and at most 5 action items.\n- Return only valid JSON matching the schema: title (string), mood (one of the valid moods), categories (array of strings, \u{2264}3), actionItems (array of strings, \u{2264}5, trimmed, no empty).";

/// Appended to the user message on the single retry after a failed attempt.
pub const MEMORY_CARD_RETRY_PROMPT_APPEND: &str =
    " Return JSON only matching this schema: { title: string, mood: enum (see Mood values), categories: string[] (\u{2264}3), actionItems: string[] (\u{2264}5) }. No other text.";

/// Prefix for the user message carrying the transcript.
pub const MEMORY_CARD_USER_MESSAGE_PREFIX: &str = "Transcript:\n\n";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_names_every_mood() {
        for mood in MOOD_LIST.split(", ") {
            assert!(
                MEMORY_CARD_SYSTEM_PROMPT.contains(mood),
                "missing mood {mood}"
            );
        }
    }

    #[test]
    fn retry_append_demands_json_only() {
        assert!(MEMORY_CARD_RETRY_PROMPT_APPEND.contains("JSON only"));
    }
}
