use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who a chat entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Assistant,
}

/// One entry in the displayed chat log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatEntry {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Append-only chat log with last-entry upsert for streaming transcripts
///
/// While a transcript streams in, the growing text replaces the last entry
/// when it belongs to the same speaker, so the displayed bubble grows
/// instead of multiplying.
#[derive(Debug, Default)]
pub struct ChatLog {
    entries: Vec<ChatEntry>,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, speaker: Speaker, text: String) {
        self.entries.push(ChatEntry {
            speaker,
            text,
            timestamp: Utc::now(),
        });
    }

    /// Replace the last entry when it has the same speaker, else append
    pub fn upsert(&mut self, speaker: Speaker, text: String) {
        match self.entries.last_mut() {
            Some(last) if last.speaker == speaker => {
                *last = ChatEntry {
                    speaker,
                    text,
                    timestamp: Utc::now(),
                };
            }
            _ => self.push(speaker, text),
        }
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-turn transcript accumulation, one growable buffer per speaker
///
/// Fragments stream in as deltas; the accumulator holds the full text of
/// the current turn until a turn-complete signal resets it.
#[derive(Debug, Default)]
pub struct TranscriptAccumulator {
    user: String,
    assistant: String,
}

impl TranscriptAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment and return the accumulated text for that speaker
    pub fn append(&mut self, speaker: Speaker, fragment: &str) -> &str {
        let buffer = match speaker {
            Speaker::User => &mut self.user,
            Speaker::Assistant => &mut self.assistant,
        };
        buffer.push_str(fragment);
        buffer
    }

    pub fn text(&self, speaker: Speaker) -> &str {
        match speaker {
            Speaker::User => &self.user,
            Speaker::Assistant => &self.assistant,
        }
    }

    /// Reset both buffers at the end of a turn
    pub fn reset(&mut self) {
        self.user.clear();
        self.assistant.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_grows_last_entry() {
        let mut log = ChatLog::new();
        log.upsert(Speaker::User, "he".to_string());
        log.upsert(Speaker::User, "hello".to_string());

        assert_eq!(log.len(), 1);
        assert_eq!(log.entries()[0].text, "hello");
    }

    #[test]
    fn test_upsert_appends_on_speaker_change() {
        let mut log = ChatLog::new();
        log.upsert(Speaker::Assistant, "how far".to_string());
        log.upsert(Speaker::User, "I dey".to_string());
        log.upsert(Speaker::Assistant, "correct".to_string());

        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_accumulator_is_per_speaker() {
        let mut acc = TranscriptAccumulator::new();
        acc.append(Speaker::User, "one ");
        acc.append(Speaker::Assistant, "two");
        let user_text = acc.append(Speaker::User, "three");

        assert_eq!(user_text, "one three");
        assert_eq!(acc.text(Speaker::Assistant), "two");
    }

    #[test]
    fn test_reset_clears_both_buffers() {
        let mut acc = TranscriptAccumulator::new();
        acc.append(Speaker::User, "abc");
        acc.append(Speaker::Assistant, "def");
        acc.reset();

        assert!(acc.text(Speaker::User).is_empty());
        assert!(acc.text(Speaker::Assistant).is_empty());
    }
}
