use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Entries kept on screen; older ones are evicted
pub const TRANSCRIPT_CAPACITY: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single line of conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: Role,

    pub text: String,

    /// When this entry was received
    pub timestamp: DateTime<Utc>,
}

/// Display buffer of the most recent conversation lines.
///
/// Not an archive: only the last [`TRANSCRIPT_CAPACITY`] entries survive.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: VecDeque<TranscriptEntry>,
    visible: bool,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `text` for `role`, evicting the oldest entry when full.
    ///
    /// Blank text is ignored; returns whether an entry was added.
    pub fn push(&mut self, role: Role, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }

        while self.entries.len() >= TRANSCRIPT_CAPACITY {
            self.entries.pop_front();
        }

        self.entries.push_back(TranscriptEntry {
            role,
            text: text.to_string(),
            timestamp: Utc::now(),
        });
        self.visible = true;

        true
    }

    pub fn entries(&self) -> impl Iterator<Item = &TranscriptEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Hide without discarding; the next push shows it again
    pub fn hide(&mut self) {
        self.visible = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(transcript: &Transcript) -> Vec<&str> {
        transcript.entries().map(|e| e.text.as_str()).collect()
    }

    #[test]
    fn test_third_entry_evicts_oldest() {
        let mut transcript = Transcript::new();
        transcript.push(Role::User, "one");
        transcript.push(Role::Assistant, "two");
        transcript.push(Role::User, "three");

        assert_eq!(transcript.len(), 2);
        assert_eq!(texts(&transcript), vec!["two", "three"]);
    }

    #[test]
    fn test_blank_text_is_ignored() {
        let mut transcript = Transcript::new();

        assert!(!transcript.push(Role::User, "   "));
        assert!(!transcript.push(Role::Assistant, ""));
        assert!(transcript.is_empty());
        assert!(!transcript.is_visible());
    }

    #[test]
    fn test_push_trims_and_shows() {
        let mut transcript = Transcript::new();
        transcript.push(Role::Assistant, "  hello \n");

        assert_eq!(texts(&transcript), vec!["hello"]);
        assert!(transcript.is_visible());

        transcript.hide();
        assert!(!transcript.is_visible());
        assert_eq!(transcript.len(), 1);
    }
}
