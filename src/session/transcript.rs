use serde::{Deserialize, Serialize};

/// Who authored a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speaker {
    /// The participant (rendered as "You" on the client)
    #[serde(rename = "You")]
    Participant,

    /// The deciding service
    Interviewer,
}

/// A single turn in the interview transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub speaker: Speaker,

    pub content: String,

    /// Interview phase reported by the interviewer, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
}

impl TranscriptEntry {
    pub fn participant(content: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Participant,
            content: content.into(),
            phase: None,
        }
    }

    pub fn interviewer(content: impl Into<String>, phase: Option<String>) -> Self {
        Self {
            speaker: Speaker::Interviewer,
            content: content.into(),
            phase,
        }
    }
}

/// Append-only, chronologically ordered transcript
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: TranscriptEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Participant-authored contents, in order
pub fn participant_messages(entries: &[TranscriptEntry]) -> Vec<String> {
    entries
        .iter()
        .filter(|entry| entry.speaker == Speaker::Participant)
        .map(|entry| entry.content.clone())
        .collect()
}
