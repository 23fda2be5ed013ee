use super::transcript::{participant_messages, TranscriptEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The record handed to persistence when an interview concludes naturally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedInterview {
    pub participant_id: String,

    pub started_at: DateTime<Utc>,

    /// Interview duration, excluding time spent disconnected
    pub duration_ms: u64,

    pub transcript: Vec<TranscriptEntry>,

    /// Evaluation produced by the interviewer at the end of the interview
    pub evaluation: serde_json::Value,

    /// Location of the encoded capture, when one was produced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_locator: Option<PathBuf>,
}

impl CompletedInterview {
    pub fn participant_messages(&self) -> Vec<String> {
        participant_messages(&self.transcript)
    }
}
