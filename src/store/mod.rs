//! Persistence of completed interviews
//!
//! The registry hands a `CompletedInterview` to an `InterviewStore` once an
//! interview concludes, then enriches it with scores via `update`.
//! - `MemoryStore`: process-local, used by default and in tests
//! - `JsonFileStore`: one JSON document per interview in a directory

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use crate::evaluation::ScoreMap;
use crate::media::artifact_stem;
use crate::session::CompletedInterview;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a persisted interview.
///
/// Derived from the participant and start time, so saving the same record
/// twice yields the same ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn for_record(record: &CompletedInterview) -> Self {
        Self(format!(
            "{}-{}",
            artifact_stem(&record.participant_id),
            record.started_at.timestamp_millis()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Scoring results merged into a persisted interview
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationUpdate {
    /// Facial, prosodic and lexical scores from the scoring model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores: Option<ScoreMap>,

    /// Emotion analysis of the participant's messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<serde_json::Value>,
}

impl EvaluationUpdate {
    pub fn is_empty(&self) -> bool {
        self.scores.is_none() && self.emotion.is_none()
    }

    /// Overlay the fields present in `other`
    pub fn merge(&mut self, other: EvaluationUpdate) {
        if other.scores.is_some() {
            self.scores = other.scores;
        }
        if other.emotion.is_some() {
            self.emotion = other.emotion;
        }
    }
}

/// A persisted interview together with any enrichment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredInterview {
    pub id: RecordId,

    #[serde(flatten)]
    pub record: CompletedInterview,

    #[serde(default)]
    pub enrichment: EvaluationUpdate,
}

/// Durable storage for completed interviews. Both operations are safe to retry.
#[async_trait]
pub trait InterviewStore: Send + Sync {
    async fn save(&self, record: &CompletedInterview) -> Result<RecordId>;

    async fn update(&self, id: &RecordId, update: EvaluationUpdate) -> Result<()>;
}
