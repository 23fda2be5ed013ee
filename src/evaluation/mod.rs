//! Post-interview evaluation
//!
//! After an interview is persisted, the registry asks an `Evaluator` for
//! feature extraction and scoring of the captured media, and for emotion
//! analysis of the participant's messages. Each call is an optional
//! enrichment and may fail independently.

mod http;

pub use http::{EvaluationConfig, HttpEvaluator};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Named scores returned by the scoring model
pub type ScoreMap = BTreeMap<String, Value>;

#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Extract model input features from a participant's captured media
    async fn extract_features(&self, participant_id: &str, media: &Path) -> Result<Vec<Value>>;

    /// Score extracted feature instances
    async fn score(&self, instances: &[Value]) -> Result<ScoreMap>;

    /// Analyse the emotional content of the participant's messages
    async fn extract_emotion(&self, messages: &[String]) -> Result<Value>;
}

/// Convert a scoring response into a `ScoreMap`, unwrapping single-element
/// arrays (`{"Calm": [0.7]}` becomes `{"Calm": 0.7}`).
pub fn flatten_scores(response: serde_json::Map<String, Value>) -> ScoreMap {
    response
        .into_iter()
        .map(|(name, value)| match value {
            Value::Array(mut items) if items.len() == 1 => (name, items.remove(0)),
            other => (name, other),
        })
        .collect()
}
