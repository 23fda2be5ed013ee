use super::{flatten_scores, Evaluator, ScoreMap};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Endpoints of the evaluation services
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Whether finished interviews are sent for scoring at all
    pub enabled: bool,

    /// Base URL of the feature/emotion extraction service
    pub features_url: String,

    /// Invocation URL of the scoring model
    pub scoring_url: String,

    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            features_url: "http://localhost:5000".to_string(),
            scoring_url: "http://localhost:8080/invocations".to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Serialize)]
struct FeatureRequest<'a> {
    participant_id: &'a str,
    video_filename: String,
}

#[derive(Debug, Deserialize)]
struct FeatureResponse {
    status: String,
    #[serde(default)]
    instances: Vec<Value>,
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct ScoreRequest<'a> {
    instances: &'a [Value],
}

#[derive(Debug, Serialize)]
struct EmotionRequest<'a> {
    messages: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmotionResponse {
    status: String,
    emotion_analysis: Option<Value>,
    error: Option<String>,
}

/// `Evaluator` talking JSON over HTTP
#[derive(Debug, Clone)]
pub struct HttpEvaluator {
    client: reqwest::Client,
    features_url: String,
    scoring_url: String,
}

impl HttpEvaluator {
    pub fn new(config: &EvaluationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build evaluation HTTP client")?;

        Ok(Self {
            client,
            features_url: config.features_url.trim_end_matches('/').to_string(),
            scoring_url: config.scoring_url.clone(),
        })
    }

    async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<R> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("{} returned HTTP {}: {}", url, status, text);
        }

        response
            .json::<R>()
            .await
            .with_context(|| format!("Invalid JSON response from {}", url))
    }
}

#[async_trait]
impl Evaluator for HttpEvaluator {
    async fn extract_features(&self, participant_id: &str, media: &Path) -> Result<Vec<Value>> {
        info!("Requesting feature extraction for participant {}", participant_id);

        let url = format!("{}/extract_features", self.features_url);
        let response: FeatureResponse = self
            .post(
                &url,
                &FeatureRequest {
                    participant_id,
                    video_filename: media.display().to_string(),
                },
            )
            .await?;

        if response.status != "success" {
            return Err(anyhow!(response
                .message
                .unwrap_or_else(|| "Failed to extract features".to_string())));
        }

        info!("Feature extraction complete: {} instances", response.instances.len());
        Ok(response.instances)
    }

    async fn score(&self, instances: &[Value]) -> Result<ScoreMap> {
        info!("Requesting scores for {} instances", instances.len());

        let response: Value = self
            .post(&self.scoring_url, &ScoreRequest { instances })
            .await?;

        match response {
            Value::Object(map) => Ok(flatten_scores(map)),
            other => bail!("Scoring response was not an object: {}", other),
        }
    }

    async fn extract_emotion(&self, messages: &[String]) -> Result<Value> {
        info!("Requesting emotion analysis of {} messages", messages.len());

        let url = format!("{}/extract_emotion", self.features_url);
        let response: EmotionResponse = self.post(&url, &EmotionRequest { messages }).await?;

        if response.status != "success" {
            return Err(anyhow!(response
                .error
                .unwrap_or_else(|| "Failed to extract emotions".to_string())));
        }

        response
            .emotion_analysis
            .ok_or_else(|| anyhow!("Emotion response missing emotion_analysis"))
    }
}
