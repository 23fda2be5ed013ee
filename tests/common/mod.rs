// Shared fixtures for integration tests
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use interview_relay::evaluation::{Evaluator, ScoreMap};
use interview_relay::media::{MediaBufferManager, MediaConfig, Transcoder};
use interview_relay::relay::{ClientEvent, DeciderEvent, RelayBridge};
use interview_relay::session::{SessionConfig, SessionRegistry};
use interview_relay::store::{InterviewStore, MemoryStore};
use interview_relay::MediaError;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::mpsc;

/// Transcoder that copies the staged capture into `output_dir`
pub struct CopyTranscoder {
    pub output_dir: PathBuf,
}

#[async_trait]
impl Transcoder for CopyTranscoder {
    async fn transcode(&self, input: &Path, output_name: &str) -> Result<PathBuf, MediaError> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let output = self.output_dir.join(output_name);
        tokio::fs::copy(input, &output).await?;
        Ok(output)
    }
}

/// Evaluator whose feature extraction always fails; records every call
#[derive(Default)]
pub struct FlakyEvaluator {
    pub calls: Mutex<Vec<String>>,
}

impl FlakyEvaluator {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Evaluator for FlakyEvaluator {
    async fn extract_features(&self, participant_id: &str, _media: &Path) -> Result<Vec<Value>> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("extract_features:{}", participant_id));
        Err(anyhow!("feature service unavailable"))
    }

    async fn score(&self, _instances: &[Value]) -> Result<ScoreMap> {
        self.calls.lock().unwrap().push("score".to_string());
        Ok(ScoreMap::new())
    }

    async fn extract_emotion(&self, messages: &[String]) -> Result<Value> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("extract_emotion:{}", messages.len()));
        Ok(json!({"dominant": "calm"}))
    }
}

pub struct Harness {
    pub registry: SessionRegistry,
    pub relay: RelayBridge,
    pub media: MediaBufferManager,
    pub store: Arc<MemoryStore>,
    pub decider: mpsc::UnboundedReceiver<DeciderEvent>,
    pub dir: TempDir,
}

impl Harness {
    pub fn new(evaluator: Option<Arc<dyn Evaluator>>) -> Self {
        let dir = TempDir::new().unwrap();
        let media_config = MediaConfig {
            staging_dir: dir.path().join("staging"),
            ..MediaConfig::default()
        };
        let transcoder = Arc::new(CopyTranscoder {
            output_dir: dir.path().join("uploads"),
        });
        let media = MediaBufferManager::new(media_config, transcoder);

        let (relay, decider) = RelayBridge::new();
        let store = Arc::new(MemoryStore::new());
        let dyn_store: Arc<dyn InterviewStore> = store.clone();

        let registry = SessionRegistry::new(
            SessionConfig::default(),
            relay.clone(),
            media.clone(),
            dyn_store,
            evaluator,
        );

        Self {
            registry,
            relay,
            media,
            store,
            decider,
            dir,
        }
    }

    /// Every event queued for the deciding service so far
    pub fn decider_events(&mut self) -> Vec<DeciderEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.decider.try_recv() {
            events.push(event);
        }
        events
    }
}

pub fn drain_client(rx: &mut mpsc::Receiver<ClientEvent>) -> Vec<ClientEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
