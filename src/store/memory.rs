use super::{EvaluationUpdate, InterviewStore, RecordId, StoredInterview};
use crate::session::CompletedInterview;
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

/// Process-local interview store
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<RecordId, StoredInterview>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: &RecordId) -> Option<StoredInterview> {
        self.records.read().await.get(id).cloned()
    }

    pub async fn all(&self) -> Vec<StoredInterview> {
        self.records.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl InterviewStore for MemoryStore {
    async fn save(&self, record: &CompletedInterview) -> Result<RecordId> {
        let id = RecordId::for_record(record);
        let mut records = self.records.write().await;
        records
            .entry(id.clone())
            .or_insert_with(|| StoredInterview {
                id: id.clone(),
                record: record.clone(),
                enrichment: EvaluationUpdate::default(),
            });

        info!("Saved interview {} ({} transcript entries)", id, record.transcript.len());
        Ok(id)
    }

    async fn update(&self, id: &RecordId, update: EvaluationUpdate) -> Result<()> {
        let mut records = self.records.write().await;
        match records.get_mut(id) {
            Some(stored) => {
                stored.enrichment.merge(update);
                Ok(())
            }
            None => bail!("Interview {} not found", id),
        }
    }
}
