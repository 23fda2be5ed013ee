use super::{EvaluationUpdate, InterviewStore, RecordId, StoredInterview};
use crate::session::CompletedInterview;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

/// Stores each interview as a pretty-printed JSON document in a directory
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create records directory: {:?}", dir))?;

        info!("Interview records stored in {}", dir.display());
        Ok(Self { dir })
    }

    pub fn path_for(&self, id: &RecordId) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    pub async fn load(&self, id: &RecordId) -> Result<StoredInterview> {
        let path = self.path_for(id);
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read interview record: {:?}", path))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("Malformed interview record: {:?}", path))
    }

    async fn write(&self, stored: &StoredInterview) -> Result<()> {
        let path = self.path_for(&stored.id);
        let json = serde_json::to_vec_pretty(stored)?;
        write_atomic(&path, &json).await
    }
}

/// Write through a temporary sibling so readers never see a partial file
async fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, data)
        .await
        .with_context(|| format!("Failed to write {:?}", tmp))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to move record into place: {:?}", path))?;
    Ok(())
}

#[async_trait]
impl InterviewStore for JsonFileStore {
    async fn save(&self, record: &CompletedInterview) -> Result<RecordId> {
        let id = RecordId::for_record(record);
        if tokio::fs::try_exists(self.path_for(&id)).await.unwrap_or(false) {
            info!("Interview {} already saved", id);
            return Ok(id);
        }

        let stored = StoredInterview {
            id: id.clone(),
            record: record.clone(),
            enrichment: EvaluationUpdate::default(),
        };
        self.write(&stored).await?;

        info!("Saved interview {} to {}", id, self.path_for(&id).display());
        Ok(id)
    }

    async fn update(&self, id: &RecordId, update: EvaluationUpdate) -> Result<()> {
        let mut stored = self.load(id).await?;
        stored.enrichment.merge(update);
        self.write(&stored).await
    }
}
