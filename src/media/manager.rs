use super::buffer::{MediaBuffer, PushReport};
use super::transcode::Transcoder;
use crate::error::MediaError;
use chrono::Utc;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Media buffering configuration
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Per-participant byte ceiling (default: 50 MiB)
    pub ceiling_bytes: usize,
    /// Maximum queued, not yet drained fragments across all participants
    pub queue_capacity: usize,
    /// How often the intake queue is drained
    pub drain_interval: Duration,
    /// Maximum fragments moved per drain
    pub drain_batch: usize,
    /// Where raw captures are staged before transcoding
    pub staging_dir: PathBuf,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ceiling_bytes: 50 * 1024 * 1024,
            queue_capacity: 1024,
            drain_interval: Duration::from_millis(50),
            drain_batch: 64,
            staging_dir: PathBuf::from("uploads"),
        }
    }
}

#[derive(Debug)]
struct QueuedFragment {
    participant_id: String,
    data: Vec<u8>,
}

struct ManagerInner {
    config: MediaConfig,
    buffers: DashMap<String, MediaBuffer>,
    queue: Mutex<VecDeque<QueuedFragment>>,
    transcoder: Arc<dyn Transcoder>,
}

impl ManagerInner {
    fn queue(&self) -> MutexGuard<'_, VecDeque<QueuedFragment>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove and return every queued fragment for one participant
    fn take_queued(&self, participant_id: &str) -> Vec<Vec<u8>> {
        let mut queue = self.queue();
        let mut taken = Vec::new();
        let mut kept = VecDeque::with_capacity(queue.len());
        for fragment in queue.drain(..) {
            if fragment.participant_id == participant_id {
                taken.push(fragment.data);
            } else {
                kept.push_back(fragment);
            }
        }
        *queue = kept;
        taken
    }
}

/// Accumulates captured media per participant under a memory ceiling.
///
/// Fragments are queued on intake and moved into their buffers in batches
/// by [`MediaBufferManager::drain_once`], which [`MediaBufferManager::spawn_drain`]
/// runs on a fixed interval.
#[derive(Clone)]
pub struct MediaBufferManager {
    inner: Arc<ManagerInner>,
}

impl MediaBufferManager {
    pub fn new(config: MediaConfig, transcoder: Arc<dyn Transcoder>) -> Self {
        info!(
            "Media buffer manager initialized: ceiling {} bytes, queue {} fragments, drain every {:?}",
            config.ceiling_bytes, config.queue_capacity, config.drain_interval
        );

        Self {
            inner: Arc::new(ManagerInner {
                config,
                buffers: DashMap::new(),
                queue: Mutex::new(VecDeque::new()),
                transcoder,
            }),
        }
    }

    /// Open a capture buffer for a participant. No-op if one exists.
    pub fn start(&self, participant_id: &str) {
        let ceiling = self.inner.config.ceiling_bytes;
        self.inner
            .buffers
            .entry(participant_id.to_string())
            .or_insert_with(|| {
                info!("Media capture started for participant {}", participant_id);
                MediaBuffer::new(ceiling)
            });
    }

    /// Queue a fragment for buffering. Returns false if it was dropped
    /// because capture is paused or not active.
    pub fn ingest(&self, participant_id: &str, fragment: Vec<u8>) -> bool {
        let accepting = self
            .inner
            .buffers
            .get(participant_id)
            .map(|buffer| !buffer.is_paused())
            .unwrap_or(false);

        if !accepting {
            debug!(
                "Dropping {} byte fragment for participant {} (capture inactive or paused)",
                fragment.len(),
                participant_id
            );
            return false;
        }

        let mut queue = self.inner.queue();
        if queue.len() >= self.inner.config.queue_capacity {
            if let Some(dropped) = queue.pop_front() {
                warn!(
                    "Media intake queue full, dropped oldest {} byte fragment for participant {}",
                    dropped.data.len(),
                    dropped.participant_id
                );
            }
        }
        queue.push_back(QueuedFragment {
            participant_id: participant_id.to_string(),
            data: fragment,
        });
        true
    }

    /// Move one batch of queued fragments into their buffers.
    /// Returns the number of fragments taken off the queue.
    pub fn drain_once(&self) -> usize {
        let batch: Vec<QueuedFragment> = {
            let mut queue = self.inner.queue();
            let count = self.inner.config.drain_batch.min(queue.len());
            queue.drain(..count).collect()
        };

        let taken = batch.len();
        for fragment in batch {
            // Pausing gates intake only; fragments queued before it still land
            let Some(mut buffer) = self.inner.buffers.get_mut(&fragment.participant_id) else {
                continue;
            };
            let report = buffer.push(fragment.data);
            self.log_push(&fragment.participant_id, &report);
        }

        taken
    }

    fn log_push(&self, participant_id: &str, report: &PushReport) {
        if !report.lost_data() {
            return;
        }
        if report.rejected {
            warn!(
                "Fragment larger than the {} byte ceiling dropped for participant {}",
                self.inner.config.ceiling_bytes, participant_id
            );
        } else {
            warn!(
                "Media buffer ceiling reached for participant {}: evicted {} oldest fragments ({} bytes)",
                participant_id, report.evicted_fragments, report.evicted_bytes
            );
        }
    }

    /// Run `drain_once` on the configured interval until the manager is dropped
    pub fn spawn_drain(&self) -> JoinHandle<()> {
        let weak: Weak<ManagerInner> = Arc::downgrade(&self.inner);
        let period = self.inner.config.drain_interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                MediaBufferManager { inner }.drain_once();
            }

            debug!("Media drain task stopped");
        })
    }

    pub fn pause(&self, participant_id: &str) {
        if let Some(mut buffer) = self.inner.buffers.get_mut(participant_id) {
            buffer.set_paused(true);
            info!("Media buffering paused for participant {}", participant_id);
        }
    }

    pub fn resume(&self, participant_id: &str) {
        if let Some(mut buffer) = self.inner.buffers.get_mut(participant_id) {
            buffer.set_paused(false);
            info!("Media buffering resumed for participant {}", participant_id);
        }
    }

    pub fn is_paused(&self, participant_id: &str) -> Option<bool> {
        self.inner
            .buffers
            .get(participant_id)
            .map(|buffer| buffer.is_paused())
    }

    pub fn is_active(&self, participant_id: &str) -> bool {
        self.inner.buffers.contains_key(participant_id)
    }

    /// Bytes currently held in the participant's buffer (excludes the queue)
    pub fn buffered_bytes(&self, participant_id: &str) -> Option<usize> {
        self.inner
            .buffers
            .get(participant_id)
            .map(|buffer| buffer.size())
    }

    pub fn queued_fragments(&self) -> usize {
        self.inner.queue().len()
    }

    /// Encode the participant's capture into a seekable artifact named
    /// `destination_name` and release the buffer.
    pub async fn finalize(
        &self,
        participant_id: &str,
        destination_name: &str,
    ) -> Result<PathBuf, MediaError> {
        let pending = self.inner.take_queued(participant_id);
        let Some((_, mut buffer)) = self.inner.buffers.remove(participant_id) else {
            return Err(MediaError::NoData(participant_id.to_string()));
        };

        for fragment in pending {
            let report = buffer.push(fragment);
            self.log_push(participant_id, &report);
        }
        if buffer.is_empty() {
            return Err(MediaError::NoData(participant_id.to_string()));
        }

        let captured_for = Utc::now() - buffer.started_at();
        let data = buffer.into_bytes();
        let staging_dir = &self.inner.config.staging_dir;
        tokio::fs::create_dir_all(staging_dir).await?;
        let staging_path = staging_dir.join(format!("{}.staging", destination_name));

        info!(
            "Finalizing media for participant {}: {} bytes over {}s staged at {}",
            participant_id,
            data.len(),
            captured_for.num_seconds(),
            staging_path.display()
        );

        let result = match tokio::fs::write(&staging_path, &data).await {
            Ok(()) => {
                self.inner
                    .transcoder
                    .transcode(&staging_path, destination_name)
                    .await
            }
            Err(e) => Err(MediaError::Io(e)),
        };

        if let Err(e) = tokio::fs::remove_file(&staging_path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    "Failed to remove staging file {}: {}",
                    staging_path.display(),
                    e
                );
            }
        }

        if let Ok(path) = &result {
            info!(
                "Saved seekable capture for participant {} at {}",
                participant_id,
                path.display()
            );
        }

        result
    }

    /// Discard the participant's capture without writing anything.
    /// Returns true if a buffer or queued data existed.
    pub fn abort(&self, participant_id: &str) -> bool {
        let queued = self.inner.take_queued(participant_id);
        let buffer = self.inner.buffers.remove(participant_id);

        let discarded = buffer.is_some() || !queued.is_empty();
        if discarded {
            let bytes = buffer.map(|(_, b)| b.size()).unwrap_or(0)
                + queued.iter().map(Vec::len).sum::<usize>();
            info!(
                "Media capture discarded for participant {} ({} bytes)",
                participant_id, bytes
            );
        }
        discarded
    }
}

/// Filesystem-safe stem for a participant's artifacts
pub fn artifact_stem(participant_id: &str) -> String {
    participant_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
