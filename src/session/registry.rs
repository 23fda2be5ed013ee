use super::config::SessionConfig;
use super::record::CompletedInterview;
use super::session::{ExpiryToken, InterviewSession, PendingExpiry};
use super::stats::SessionSnapshot;
use super::transcript::TranscriptEntry;
use crate::error::MediaError;
use crate::evaluation::Evaluator;
use crate::media::{artifact_stem, MediaBufferManager};
use crate::relay::{ClientEvent, ConnectionHandle, DeciderEvent, RelayBridge};
use crate::store::{EvaluationUpdate, InterviewStore, RecordId};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

/// Per-participant slot. The mutex serializes every operation on one
/// participant; `None` means no session.
type Slot = Arc<Mutex<Option<InterviewSession>>>;

/// Result of attaching a connection to a participant's session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    /// A new interview started
    Created,
    /// The session was in its grace window and picked up where it left off
    Resumed,
    /// The session was already connected; only the handle changed
    Refreshed,
}

/// Everything needed to finish an interview once its lock is released
#[derive(Debug)]
struct FinalizeJob {
    participant_id: String,
    started_at: DateTime<Utc>,
    duration_ms: u64,
    transcript: Vec<TranscriptEntry>,
    evaluation: serde_json::Value,
}

struct RegistryInner {
    config: SessionConfig,
    slots: DashMap<String, Slot>,
    /// Slots currently holding a session
    live: AtomicUsize,
    /// Natural-end finalizations still running in the background
    finalizing: TaskTracker,
    relay: RelayBridge,
    media: MediaBufferManager,
    store: Arc<dyn InterviewStore>,
    evaluator: Option<Arc<dyn Evaluator>>,
}

/// Exclusive access to one participant's slot. Dropping a guard whose slot
/// is empty removes the slot from the table while the lock is still held.
struct SlotGuard<'a> {
    slots: &'a DashMap<String, Slot>,
    live: &'a AtomicUsize,
    /// Whether the slot held a session when the lock was taken
    occupied: bool,
    participant_id: String,
    slot: Slot,
    guard: OwnedMutexGuard<Option<InterviewSession>>,
}

impl Deref for SlotGuard<'_> {
    type Target = Option<InterviewSession>;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl DerefMut for SlotGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        match (self.occupied, self.guard.is_some()) {
            (false, true) => {
                self.live.fetch_add(1, Ordering::Relaxed);
            }
            (true, false) => {
                self.live.fetch_sub(1, Ordering::Relaxed);
            }
            _ => {}
        }

        if self.guard.is_none() {
            self.slots
                .remove_if(&self.participant_id, |_, slot| Arc::ptr_eq(slot, &self.slot));
        }
    }
}

/// Owns every live interview session and drives its lifecycle.
///
/// Operations on one participant are serialized by that participant's slot
/// lock; different participants never contend.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RegistryInner>,
}

impl SessionRegistry {
    pub fn new(
        config: SessionConfig,
        relay: RelayBridge,
        media: MediaBufferManager,
        store: Arc<dyn InterviewStore>,
        evaluator: Option<Arc<dyn Evaluator>>,
    ) -> Self {
        info!(
            "Session registry initialized (grace period {:?}, end phase {:?})",
            config.grace_period, config.end_phase
        );

        Self {
            inner: Arc::new(RegistryInner {
                config,
                slots: DashMap::new(),
                live: AtomicUsize::new(0),
                finalizing: TaskTracker::new(),
                relay,
                media,
                store,
                evaluator,
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Lock a participant's slot, creating an empty one if needed
    async fn lock(&self, participant_id: &str) -> SlotGuard<'_> {
        loop {
            let slot = Arc::clone(
                self.inner
                    .slots
                    .entry(participant_id.to_string())
                    .or_default()
                    .value(),
            );
            let guard = Arc::clone(&slot).lock_owned().await;

            // The slot may have been retired while we waited for it
            let current = self
                .inner
                .slots
                .get(participant_id)
                .map(|entry| Arc::ptr_eq(entry.value(), &slot))
                .unwrap_or(false);

            if current {
                return SlotGuard {
                    slots: &self.inner.slots,
                    live: &self.inner.live,
                    occupied: guard.is_some(),
                    participant_id: participant_id.to_string(),
                    slot,
                    guard,
                };
            }
        }
    }

    /// Bind a connection to the participant's session, creating the session
    /// if none exists.
    pub async fn attach(
        &self,
        participant_id: &str,
        handle: ConnectionHandle,
        display_name: &str,
    ) -> AttachOutcome {
        let mut slot = self.lock(participant_id).await;

        match slot.as_mut() {
            Some(session) => {
                let resumed = session.cancel_pending_expiry();
                if resumed {
                    session.stopwatch.start();
                    self.inner.media.resume(participant_id);
                }

                session.connection = Some(handle);
                self.inner.relay.deliver_to_participant(
                    Some(handle),
                    ClientEvent::History {
                        transcript: session.transcript.entries().to_vec(),
                    },
                );

                if resumed {
                    info!(
                        "Participant {} reconnected on {}, sent {} transcript entries",
                        participant_id,
                        handle,
                        session.transcript.len()
                    );
                    AttachOutcome::Resumed
                } else {
                    debug!("Participant {} rebound to {}", participant_id, handle);
                    AttachOutcome::Refreshed
                }
            }
            None => {
                *slot = Some(InterviewSession::new(participant_id, display_name, handle));
                self.inner.media.start(participant_id);
                self.inner.relay.deliver_to_decider(DeciderEvent::StartSession {
                    participant_id: participant_id.to_string(),
                    display_name: display_name.to_string(),
                });

                info!("Participant {} started a new interview", participant_id);
                AttachOutcome::Created
            }
        }
    }

    /// Record an interviewer turn and forward it to the participant. A turn
    /// in the end phase also concludes the interview in the background.
    pub async fn relay_outbound(
        &self,
        participant_id: &str,
        content: String,
        phase: Option<String>,
        evaluation: Option<serde_json::Value>,
    ) {
        let job = {
            let mut slot = self.lock(participant_id).await;
            let Some(session) = slot.as_mut() else {
                warn!(
                    "Interviewer response for unknown participant {}, dropping",
                    participant_id
                );
                return;
            };
            if session.finalizing {
                warn!(
                    "Interviewer response for concluded interview of {}, dropping",
                    participant_id
                );
                return;
            }

            let is_end = phase.as_deref() == Some(self.inner.config.end_phase.as_str());

            session
                .transcript
                .push(TranscriptEntry::interviewer(content.clone(), phase));
            self.inner
                .relay
                .deliver_to_participant(session.connection, ClientEvent::Content { content });

            if !is_end {
                return;
            }
            Self::begin_finalize(session, evaluation.unwrap_or(serde_json::Value::Null))
        };

        if let Some(job) = job {
            let registry = self.clone();
            self.inner.finalizing.spawn(async move {
                registry.complete_finalize(job).await;
            });
        }
    }

    /// Record a participant message and forward it to the deciding service
    pub async fn relay_inbound(&self, participant_id: &str, handle: ConnectionHandle, content: String) {
        let mut slot = self.lock(participant_id).await;
        let Some(session) = slot.as_mut() else {
            warn!("Message from participant {} without a session, dropping", participant_id);
            return;
        };
        if !session.is_bound_to(handle) {
            warn!(
                "Message for participant {} from stale connection {}, dropping",
                participant_id, handle
            );
            return;
        }
        if session.finalizing {
            debug!("Interview of {} concluded, dropping message", participant_id);
            return;
        }

        session
            .transcript
            .push(TranscriptEntry::participant(content.clone()));
        self.inner.relay.deliver_to_decider(DeciderEvent::InboundMessage {
            participant_id: participant_id.to_string(),
            content,
        });
    }

    /// Unbind a closed connection and start the grace window. Ignored when
    /// `handle` has already been replaced by a newer connection.
    pub async fn disconnect(&self, participant_id: &str, handle: ConnectionHandle) {
        let mut slot = self.lock(participant_id).await;
        let Some(session) = slot.as_mut() else {
            return;
        };
        if !session.is_bound_to(handle) {
            debug!(
                "Stale connection {} closed for participant {}",
                handle, participant_id
            );
            return;
        }

        session.connection = None;
        if session.finalizing {
            return;
        }

        session.stopwatch.pause();
        self.inner.media.pause(participant_id);

        let token = ExpiryToken::next();
        let deadline = tokio::time::Instant::now() + self.inner.config.grace_period;
        let registry = self.clone();
        let id = participant_id.to_string();
        let task = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            registry.expire(&id, token).await;
        });
        session.pending_expiry = Some(PendingExpiry { token, task });

        info!(
            "Participant {} disconnected, session expires in {:?} unless they reconnect",
            participant_id, self.inner.config.grace_period
        );
    }

    /// Grace timer callback. Terminates the session only if `token` is still
    /// its pending expiry.
    pub(crate) async fn expire(&self, participant_id: &str, token: ExpiryToken) {
        let mut slot = self.lock(participant_id).await;
        let current = slot
            .as_ref()
            .and_then(|session| session.pending_expiry.as_ref())
            .map(|pending| pending.token == token)
            .unwrap_or(false);
        if !current {
            debug!("Expiry for participant {} no longer current", participant_id);
            return;
        }

        if let Some(mut session) = slot.take() {
            // This is the timer's own task, so detach rather than abort it
            session.pending_expiry = None;
        }
        self.inner.media.abort(participant_id);
        self.inner.relay.deliver_to_decider(DeciderEvent::EndSession {
            participant_id: participant_id.to_string(),
        });

        info!("Session for participant {} expired after disconnect", participant_id);
    }

    /// End the interview at the participant's request. Nothing is persisted.
    pub async fn end_explicit(&self, participant_id: &str) {
        let mut slot = self.lock(participant_id).await;
        match slot.as_ref() {
            None => return,
            Some(session) if session.finalizing => {
                debug!("Interview of {} already concluding", participant_id);
                return;
            }
            Some(_) => {}
        }

        if let Some(mut session) = slot.take() {
            session.cancel_pending_expiry();
        }
        self.inner.media.abort(participant_id);
        self.inner.relay.deliver_to_decider(DeciderEvent::EndSession {
            participant_id: participant_id.to_string(),
        });

        info!("Session for participant {} ended by participant", participant_id);
    }

    /// End the interview because the deciding service failed. The
    /// participant is told why; nothing is persisted.
    pub async fn end_on_error(&self, participant_id: &str, reason: String) {
        let mut slot = self.lock(participant_id).await;
        match slot.as_ref() {
            None => {
                warn!(
                    "Interviewer fault for unknown participant {}: {}",
                    participant_id, reason
                );
                return;
            }
            Some(session) if session.finalizing => {
                warn!(
                    "Interviewer fault after interview of {} concluded: {}",
                    participant_id, reason
                );
                return;
            }
            Some(_) => {}
        }

        if let Some(mut session) = slot.take() {
            session.cancel_pending_expiry();
            self.inner
                .relay
                .deliver_to_participant(session.connection, ClientEvent::Fault {
                    reason: reason.clone(),
                });
        }
        self.inner.media.abort(participant_id);

        error!(
            "Session for participant {} ended by interviewer fault: {}",
            participant_id, reason
        );
    }

    /// Conclude the interview: persist the completed record, score it, then
    /// remove the session. Returns the record ID if persistence succeeded.
    pub async fn finalize(
        &self,
        participant_id: &str,
        evaluation: serde_json::Value,
    ) -> Option<RecordId> {
        let job = {
            let mut slot = self.lock(participant_id).await;
            let Some(session) = slot.as_mut() else {
                warn!("Finalize for unknown participant {}", participant_id);
                return None;
            };
            Self::begin_finalize(session, evaluation)?
        };

        self.complete_finalize(job).await
    }

    /// Move a session into finalizing under its lock. Returns None if it is
    /// already finalizing.
    fn begin_finalize(
        session: &mut InterviewSession,
        evaluation: serde_json::Value,
    ) -> Option<FinalizeJob> {
        if session.finalizing {
            return None;
        }

        session.finalizing = true;
        session.cancel_pending_expiry();
        session.stopwatch.pause();

        Some(FinalizeJob {
            participant_id: session.participant_id().to_string(),
            started_at: session.started_at(),
            duration_ms: session.stopwatch.elapsed().as_millis() as u64,
            transcript: session.transcript.entries().to_vec(),
            evaluation,
        })
    }

    async fn complete_finalize(&self, job: FinalizeJob) -> Option<RecordId> {
        let participant_id = job.participant_id.clone();
        info!(
            "Finalizing interview for participant {} ({} ms, {} transcript entries)",
            participant_id,
            job.duration_ms,
            job.transcript.len()
        );

        let destination = format!(
            "{}_{}.webm",
            artifact_stem(&participant_id),
            Utc::now().timestamp_millis()
        );
        let media_locator = match self.inner.media.finalize(&participant_id, &destination).await {
            Ok(path) => Some(path),
            Err(MediaError::NoData(_)) => {
                info!("No media captured for participant {}", participant_id);
                None
            }
            Err(e) => {
                error!("Failed to save media for participant {}: {}", participant_id, e);
                None
            }
        };

        let record = CompletedInterview {
            participant_id: job.participant_id,
            started_at: job.started_at,
            duration_ms: job.duration_ms,
            transcript: job.transcript,
            evaluation: job.evaluation,
            media_locator,
        };

        let record_id = match self.inner.store.save(&record).await {
            Ok(id) => Some(id),
            Err(e) => {
                error!("Failed to save interview for participant {}: {:#}", participant_id, e);
                None
            }
        };

        if let (Some(id), Some(evaluator)) = (&record_id, &self.inner.evaluator) {
            self.enrich(evaluator.as_ref(), id, &record).await;
        }

        {
            let mut slot = self.lock(&participant_id).await;
            if slot.as_ref().map(|session| session.finalizing).unwrap_or(false) {
                *slot = None;
            }
        }

        info!("Interview for participant {} complete", participant_id);
        record_id
    }

    /// Best-effort scoring. Failures are logged and leave the record as saved.
    async fn enrich(&self, evaluator: &dyn Evaluator, id: &RecordId, record: &CompletedInterview) {
        let mut update = EvaluationUpdate::default();

        match &record.media_locator {
            Some(media) => match evaluator.extract_features(&record.participant_id, media).await {
                Ok(instances) => match evaluator.score(&instances).await {
                    Ok(scores) => update.scores = Some(scores),
                    Err(e) => warn!("Scoring failed for interview {}: {:#}", id, e),
                },
                Err(e) => warn!("Feature extraction failed for interview {}: {:#}", id, e),
            },
            None => debug!("No media for interview {}, skipping feature scoring", id),
        }

        let messages = record.participant_messages();
        if !messages.is_empty() {
            match evaluator.extract_emotion(&messages).await {
                Ok(emotion) => update.emotion = Some(emotion),
                Err(e) => warn!("Emotion extraction failed for interview {}: {:#}", id, e),
            }
        }

        if update.is_empty() {
            return;
        }
        if let Err(e) = self.inner.store.update(id, update).await {
            error!("Failed to store evaluation for interview {}: {:#}", id, e);
        }
    }

    pub async fn snapshot(&self, participant_id: &str) -> Option<SessionSnapshot> {
        let slot = self
            .inner
            .slots
            .get(participant_id)
            .map(|entry| Arc::clone(entry.value()))?;
        let guard = slot.lock().await;
        let snapshot = (*guard).as_ref().map(InterviewSession::snapshot);
        snapshot
    }

    pub fn contains(&self, participant_id: &str) -> bool {
        self.inner.slots.contains_key(participant_id)
    }

    /// Number of participants with a session, including those finalizing
    pub fn active_count(&self) -> usize {
        self.inner.live.load(Ordering::Relaxed)
    }

    /// Number of natural-end finalizations still running
    pub fn finalizing_count(&self) -> usize {
        self.inner.finalizing.len()
    }

    /// Wait until every finalization started so far has persisted its record.
    /// New finalizations may still be started afterwards.
    pub async fn wait_finalizing(&self) {
        let tracker = &self.inner.finalizing;
        tracker.close();
        tracker.wait().await;
        tracker.reopen();
    }
}
