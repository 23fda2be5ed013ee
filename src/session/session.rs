use super::stats::{SessionSnapshot, SessionState};
use super::stopwatch::Stopwatch;
use super::transcript::Transcript;
use crate::relay::ConnectionHandle;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::task::JoinHandle;

static NEXT_EXPIRY_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Identifies one scheduled expiry. Tokens are never reused, so a timer
/// scheduled for an earlier session can never match a later one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExpiryToken(u64);

impl ExpiryToken {
    pub(crate) fn next() -> Self {
        Self(NEXT_EXPIRY_TOKEN.fetch_add(1, Ordering::Relaxed))
    }
}

/// A grace timer waiting to terminate a disconnected session
#[derive(Debug)]
pub(crate) struct PendingExpiry {
    pub token: ExpiryToken,
    pub task: JoinHandle<()>,
}

/// One participant's live interview
#[derive(Debug)]
pub struct InterviewSession {
    participant_id: String,

    display_name: String,

    /// Bound connection, absent while disconnected
    pub(crate) connection: Option<ConnectionHandle>,

    pub(crate) transcript: Transcript,

    pub(crate) stopwatch: Stopwatch,

    started_at: DateTime<Utc>,

    /// Present only inside the grace window
    pub(crate) pending_expiry: Option<PendingExpiry>,

    /// Set once the interview concluded and the record is being written
    pub(crate) finalizing: bool,
}

impl InterviewSession {
    /// Create a connected session with its stopwatch running
    pub fn new(participant_id: &str, display_name: &str, connection: ConnectionHandle) -> Self {
        Self {
            participant_id: participant_id.to_string(),
            display_name: display_name.to_string(),
            connection: Some(connection),
            transcript: Transcript::new(),
            stopwatch: Stopwatch::started(),
            started_at: Utc::now(),
            pending_expiry: None,
            finalizing: false,
        }
    }

    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn connection(&self) -> Option<ConnectionHandle> {
        self.connection
    }

    pub fn state(&self) -> SessionState {
        if self.finalizing {
            SessionState::Finalizing
        } else if self.pending_expiry.is_some() {
            SessionState::Grace
        } else {
            SessionState::Active
        }
    }

    /// Whether `handle` is the connection currently bound to this session
    pub fn is_bound_to(&self, handle: ConnectionHandle) -> bool {
        self.connection == Some(handle)
    }

    /// Cancel a pending expiry. Returns true if the session was in its grace
    /// window.
    pub(crate) fn cancel_pending_expiry(&mut self) -> bool {
        match self.pending_expiry.take() {
            Some(pending) => {
                pending.task.abort();
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            participant_id: self.participant_id.clone(),
            state: self.state(),
            connected: self.connection.is_some(),
            started_at: self.started_at,
            elapsed_ms: self.stopwatch.elapsed().as_millis() as u64,
            transcript_len: self.transcript.len(),
        }
    }
}
