use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a session sits in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Connected and exchanging messages
    Active,

    /// Disconnected, waiting for the participant inside the grace window
    Grace,

    /// Interview concluded, record being persisted and scored
    Finalizing,
}

/// Point-in-time view of a session for status queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub participant_id: String,

    pub state: SessionState,

    /// Whether a connection is currently bound
    pub connected: bool,

    /// When the session was created
    pub started_at: DateTime<Utc>,

    /// Interview time so far, excluding disconnected intervals
    pub elapsed_ms: u64,

    /// Number of transcript entries recorded
    pub transcript_len: usize,
}
