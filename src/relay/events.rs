use crate::session::TranscriptEntry;
use serde::{Deserialize, Serialize};

/// Events sent to a participant's connection
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Full transcript, sent on reattachment so the client can resync
    History { transcript: Vec<TranscriptEntry> },

    /// One interviewer turn
    Content { content: String },

    /// The interviewer failed and the session was ended
    Fault { reason: String },
}

/// Commands received from a participant's connection (text frames).
/// Media fragments arrive as binary frames instead.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Bind this connection to the authenticated participant's session
    Attach,

    Message { content: String },

    /// The participant ended the interview early
    End,
}

/// Notifications sent to the deciding service
#[derive(Debug, Clone, PartialEq)]
pub enum DeciderEvent {
    StartSession {
        participant_id: String,
        display_name: String,
    },
    InboundMessage {
        participant_id: String,
        content: String,
    },
    EndSession {
        participant_id: String,
    },
}

impl DeciderEvent {
    pub fn participant_id(&self) -> &str {
        match self {
            Self::StartSession { participant_id, .. }
            | Self::InboundMessage { participant_id, .. }
            | Self::EndSession { participant_id } => participant_id,
        }
    }
}
