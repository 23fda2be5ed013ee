use serde::{Deserialize, Serialize};

/// Published when a participant starts a new interview
#[derive(Debug, Serialize, Deserialize)]
pub struct StartSessionMessage {
    pub participant_id: String,
    pub display_name: String,
}

/// Published for every participant message
#[derive(Debug, Serialize, Deserialize)]
pub struct InboundMessage {
    pub participant_id: String,
    pub content: String,
}

/// Published when an interview ends before its natural conclusion
#[derive(Debug, Serialize, Deserialize)]
pub struct EndSessionMessage {
    pub participant_id: String,
}

/// Interviewer turn received from the deciding service
#[derive(Debug, Serialize, Deserialize)]
pub struct InterviewerResponse {
    /// Participant the turn is addressed to
    pub recipient: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub phase: Option<String>,
    /// Final evaluation, sent with the end phase
    #[serde(default)]
    pub evaluation: Option<serde_json::Value>,
}

/// Fault reported by the deciding service for one participant
#[derive(Debug, Serialize, Deserialize)]
pub struct InterviewerFault {
    pub recipient: String,
    pub reason: String,
}
