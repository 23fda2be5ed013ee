use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lifecycle configuration shared by every interview session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// How long a disconnected session is kept for resumption
    /// Default: 60 seconds
    pub grace_period: Duration,

    /// Phase name the interviewer uses to signal the natural end
    pub end_phase: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(60),
            end_phase: "end".to_string(),
        }
    }
}
