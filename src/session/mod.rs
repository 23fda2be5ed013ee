//! Interview session management
//!
//! This module provides the `SessionRegistry`, the single source of truth for
//! which participants are mid-interview. It manages:
//! - Session creation, resumption and the disconnect grace window
//! - Transcript accumulation in both directions
//! - Elapsed interview time across pause/resume
//! - Termination (explicit, timeout, interviewer fault) and finalization

mod config;
mod record;
mod registry;
mod session;
mod stats;
mod stopwatch;
mod transcript;

pub use config::SessionConfig;
pub use record::CompletedInterview;
pub use registry::{AttachOutcome, SessionRegistry};
pub use session::{ExpiryToken, InterviewSession};
pub use stats::{SessionSnapshot, SessionState};
pub use stopwatch::Stopwatch;
pub use transcript::{participant_messages, Speaker, Transcript, TranscriptEntry};
