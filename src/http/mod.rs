//! Participant-facing HTTP surface
//!
//! - GET /interview/ws?token=... - Participant socket (JSON commands, binary media)
//! - GET /sessions - Count of live sessions
//! - GET /sessions/:participant_id - Status of one session
//! - GET /health - Health check

mod handlers;
mod routes;
mod socket;
mod state;

pub use routes::create_router;
pub use state::AppState;
