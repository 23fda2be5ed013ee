pub mod config;
pub mod error;
pub mod evaluation;
pub mod http;
pub mod identity;
pub mod media;
pub mod nats;
pub mod relay;
pub mod session;
pub mod store;

pub use config::Config;
pub use error::{IdentityError, MediaError};
pub use evaluation::{EvaluationConfig, Evaluator, HttpEvaluator, ScoreMap};
pub use http::{create_router, AppState};
pub use identity::{Identity, IdentityProvider, StaticTokenIdentity};
pub use media::{FfmpegTranscoder, MediaBufferManager, MediaConfig, Transcoder};
pub use nats::{NatsClient, Subjects};
pub use relay::{ClientCommand, ClientEvent, ConnectionHandle, DeciderEvent, RelayBridge};
pub use session::{
    AttachOutcome, CompletedInterview, SessionConfig, SessionRegistry, SessionSnapshot,
    SessionState, Speaker, TranscriptEntry,
};
pub use store::{EvaluationUpdate, InterviewStore, JsonFileStore, MemoryStore, RecordId};
