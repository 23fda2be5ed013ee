//! Captured-media buffering
//!
//! Participants stream small binary fragments of their webcam capture. This
//! module provides:
//! - `MediaBuffer`: per-participant accumulation under a byte ceiling
//! - `MediaBufferManager`: batched intake, pause/resume, finalize and abort
//! - `Transcoder`: rewriting the raw capture into a seekable container

pub mod buffer;
pub mod manager;
pub mod transcode;

pub use buffer::{MediaBuffer, PushReport};
pub use manager::{artifact_stem, MediaBufferManager, MediaConfig};
pub use transcode::{FfmpegTranscoder, Transcoder};
