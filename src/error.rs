//! Typed errors for boundaries where callers branch on the failure kind.
//! Everything else uses `anyhow`.

/// Media capture finalization failures
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("No media data buffered for participant {0}")]
    NoData(String),

    #[error("Media staging I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transcode error: {0}")]
    Transcode(String),
}

/// Credential verification failures
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Unauthenticated")]
    Unauthenticated,
}
