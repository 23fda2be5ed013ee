use crate::identity::IdentityProvider;
use crate::media::MediaBufferManager;
use crate::relay::RelayBridge;
use crate::session::SessionRegistry;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Live interview sessions
    pub registry: SessionRegistry,

    /// Connection table for participant sockets
    pub relay: RelayBridge,

    /// Capture buffers fed by binary socket frames
    pub media: MediaBufferManager,

    /// Verifies the token presented when a socket is opened
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    pub fn new(
        registry: SessionRegistry,
        relay: RelayBridge,
        media: MediaBufferManager,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            registry,
            relay,
            media,
            identity,
        }
    }
}
