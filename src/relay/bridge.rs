use super::events::{ClientEvent, DeciderEvent};
use dashmap::DashMap;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Transient identifier of one participant connection.
/// A reconnecting participant gets a new handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ConnectionHandle(Uuid);

impl ConnectionHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Events queued per connection before further events are dropped
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

/// Routes events between participant connections and the deciding service
#[derive(Clone)]
pub struct RelayBridge {
    /// Outbound queue of every live connection
    connections: Arc<DashMap<ConnectionHandle, mpsc::Sender<ClientEvent>>>,

    outbound_capacity: usize,

    /// Ordered, fire-and-forget channel to the deciding service
    decider_tx: mpsc::UnboundedSender<DeciderEvent>,
}

impl RelayBridge {
    /// Create a bridge and the receiving end of its deciding-service channel
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DeciderEvent>) {
        Self::with_outbound_capacity(DEFAULT_OUTBOUND_CAPACITY)
    }

    /// Like `new`, holding at most `capacity` undelivered events per
    /// connection. A client that stops reading loses newer events.
    pub fn with_outbound_capacity(
        capacity: usize,
    ) -> (Self, mpsc::UnboundedReceiver<DeciderEvent>) {
        let (decider_tx, decider_rx) = mpsc::unbounded_channel();
        (
            Self {
                connections: Arc::new(DashMap::new()),
                outbound_capacity: capacity.max(1),
                decider_tx,
            },
            decider_rx,
        )
    }

    /// Register a connection, returning the queue of events addressed to it
    pub fn register(&self, handle: ConnectionHandle) -> mpsc::Receiver<ClientEvent> {
        let (tx, rx) = mpsc::channel(self.outbound_capacity);
        self.connections.insert(handle, tx);
        debug!("Connection {} registered", handle);
        rx
    }

    pub fn unregister(&self, handle: ConnectionHandle) {
        if self.connections.remove(&handle).is_some() {
            debug!("Connection {} unregistered", handle);
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Deliver an event to a connection. Returns false (and logs) when there
    /// is no such live connection.
    pub fn deliver_to_participant(&self, handle: Option<ConnectionHandle>, event: ClientEvent) -> bool {
        let Some(handle) = handle else {
            debug!("Participant not connected, event held for replay: {:?}", event);
            return false;
        };

        let Some(tx) = self.connections.get(&handle) else {
            warn!("Connection {} not found, dropping event", handle);
            return false;
        };

        match tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(
                    "Connection {} is not keeping up ({} events queued), dropping event",
                    handle, self.outbound_capacity
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!("Connection {} closed, dropping event", handle);
                false
            }
        }
    }

    /// Queue a notification for the deciding service without waiting
    pub fn deliver_to_decider(&self, event: DeciderEvent) {
        if let Err(e) = self.decider_tx.send(event) {
            error!(
                "Deciding service channel closed, dropping event for participant {}",
                e.0.participant_id()
            );
        }
    }
}
