//! Relay between participant connections and the deciding service
//!
//! Participants are identified durably by their participant ID, but reach the
//! server through transient connections. The `RelayBridge` owns the mapping
//! from connection handle to outbound queue and the long-lived channel to the
//! deciding service.

mod bridge;
mod events;

pub use bridge::{ConnectionHandle, RelayBridge, DEFAULT_OUTBOUND_CAPACITY};
pub use events::{ClientCommand, ClientEvent, DeciderEvent};
