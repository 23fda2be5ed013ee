use super::state::AppState;
use crate::identity::Identity;
use crate::relay::{ClientCommand, ConnectionHandle};
use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

/// Drive one participant socket until it closes, then tear it down.
///
/// Text frames carry `ClientCommand`s, binary frames carry media fragments.
/// Events for the participant arrive through the relay and are written by a
/// separate task so a slow client never blocks the registry.
pub async fn handle_socket(socket: WebSocket, state: AppState, identity: Identity) {
    let handle = ConnectionHandle::new();
    let participant_id = identity.participant_id.clone();
    info!("Connection {} opened for participant {}", handle, participant_id);

    let mut outbound = state.relay.register(handle);
    let (mut sender, mut receiver) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to encode event for {}: {}", handle, e);
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let mut attached = false;

    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientCommand>(&text) {
                Ok(ClientCommand::Attach) => {
                    state
                        .registry
                        .attach(&participant_id, handle, &identity.display_name)
                        .await;
                    attached = true;
                }
                Ok(ClientCommand::Message { content }) => {
                    if attached {
                        state
                            .registry
                            .relay_inbound(&participant_id, handle, content)
                            .await;
                    } else {
                        warn!("Message on {} before attach, dropping", handle);
                    }
                }
                Ok(ClientCommand::End) => {
                    if attached {
                        state.registry.end_explicit(&participant_id).await;
                        attached = false;
                    }
                }
                Err(e) => {
                    warn!("Malformed command on {}: {}", handle, e);
                }
            },
            Ok(Message::Binary(fragment)) => {
                if attached {
                    state.media.ingest(&participant_id, fragment);
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("Connection {} errored: {}", handle, e);
                break;
            }
        }
    }

    // Teardown: stop routing to this connection, then start the grace window
    state.relay.unregister(handle);
    writer.abort();
    if attached {
        state.registry.disconnect(&participant_id, handle).await;
    }

    info!("Connection {} closed for participant {}", handle, participant_id);
}
