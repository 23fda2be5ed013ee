//! Tasks connecting the NATS link to the rest of the relay

use super::client::NatsClient;
use super::messages::{InterviewerFault, InterviewerResponse};
use crate::relay::DeciderEvent;
use crate::session::SessionRegistry;
use anyhow::Result;
use futures::stream::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Publish queued deciding-service events in order until the queue closes
pub async fn run_event_pump(client: Arc<NatsClient>, mut events: mpsc::UnboundedReceiver<DeciderEvent>) {
    info!("Interview event pump started");

    while let Some(event) = events.recv().await {
        if let Err(e) = client.publish_event(&event).await {
            error!(
                "Failed to deliver event for participant {}: {:#}",
                event.participant_id(),
                e
            );
        }
    }

    info!("Interview event pump stopped");
}

/// Apply one interviewer turn payload to the registry
pub async fn handle_response(registry: &SessionRegistry, payload: &[u8]) -> Result<()> {
    let response: InterviewerResponse = serde_json::from_slice(payload)?;
    registry
        .relay_outbound(
            &response.recipient,
            response.content,
            response.phase,
            response.evaluation,
        )
        .await;
    Ok(())
}

/// Apply one interviewer fault payload to the registry
pub async fn handle_fault(registry: &SessionRegistry, payload: &[u8]) -> Result<()> {
    let fault: InterviewerFault = serde_json::from_slice(payload)?;
    registry.end_on_error(&fault.recipient, fault.reason).await;
    Ok(())
}

/// Route interviewer turns to their sessions until the subscription ends
pub async fn run_response_listener(mut subscriber: async_nats::Subscriber, registry: SessionRegistry) {
    info!("Interviewer response listener started");

    while let Some(msg) = subscriber.next().await {
        if let Err(e) = handle_response(&registry, &msg.payload).await {
            warn!("Failed to parse interviewer response: {}", e);
        }
    }

    info!("Interviewer response listener stopped");
}

/// Route interviewer faults to their sessions until the subscription ends
pub async fn run_fault_listener(mut subscriber: async_nats::Subscriber, registry: SessionRegistry) {
    info!("Interviewer fault listener started");

    while let Some(msg) = subscriber.next().await {
        if let Err(e) = handle_fault(&registry, &msg.payload).await {
            warn!("Failed to parse interviewer fault: {}", e);
        }
    }

    info!("Interviewer fault listener stopped");
}
