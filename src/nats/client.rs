use super::messages::{EndSessionMessage, InboundMessage, StartSessionMessage};
use crate::relay::DeciderEvent;
use anyhow::{Context, Result};
use async_nats::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Subject layout shared with the deciding service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Subjects {
    /// Prefix for events this relay publishes
    pub session_prefix: String,
    /// Prefix for events the deciding service publishes
    pub interviewer_prefix: String,
}

impl Default for Subjects {
    fn default() -> Self {
        Self {
            session_prefix: "interview.session".to_string(),
            interviewer_prefix: "interviewer".to_string(),
        }
    }
}

impl Subjects {
    pub fn start(&self) -> String {
        format!("{}.start", self.session_prefix)
    }

    pub fn message(&self) -> String {
        format!("{}.message", self.session_prefix)
    }

    pub fn end(&self) -> String {
        format!("{}.end", self.session_prefix)
    }

    pub fn response(&self) -> String {
        format!("{}.response", self.interviewer_prefix)
    }

    pub fn fault(&self) -> String {
        format!("{}.fault", self.interviewer_prefix)
    }

    /// Subject and JSON payload for an outgoing event
    pub fn encode(&self, event: &DeciderEvent) -> Result<(String, Vec<u8>)> {
        let encoded = match event {
            DeciderEvent::StartSession {
                participant_id,
                display_name,
            } => (
                self.start(),
                serde_json::to_vec(&StartSessionMessage {
                    participant_id: participant_id.clone(),
                    display_name: display_name.clone(),
                })?,
            ),
            DeciderEvent::InboundMessage {
                participant_id,
                content,
            } => (
                self.message(),
                serde_json::to_vec(&InboundMessage {
                    participant_id: participant_id.clone(),
                    content: content.clone(),
                })?,
            ),
            DeciderEvent::EndSession { participant_id } => (
                self.end(),
                serde_json::to_vec(&EndSessionMessage {
                    participant_id: participant_id.clone(),
                })?,
            ),
        };
        Ok(encoded)
    }
}

pub struct NatsClient {
    client: Client,
    subjects: Subjects,
}

impl NatsClient {
    /// Connect to NATS server
    pub async fn connect(url: &str, subjects: Subjects) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self { client, subjects })
    }

    pub fn subjects(&self) -> &Subjects {
        &self.subjects
    }

    /// Publish an event to the deciding service
    pub async fn publish_event(&self, event: &DeciderEvent) -> Result<()> {
        let (subject, payload) = self.subjects.encode(event)?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .context("Failed to publish interview event")?;

        debug!(
            "Published to {} for participant {}",
            subject,
            event.participant_id()
        );

        Ok(())
    }

    /// Subscribe to interviewer turns
    pub async fn subscribe_responses(&self) -> Result<async_nats::Subscriber> {
        self.subscribe(self.subjects.response()).await
    }

    /// Subscribe to interviewer faults
    pub async fn subscribe_faults(&self) -> Result<async_nats::Subscriber> {
        self.subscribe(self.subjects.fault()).await
    }

    async fn subscribe(&self, subject: String) -> Result<async_nats::Subscriber> {
        info!("Subscribing to {}", subject);

        let subscriber = self
            .client
            .subscribe(subject.clone())
            .await
            .with_context(|| format!("Failed to subscribe to {}", subject))?;

        info!("Subscribed to {}", subject);

        Ok(subscriber)
    }

    /// Flush pending publishes before shutdown
    pub async fn close(&self) -> Result<()> {
        info!("Closing NATS connection");
        self.client
            .flush()
            .await
            .context("Failed to flush NATS connection")?;
        Ok(())
    }
}
