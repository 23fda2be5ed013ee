use crate::evaluation::EvaluationConfig;
use crate::identity::Identity;
use crate::media::MediaConfig;
use crate::nats::Subjects;
use crate::session::SessionConfig;
use anyhow::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub nats: NatsConfig,
    pub session: SessionSettings,
    pub media: MediaSettings,
    pub store: StoreConfig,
    pub evaluation: EvaluationConfig,
    pub identity: IdentityConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "interview-relay".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NatsConfig {
    pub url: String,
    pub subjects: Subjects,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            subjects: Subjects::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Seconds a disconnected session is kept for resumption
    pub grace_secs: u64,
    pub end_phase: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        let defaults = SessionConfig::default();
        Self {
            grace_secs: defaults.grace_period.as_secs(),
            end_phase: defaults.end_phase,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MediaSettings {
    pub ceiling_bytes: usize,
    pub queue_capacity: usize,
    pub drain_interval_ms: u64,
    pub drain_batch: usize,
    /// Where staged and transcoded captures are written
    pub uploads_dir: PathBuf,
    pub ffmpeg_path: PathBuf,
}

impl Default for MediaSettings {
    fn default() -> Self {
        let defaults = MediaConfig::default();
        Self {
            ceiling_bytes: defaults.ceiling_bytes,
            queue_capacity: defaults.queue_capacity,
            drain_interval_ms: defaults.drain_interval.as_millis() as u64,
            drain_batch: defaults.drain_batch,
            uploads_dir: defaults.staging_dir,
            ffmpeg_path: PathBuf::from("ffmpeg"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory for JSON interview records; in-memory when unset
    pub records_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Accepted tokens and the participant each one identifies
    pub tokens: Vec<TokenEntry>,
}

/// Kept as a list rather than a table: config keys are case-folded
#[derive(Debug, Deserialize)]
pub struct TokenEntry {
    pub token: String,
    pub participant_id: String,
    pub display_name: String,
}

impl IdentityConfig {
    pub fn token_table(&self) -> HashMap<String, Identity> {
        self.tokens
            .iter()
            .map(|entry| {
                (
                    entry.token.clone(),
                    Identity {
                        participant_id: entry.participant_id.clone(),
                        display_name: entry.display_name.clone(),
                    },
                )
            })
            .collect()
    }
}

impl Config {
    /// Load from an optional file at `path` (extension inferred), overlaid
    /// with `INTERVIEW_RELAY__SECTION__KEY` environment variables.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("INTERVIEW_RELAY")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            grace_period: Duration::from_secs(self.session.grace_secs),
            end_phase: self.session.end_phase.clone(),
        }
    }

    pub fn media_config(&self) -> MediaConfig {
        MediaConfig {
            ceiling_bytes: self.media.ceiling_bytes,
            queue_capacity: self.media.queue_capacity,
            drain_interval: Duration::from_millis(self.media.drain_interval_ms),
            drain_batch: self.media.drain_batch,
            staging_dir: self.media.uploads_dir.clone(),
        }
    }
}
