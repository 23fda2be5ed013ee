use crate::error::MediaError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::info;

/// Rewrites a raw capture into a seekable container
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Transcode `input` into an artifact named `output_name`, returning its path
    async fn transcode(&self, input: &Path, output_name: &str) -> Result<PathBuf, MediaError>;
}

/// Transcoder backed by the `ffmpeg` binary (stream copy, no re-encode)
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
    output_dir: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            output_dir: output_dir.into(),
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, input: &Path, output_name: &str) -> Result<PathBuf, MediaError> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let output_path = self.output_dir.join(output_name);

        info!(
            "Transcoding {} -> {}",
            input.display(),
            output_path.display()
        );

        let output = Command::new(&self.program)
            .args(["-y", "-loglevel", "error", "-i"])
            .arg(input)
            .args(["-c", "copy"])
            .arg(&output_path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                MediaError::Transcode(format!(
                    "failed to run {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            return Err(MediaError::Transcode(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(output_path)
    }
}
