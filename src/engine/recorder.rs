//! Utterance capture
//!
//! The dictation engine needs one recorded utterance per turn. Capture is
//! delegated to an external recorder process (`arecord` by default) so the
//! microphone is only held for the duration of one turn.

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::DictationConfig;
use crate::{Error, Result};

/// Produces one recorded utterance as encoded audio bytes
#[async_trait]
pub trait UtteranceSource: Send + Sync + 'static {
    /// Record a single utterance. Blocks (asynchronously) until the
    /// recording completes.
    async fn record(&self) -> Result<Vec<u8>>;
}

/// Utterance source running an external recorder command and capturing
/// the WAV it writes to stdout
pub struct CommandRecorder {
    command: Vec<String>,
}

impl CommandRecorder {
    /// Build the recorder from dictation configuration
    #[must_use]
    pub fn from_config(config: &DictationConfig) -> Self {
        Self {
            command: config.recorder_cmd.clone(),
        }
    }
}

#[async_trait]
impl UtteranceSource for CommandRecorder {
    async fn record(&self) -> Result<Vec<u8>> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| Error::Dictation("empty recorder command".into()))?;

        tracing::debug!(recorder = %program, "recording utterance");
        let output = Command::new(program)
            .args(args)
            .stdin(std::process::Stdio::null())
            .output()
            .await
            .map_err(|e| Error::Dictation(format!("failed to run recorder: {e}")))?;

        if !output.status.success() {
            return Err(Error::Dictation(format!(
                "recorder exited with {}",
                output.status
            )));
        }
        if output.stdout.is_empty() {
            return Err(Error::Dictation("recorder produced no audio".into()));
        }

        tracing::debug!(bytes = output.stdout.len(), "utterance captured");
        Ok(output.stdout)
    }
}
