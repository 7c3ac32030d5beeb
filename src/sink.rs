//! Command sinks
//!
//! The orchestrator forwards the transcripts of a successful dictation
//! turn, in original order, to a [`CommandSink`]. How the list is
//! interpreted — including first-match-wins scanning — is sink policy.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::{Error, Result};

/// Receives the final command list of one dictation turn.
///
/// Called at most once per turn, only on a well-formed successful result.
#[async_trait]
pub trait CommandSink: Send + Sync {
    /// Deliver candidate commands, best transcript first.
    async fn deliver(&self, commands: &[String]) -> Result<()>;
}

/// Sink that only logs the command list; useful for headless operation.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl CommandSink for LogSink {
    async fn deliver(&self, commands: &[String]) -> Result<()> {
        tracing::info!(?commands, "commands received");
        Ok(())
    }
}

/// Light bulb color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Yellow,
    Blue,
    Pink,
}

/// State of the controlled light
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightState {
    /// Whether the bulb is shown
    pub visible: bool,
    /// Current bulb color
    pub color: Color,
}

impl Default for LightState {
    fn default() -> Self {
        Self {
            visible: true,
            color: Color::Yellow,
        }
    }
}

/// Sink driving a light from spoken commands.
///
/// Scans the candidate list in order and acts on the first recognized
/// command only; the rest of the list is ignored. Unrecognized candidates
/// are skipped.
#[derive(Debug, Default)]
pub struct LightSink {
    state: Mutex<LightState>,
}

impl LightSink {
    /// Create a sink with the default light state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current light state
    ///
    /// # Panics
    ///
    /// Panics if the state lock is poisoned.
    #[must_use]
    pub fn state(&self) -> LightState {
        *self.state.lock().expect("light state poisoned")
    }

    fn act(&self, command: &str) -> Result<bool> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| Error::Sink("light state poisoned".into()))?;
        match command {
            "hide" => state.visible = false,
            "show" => state.visible = true,
            "turn yellow" => {
                state.color = Color::Yellow;
                state.visible = true;
            }
            "turn blue" => {
                state.color = Color::Blue;
                state.visible = true;
            }
            "turn pink" => {
                state.color = Color::Pink;
                state.visible = true;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}

#[async_trait]
impl CommandSink for LightSink {
    async fn deliver(&self, commands: &[String]) -> Result<()> {
        for command in commands {
            if self.act(command)? {
                tracing::info!(command = %command, "light command applied");
                return Ok(());
            }
        }

        tracing::debug!(candidates = commands.len(), "no recognized command");
        Ok(())
    }
}
