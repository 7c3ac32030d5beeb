//! Daemon - the main gateway service
//!
//! Wires configuration into concrete engines, builds the orchestrator and
//! runs it until interrupted.

use std::sync::Arc;

use crate::engine::{CommandRecorder, HttpDictationEngine, ProcessKeywordEngine};
use crate::orchestrator::{Orchestrator, OrchestratorConfig};
use crate::sink::{CommandSink, LightSink, LogSink};
use crate::{Config, Result};

/// The Lumen daemon - wake-word listening and dictation handoff
pub struct Daemon {
    config: Config,
}

impl Daemon {
    /// Create a new daemon instance from loaded configuration
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the daemon until interrupted.
    ///
    /// # Errors
    ///
    /// Returns error if engine construction or keyword initialization
    /// fails. Runtime recognition errors are absorbed by the orchestrator.
    pub async fn run(self) -> Result<()> {
        let keyword = ProcessKeywordEngine::from_config(&self.config.keyword);
        let recorder = CommandRecorder::from_config(&self.config.dictation);
        let dictation =
            HttpDictationEngine::from_config(&self.config.dictation, Box::new(recorder))?;
        let sink = build_sink(&self.config.sink);

        let orchestrator = Orchestrator::new(
            Box::new(keyword),
            Arc::new(dictation),
            sink,
            OrchestratorConfig::from(&self.config),
        );
        let handle = orchestrator.handle();

        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown requested");
                handle.shutdown().await;
            }
        });

        tracing::info!(
            phrase = %self.config.keyword.phrase,
            provider = %self.config.dictation.provider,
            sink = %self.config.sink,
            "lumen gateway ready"
        );

        orchestrator.run().await?;
        tracing::info!("daemon stopped");
        Ok(())
    }
}

/// Select the command sink by name; unknown names fall back to the light
fn build_sink(name: &str) -> Box<dyn CommandSink> {
    match name {
        "log" => Box::new(LogSink),
        "light" => Box::new(LightSink::new()),
        other => {
            tracing::warn!(sink = other, "unknown sink, using light");
            Box::new(LightSink::new())
        }
    }
}
