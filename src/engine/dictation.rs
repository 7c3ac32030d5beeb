//! Dictation engine adapter
//!
//! Drives the single-shot remote recognizer. Each activation spawns one
//! recognition turn that delivers exactly one terminal event — a result,
//! an error, or a timeout — into the orchestrator's channel. Cancelling
//! aborts the turn so no terminal event is delivered for it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::orchestrator::Event;
use crate::Error;

use super::{DictationEngine, EngineState};

/// Adapter around the on-demand, network-backed dictation recognizer
pub struct DictationAdapter {
    engine: Arc<dyn DictationEngine>,
    events: mpsc::Sender<Event>,
    timeout_secs: u64,
    state: EngineState,
    released: bool,
    turn: Option<JoinHandle<()>>,
}

impl DictationAdapter {
    /// Wrap a dictation engine. `timeout_secs` bounds each recognition
    /// turn; expiry is reported as a terminal error.
    pub fn new(
        engine: Arc<dyn DictationEngine>,
        events: mpsc::Sender<Event>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            engine,
            events,
            timeout_secs,
            state: EngineState::Ready,
            released: false,
            turn: None,
        }
    }

    /// Trigger network listening for exactly one utterance.
    ///
    /// Emits exactly one terminal event per activation, unless the turn is
    /// cancelled first.
    pub fn activate(&mut self) {
        if self.released {
            tracing::warn!("dictation activate after release, ignoring");
            return;
        }
        // At most one turn in flight
        self.cancel();

        let engine = Arc::clone(&self.engine);
        let events = self.events.clone();
        let secs = self.timeout_secs;

        self.turn = Some(tokio::spawn(async move {
            let outcome = match tokio::time::timeout(
                Duration::from_secs(secs),
                engine.recognize(),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(Error::DictationTimeout(secs)),
            };

            let event = match outcome {
                Ok(raw) => Event::DictationResult(raw),
                Err(e) => Event::DictationError(e),
            };
            let _ = events.send(event).await;
        }));

        self.state = EngineState::Listening;
        tracing::debug!(timeout_secs = secs, "dictation turn started");
    }

    /// Abort the in-flight turn, if any. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(turn) = self.turn.take() {
            turn.abort();
            tracing::debug!("dictation turn cancelled");
        }
        if self.state == EngineState::Listening {
            self.state = EngineState::Ready;
        }
    }

    /// Cancel and permanently release the recognizer. Safe to call with no
    /// activation in progress; idempotent.
    pub fn release(&mut self) {
        self.cancel();
        if !self.released {
            self.released = true;
            tracing::debug!("dictation engine released");
        }
    }

    /// Current engine lifecycle state
    #[must_use]
    pub const fn state(&self) -> EngineState {
        self.state
    }

    /// Whether the adapter has been released
    #[must_use]
    pub const fn is_released(&self) -> bool {
        self.released
    }
}
