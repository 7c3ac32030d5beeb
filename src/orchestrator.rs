//! The wake-word handoff state machine
//!
//! A single consumer task drains a channel of tagged engine events, so
//! transitions are serialized without locks. The orchestrator owns both
//! engine adapters exclusively; the microphone invariant — passive keyword
//! listening and active dictation never overlap — is enforced at the one
//! transition that hands it over.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::diagnostics::Diagnostics;
use crate::engine::{
    DictationAdapter, DictationEngine, KeywordAdapter, KeywordEngine, RawDictation,
};
use crate::sink::CommandSink;
use crate::{Error, Result};

/// Capacity of the orchestrator event channel
const EVENT_CAPACITY: usize = 64;

/// Which adapter is authoritative at any moment. Exactly one state holds
/// at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Keyword engine assets are loading
    Initializing,
    /// Keyword engine holds the microphone, waiting for the wake phrase
    PassiveListening,
    /// Dictation engine holds the microphone for one utterance
    ActiveDictation,
    /// Terminal: both engines released
    ShuttingDown,
}

/// Tagged events drained by the orchestrator loop
#[derive(Debug)]
pub enum Event {
    /// Partial hypothesis from the keyword engine; `None` means "no
    /// result yet" and is equivalent to an empty string
    KeywordPartial(Option<String>),
    /// Keyword engine fault during listening
    KeywordError(Error),
    /// Terminal dictation success
    DictationResult(RawDictation),
    /// Terminal dictation failure
    DictationError(Error),
    /// External shutdown request
    Shutdown,
}

/// Orchestrator tuning, fixed at construction
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// The exact phrase that arms dictation; matching is case-sensitive
    pub phrase: String,
    /// Named keyword search identifier, reused verbatim on every re-arm
    pub search_id: String,
    /// Deadline for one dictation turn, in seconds
    pub dictation_timeout_secs: u64,
}

impl From<&crate::Config> for OrchestratorConfig {
    fn from(config: &crate::Config) -> Self {
        Self {
            phrase: config.keyword.phrase.clone(),
            search_id: config.keyword.search_id.clone(),
            dictation_timeout_secs: config.dictation.timeout_secs,
        }
    }
}

/// Handle for requesting shutdown from outside the orchestrator loop
#[derive(Clone)]
pub struct OrchestratorHandle {
    tx: mpsc::Sender<Event>,
}

impl OrchestratorHandle {
    /// Request shutdown. Safe to call from anywhere, any number of times,
    /// including mid-transition.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(Event::Shutdown).await;
    }
}

/// The two-engine handoff state machine
pub struct Orchestrator {
    keyword: KeywordAdapter,
    dictation: DictationAdapter,
    sink: Box<dyn CommandSink>,
    phrase: String,
    search_id: String,
    state: State,
    diagnostics: Arc<Diagnostics>,
    rx: mpsc::Receiver<Event>,
    tx: mpsc::Sender<Event>,
}

impl Orchestrator {
    /// Build the orchestrator around the two engines and a command sink
    #[must_use]
    pub fn new(
        keyword_engine: Box<dyn KeywordEngine>,
        dictation_engine: Arc<dyn DictationEngine>,
        sink: Box<dyn CommandSink>,
        config: OrchestratorConfig,
    ) -> Self {
        let (tx, rx) = mpsc::channel(EVENT_CAPACITY);
        let keyword = KeywordAdapter::new(keyword_engine, tx.clone());
        let dictation =
            DictationAdapter::new(dictation_engine, tx.clone(), config.dictation_timeout_secs);

        Self {
            keyword,
            dictation,
            sink,
            phrase: config.phrase,
            search_id: config.search_id,
            state: State::Initializing,
            diagnostics: Diagnostics::new(),
            rx,
            tx,
        }
    }

    /// Handle for requesting shutdown
    #[must_use]
    pub fn handle(&self) -> OrchestratorHandle {
        OrchestratorHandle {
            tx: self.tx.clone(),
        }
    }

    /// Shared failure counters
    #[must_use]
    pub fn diagnostics(&self) -> Arc<Diagnostics> {
        Arc::clone(&self.diagnostics)
    }

    /// Current orchestrator state
    #[must_use]
    pub const fn state(&self) -> State {
        self.state
    }

    /// Initialize the keyword engine, arm passive listening and run the
    /// event loop until shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Init`] if keyword initialization or the initial
    /// arming of passive listening fails — fatal startup conditions
    /// requiring external remediation, never retried here. Runtime engine
    /// errors are absorbed and recorded instead.
    pub async fn run(mut self) -> Result<()> {
        // Model loading is I/O bound; the engine keeps it off the runtime.
        // On failure we stay in Initializing and surface the error.
        self.keyword.initialize().await?;

        // A system that never armed is as inoperative as one that never
        // loaded its model
        self.keyword
            .start_listening(&self.search_id)
            .await
            .map_err(|e| Error::Init(format!("failed to arm keyword listening: {e}")))?;
        self.transition(State::PassiveListening);
        tracing::info!(phrase = %self.phrase, search_id = %self.search_id, "passive listening");

        while let Some(event) = self.rx.recv().await {
            if !self.handle_event(event).await {
                break;
            }
        }

        self.diagnostics.report();
        Ok(())
    }

    /// Apply one event. Returns false once the loop should stop.
    async fn handle_event(&mut self, event: Event) -> bool {
        match event {
            Event::KeywordPartial(hypothesis) => self.on_partial(hypothesis).await,
            Event::KeywordError(e) => self.on_keyword_error(e).await,
            Event::DictationResult(raw) => self.on_dictation_terminal(Ok(raw)).await,
            Event::DictationError(e) => self.on_dictation_terminal(Err(e)).await,
            Event::Shutdown => {
                self.shutdown().await;
                return false;
            }
        }
        true
    }

    async fn on_partial(&mut self, hypothesis: Option<String>) {
        if self.state != State::PassiveListening {
            tracing::trace!(state = ?self.state, "dropping late keyword partial");
            return;
        }

        // Absent and empty hypotheses are both "no match"
        let Some(text) = hypothesis.filter(|t| !t.is_empty()) else {
            return;
        };
        if text != self.phrase {
            tracing::trace!(%text, "partial does not match wake phrase");
            return;
        }

        tracing::info!(phrase = %self.phrase, "wake phrase detected");
        // The keyword pass must be cancelled before dictation is activated,
        // otherwise both engines compete for the microphone
        self.keyword.cancel().await;
        self.dictation.activate();
        self.transition(State::ActiveDictation);
    }

    async fn on_keyword_error(&mut self, error: Error) {
        self.diagnostics.record_keyword_error();
        tracing::warn!(error = %error, "keyword engine error");

        if self.state == State::PassiveListening {
            if let Err(e) = self.keyword.start_listening(&self.search_id).await {
                tracing::error!(error = %e, "failed to re-arm keyword engine");
            }
        }
    }

    async fn on_dictation_terminal(&mut self, outcome: Result<RawDictation>) {
        if self.state != State::ActiveDictation {
            tracing::debug!(state = ?self.state, "ignoring stale dictation event");
            return;
        }

        match outcome {
            Ok(raw) if raw.is_aligned() => {
                tracing::info!(candidates = raw.transcripts.len(), "dictation complete");
                // Ordering is preserved; first-match-wins is sink policy
                match self.sink.deliver(&raw.transcripts).await {
                    Ok(()) => self.diagnostics.record_forwarded(),
                    Err(e) => {
                        self.diagnostics.record_sink_error();
                        tracing::warn!(error = %e, "command sink failed");
                    }
                }
            }
            Ok(raw) => {
                // Misaligned lists are error-equivalent: nothing forwarded
                self.diagnostics.record_misaligned();
                tracing::warn!(
                    transcripts = raw.transcripts.len(),
                    confidences = raw.confidences.len(),
                    "discarding misaligned dictation result"
                );
            }
            Err(e) => {
                // Silent recovery: recorded for operators, invisible to the sink
                self.diagnostics.record_dictation_error();
                tracing::warn!(error = %e, "dictation failed");
            }
        }

        self.rearm().await;
    }

    /// Return the keyword engine to passive listening with the same search
    /// identifier. Runs exactly once per terminal dictation outcome.
    async fn rearm(&mut self) {
        self.dictation.cancel();
        if let Err(e) = self.keyword.start_listening(&self.search_id).await {
            tracing::error!(error = %e, "failed to re-arm keyword engine");
        }
        self.transition(State::PassiveListening);
    }

    /// Cancel and release both engines. Reentrant-safe and idempotent.
    async fn shutdown(&mut self) {
        if self.state == State::ShuttingDown {
            return;
        }
        self.transition(State::ShuttingDown);
        self.keyword.shutdown().await;
        self.dictation.release();
        tracing::info!("orchestrator stopped");
    }

    fn transition(&mut self, next: State) {
        tracing::debug!(from = ?self.state, to = ?next, "state transition");
        self.state = next;
    }
}
