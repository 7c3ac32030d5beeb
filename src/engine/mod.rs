//! Recognition engines and their adapters
//!
//! The two recognizers are external collaborators behind capability
//! traits: a continuously-streaming offline keyword spotter and a
//! single-shot remote dictation recognizer. The adapters own engine
//! lifecycle state and translate engine output into orchestrator events;
//! the orchestrator never touches engine internals directly.

mod dictation;
mod keyword;
mod process;
mod recorder;
mod remote;

pub use dictation::DictationAdapter;
pub use keyword::KeywordAdapter;
pub use process::ProcessKeywordEngine;
pub use recorder::{CommandRecorder, UtteranceSource};
pub use remote::HttpDictationEngine;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::Result;

/// Per-adapter engine lifecycle state. Owned exclusively by the adapter;
/// the orchestrator observes transitions through events only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Created but assets not yet loaded
    Uninitialized,
    /// Initialized and idle
    Ready,
    /// Actively holding the microphone
    Listening,
    /// Listening pass cancelled, awaiting re-arm
    Suspended,
    /// Initialization or engine failure
    Failed,
}

/// Raw output of one dictation turn, exactly as the engine reports it:
/// parallel transcript and confidence lists. Alignment is validated by the
/// consumer before the transcripts are trusted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDictation {
    /// Candidate transcripts, best first
    pub transcripts: Vec<String>,
    /// Confidence score per transcript, index-aligned
    pub confidences: Vec<f32>,
}

impl RawDictation {
    /// A result is well formed when it is non-empty and the two lists are
    /// the same length.
    #[must_use]
    pub fn is_aligned(&self) -> bool {
        !self.transcripts.is_empty() && self.transcripts.len() == self.confidences.len()
    }
}

/// A partial hypothesis signal from a keyword listening pass.
///
/// `Ok(None)` means "no result yet"; `Ok(Some(text))` is a candidate
/// transcript; `Err` is an engine fault, after which the pass is over.
pub type KeywordSignal = std::result::Result<Option<String>, crate::Error>;

/// Capability contract for the offline keyword spotter
///
/// The engine owns the microphone while a pass is live and pushes partial
/// hypotheses into the channel handed to `start_listening`.
#[async_trait]
pub trait KeywordEngine: Send + 'static {
    /// Prepare assets and load the model. File-I/O bound and potentially
    /// slow; implementations must not block the async runtime.
    async fn initialize(&mut self) -> Result<()>;

    /// Begin a listening pass for the named search, streaming partials
    /// into `signals` until stopped.
    async fn start_listening(
        &mut self,
        search_id: &str,
        signals: mpsc::Sender<KeywordSignal>,
    ) -> Result<()>;

    /// Stop the current pass, allowing a final result to settle.
    async fn stop(&mut self) -> Result<()>;

    /// Abort the current pass, discarding any partial hypothesis.
    async fn cancel(&mut self);

    /// Release all engine resources. The engine is unusable afterwards.
    async fn shutdown(&mut self);
}

/// Capability contract for the single-shot remote dictation recognizer
///
/// One call recognizes exactly one utterance and resolves to a terminal
/// result or error; it cannot stream.
#[async_trait]
pub trait DictationEngine: Send + Sync + 'static {
    /// Capture and recognize one utterance.
    async fn recognize(&self) -> Result<RawDictation>;
}
