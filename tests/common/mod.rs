//! Shared test utilities

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use lumen_voice::engine::{DictationEngine, KeywordEngine, KeywordSignal, RawDictation};
use lumen_voice::sink::CommandSink;
use lumen_voice::{Error, Result};

/// Map "" to "no result yet" and anything else to a hypothesis
#[must_use]
pub fn hypotheses(texts: &[&str]) -> Vec<Option<String>> {
    texts
        .iter()
        .map(|t| {
            if t.is_empty() {
                None
            } else {
                Some((*t).to_string())
            }
        })
        .collect()
}

/// Build a raw dictation result from parallel slices
#[must_use]
pub fn raw(transcripts: &[&str], confidences: &[f32]) -> RawDictation {
    RawDictation {
        transcripts: transcripts.iter().map(ToString::to_string).collect(),
        confidences: confidences.to_vec(),
    }
}

/// Ordered record of engine calls, shared between mocks so tests can
/// assert cross-engine sequencing
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Keyword engine replaying one scripted partial sequence per listening
/// pass. Records the search identifier of every started pass.
pub struct ScriptedKeywordEngine {
    passes: Mutex<VecDeque<Vec<Option<String>>>>,
    starts: Arc<Mutex<Vec<String>>>,
    log: Option<CallLog>,
}

impl ScriptedKeywordEngine {
    #[must_use]
    pub fn new(passes: Vec<Vec<Option<String>>>) -> (Self, Arc<Mutex<Vec<String>>>) {
        let starts = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                passes: Mutex::new(passes.into()),
                starts: Arc::clone(&starts),
                log: None,
            },
            starts,
        )
    }

    /// Same engine, additionally recording `cancel` into a shared log
    #[must_use]
    pub fn logged(
        passes: Vec<Vec<Option<String>>>,
        log: CallLog,
    ) -> (Self, Arc<Mutex<Vec<String>>>) {
        let (mut engine, starts) = Self::new(passes);
        engine.log = Some(log);
        (engine, starts)
    }
}

#[async_trait]
impl KeywordEngine for ScriptedKeywordEngine {
    async fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    async fn start_listening(
        &mut self,
        search_id: &str,
        signals: mpsc::Sender<KeywordSignal>,
    ) -> Result<()> {
        self.starts.lock().unwrap().push(search_id.to_string());

        let script = self.passes.lock().unwrap().pop_front().unwrap_or_default();
        tokio::spawn(async move {
            for partial in script {
                tokio::time::sleep(Duration::from_millis(5)).await;
                if signals.send(Ok(partial)).await.is_err() {
                    break;
                }
            }
        });
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    async fn cancel(&mut self) {
        if let Some(log) = &self.log {
            // Sleep before recording so any work spawned ahead of this
            // cancel gets to run and log first
            tokio::time::sleep(Duration::from_millis(10)).await;
            log.lock().unwrap().push("keyword.cancel".to_string());
        }
    }

    async fn shutdown(&mut self) {}
}

/// Dictation engine resolving queued outcomes in order. Once the queue is
/// empty, recognition never resolves.
pub struct QueuedDictationEngine {
    outcomes: Mutex<VecDeque<Result<RawDictation>>>,
    delay: Duration,
    calls: Arc<AtomicUsize>,
    log: Option<CallLog>,
}

impl QueuedDictationEngine {
    #[must_use]
    pub fn new(
        outcomes: Vec<Result<RawDictation>>,
        delay: Duration,
    ) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                outcomes: Mutex::new(outcomes.into()),
                delay,
                calls: Arc::clone(&calls),
                log: None,
            },
            calls,
        )
    }

    /// Same engine, additionally recording `recognize` into a shared log
    #[must_use]
    pub fn logged(
        outcomes: Vec<Result<RawDictation>>,
        delay: Duration,
        log: CallLog,
    ) -> (Self, Arc<AtomicUsize>) {
        let (mut engine, calls) = Self::new(outcomes, delay);
        engine.log = Some(log);
        (engine, calls)
    }
}

#[async_trait]
impl DictationEngine for QueuedDictationEngine {
    async fn recognize(&self) -> Result<RawDictation> {
        if let Some(log) = &self.log {
            log.lock().unwrap().push("dictation.recognize".to_string());
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let outcome = self.outcomes.lock().unwrap().pop_front();
        match outcome {
            Some(outcome) => outcome,
            None => futures::future::pending().await,
        }
    }
}

/// Sink recording every delivered command list
#[derive(Default)]
pub struct RecordingSink {
    delivered: Arc<Mutex<Vec<Vec<String>>>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> (Self, Arc<Mutex<Vec<Vec<String>>>>) {
        let sink = Self::default();
        let delivered = Arc::clone(&sink.delivered);
        (sink, delivered)
    }
}

#[async_trait]
impl CommandSink for RecordingSink {
    async fn deliver(&self, commands: &[String]) -> Result<()> {
        self.delivered.lock().unwrap().push(commands.to_vec());
        Ok(())
    }
}

/// A dictation error for scripting failure outcomes
#[must_use]
pub fn dictation_error(message: &str) -> Error {
    Error::Dictation(message.to_string())
}
