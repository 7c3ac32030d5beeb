//! Keyword engine adapter
//!
//! Owns the offline keyword spotter's lifecycle and pumps its partial
//! hypotheses into the orchestrator's event channel. Restarting a live
//! engine is internally sequenced as stop-then-start; a cancelled pass is
//! fenced by a generation counter so it can never emit a stale partial.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::orchestrator::Event;
use crate::{Error, Result};

use super::{EngineState, KeywordEngine};

/// Buffer size for the engine-to-adapter partial channel
const SIGNAL_CAPACITY: usize = 16;

/// Adapter around the continuously-streaming keyword spotter
pub struct KeywordAdapter {
    engine: Box<dyn KeywordEngine>,
    events: mpsc::Sender<Event>,
    state: EngineState,
    released: bool,
    /// Current pass generation; bumped on every start/cancel to fence
    /// pumps belonging to earlier passes
    pass: Arc<AtomicU64>,
    pump: Option<JoinHandle<()>>,
}

impl KeywordAdapter {
    /// Wrap a keyword engine, emitting events into `events`
    pub fn new(engine: Box<dyn KeywordEngine>, events: mpsc::Sender<Event>) -> Self {
        Self {
            engine,
            events,
            state: EngineState::Uninitialized,
            released: false,
            pass: Arc::new(AtomicU64::new(0)),
            pump: None,
        }
    }

    /// Prepare assets and load the model. I/O bound; may take seconds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Init`] if assets cannot be synchronized or loaded.
    /// Not retried automatically.
    pub async fn initialize(&mut self) -> Result<()> {
        if self.released {
            return Err(Error::Engine("keyword adapter is shut down".into()));
        }
        if self.state != EngineState::Uninitialized {
            return Err(Error::Engine("keyword engine already initialized".into()));
        }

        match self.engine.initialize().await {
            Ok(()) => {
                self.state = EngineState::Ready;
                tracing::debug!("keyword engine initialized");
                Ok(())
            }
            Err(e) => {
                self.state = EngineState::Failed;
                Err(e)
            }
        }
    }

    /// Begin (or restart) a listening pass for the named search.
    ///
    /// # Errors
    ///
    /// Returns error if the adapter is uninitialized, shut down, or the
    /// engine rejects the search.
    pub async fn start_listening(&mut self, search_id: &str) -> Result<()> {
        if self.released {
            return Err(Error::Engine("keyword adapter is shut down".into()));
        }
        match self.state {
            EngineState::Uninitialized => {
                return Err(Error::Engine("keyword engine not initialized".into()));
            }
            EngineState::Failed => {
                return Err(Error::Engine("keyword engine failed to initialize".into()));
            }
            EngineState::Listening => {
                // A live engine must be stopped before a new search starts
                self.halt_pump();
                self.engine.stop().await?;
            }
            EngineState::Ready | EngineState::Suspended => {}
        }

        let (tx, mut rx) = mpsc::channel(SIGNAL_CAPACITY);
        self.engine.start_listening(search_id, tx).await?;

        let pass = self.pass.fetch_add(1, Ordering::SeqCst) + 1;
        let current = Arc::clone(&self.pass);
        let events = self.events.clone();

        self.pump = Some(tokio::spawn(async move {
            while let Some(signal) = rx.recv().await {
                if current.load(Ordering::SeqCst) != pass {
                    break;
                }
                let event = match signal {
                    Ok(hypothesis) => Event::KeywordPartial(hypothesis),
                    Err(e) => Event::KeywordError(e),
                };
                if events.send(event).await.is_err() {
                    break;
                }
            }
        }));

        self.state = EngineState::Listening;
        tracing::debug!(search_id, pass, "keyword listening started");
        Ok(())
    }

    /// Abort the current listening pass, discarding partials. Idempotent.
    pub async fn cancel(&mut self) {
        if self.released {
            return;
        }
        self.halt_pump();
        self.engine.cancel().await;
        if self.state == EngineState::Listening {
            self.state = EngineState::Suspended;
            tracing::debug!("keyword listening suspended");
        }
    }

    /// Release all engine resources. The adapter is permanently unusable
    /// afterwards. Idempotent.
    pub async fn shutdown(&mut self) {
        if self.released {
            return;
        }
        self.halt_pump();
        self.engine.cancel().await;
        self.engine.shutdown().await;
        self.released = true;
        tracing::debug!("keyword engine shut down");
    }

    /// Current engine lifecycle state
    #[must_use]
    pub const fn state(&self) -> EngineState {
        self.state
    }

    /// Whether the adapter has been shut down
    #[must_use]
    pub const fn is_released(&self) -> bool {
        self.released
    }

    fn halt_pump(&mut self) {
        self.pass.fetch_add(1, Ordering::SeqCst);
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::engine::KeywordSignal;

    /// Engine that records calls and replays a scripted partial sequence
    struct ScriptedEngine {
        partials: Vec<Option<String>>,
        delay: Duration,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedEngine {
        fn new(partials: Vec<Option<String>>) -> (Self, Arc<Mutex<Vec<String>>>) {
            Self::with_delay(partials, Duration::ZERO)
        }

        fn with_delay(
            partials: Vec<Option<String>>,
            delay: Duration,
        ) -> (Self, Arc<Mutex<Vec<String>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    partials,
                    delay,
                    calls: Arc::clone(&calls),
                },
                calls,
            )
        }

        fn record(&self, call: &str) {
            self.calls.lock().unwrap().push(call.to_string());
        }
    }

    #[async_trait]
    impl KeywordEngine for ScriptedEngine {
        async fn initialize(&mut self) -> Result<()> {
            self.record("initialize");
            Ok(())
        }

        async fn start_listening(
            &mut self,
            search_id: &str,
            signals: mpsc::Sender<KeywordSignal>,
        ) -> Result<()> {
            self.record(&format!("start:{search_id}"));
            let partials = self.partials.clone();
            let delay = self.delay;
            tokio::spawn(async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                for partial in partials {
                    if signals.send(Ok(partial)).await.is_err() {
                        break;
                    }
                }
            });
            Ok(())
        }

        async fn stop(&mut self) -> Result<()> {
            self.record("stop");
            Ok(())
        }

        async fn cancel(&mut self) {
            self.record("cancel");
        }

        async fn shutdown(&mut self) {
            self.record("shutdown");
        }
    }

    #[tokio::test]
    async fn listening_requires_initialize() {
        let (engine, _) = ScriptedEngine::new(Vec::new());
        let (tx, _rx) = mpsc::channel(8);
        let mut adapter = KeywordAdapter::new(Box::new(engine), tx);

        assert!(adapter.start_listening("wakeup").await.is_err());
    }

    #[tokio::test]
    async fn partials_are_pumped_to_events() {
        let (engine, _) = ScriptedEngine::new(vec![None, Some("ok".into()), Some("ok light".into())]);
        let (tx, mut rx) = mpsc::channel(8);
        let mut adapter = KeywordAdapter::new(Box::new(engine), tx);

        adapter.initialize().await.unwrap();
        adapter.start_listening("wakeup").await.unwrap();

        let mut seen = Vec::new();
        for _ in 0..3 {
            match rx.recv().await {
                Some(Event::KeywordPartial(h)) => seen.push(h),
                other => panic!("unexpected event: {other:?}"),
            }
        }
        assert_eq!(
            seen,
            vec![None, Some("ok".to_string()), Some("ok light".to_string())]
        );
    }

    #[tokio::test]
    async fn restart_stops_live_pass_first() {
        let (engine, calls) = ScriptedEngine::new(Vec::new());
        let (tx, _rx) = mpsc::channel(8);
        let mut adapter = KeywordAdapter::new(Box::new(engine), tx);

        adapter.initialize().await.unwrap();
        adapter.start_listening("wakeup").await.unwrap();
        adapter.start_listening("wakeup").await.unwrap();

        let calls = calls.lock().unwrap().clone();
        assert_eq!(calls, vec!["initialize", "start:wakeup", "stop", "start:wakeup"]);
    }

    #[tokio::test]
    async fn cancel_fences_stale_partials() {
        let (engine, _) = ScriptedEngine::with_delay(
            vec![Some("ok light".into())],
            Duration::from_millis(30),
        );
        let (tx, mut rx) = mpsc::channel(8);
        let mut adapter = KeywordAdapter::new(Box::new(engine), tx);

        adapter.initialize().await.unwrap();
        adapter.start_listening("wakeup").await.unwrap();
        adapter.cancel().await;
        assert_eq!(adapter.state(), EngineState::Suspended);

        // Nothing from the cancelled pass may arrive after the fence
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn shutdown_is_idempotent_and_terminal() {
        let (engine, calls) = ScriptedEngine::new(Vec::new());
        let (tx, _rx) = mpsc::channel(8);
        let mut adapter = KeywordAdapter::new(Box::new(engine), tx);

        adapter.initialize().await.unwrap();
        adapter.shutdown().await;
        adapter.shutdown().await;

        assert!(adapter.is_released());
        assert!(adapter.start_listening("wakeup").await.is_err());

        let shutdowns = calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == "shutdown")
            .count();
        assert_eq!(shutdowns, 1);
    }
}
