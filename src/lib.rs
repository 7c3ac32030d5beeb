//! Lumen - wake-word voice control gateway
//!
//! Lumen keeps an offline keyword spotter listening for a wake phrase and,
//! on an exact match, hands the microphone to a remote dictation
//! recognizer for one utterance. The best recognized command drives a
//! pluggable command sink, then the spotter is re-armed.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                  Orchestrator                     │
//! │  Initializing → PassiveListening ⇄ ActiveDictation│
//! └──────┬──────────────────┬────────────────┬───────┘
//!        │                  │                │
//! ┌──────▼──────┐   ┌───────▼───────┐  ┌─────▼─────┐
//! │   Keyword   │   │   Dictation   │  │  Command  │
//! │   spotter   │   │  (remote API) │  │   sink    │
//! └─────────────┘   └───────────────┘  └───────────┘
//! ```

pub mod config;
pub mod daemon;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod sink;

pub use config::Config;
pub use daemon::Daemon;
pub use diagnostics::{Diagnostics, DiagnosticsSnapshot};
pub use error::{Error, Result};
pub use orchestrator::{Orchestrator, OrchestratorConfig, OrchestratorHandle};
