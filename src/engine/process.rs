//! Process-backed keyword spotter
//!
//! Runs an external pocketsphinx-style spotter as a child process and
//! turns its stdout lines into partial hypotheses. The spotter prints its
//! running hypothesis once per decoded chunk; a blank line means "nothing
//! recognized yet".

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

use crate::config::KeywordConfig;
use crate::{Error, Result};

use super::{KeywordEngine, KeywordSignal};

/// Keyword spotter driving an external recognizer process.
///
/// Searches are registered by name at construction; each listening pass
/// runs one child process configured for the named search's phrase.
pub struct ProcessKeywordEngine {
    /// Program and leading arguments of the spotter command
    command: Vec<String>,
    /// Named searches: search identifier to keyphrase
    searches: HashMap<String, String>,
    threshold: f32,
    asset_dir: PathBuf,
    asset_source: Option<PathBuf>,
    acoustic_model: String,
    dictionary: String,
    child: Option<Child>,
    /// Set before a deliberate kill so the reader does not report the
    /// resulting EOF as an engine fault
    stopping: Arc<AtomicBool>,
    initialized: bool,
}

impl ProcessKeywordEngine {
    /// Build the engine from keyword configuration, registering the
    /// configured search
    #[must_use]
    pub fn from_config(config: &KeywordConfig) -> Self {
        let mut searches = HashMap::new();
        searches.insert(config.search_id.clone(), config.phrase.clone());

        Self {
            command: config.spotter_cmd.clone(),
            searches,
            threshold: config.threshold,
            asset_dir: config.asset_dir.clone(),
            asset_source: config.asset_source.clone(),
            acoustic_model: config.acoustic_model.clone(),
            dictionary: config.dictionary.clone(),
            child: None,
            stopping: Arc::new(AtomicBool::new(false)),
            initialized: false,
        }
    }

    /// Register an additional named search
    pub fn add_search(&mut self, search_id: &str, phrase: &str) {
        self.searches.insert(search_id.to_string(), phrase.to_string());
    }

    fn kill_child(&mut self) {
        if let Some(mut child) = self.child.take() {
            self.stopping.store(true, Ordering::SeqCst);
            if let Err(e) = child.start_kill() {
                tracing::debug!(error = %e, "spotter already exited");
            }
        }
    }
}

#[async_trait]
impl KeywordEngine for ProcessKeywordEngine {
    /// Synchronize bundled assets into the cache directory and verify the
    /// model files exist. Slow on first run; subsequent runs skip files
    /// that are already current.
    async fn initialize(&mut self) -> Result<()> {
        if let Some(source) = self.asset_source.clone() {
            let target = self.asset_dir.clone();
            tokio::task::spawn_blocking(move || sync_assets(&source, &target))
                .await
                .map_err(|e| Error::Init(format!("asset sync task failed: {e}")))?
                .map_err(|e| Error::Init(format!("asset sync failed: {e}")))?;
        }

        let model = self.asset_dir.join(&self.acoustic_model);
        if !model.is_dir() {
            return Err(Error::Init(format!(
                "acoustic model not found at {}",
                model.display()
            )));
        }
        let dict = self.asset_dir.join(&self.dictionary);
        if !dict.is_file() {
            return Err(Error::Init(format!(
                "pronunciation dictionary not found at {}",
                dict.display()
            )));
        }

        self.initialized = true;
        tracing::info!(asset_dir = %self.asset_dir.display(), "keyword assets ready");
        Ok(())
    }

    async fn start_listening(
        &mut self,
        search_id: &str,
        signals: mpsc::Sender<KeywordSignal>,
    ) -> Result<()> {
        if !self.initialized {
            return Err(Error::Engine("keyword assets not initialized".into()));
        }
        let phrase = self
            .searches
            .get(search_id)
            .cloned()
            .ok_or_else(|| Error::Engine(format!("unknown keyword search: {search_id}")))?;
        self.kill_child();

        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| Error::Engine("empty spotter command".into()))?;

        let mut child = Command::new(program)
            .args(args)
            .arg("-keyphrase")
            .arg(&phrase)
            .arg("-kws_threshold")
            .arg(format!("{:e}", self.threshold))
            .arg("-hmm")
            .arg(self.asset_dir.join(&self.acoustic_model))
            .arg("-dict")
            .arg(self.asset_dir.join(&self.dictionary))
            .arg("-inmic")
            .arg("yes")
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Engine(format!("failed to spawn spotter: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Engine("spotter stdout not captured".into()))?;

        self.stopping.store(false, Ordering::SeqCst);
        let stopping = Arc::clone(&self.stopping);

        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let hypothesis = {
                            let trimmed = line.trim();
                            if trimmed.is_empty() {
                                None
                            } else {
                                Some(trimmed.to_string())
                            }
                        };
                        if signals.send(Ok(hypothesis)).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        // EOF after a deliberate kill is expected
                        if !stopping.load(Ordering::SeqCst) {
                            let _ = signals
                                .send(Err(Error::Engine("spotter exited unexpectedly".into())))
                                .await;
                        }
                        break;
                    }
                    Err(e) => {
                        let _ = signals
                            .send(Err(Error::Engine(format!("spotter read failed: {e}"))))
                            .await;
                        break;
                    }
                }
            }
        });

        self.child = Some(child);
        tracing::debug!(search_id, phrase, "spotter process started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.kill_child();
        Ok(())
    }

    async fn cancel(&mut self) {
        self.kill_child();
    }

    async fn shutdown(&mut self) {
        self.kill_child();
        self.initialized = false;
    }
}

/// Copy the asset tree from `source` into `target`, skipping files whose
/// size and modification time already match.
fn sync_assets(source: &std::path::Path, target: &std::path::Path) -> std::io::Result<()> {
    std::fs::create_dir_all(target)?;

    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let dest = target.join(entry.file_name());

        if entry.file_type()?.is_dir() {
            sync_assets(&entry.path(), &dest)?;
        } else if !asset_is_current(&entry.path(), &dest) {
            std::fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}

fn asset_is_current(source: &std::path::Path, dest: &std::path::Path) -> bool {
    let (Ok(src), Ok(dst)) = (std::fs::metadata(source), std::fs::metadata(dest)) else {
        return false;
    };
    src.len() == dst.len()
        && matches!(
            (src.modified(), dst.modified()),
            (Ok(s), Ok(d)) if d >= s
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeywordConfig;

    fn seeded_config(dir: &std::path::Path) -> KeywordConfig {
        let source = dir.join("bundled");
        std::fs::create_dir_all(source.join("en-us-ptm")).unwrap();
        std::fs::write(source.join("en-us-ptm").join("model.bin"), b"model").unwrap();
        std::fs::write(source.join("cmudict-en-us.dict"), b"ok OW K EY").unwrap();

        KeywordConfig {
            asset_dir: dir.join("cache"),
            asset_source: Some(source),
            ..KeywordConfig::default()
        }
    }

    #[tokio::test]
    async fn initialize_syncs_assets_into_cache() {
        let dir = tempfile::tempdir().unwrap();
        let config = seeded_config(dir.path());
        let mut engine = ProcessKeywordEngine::from_config(&config);

        engine.initialize().await.unwrap();

        assert!(config.asset_dir.join("cmudict-en-us.dict").is_file());
        assert!(config.asset_dir.join("en-us-ptm").join("model.bin").is_file());
    }

    #[tokio::test]
    async fn initialize_rejects_missing_dictionary() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = seeded_config(dir.path());
        std::fs::remove_file(
            config
                .asset_source
                .as_ref()
                .unwrap()
                .join("cmudict-en-us.dict"),
        )
        .unwrap();
        config.dictionary = "missing.dict".to_string();

        let mut engine = ProcessKeywordEngine::from_config(&config);
        let err = engine.initialize().await.unwrap_err();
        assert!(matches!(err, Error::Init(_)));
    }

    #[tokio::test]
    async fn listening_requires_known_search() {
        let dir = tempfile::tempdir().unwrap();
        let config = seeded_config(dir.path());
        let mut engine = ProcessKeywordEngine::from_config(&config);
        engine.initialize().await.unwrap();

        let (tx, _rx) = mpsc::channel(4);
        let err = engine.start_listening("menu", tx).await.unwrap_err();
        assert!(matches!(err, Error::Engine(_)));
    }

    #[tokio::test]
    async fn listening_requires_initialize() {
        let config = KeywordConfig::default();
        let mut engine = ProcessKeywordEngine::from_config(&config);

        let (tx, _rx) = mpsc::channel(4);
        assert!(engine.start_listening("wakeup", tx).await.is_err());
    }
}
