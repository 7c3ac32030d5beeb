//! Configuration management for the Lumen gateway
//!
//! Runtime configuration is built from defaults, then overlaid with an
//! optional TOML file (`~/.config/lumen/config.toml`). All file fields are
//! optional — the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Error, Result};

/// Default wake phrase that arms the dictation engine
pub const DEFAULT_PHRASE: &str = "ok light";

/// Default named keyword search identifier
pub const DEFAULT_SEARCH_ID: &str = "wakeup";

/// Default keyword sensitivity threshold. Tunable to trade false positives
/// against false negatives.
pub const DEFAULT_THRESHOLD: f32 = 1e-45;

/// Lumen gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Keyword spotting configuration
    pub keyword: KeywordConfig,

    /// Remote dictation configuration
    pub dictation: DictationConfig,

    /// Command sink selection ("light" or "log")
    pub sink: String,
}

/// Keyword spotting configuration
#[derive(Debug, Clone)]
pub struct KeywordConfig {
    /// The exact phrase that arms the dictation engine. Matching is
    /// case-sensitive exact equality.
    pub phrase: String,

    /// Named search identifier bound to the phrase
    pub search_id: String,

    /// Keyword sensitivity threshold
    pub threshold: f32,

    /// Spotter command line (program + leading args); the engine appends
    /// the phrase, threshold and model arguments
    pub spotter_cmd: Vec<String>,

    /// Directory the engine syncs its model assets into
    pub asset_dir: PathBuf,

    /// Optional directory of bundled assets to sync from at initialize
    pub asset_source: Option<PathBuf>,

    /// Acoustic model directory name inside the asset dir
    pub acoustic_model: String,

    /// Pronunciation dictionary file name inside the asset dir
    pub dictionary: String,
}

/// Remote dictation configuration
#[derive(Debug, Clone)]
pub struct DictationConfig {
    /// Recognition provider ("deepgram" or "whisper")
    pub provider: String,

    /// API key for the provider
    pub api_key: String,

    /// Model identifier (e.g. "nova-2", "whisper-1")
    pub model: String,

    /// Deadline for one dictation turn, in seconds
    pub timeout_secs: u64,

    /// Number of alternative transcripts to request
    pub max_alternatives: u32,

    /// Recorder command producing one WAV utterance on stdout
    pub recorder_cmd: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keyword: KeywordConfig::default(),
            dictation: DictationConfig::default(),
            sink: "light".to_string(),
        }
    }
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            phrase: DEFAULT_PHRASE.to_string(),
            search_id: DEFAULT_SEARCH_ID.to_string(),
            threshold: DEFAULT_THRESHOLD,
            spotter_cmd: vec!["pocketsphinx_continuous".to_string()],
            asset_dir: default_asset_dir(),
            asset_source: None,
            acoustic_model: "en-us-ptm".to_string(),
            dictionary: "cmudict-en-us.dict".to_string(),
        }
    }
}

impl Default for DictationConfig {
    fn default() -> Self {
        Self {
            provider: "deepgram".to_string(),
            api_key: String::new(),
            model: "nova-2".to_string(),
            timeout_secs: 30,
            max_alternatives: 5,
            recorder_cmd: vec![
                "arecord".to_string(),
                "-q".to_string(),
                "-f".to_string(),
                "S16_LE".to_string(),
                "-r".to_string(),
                "16000".to_string(),
                "-c".to_string(),
                "1".to_string(),
                "-d".to_string(),
                "8".to_string(),
                "-t".to_string(),
                "wav".to_string(),
            ],
        }
    }
}

impl Config {
    /// Load configuration: defaults overlaid with the TOML file.
    ///
    /// With an explicit `path` the file must exist and parse. Without one,
    /// the standard path is used and a missing or broken file falls back to
    /// defaults with a warning.
    ///
    /// # Errors
    ///
    /// Returns error if an explicitly given file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)
                    .map_err(|e| Error::Config(format!("cannot read {}: {e}", p.display())))?;
                toml::from_str(&content)?
            }
            None => load_default_file(),
        };

        let mut config = Self::default();
        config.apply(file);
        config.validate()?;
        Ok(config)
    }

    fn apply(&mut self, file: ConfigFile) {
        let kw = file.keyword;
        if let Some(v) = kw.phrase {
            self.keyword.phrase = v;
        }
        if let Some(v) = kw.search_id {
            self.keyword.search_id = v;
        }
        if let Some(v) = kw.threshold {
            self.keyword.threshold = v;
        }
        if let Some(v) = kw.spotter_cmd {
            self.keyword.spotter_cmd = v;
        }
        if let Some(v) = kw.asset_dir {
            self.keyword.asset_dir = v;
        }
        if let Some(v) = kw.asset_source {
            self.keyword.asset_source = Some(v);
        }
        if let Some(v) = kw.acoustic_model {
            self.keyword.acoustic_model = v;
        }
        if let Some(v) = kw.dictionary {
            self.keyword.dictionary = v;
        }

        let dc = file.dictation;
        if let Some(v) = dc.provider {
            self.dictation.provider = v;
        }
        if let Some(v) = dc.api_key {
            self.dictation.api_key = v;
        }
        if let Some(v) = dc.model {
            self.dictation.model = v;
        }
        if let Some(v) = dc.timeout_secs {
            self.dictation.timeout_secs = v;
        }
        if let Some(v) = dc.max_alternatives {
            self.dictation.max_alternatives = v;
        }
        if let Some(v) = dc.recorder_cmd {
            self.dictation.recorder_cmd = v;
        }

        if let Some(v) = file.sink {
            self.sink = v;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.keyword.phrase.is_empty() {
            return Err(Error::Config("keyword.phrase must not be empty".into()));
        }
        if self.keyword.spotter_cmd.is_empty() {
            return Err(Error::Config("keyword.spotter_cmd must not be empty".into()));
        }
        if self.dictation.recorder_cmd.is_empty() {
            return Err(Error::Config(
                "dictation.recorder_cmd must not be empty".into(),
            ));
        }
        match self.dictation.provider.as_str() {
            "deepgram" | "whisper" => Ok(()),
            other => Err(Error::Config(format!("unknown dictation provider: {other}"))),
        }
    }
}

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    keyword: KeywordFileConfig,

    #[serde(default)]
    dictation: DictationFileConfig,

    sink: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct KeywordFileConfig {
    phrase: Option<String>,
    search_id: Option<String>,
    threshold: Option<f32>,
    spotter_cmd: Option<Vec<String>>,
    asset_dir: Option<PathBuf>,
    asset_source: Option<PathBuf>,
    acoustic_model: Option<String>,
    dictionary: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DictationFileConfig {
    provider: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_alternatives: Option<u32>,
    recorder_cmd: Option<Vec<String>>,
}

/// Load the TOML config file from the standard path, falling back to
/// defaults if it is missing or unparseable.
fn load_default_file() -> ConfigFile {
    let Some(path) = config_file_path() else {
        return ConfigFile::default();
    };

    if !path.exists() {
        return ConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                ConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            ConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/lumen/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("lumen").join("config.toml"))
}

/// Asset cache directory: `~/.cache/lumen/assets`
fn default_asset_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".lumen-assets"),
        |d| d.cache_dir().join("lumen").join("assets"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.keyword.phrase, "ok light");
        assert_eq!(config.keyword.search_id, "wakeup");
        assert_eq!(config.dictation.timeout_secs, 30);
    }

    #[test]
    fn overlay_is_partial() {
        let file: ConfigFile = toml::from_str(
            r#"
            [keyword]
            phrase = "hey lumen"

            [dictation]
            provider = "whisper"
            model = "whisper-1"
            "#,
        )
        .unwrap();

        let mut config = Config::default();
        config.apply(file);

        assert_eq!(config.keyword.phrase, "hey lumen");
        // Untouched fields keep their defaults
        assert_eq!(config.keyword.search_id, "wakeup");
        assert_eq!(config.dictation.provider, "whisper");
        assert_eq!(config.dictation.model, "whisper-1");
        assert_eq!(config.dictation.max_alternatives, 5);
    }

    #[test]
    fn unknown_provider_rejected() {
        let mut config = Config::default();
        config.dictation.provider = "parrot".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn explicit_path_must_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "keyword = 3").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn explicit_path_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[keyword]\nphrase = \"ok lamp\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.keyword.phrase, "ok lamp");
    }
}
