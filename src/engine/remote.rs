//! Remote dictation recognizer
//!
//! Implements [`DictationEngine`] against hosted transcription APIs. Each
//! recognition turn records one utterance, uploads it, and returns the
//! provider's candidate transcripts with their confidence scores as
//! parallel lists.

use async_trait::async_trait;

use crate::config::DictationConfig;
use crate::{Error, Result};

use super::{DictationEngine, RawDictation, UtteranceSource};

/// Response from Deepgram transcription API
#[derive(serde::Deserialize)]
struct DeepgramResponse {
    results: DeepgramResults,
}

#[derive(serde::Deserialize)]
struct DeepgramResults {
    channels: Vec<DeepgramChannel>,
}

#[derive(serde::Deserialize)]
struct DeepgramChannel {
    alternatives: Vec<DeepgramAlternative>,
}

#[derive(serde::Deserialize)]
struct DeepgramAlternative {
    transcript: String,
    confidence: f32,
}

/// Response from OpenAI Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Dictation provider backend
#[derive(Clone, Copy, Debug)]
enum Provider {
    Deepgram,
    Whisper,
}

/// Dictation engine calling a hosted transcription API over HTTPS
pub struct HttpDictationEngine {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_alternatives: u32,
    provider: Provider,
    source: Box<dyn UtteranceSource>,
    base_url: String,
}

impl HttpDictationEngine {
    /// Create the engine from dictation configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the API key is missing or the provider
    /// name is unknown.
    pub fn from_config(config: &DictationConfig, source: Box<dyn UtteranceSource>) -> Result<Self> {
        let provider = match config.provider.as_str() {
            "deepgram" => Provider::Deepgram,
            "whisper" => Provider::Whisper,
            other => {
                return Err(Error::Config(format!("unknown dictation provider: {other}")));
            }
        };
        if config.api_key.is_empty() {
            return Err(Error::Config(format!(
                "API key required for {} dictation",
                config.provider
            )));
        }

        let base_url = match provider {
            Provider::Deepgram => "https://api.deepgram.com".to_string(),
            Provider::Whisper => "https://api.openai.com".to_string(),
        };

        Ok(Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_alternatives: config.max_alternatives,
            provider,
            source,
            base_url,
        })
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    /// Transcribe using Deepgram, requesting N-best alternatives
    async fn recognize_deepgram(&self, audio: Vec<u8>) -> Result<RawDictation> {
        let url = format!(
            "{}/v1/listen?model={}&alternatives={}&punctuate=false",
            self.base_url, self.model, self.max_alternatives
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", "audio/wav")
            .body(audio)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Deepgram request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Deepgram API error");
            return Err(Error::Dictation(format!("Deepgram API error {status}: {body}")));
        }

        let result: DeepgramResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse Deepgram response");
            e
        })?;

        let alternatives = result
            .results
            .channels
            .into_iter()
            .next()
            .map(|c| c.alternatives)
            .unwrap_or_default();

        if alternatives.is_empty() {
            return Err(Error::Dictation("no speech recognized".into()));
        }

        let mut raw = RawDictation::default();
        for alternative in alternatives {
            raw.transcripts.push(alternative.transcript);
            raw.confidences.push(alternative.confidence);
        }

        tracing::info!(
            best = %raw.transcripts[0],
            candidates = raw.transcripts.len(),
            "transcription complete"
        );
        Ok(raw)
    }

    /// Transcribe using OpenAI Whisper. Whisper returns one transcript, so
    /// the result is a single candidate with full confidence.
    async fn recognize_whisper(&self, audio: Vec<u8>) -> Result<RawDictation> {
        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio)
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Dictation(e.to_string()))?,
            )
            .text("model", self.model.clone());

        let response = self
            .client
            .post(format!("{}/v1/audio/transcriptions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Whisper request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(Error::Dictation(format!("Whisper API error {status}: {body}")));
        }

        let result: WhisperResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse Whisper response");
            e
        })?;

        if result.text.is_empty() {
            return Err(Error::Dictation("no speech recognized".into()));
        }

        tracing::info!(transcript = %result.text, "transcription complete");
        Ok(RawDictation {
            transcripts: vec![result.text],
            confidences: vec![1.0],
        })
    }
}

#[async_trait]
impl DictationEngine for HttpDictationEngine {
    async fn recognize(&self) -> Result<RawDictation> {
        let audio = self.source.record().await?;
        tracing::debug!(audio_bytes = audio.len(), provider = ?self.provider, "uploading utterance");

        match self.provider {
            Provider::Deepgram => self.recognize_deepgram(audio).await,
            Provider::Whisper => self.recognize_whisper(audio).await,
        }
    }
}
