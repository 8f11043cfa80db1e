//! Speech-to-text: Azure short-audio recognition behind the `SpeechToText` trait.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::SpeechConfig;

pub mod audio;
pub mod stream;

use audio::AudioClip;

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("Azure Speech service not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Speech API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error(
        "No speech could be recognized ({0}). Please speak clearly, record for at least \
         2-3 seconds, check your microphone and reduce background noise."
    )]
    NoMatch(String),

    #[error("Speech was recognized but no text was returned. Please try speaking more clearly.")]
    EmptyText,

    #[error("Speech recognition failed with status: {0}")]
    Failed(String),
}

impl SpeechError {
    /// Errors caused by the audio itself rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, SpeechError::NoMatch(_) | SpeechError::EmptyText)
    }
}

#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn recognize(&self, clip: &AudioClip, language: &str) -> Result<String, SpeechError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RecognitionResponse {
    recognition_status: String,
    display_text: Option<String>,
}

/// Azure Speech REST client for short-audio recognition.
#[derive(Clone)]
pub struct AzureSpeechClient {
    client: Client,
    url: String,
    key: String,
}

impl AzureSpeechClient {
    pub fn new(client: Client, config: &SpeechConfig) -> Self {
        Self {
            client,
            url: format!(
                "https://{}.stt.speech.microsoft.com/speech/recognition/conversation/cognitiveservices/v1",
                config.region
            ),
            key: config.key.clone(),
        }
    }
}

#[async_trait]
impl SpeechToText for AzureSpeechClient {
    async fn recognize(&self, clip: &AudioClip, language: &str) -> Result<String, SpeechError> {
        let content_type = format!(
            "audio/wav; codecs=audio/pcm; samplerate={}",
            clip.format.sample_rate
        );

        debug!(
            "Recognizing {:.2}s of audio ({}Hz, {} channel(s), {}bit)",
            clip.duration_secs,
            clip.format.sample_rate,
            clip.format.channels,
            clip.format.bits_per_sample
        );

        let response = self
            .client
            .post(&self.url)
            .query(&[("language", language), ("format", "simple")])
            .header("Ocp-Apim-Subscription-Key", &self.key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header(reqwest::header::ACCEPT, "application/json")
            .body(clip.wav.clone())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SpeechError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let result: RecognitionResponse = response.json().await?;
        interpret_recognition(result)
    }
}

fn interpret_recognition(result: RecognitionResponse) -> Result<String, SpeechError> {
    match result.recognition_status.as_str() {
        "Success" => {
            let text = result.display_text.unwrap_or_default().trim().to_string();
            if text.is_empty() {
                Err(SpeechError::EmptyText)
            } else {
                Ok(text)
            }
        }
        "NoMatch" | "InitialSilenceTimeout" | "BabbleTimeout" => {
            Err(SpeechError::NoMatch(result.recognition_status))
        }
        other => Err(SpeechError::Failed(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<String, SpeechError> {
        interpret_recognition(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn test_success_returns_trimmed_text() {
        let text = parse(
            r#"{"RecognitionStatus":"Success","DisplayText":" Patient reports a headache. ","Offset":100,"Duration":2000}"#,
        )
        .unwrap();
        assert_eq!(text, "Patient reports a headache.");
    }

    #[test]
    fn test_success_without_text_is_empty_text() {
        let err = parse(r#"{"RecognitionStatus":"Success","DisplayText":""}"#).unwrap_err();
        assert!(matches!(err, SpeechError::EmptyText));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_silence_is_no_match() {
        let err = parse(r#"{"RecognitionStatus":"InitialSilenceTimeout"}"#).unwrap_err();
        assert!(matches!(err, SpeechError::NoMatch(ref s) if s == "InitialSilenceTimeout"));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_service_error_is_not_client_error() {
        let err = parse(r#"{"RecognitionStatus":"Error"}"#).unwrap_err();
        assert!(matches!(err, SpeechError::Failed(_)));
        assert!(!err.is_client_error());
    }
}
