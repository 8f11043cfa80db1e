//! Axum route handlers for the Clinical API.

use axum::{extract::State, Json};
use tracing::info;

use crate::clinical::pipeline::{build_clinical_note, ClinicalNoteResponse};
use crate::errors::AppError;
use crate::routes::form::FormFields;
use crate::speech::audio::{decode_audio_base64, validate_audio};
use crate::speech::SpeechError;
use crate::state::AppState;

const DEFAULT_LANGUAGE: &str = "en-US";

/// Fixed confidence reported for speech transcripts.
const TRANSCRIPT_CONFIDENCE: f64 = 0.85;
const TEXT_CONFIDENCE: f64 = 1.0;

/// POST /api/clinical/transcribe
///
/// Form fields: `audio_data` (base64), `language` (default en-US).
/// Audio is validated locally before the speech service is called.
pub async fn handle_transcribe(
    State(state): State<AppState>,
    form: FormFields,
) -> Result<Json<ClinicalNoteResponse>, AppError> {
    let audio = form.required("audio_data")?;
    let language = form.optional("language").unwrap_or(DEFAULT_LANGUAGE);

    let clip = validate_audio(decode_audio_base64(audio)?)?;
    let speech = state.speech.as_ref().ok_or(SpeechError::NotConfigured)?;
    let transcript = speech.recognize(&clip, language).await?;

    info!(
        "Transcribed {:.1}s of clinical audio ({} chars)",
        clip.duration_secs,
        transcript.len()
    );

    let note = build_clinical_note(&state, transcript, TRANSCRIPT_CONFIDENCE).await;
    Ok(Json(note))
}

/// POST /api/clinical/text-to-soap
///
/// Form field: `text`. Same pipeline as transcription, minus speech recognition.
pub async fn handle_text_to_soap(
    State(state): State<AppState>,
    form: FormFields,
) -> Result<Json<ClinicalNoteResponse>, AppError> {
    let text = form.required("text")?.trim().to_string();
    let note = build_clinical_note(&state, text, TEXT_CONFIDENCE).await;
    Ok(Json(note))
}
