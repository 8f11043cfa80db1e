//! Axum route handlers for the Diary API.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::diary::pipeline::{analyze_sentiment, generate_suggestions, generate_summary, DiarySummary};
use crate::errors::AppError;
use crate::models::diary::{DiaryEntry, EntryType, Sentiment};
use crate::routes::form::FormFields;
use crate::speech::audio::{decode_audio_base64, validate_audio};
use crate::speech::SpeechError;
use crate::state::AppState;

const DEFAULT_LANGUAGE: &str = "en-US";

// ────────────────────────────────────────────────────────────────────────────
// Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct DiaryEntryResponse {
    pub id: String,
    pub text: String,
    pub entry_type: EntryType,
    pub timestamp: DateTime<Utc>,
    pub sentiment: Option<Sentiment>,
    pub summary: Option<String>,
    pub suggestions: Vec<String>,
}

impl DiaryEntryResponse {
    fn from_entry(entry: DiaryEntry, suggestions: Vec<String>) -> Self {
        Self {
            id: entry.id,
            text: entry.text,
            entry_type: entry.entry_type,
            timestamp: entry.timestamp,
            sentiment: entry.sentiment,
            summary: None,
            suggestions,
        }
    }
}

/// RFC 3339, or a naive ISO-8601 datetime read as UTC. Unparseable values yield `None`.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/diary/entry
///
/// Form fields: `entry_type`, plus `text` or base64 `audio_data`, and an optional `timestamp`.
/// Text wins when both are supplied.
pub async fn handle_create_entry(
    State(state): State<AppState>,
    form: FormFields,
) -> Result<Json<DiaryEntryResponse>, AppError> {
    let entry_type = form
        .required("entry_type")?
        .parse::<EntryType>()
        .map_err(AppError::Validation)?;

    let text = match (form.optional("text"), form.optional("audio_data")) {
        (Some(text), _) => text.trim().to_string(),
        (None, Some(audio)) => {
            let clip = validate_audio(decode_audio_base64(audio)?)?;
            let speech = state.speech.as_ref().ok_or(SpeechError::NotConfigured)?;
            let language = form.optional("language").unwrap_or(DEFAULT_LANGUAGE);
            speech.recognize(&clip, language).await?
        }
        (None, None) => {
            return Err(AppError::Validation(
                "Either text or audio_data must be provided".to_string(),
            ))
        }
    };

    let timestamp = form
        .optional("timestamp")
        .and_then(|raw| {
            let parsed = parse_timestamp(raw);
            if parsed.is_none() {
                debug!("Ignoring unparseable timestamp '{raw}'");
            }
            parsed
        })
        .unwrap_or_else(Utc::now);

    let sentiment = analyze_sentiment(state.llm(), &text).await;

    let entry = DiaryEntry {
        id: Uuid::new_v4().to_string(),
        text,
        entry_type,
        timestamp,
        sentiment: Some(sentiment),
    };

    let suggestions = generate_suggestions(state.llm(), std::slice::from_ref(&entry)).await;

    state.diary.insert(entry.clone()).await;
    info!("Diary entry {} created ({entry_type}, {sentiment:?})", entry.id);

    Ok(Json(DiaryEntryResponse::from_entry(entry, suggestions)))
}

/// GET /api/diary/entries
pub async fn handle_list_entries(State(state): State<AppState>) -> Json<Vec<DiaryEntryResponse>> {
    let entries = state
        .diary
        .list()
        .await
        .into_iter()
        .map(|entry| DiaryEntryResponse::from_entry(entry, vec![]))
        .collect();
    Json(entries)
}

/// GET /api/diary/summary
pub async fn handle_summary(State(state): State<AppState>) -> Json<DiarySummary> {
    let entries = state.diary.list().await;
    Json(generate_summary(state.llm(), &entries).await)
}

/// DELETE /api/diary/entries/:id
pub async fn handle_delete_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    if !state.diary.remove(&id).await {
        return Err(AppError::NotFound("Entry not found".to_string()));
    }
    info!("Diary entry {id} deleted");
    Ok(Json(json!({ "message": "Entry deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_timestamp_variants() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-05-01T08:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01T10:30:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01T08:30:00"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}
