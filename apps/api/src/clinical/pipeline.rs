//! SOAP note pipeline: dictation → entities → SOAP note → differential.
//!
//! Every external step degrades instead of failing. Entity extraction failure yields no
//! entities, an LLM failure yields the rule-based note, and a lookup failure yields an
//! empty differential.

use serde::Serialize;
use tracing::{debug, warn};

use crate::clinical::differential::build_differential;
use crate::clinical::prompts::{
    context_block, SOAP_PROMPT_TEMPLATE, SOAP_SYSTEM, SOAP_UPDATE_PROMPT_TEMPLATE,
    SOAP_UPDATE_SYSTEM,
};
use crate::clinical::soap_parser::{parse_soap_sections, Section};
use crate::integrations::HealthEntityExtractor;
use crate::llm_client::prompts::{fill, CLINICAL_ACCURACY_INSTRUCTION};
use crate::llm_client::{complete_with, ChatCompletion, ChatRequest};
use crate::models::clinical::{
    DifferentialDiagnosis, HealthAnalysis, HealthEntity, HealthRelation, SoapNote,
};
use crate::state::AppState;
use crate::vocabulary::find_symptoms;

/// Entities listed in the SOAP prompt.
const MAX_PROMPT_ENTITIES: usize = 10;

/// Optional background supplied by the live dictation client.
#[derive(Debug, Clone, Default)]
pub struct NoteContext {
    pub diary_context: Option<String>,
    pub patient_gender: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClinicalNoteResponse {
    pub transcription: String,
    pub soap_note: SoapNote,
    pub health_entities: Vec<HealthEntity>,
    pub health_relations: Vec<HealthRelation>,
    pub differential_diagnosis: DifferentialDiagnosis,
    pub confidence_score: f64,
}

/// `text (category)` for the first entities, comma separated.
pub fn entity_summary(analysis: &HealthAnalysis) -> String {
    analysis
        .entities
        .iter()
        .take(MAX_PROMPT_ENTITIES)
        .map(|e| format!("{} ({})", e.text, e.category))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Runs entity extraction when a client is configured. Failures yield an empty analysis.
pub async fn extract_entities(
    extractor: Option<&dyn HealthEntityExtractor>,
    text: &str,
) -> HealthAnalysis {
    let Some(extractor) = extractor else {
        return HealthAnalysis::default();
    };
    match extractor.extract(text).await {
        Ok(analysis) => {
            debug!("Extracted {} health entities", analysis.entities.len());
            analysis
        }
        Err(e) => {
            warn!("Health entity extraction failed: {e}");
            HealthAnalysis::default()
        }
    }
}

/// Rule-based note used when the LLM is unavailable.
pub fn fallback_soap_note(transcript: &str) -> SoapNote {
    let symptoms = find_symptoms(transcript);
    let assessment = if symptoms.is_empty() {
        "Clinical assessment pending.".to_string()
    } else {
        format!(
            "Reported symptoms: {}. Clinical assessment pending.",
            symptoms.join(", ")
        )
    };

    let subjective = transcript.trim();
    SoapNote {
        subjective: if subjective.is_empty() {
            Section::Subjective.placeholder()
        } else {
            subjective.to_string()
        },
        objective: "Objective findings to be documented.".to_string(),
        assessment,
        plan: "Treatment plan to be determined.".to_string(),
    }
}

/// Converts a complete dictation into a SOAP note.
pub async fn generate_soap_note(
    llm: Option<&dyn ChatCompletion>,
    transcript: &str,
    analysis: &HealthAnalysis,
    context: &NoteContext,
) -> SoapNote {
    let system = format!("{SOAP_SYSTEM}\n\n{CLINICAL_ACCURACY_INSTRUCTION}");
    let extra = context_block(
        &entity_summary(analysis),
        context.diary_context.as_deref(),
        context.patient_gender.as_deref(),
    );
    let user = fill(
        SOAP_PROMPT_TEMPLATE,
        &[("dictation", transcript), ("context", &extra)],
    );

    let request = ChatRequest {
        system: &system,
        user: &user,
        temperature: 0.3,
        max_tokens: 1000,
    };

    match complete_with(llm, request).await {
        Ok(text) => parse_soap_sections(&text, Some(transcript)),
        Err(e) => {
            warn!("SOAP generation failed, using rule-based note: {e}");
            fallback_soap_note(transcript)
        }
    }
}

/// Folds newly dictated text into `current`. The result replaces every section.
pub async fn update_soap_note(
    llm: Option<&dyn ChatCompletion>,
    current: &SoapNote,
    new_dictation: &str,
    context: &NoteContext,
) -> SoapNote {
    let system = format!("{SOAP_UPDATE_SYSTEM}\n\n{CLINICAL_ACCURACY_INSTRUCTION}");
    let extra = context_block(
        "",
        context.diary_context.as_deref(),
        context.patient_gender.as_deref(),
    );
    let user = fill(
        SOAP_UPDATE_PROMPT_TEMPLATE,
        &[
            ("subjective", &current.subjective),
            ("objective", &current.objective),
            ("assessment", &current.assessment),
            ("plan", &current.plan),
            ("dictation", new_dictation),
            ("context", &extra),
        ],
    );

    let request = ChatRequest {
        system: &system,
        user: &user,
        temperature: 0.3,
        max_tokens: 1000,
    };

    match complete_with(llm, request).await {
        Ok(text) => parse_soap_sections(&text, Some(&current.subjective)),
        Err(e) => {
            warn!("SOAP update failed, appending dictation to subjective: {e}");
            append_to_subjective(current, new_dictation)
        }
    }
}

fn append_to_subjective(current: &SoapNote, new_dictation: &str) -> SoapNote {
    let addition = new_dictation.trim();
    let mut note = current.clone();
    if addition.is_empty() {
        return note;
    }
    note.subjective = if current.subjective == Section::Subjective.placeholder() {
        addition.to_string()
    } else {
        format!("{}\n{}", current.subjective, addition)
    };
    note
}

/// Builds the full response for a finished transcript.
pub async fn build_clinical_note(
    state: &AppState,
    transcript: String,
    confidence_score: f64,
) -> ClinicalNoteResponse {
    let analysis = extract_entities(state.health_nlp.as_deref(), &transcript).await;
    let soap_note =
        generate_soap_note(state.llm(), &transcript, &analysis, &NoteContext::default()).await;
    let differential_diagnosis = build_differential(
        state.llm(),
        state.conditions.as_ref(),
        &transcript,
        &analysis,
    )
    .await;

    ClinicalNoteResponse {
        transcription: transcript,
        soap_note,
        health_entities: analysis.entities,
        health_relations: analysis.relations,
        differential_diagnosis,
        confidence_score,
    }
}
