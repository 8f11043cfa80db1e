//! Doctor matching: symptoms → specialty, and LLM re-ranking of registry results.

use tracing::{debug, warn};

use crate::doctors::prompts::{
    RANK_PROMPT_TEMPLATE, RANK_SYSTEM, SPECIALTY_PROMPT_TEMPLATE, SPECIALTY_SYSTEM_TEMPLATE,
};
use crate::llm_client::prompts::{fill, PLAIN_TEXT_INSTRUCTION};
use crate::llm_client::{complete_with, ChatCompletion, ChatRequest};
use crate::models::clinical::Doctor;

pub const DEFAULT_SPECIALTY: &str = "Family Medicine";

/// Taxonomy descriptions understood by the provider registry.
pub const SPECIALTIES: &[&str] = &[
    "Family Medicine",
    "Internal Medicine",
    "Allergy & Immunology",
    "Cardiovascular Disease",
    "Dermatology",
    "Endocrinology, Diabetes & Metabolism",
    "Gastroenterology",
    "Infectious Disease",
    "Nephrology",
    "Neurology",
    "Obstetrics & Gynecology",
    "Ophthalmology",
    "Orthopaedic Surgery",
    "Otolaryngology",
    "Pediatrics",
    "Psychiatry",
    "Pulmonary Disease",
    "Rheumatology",
    "Urology",
];

/// Symptom keyword → specialty, checked in order.
const KEYWORD_SPECIALTIES: &[(&str, &str)] = &[
    ("chest pain", "Cardiovascular Disease"),
    ("palpitation", "Cardiovascular Disease"),
    ("shortness of breath", "Pulmonary Disease"),
    ("wheez", "Pulmonary Disease"),
    ("asthma", "Pulmonary Disease"),
    ("headache", "Neurology"),
    ("migraine", "Neurology"),
    ("dizziness", "Neurology"),
    ("numbness", "Neurology"),
    ("seizure", "Neurology"),
    ("rash", "Dermatology"),
    ("itch", "Dermatology"),
    ("acne", "Dermatology"),
    ("abdominal pain", "Gastroenterology"),
    ("nausea", "Gastroenterology"),
    ("vomiting", "Gastroenterology"),
    ("diarrhea", "Gastroenterology"),
    ("heartburn", "Gastroenterology"),
    ("sore throat", "Otolaryngology"),
    ("sinus", "Otolaryngology"),
    ("back pain", "Orthopaedic Surgery"),
    ("fracture", "Orthopaedic Surgery"),
    ("joint pain", "Rheumatology"),
    ("anxiety", "Psychiatry"),
    ("depression", "Psychiatry"),
    ("insomnia", "Psychiatry"),
    ("thirst", "Endocrinology, Diabetes & Metabolism"),
    ("urinat", "Urology"),
    ("blurred vision", "Ophthalmology"),
    ("sneez", "Allergy & Immunology"),
];

// ────────────────────────────────────────────────────────────────────────────
// Specialty
// ────────────────────────────────────────────────────────────────────────────

pub fn keyword_specialty(symptoms: &str) -> &'static str {
    let lower = symptoms.to_lowercase();
    KEYWORD_SPECIALTIES
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map(|(_, specialty)| *specialty)
        .unwrap_or(DEFAULT_SPECIALTY)
}

/// Maps a one-line answer onto the fixed list: exact match first, then containment.
pub fn match_specialty(answer: &str) -> Option<&'static str> {
    let line = answer
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())?
        .trim_matches(|c: char| c == '.' || c == '"' || c == '*' || c.is_whitespace())
        .to_lowercase();

    SPECIALTIES
        .iter()
        .find(|s| s.to_lowercase() == line)
        .or_else(|| SPECIALTIES.iter().find(|s| line.contains(&s.to_lowercase())))
        .copied()
}

pub async fn classify_specialty(llm: Option<&dyn ChatCompletion>, symptoms: &str) -> String {
    let system = fill(
        SPECIALTY_SYSTEM_TEMPLATE,
        &[("specialties", &SPECIALTIES.join("\n"))],
    );
    let user = fill(SPECIALTY_PROMPT_TEMPLATE, &[("symptoms", symptoms)]);
    let request = ChatRequest {
        system: &system,
        user: &user,
        temperature: 0.0,
        max_tokens: 20,
    };

    match complete_with(llm, request).await {
        Ok(answer) => match match_specialty(&answer) {
            Some(specialty) => specialty.to_string(),
            None => {
                warn!("Specialty answer '{answer}' not in list, using keyword map");
                keyword_specialty(symptoms).to_string()
            }
        },
        Err(e) => {
            warn!("Specialty classification failed, using keyword map: {e}");
            keyword_specialty(symptoms).to_string()
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Ranking
// ────────────────────────────────────────────────────────────────────────────

/// Reorders `doctors` by the NPIs named in `answer`. Unknown NPIs are ignored and
/// unmentioned doctors follow in their original order.
pub fn apply_ranking(answer: &str, doctors: Vec<Doctor>) -> Vec<Doctor> {
    let mut remaining: Vec<Option<Doctor>> = doctors.into_iter().map(Some).collect();
    let mut ranked = Vec::with_capacity(remaining.len());

    for npi in answer
        .split(|c: char| !c.is_ascii_digit())
        .filter(|t| !t.is_empty())
    {
        if let Some(slot) = remaining
            .iter_mut()
            .find(|slot| slot.as_ref().is_some_and(|d| d.npi == npi))
        {
            ranked.extend(slot.take());
        }
    }

    ranked.extend(remaining.into_iter().flatten());
    ranked
}

/// Returns the doctors reordered by the model, and whether the model's order was used.
pub async fn rank_doctors(
    llm: Option<&dyn ChatCompletion>,
    symptoms: &str,
    doctors: Vec<Doctor>,
) -> (Vec<Doctor>, bool) {
    if doctors.len() < 2 {
        return (doctors, false);
    }

    let listing = doctors
        .iter()
        .map(|d| {
            format!(
                "NPI {}: {}{} ({})",
                d.npi,
                d.name,
                d.credential
                    .as_deref()
                    .map(|c| format!(", {c}"))
                    .unwrap_or_default(),
                d.specialty.as_deref().unwrap_or("unknown specialty")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    let user = fill(
        RANK_PROMPT_TEMPLATE,
        &[("symptoms", symptoms), ("doctors", &listing)],
    );
    let system = format!("{RANK_SYSTEM} {PLAIN_TEXT_INSTRUCTION}");
    let request = ChatRequest {
        system: &system,
        user: &user,
        temperature: 0.2,
        max_tokens: 200,
    };

    match complete_with(llm, request).await {
        Ok(answer) => {
            debug!("Ranking answer: {answer}");
            (apply_ranking(&answer, doctors), true)
        }
        Err(e) => {
            warn!("Doctor ranking failed, keeping registry order: {e}");
            (doctors, false)
        }
    }
}
