//! Differential diagnosis: symptoms → candidate conditions → LLM elimination.
//!
//! Candidates come from the public conditions lookup, one query per symptom. The LLM only
//! removes and reorders candidates; it never adds new ones. Without a usable LLM answer the
//! candidates are ranked by how many of the reported symptoms they matched.

use tracing::{debug, warn};

use crate::clinical::prompts::{ELIMINATE_PROMPT_TEMPLATE, ELIMINATE_SYSTEM};
use crate::integrations::ConditionLookup;
use crate::llm_client::prompts::{fill, PLAIN_TEXT_INSTRUCTION};
use crate::llm_client::{answer_lines, complete_with, ChatCompletion, ChatRequest};
use crate::models::clinical::{ConditionCandidate, DifferentialDiagnosis, HealthAnalysis};
use crate::vocabulary::find_symptoms;

pub const MAX_SYMPTOMS: usize = 3;
pub const MAX_RESULTS_PER_SYMPTOM: usize = 5;

const SYMPTOM_CATEGORY: &str = "SymptomOrSign";

/// Symptoms to look up: extracted `SymptomOrSign` entities, or vocabulary matches when the
/// extractor found none.
pub fn collect_symptoms(transcript: &str, analysis: &HealthAnalysis) -> Vec<String> {
    let mut symptoms: Vec<String> = Vec::new();
    for entity in analysis
        .entities
        .iter()
        .filter(|e| e.category == SYMPTOM_CATEGORY)
    {
        let symptom = entity.text.trim().to_lowercase();
        if !symptom.is_empty() && !symptoms.contains(&symptom) {
            symptoms.push(symptom);
        }
    }

    if symptoms.is_empty() {
        symptoms = find_symptoms(transcript)
            .into_iter()
            .map(str::to_string)
            .collect();
    }

    symptoms.truncate(MAX_SYMPTOMS);
    symptoms
}

/// Queries the lookup once per symptom and merges the hits by condition name.
/// A failed lookup contributes no candidates.
pub async fn lookup_candidates(
    conditions: &dyn ConditionLookup,
    symptoms: &[String],
) -> Vec<ConditionCandidate> {
    let mut candidates: Vec<ConditionCandidate> = Vec::new();

    for symptom in symptoms {
        let hits = match conditions.search(symptom, MAX_RESULTS_PER_SYMPTOM).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Condition lookup for '{symptom}' failed: {e}");
                continue;
            }
        };

        for hit in hits {
            match candidates
                .iter_mut()
                .find(|c| c.name.eq_ignore_ascii_case(&hit.name))
            {
                Some(existing) => {
                    if !existing.matched_symptoms.contains(symptom) {
                        existing.matched_symptoms.push(symptom.clone());
                    }
                    for code in hit.icd10_codes {
                        if !existing.icd10_codes.contains(&code) {
                            existing.icd10_codes.push(code);
                        }
                    }
                }
                None => candidates.push(ConditionCandidate {
                    name: hit.name,
                    icd10_codes: hit.icd10_codes,
                    matched_symptoms: vec![symptom.clone()],
                }),
            }
        }
    }

    candidates
}

/// Most matched symptoms first; ties keep lookup order.
pub fn rank_by_symptom_overlap(mut candidates: Vec<ConditionCandidate>) -> Vec<ConditionCandidate> {
    candidates.sort_by(|a, b| b.matched_symptoms.len().cmp(&a.matched_symptoms.len()));
    candidates
}

/// Applies the LLM's answer. Returns `(survivors, eliminated names)`, or `None` when the
/// answer names no known candidate and is not an explicit "none".
pub fn apply_elimination(
    answer: &str,
    candidates: &[ConditionCandidate],
) -> Option<(Vec<ConditionCandidate>, Vec<String>)> {
    let lines = answer_lines(answer);

    let survivors: Vec<ConditionCandidate> = if lines.len() == 1
        && lines[0].trim_end_matches('.').eq_ignore_ascii_case("none")
    {
        Vec::new()
    } else {
        let mut kept: Vec<ConditionCandidate> = Vec::new();
        for line in &lines {
            let Some(candidate) = candidates
                .iter()
                .find(|c| line.trim_end_matches('.').eq_ignore_ascii_case(&c.name))
            else {
                continue;
            };
            if !kept.iter().any(|k| k.name == candidate.name) {
                kept.push(candidate.clone());
            }
        }
        if kept.is_empty() {
            return None;
        }
        kept
    };

    let eliminated = candidates
        .iter()
        .filter(|c| !survivors.iter().any(|s| s.name == c.name))
        .map(|c| c.name.clone())
        .collect();

    Some((survivors, eliminated))
}

/// Full differential pass for one transcript.
pub async fn build_differential(
    llm: Option<&dyn ChatCompletion>,
    conditions: &dyn ConditionLookup,
    transcript: &str,
    analysis: &HealthAnalysis,
) -> DifferentialDiagnosis {
    let symptoms = collect_symptoms(transcript, analysis);
    let candidates = lookup_candidates(conditions, &symptoms).await;

    if candidates.is_empty() {
        return DifferentialDiagnosis {
            symptoms,
            method: "rule_based".to_string(),
            ..Default::default()
        };
    }

    let candidate_list = candidates
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let user = fill(
        ELIMINATE_PROMPT_TEMPLATE,
        &[("dictation", transcript), ("candidates", &candidate_list)],
    );
    let system = format!("{ELIMINATE_SYSTEM} {PLAIN_TEXT_INSTRUCTION}");
    let request = ChatRequest {
        system: &system,
        user: &user,
        temperature: 0.2,
        max_tokens: 300,
    };

    let applied = match complete_with(llm, request).await {
        Ok(answer) => {
            let applied = apply_elimination(&answer, &candidates);
            if applied.is_none() {
                warn!("Elimination answer named no known candidate, ranking by symptom overlap");
            }
            applied
        }
        Err(e) => {
            warn!("Candidate elimination failed, ranking by symptom overlap: {e}");
            None
        }
    };

    match applied {
        Some((survivors, eliminated)) => {
            debug!(
                "Differential kept {} of {} candidates",
                survivors.len(),
                survivors.len() + eliminated.len()
            );
            DifferentialDiagnosis {
                symptoms,
                candidates: survivors,
                eliminated,
                method: "llm".to_string(),
            }
        }
        None => DifferentialDiagnosis {
            symptoms,
            candidates: rank_by_symptom_overlap(candidates),
            eliminated: vec![],
            method: "rule_based".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::clinical::HealthEntity;
    use crate::test_support::{FakeChat, FakeConditions};

    fn entity(text: &str, category: &str) -> HealthEntity {
        HealthEntity {
            text: text.to_string(),
            category: category.to_string(),
            confidence: 0.9,
            offset: 0,
            length: text.len(),
        }
    }

    fn candidate(name: &str, symptoms: &[&str]) -> ConditionCandidate {
        ConditionCandidate {
            name: name.to_string(),
            icd10_codes: vec![],
            matched_symptoms: symptoms.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_collect_symptoms_prefers_entities() {
        let analysis = HealthAnalysis {
            entities: vec![
                entity("Fever", "SymptomOrSign"),
                entity("ibuprofen", "MedicationName"),
                entity("fever", "SymptomOrSign"),
                entity("Cough", "SymptomOrSign"),
            ],
            relations: vec![],
        };
        assert_eq!(
            collect_symptoms("headache too", &analysis),
            vec!["fever".to_string(), "cough".to_string()]
        );
    }

    #[test]
    fn test_collect_symptoms_falls_back_to_vocabulary_and_caps() {
        let symptoms = collect_symptoms(
            "Nausea, fever, cough and fatigue since Monday",
            &HealthAnalysis::default(),
        );
        assert_eq!(symptoms, vec!["fever", "nausea", "fatigue"]);
    }

    #[tokio::test]
    async fn test_lookup_merges_candidates_by_name() {
        let conditions = FakeConditions::default()
            .with("fever", &["Influenza", "Malaria"])
            .with("cough", &["influenza", "Bronchitis"]);
        let symptoms = vec!["fever".to_string(), "cough".to_string()];

        let candidates = lookup_candidates(&conditions, &symptoms).await;

        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].name, "Influenza");
        assert_eq!(candidates[0].matched_symptoms, vec!["fever", "cough"]);
        assert_eq!(conditions.terms(), vec!["fever", "cough"]);
    }

    #[test]
    fn test_apply_elimination_keeps_llm_order() {
        let candidates = vec![
            candidate("Influenza", &["fever"]),
            candidate("Malaria", &["fever"]),
            candidate("Bronchitis", &["cough"]),
        ];
        let (kept, eliminated) =
            apply_elimination("1. Bronchitis\n2. influenza\nSomething else", &candidates).unwrap();
        assert_eq!(
            kept.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            vec!["Bronchitis", "Influenza"]
        );
        assert_eq!(eliminated, vec!["Malaria"]);
    }

    #[test]
    fn test_apply_elimination_none_removes_all() {
        let candidates = vec![candidate("Malaria", &["fever"])];
        let (kept, eliminated) = apply_elimination("None.", &candidates).unwrap();
        assert!(kept.is_empty());
        assert_eq!(eliminated, vec!["Malaria"]);
    }

    #[test]
    fn test_apply_elimination_unusable_answer() {
        let candidates = vec![candidate("Malaria", &["fever"])];
        assert!(apply_elimination("I cannot help with that.", &candidates).is_none());
    }

    #[tokio::test]
    async fn test_build_differential_without_llm_ranks_by_overlap() {
        let conditions = FakeConditions::default()
            .with("fever", &["Malaria", "Influenza"])
            .with("cough", &["Influenza"]);

        let differential =
            build_differential(None, &conditions, "fever and cough", &HealthAnalysis::default())
                .await;

        assert_eq!(differential.method, "rule_based");
        assert_eq!(differential.candidates[0].name, "Influenza");
        assert_eq!(differential.candidates[1].name, "Malaria");
        assert!(differential.eliminated.is_empty());
    }

    #[tokio::test]
    async fn test_build_differential_with_llm() {
        let conditions = FakeConditions::default().with("fever", &["Malaria", "Influenza"]);
        let chat = FakeChat::new().route("Candidate conditions", "Influenza");

        let differential = build_differential(
            Some(&chat),
            &conditions,
            "fever, no travel history",
            &HealthAnalysis::default(),
        )
        .await;

        assert_eq!(differential.method, "llm");
        assert_eq!(differential.candidates.len(), 1);
        assert_eq!(differential.eliminated, vec!["Malaria"]);
        assert_eq!(chat.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_build_differential_without_candidates_skips_llm() {
        let chat = FakeChat::new().route("Candidate conditions", "none");
        let differential = build_differential(
            Some(&chat),
            &FakeConditions::default(),
            "routine visit",
            &HealthAnalysis::default(),
        )
        .await;

        assert!(differential.symptoms.is_empty());
        assert!(differential.candidates.is_empty());
        assert!(chat.requests().is_empty());
    }
}
