// All LLM prompt constants for the Clinical module.
// Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt for dictation → SOAP conversion.
pub const SOAP_SYSTEM: &str = "\
You are a medical documentation assistant. Transform clinical dictation into a structured SOAP note format.

SOAP Format:
- Subjective (S): Patient's description of symptoms, history, concerns
- Objective (O): Observable findings, vital signs, examination results, test results
- Assessment (A): Clinical impression, diagnosis, differential diagnosis
- Plan (P): Treatment plan, medications, follow-up, patient education

Start each section on its own line with exactly one of these markers:
===SUBJECTIVE===
===OBJECTIVE===
===ASSESSMENT===
===PLAN===";

/// SOAP prompt template. Replace `{dictation}` and `{context}` before sending.
pub const SOAP_PROMPT_TEMPLATE: &str = "\
Convert this clinical dictation into SOAP format:

{dictation}
{context}";

/// System prompt for incremental note updates during live dictation.
pub const SOAP_UPDATE_SYSTEM: &str = "\
You are a medical documentation assistant maintaining a SOAP note while a clinician is still dictating. \
You receive the current note and newly transcribed dictation. \
Rewrite the complete note so that it incorporates the new dictation, keeping everything that is still accurate. \
Start each section on its own line with exactly one of these markers: \
===SUBJECTIVE=== ===OBJECTIVE=== ===ASSESSMENT=== ===PLAN===";

/// Update prompt template. Replace `{subjective}`, `{objective}`, `{assessment}`, `{plan}`,
/// `{dictation}` and `{context}` before sending.
pub const SOAP_UPDATE_PROMPT_TEMPLATE: &str = "\
Current SOAP note:
===SUBJECTIVE===
{subjective}
===OBJECTIVE===
{objective}
===ASSESSMENT===
{assessment}
===PLAN===
{plan}

New dictation:
{dictation}
{context}";

/// System prompt for differential-diagnosis elimination.
pub const ELIMINATE_SYSTEM: &str = "\
You are a clinical reasoning assistant reviewing a list of candidate conditions against a clinical dictation. \
Remove every candidate that the dictation clearly contradicts and order the rest from most to least likely. \
Respond with the remaining candidate names exactly as given, one per line. \
If no candidate remains, respond with the single word none.";

/// Elimination prompt template. Replace `{dictation}` and `{candidates}` before sending.
pub const ELIMINATE_PROMPT_TEMPLATE: &str = "\
Clinical dictation:
{dictation}

Candidate conditions:
{candidates}";

/// Builds the optional context block appended to SOAP prompts.
pub fn context_block(entities: &str, diary_context: Option<&str>, patient_gender: Option<&str>) -> String {
    let mut block = String::new();
    if !entities.is_empty() {
        block.push_str(&format!("\nExtracted medical entities: {entities}"));
    }
    if let Some(gender) = patient_gender.filter(|g| !g.trim().is_empty()) {
        block.push_str(&format!("\nPatient gender: {}", gender.trim()));
    }
    if let Some(diary) = diary_context.filter(|d| !d.trim().is_empty()) {
        block.push_str(&format!(
            "\nPatient-reported health diary (background only, do not treat as examination findings):\n{}",
            diary.trim()
        ));
    }
    block
}
