// All LLM prompt constants for the Doctors module.

/// System prompt for specialty classification. Replace `{specialties}` before sending.
pub const SPECIALTY_SYSTEM_TEMPLATE: &str = "\
You route patients to the right kind of physician. \
Given a patient's symptoms, answer with exactly one specialty from this list and nothing else:
{specialties}";

/// Specialty prompt template. Replace `{symptoms}` before sending.
pub const SPECIALTY_PROMPT_TEMPLATE: &str = "Patient symptoms: {symptoms}";

/// System prompt for doctor ranking.
pub const RANK_SYSTEM: &str = "\
You help patients choose between physicians. \
Order the doctors from best to worst fit for the patient's symptoms, using their specialty and credentials. \
Respond with their NPI numbers only, comma separated, and nothing else.";

/// Ranking prompt template. Replace `{symptoms}` and `{doctors}` before sending.
pub const RANK_PROMPT_TEMPLATE: &str = "\
Patient symptoms: {symptoms}

Doctors:
{doctors}";
