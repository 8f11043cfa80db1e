use serde::{Deserialize, Serialize};

/// Four-section clinical note. Every field is always non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoapNote {
    pub subjective: String,
    pub objective: String,
    pub assessment: String,
    pub plan: String,
}

/// Entity span returned by the healthcare NLP service, passed through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthEntity {
    pub text: String,
    pub category: String,
    pub confidence: f64,
    pub offset: usize,
    pub length: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationRole {
    pub entity: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRelation {
    pub relation_type: String,
    pub roles: Vec<RelationRole>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthAnalysis {
    pub entities: Vec<HealthEntity>,
    pub relations: Vec<HealthRelation>,
}

/// A condition surfaced by the terminology lookup for one or more symptoms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionCandidate {
    pub name: String,
    pub icd10_codes: Vec<String>,
    pub matched_symptoms: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifferentialDiagnosis {
    pub symptoms: Vec<String>,
    pub candidates: Vec<ConditionCandidate>,
    pub eliminated: Vec<String>,
    /// "llm" | "rule_based"
    pub method: String,
}

/// A provider record from the public registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    pub npi: String,
    pub name: String,
    pub credential: Option<String>,
    pub specialty: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
}
