//! Fixed symptom vocabulary backing every rule-based fallback.

/// Symptoms recognized by substring matching, most specific first.
pub const SYMPTOM_VOCABULARY: &[&str] = &[
    "sore throat",
    "shortness of breath",
    "chest pain",
    "abdominal pain",
    "back pain",
    "headache",
    "pain",
    "fever",
    "nausea",
    "vomiting",
    "diarrhea",
    "fatigue",
    "cough",
    "dizziness",
    "rash",
    "insomnia",
    "anxiety",
];

/// Vocabulary symptoms mentioned in `text`, in vocabulary order.
pub fn find_symptoms(text: &str) -> Vec<&'static str> {
    let lower = text.to_lowercase();
    SYMPTOM_VOCABULARY
        .iter()
        .copied()
        .filter(|symptom| lower.contains(symptom))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_symptoms_is_case_insensitive() {
        assert_eq!(find_symptoms("Bad HEADACHE and a Fever"), vec!["headache", "fever"]);
    }

    #[test]
    fn test_compound_symptom_also_matches_generic_pain() {
        assert_eq!(find_symptoms("chest pain at night"), vec!["chest pain", "pain"]);
    }

    #[test]
    fn test_no_symptoms() {
        assert!(find_symptoms("Had a salad for lunch").is_empty());
    }
}
