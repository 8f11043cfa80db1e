use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    Symptom,
    Food,
    Mood,
    General,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Symptom => "symptom",
            EntryType::Food => "food",
            EntryType::Mood => "mood",
            EntryType::General => "general",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "symptom" => Ok(EntryType::Symptom),
            "food" => Ok(EntryType::Food),
            "mood" => Ok(EntryType::Mood),
            "general" => Ok(EntryType::General),
            other => Err(format!(
                "Unknown entry_type '{other}'. Expected one of: symptom, food, mood, general"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }

    /// Parses a single-word label. Anything else is `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().trim_end_matches('.').to_ascii_lowercase();
        Sentiment::ALL.into_iter().find(|s| s.as_str() == label)
    }
}

/// A patient-authored diary entry. Lives only in process memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiaryEntry {
    pub id: String,
    pub text: String,
    pub entry_type: EntryType,
    pub timestamp: DateTime<Utc>,
    pub sentiment: Option<Sentiment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_type_parses_case_insensitively() {
        assert_eq!("Symptom".parse::<EntryType>().unwrap(), EntryType::Symptom);
        assert_eq!(" mood ".parse::<EntryType>().unwrap(), EntryType::Mood);
        assert!("exercise".parse::<EntryType>().is_err());
    }

    #[test]
    fn test_sentiment_label_tolerates_trailing_period() {
        assert_eq!(Sentiment::from_label("Positive."), Some(Sentiment::Positive));
        assert_eq!(Sentiment::from_label("mixed"), None);
    }

    #[test]
    fn test_entry_serializes_snake_case_enums() {
        let entry = DiaryEntry {
            id: "abc".to_string(),
            text: "Slept badly".to_string(),
            entry_type: EntryType::Symptom,
            timestamp: Utc::now(),
            sentiment: Some(Sentiment::Negative),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["entry_type"], "symptom");
        assert_eq!(json["sentiment"], "negative");
    }
}
