//! Diary pipeline: sentiment tagging, suggestions and the diary summary.
//!
//! LLM calls are optional here. Every operation has a deterministic answer computed from
//! keyword matching, used whenever the model is absent, fails, or answers off-format.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::diary::prompts::{
    SENTIMENT_PROMPT_TEMPLATE, SENTIMENT_SYSTEM, SUGGESTIONS_PROMPT_TEMPLATE, SUGGESTIONS_SYSTEM,
};
use crate::llm_client::prompts::{fill, PLAIN_TEXT_INSTRUCTION};
use crate::llm_client::{answer_lines, complete_with, ChatCompletion, ChatRequest};
use crate::models::diary::{DiaryEntry, EntryType, Sentiment};
use crate::vocabulary::{find_symptoms, SYMPTOM_VOCABULARY};

pub const MAX_SUGGESTIONS: usize = 3;

/// Entries included in the suggestions prompt, most recent last.
const SUGGESTION_WINDOW: usize = 10;

const TOP_SYMPTOMS: usize = 5;

const GENERIC_SUGGESTIONS: [&str; 2] = [
    "Consider maintaining regular sleep patterns",
    "Stay hydrated throughout the day",
];

const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "better", "happy", "improved", "improving", "well", "rested", "energetic",
    "calm", "relieved",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad", "worse", "worsening", "sad", "sick", "tired", "anxious", "awful", "terrible", "pain",
    "painful", "exhausted", "nauseous",
];

// ────────────────────────────────────────────────────────────────────────────
// Sentiment
// ────────────────────────────────────────────────────────────────────────────

/// Word-count sentiment used when the model cannot be asked.
pub fn lexicon_sentiment(text: &str) -> Sentiment {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .collect();

    let positive = words.iter().filter(|w| POSITIVE_WORDS.contains(w)).count();
    let negative = words.iter().filter(|w| NEGATIVE_WORDS.contains(w)).count();

    match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => Sentiment::Positive,
        std::cmp::Ordering::Less => Sentiment::Negative,
        std::cmp::Ordering::Equal => Sentiment::Neutral,
    }
}

pub async fn analyze_sentiment(llm: Option<&dyn ChatCompletion>, text: &str) -> Sentiment {
    let user = fill(SENTIMENT_PROMPT_TEMPLATE, &[("text", text)]);
    let request = ChatRequest {
        system: SENTIMENT_SYSTEM,
        user: &user,
        temperature: 0.3,
        max_tokens: 10,
    };

    match complete_with(llm, request).await {
        Ok(answer) => Sentiment::from_label(&answer).unwrap_or_else(|| {
            debug!("Unexpected sentiment label '{answer}', using neutral");
            Sentiment::Neutral
        }),
        Err(e) => {
            warn!("Sentiment analysis failed, using keyword lexicon: {e}");
            lexicon_sentiment(text)
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Suggestions
// ────────────────────────────────────────────────────────────────────────────

fn symptom_tip(symptom: &str) -> Option<&'static str> {
    let tip = match symptom {
        "headache" => "Note when headaches start and what preceded them, such as screen time, caffeine or missed meals",
        "fever" => "Rest, drink plenty of fluids and check your temperature regularly",
        "cough" | "sore throat" => "Warm fluids and rest can soothe your throat; see a doctor if it lasts more than a week",
        "nausea" | "vomiting" | "diarrhea" => "Try small, bland meals and sip water or an oral rehydration solution",
        "fatigue" | "insomnia" => "Keep a consistent sleep schedule and limit screens before bed",
        "dizziness" => "Stand up slowly and make sure you are eating and drinking regularly",
        "anxiety" => "Short breathing exercises or a daily walk can help ease anxiety",
        "shortness of breath" | "chest pain" => "Seek medical attention promptly for chest pain or trouble breathing",
        _ => return None,
    };
    Some(tip)
}

/// Tips for the symptoms mentioned in `entries`, else the generic pair.
pub fn fallback_suggestions(entries: &[DiaryEntry]) -> Vec<String> {
    let mut tips: Vec<String> = Vec::new();
    for entry in entries {
        for symptom in find_symptoms(&entry.text) {
            if let Some(tip) = symptom_tip(symptom) {
                if !tips.iter().any(|t| t == tip) {
                    tips.push(tip.to_string());
                }
            }
        }
    }

    if tips.is_empty() {
        return GENERIC_SUGGESTIONS.iter().map(|s| s.to_string()).collect();
    }
    tips.truncate(MAX_SUGGESTIONS);
    tips
}

pub async fn generate_suggestions(
    llm: Option<&dyn ChatCompletion>,
    entries: &[DiaryEntry],
) -> Vec<String> {
    if entries.is_empty() {
        return vec![];
    }

    let recent = &entries[entries.len().saturating_sub(SUGGESTION_WINDOW)..];
    let lines = recent
        .iter()
        .map(|e| format!("{}: {}", e.entry_type, e.text))
        .collect::<Vec<_>>()
        .join("\n");
    let user = fill(SUGGESTIONS_PROMPT_TEMPLATE, &[("entries", &lines)]);

    let system = format!("{SUGGESTIONS_SYSTEM} {PLAIN_TEXT_INSTRUCTION}");
    let request = ChatRequest {
        system: &system,
        user: &user,
        temperature: 0.7,
        max_tokens: 200,
    };

    match complete_with(llm, request).await {
        Ok(answer) => {
            let mut suggestions = answer_lines(&answer);
            if suggestions.is_empty() {
                return fallback_suggestions(recent);
            }
            suggestions.truncate(MAX_SUGGESTIONS);
            suggestions
        }
        Err(e) => {
            warn!("Suggestion generation failed, using rule-based tips: {e}");
            fallback_suggestions(recent)
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Summary
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DateRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentCount {
    pub sentiment: Sentiment,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymptomCount {
    pub symptom: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoodCount {
    pub mood: Sentiment,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimePoint {
    pub date: DateTime<Utc>,
    pub sentiment: Sentiment,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SentimentDistribution {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

impl SentimentDistribution {
    fn count(&self, sentiment: Sentiment) -> usize {
        match sentiment {
            Sentiment::Positive => self.positive,
            Sentiment::Negative => self.negative,
            Sentiment::Neutral => self.neutral,
        }
    }

    fn add(&mut self, sentiment: Sentiment) {
        match sentiment {
            Sentiment::Positive => self.positive += 1,
            Sentiment::Negative => self.negative += 1,
            Sentiment::Neutral => self.neutral += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VisualizationData {
    pub time_series: Vec<TimePoint>,
    pub sentiment_distribution: SentimentDistribution,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiarySummary {
    pub total_entries: usize,
    pub date_range: DateRange,
    pub sentiment_trend: Vec<SentimentCount>,
    pub common_symptoms: Vec<SymptomCount>,
    pub mood_patterns: Vec<MoodCount>,
    pub suggestions: Vec<String>,
    pub visualization_data: VisualizationData,
}

/// Mood words in a `mood` entry; anything else is neutral.
pub fn classify_mood(text: &str) -> Sentiment {
    let lower = text.to_lowercase();
    if lower.contains("happy") || lower.contains("good") {
        Sentiment::Positive
    } else if lower.contains("sad") || lower.contains("bad") {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

/// Aggregates `entries` without any model call.
pub fn summarize(entries: &[DiaryEntry], suggestions: Vec<String>) -> DiarySummary {
    if entries.is_empty() {
        return DiarySummary {
            suggestions,
            ..Default::default()
        };
    }

    let mut distribution = SentimentDistribution::default();
    let mut symptom_counts = vec![0usize; SYMPTOM_VOCABULARY.len()];
    let mut moods = SentimentDistribution::default();
    let mut time_series = Vec::with_capacity(entries.len());

    for entry in entries {
        let sentiment = entry.sentiment.unwrap_or_default();
        distribution.add(sentiment);

        match entry.entry_type {
            EntryType::Symptom => {
                for symptom in find_symptoms(&entry.text) {
                    if let Some(i) = SYMPTOM_VOCABULARY.iter().position(|s| *s == symptom) {
                        symptom_counts[i] += 1;
                    }
                }
            }
            EntryType::Mood => moods.add(classify_mood(&entry.text)),
            _ => {}
        }

        time_series.push(TimePoint {
            date: entry.timestamp,
            sentiment,
            entry_type: entry.entry_type,
        });
    }

    let mut common_symptoms: Vec<SymptomCount> = SYMPTOM_VOCABULARY
        .iter()
        .zip(symptom_counts)
        .filter(|(_, count)| *count > 0)
        .map(|(symptom, count)| SymptomCount {
            symptom: symptom.to_string(),
            count,
        })
        .collect();
    common_symptoms.sort_by(|a, b| b.count.cmp(&a.count));
    common_symptoms.truncate(TOP_SYMPTOMS);

    let sentiment_trend = Sentiment::ALL
        .into_iter()
        .map(|sentiment| SentimentCount {
            sentiment,
            count: distribution.count(sentiment),
        })
        .collect();

    let mood_patterns = Sentiment::ALL
        .into_iter()
        .filter(|mood| moods.count(*mood) > 0)
        .map(|mood| MoodCount {
            mood,
            count: moods.count(mood),
        })
        .collect();

    DiarySummary {
        total_entries: entries.len(),
        date_range: DateRange {
            start: entries.iter().map(|e| e.timestamp).min(),
            end: entries.iter().map(|e| e.timestamp).max(),
        },
        sentiment_trend,
        common_symptoms,
        mood_patterns,
        suggestions,
        visualization_data: VisualizationData {
            time_series,
            sentiment_distribution: distribution,
        },
    }
}

pub async fn generate_summary(
    llm: Option<&dyn ChatCompletion>,
    entries: &[DiaryEntry],
) -> DiarySummary {
    let suggestions = generate_suggestions(llm, entries).await;
    summarize(entries, suggestions)
}
